//! Topic routing.
//!
//! Topics are dot-delimited strings such as `log.info` or `signal.TERM`.
//! Subscriptions use AMQP-flavoured patterns that are compiled into an
//! anchored regular expression:
//!
//! ```text
//! ['foo', 'bar', 'baz'] => ^foo\.bar\.baz$      foo.bar.baz
//! ['foo', '*', 'baz']   => ^foo\.[^.]+\.baz$    foo.*.baz
//! ['foo', '#', 'baz']   => ^foo.*?\.baz$        foo.#.baz
//! ```
//!
//! `#` is a non-greedy run of arbitrary characters and does not respect
//! segment boundaries: `foo.#.baz` also matches `foobar.baz`.
//! A [`Regex`] is used as-is, without anchoring.

use regex::Regex;

use crate::error::{DispatchError, DispatchResult};

const SINGLE_SEGMENT: &str = "*";
const MULTI_SEGMENT: &str = "#";

/// A compiled subscription pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile a dot-delimited pattern such as `foo.*.baz`.
    pub fn parse(pattern: &str) -> DispatchResult<Self> {
        let segments: Vec<&str> = pattern.split('.').collect();
        Self::from_segments(&segments)
    }

    /// Compile a pattern from pre-split segments.
    ///
    /// Equivalent to joining the segments with `.` and calling [`Pattern::parse`].
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> DispatchResult<Self> {
        let mut source = String::from("^");
        for (index, segment) in segments.iter().enumerate() {
            match segment.as_ref() {
                SINGLE_SEGMENT => {
                    if index > 0 {
                        source.push_str(r"\.");
                    }
                    source.push_str(r"[^.]+");
                }
                MULTI_SEGMENT => source.push_str(".*?"),
                literal => {
                    if index > 0 {
                        source.push_str(r"\.");
                    }
                    source.push_str(&regex::escape(literal));
                }
            }
        }
        source.push('$');
        Self::compile(&source)
    }

    /// Use a raw regular expression. It is not anchored.
    pub fn regex(expr: &str) -> DispatchResult<Self> {
        Self::compile(expr)
    }

    fn compile(expr: &str) -> DispatchResult<Self> {
        let regex = Regex::new(expr).map_err(|source| DispatchError::InvalidPattern {
            pattern: expr.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// Test a topic against this pattern.
    pub fn is_match(&self, topic: &str) -> bool {
        self.regex.is_match(topic)
    }

    /// The compiled expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self { regex }
    }
}

/// Conversion into a compiled [`Pattern`].
pub trait IntoPattern {
    fn into_pattern(self) -> DispatchResult<Pattern>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Ok(self)
    }
}

impl IntoPattern for Regex {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Ok(Pattern::from(self))
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Pattern::parse(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Pattern::parse(&self)
    }
}

impl IntoPattern for &String {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Pattern::parse(self)
    }
}

impl<S: AsRef<str>> IntoPattern for &[S] {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Pattern::from_segments(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoPattern for [S; N] {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Pattern::from_segments(&self)
    }
}

impl<S: AsRef<str>> IntoPattern for Vec<S> {
    fn into_pattern(self) -> DispatchResult<Pattern> {
        Pattern::from_segments(&self)
    }
}

/// A signalled topic. Segment lists are joined with `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(topic: &str) -> Self {
        Self(topic.to_string())
    }
}

impl From<String> for Topic {
    fn from(topic: String) -> Self {
        Self(topic)
    }
}

impl From<&String> for Topic {
    fn from(topic: &String) -> Self {
        Self(topic.clone())
    }
}

impl<S: AsRef<str>> From<&[S]> for Topic {
    fn from(segments: &[S]) -> Self {
        Self(join_segments(segments))
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Topic {
    fn from(segments: [S; N]) -> Self {
        Self(join_segments(&segments))
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Topic {
    fn from(segments: Vec<S>) -> Self {
        Self(join_segments(&segments))
    }
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod tests;

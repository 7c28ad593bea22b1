//! Signal names and their normalization.
//!
//! The canonical name of a signal is its platform name without the `SIG`
//! prefix: `INT`, `TERM`, `USR1`. Anything that identifies a signal (a bare
//! name, a `SIG`-prefixed name, a number or a numeric string) can be turned
//! into a [`Signal`] with [`IntoSignal`].

use std::str::FromStr;

use nix::sys::signal::Signal;

use crate::error::{SignalError, SignalResult};

/// Canonical name of a signal.
pub fn name(signal: Signal) -> &'static str {
    let full = signal.as_str();
    full.strip_prefix("SIG").unwrap_or(full)
}

/// Normalize anything identifying a signal to its canonical name.
///
/// ```rust
/// use enkidu_signals::normalize;
///
/// assert_eq!(normalize("SIGINT").unwrap(), "INT");
/// assert_eq!(normalize("INT").unwrap(), "INT");
/// assert_eq!(normalize(15).unwrap(), "TERM");
/// assert!(normalize(1234).is_err());
/// ```
pub fn normalize<S: IntoSignal>(signal: S) -> SignalResult<&'static str> {
    signal.into_signal().map(name)
}

/// Every signal the platform knows, as `(name, number)` pairs.
pub fn signal_table() -> Vec<(&'static str, i32)> {
    Signal::iterator().map(|s| (name(s), s as i32)).collect()
}

/// Values that identify a signal.
pub trait IntoSignal {
    fn into_signal(self) -> SignalResult<Signal>;
}

impl IntoSignal for Signal {
    fn into_signal(self) -> SignalResult<Signal> {
        Ok(self)
    }
}

impl IntoSignal for i32 {
    fn into_signal(self) -> SignalResult<Signal> {
        Signal::try_from(self).map_err(|_| SignalError::UnrecognizedSignal(self.to_string()))
    }
}

impl IntoSignal for &str {
    fn into_signal(self) -> SignalResult<Signal> {
        let trimmed = self.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return match trimmed.parse::<i32>() {
                Ok(number) => number.into_signal(),
                Err(_) => Err(SignalError::UnrecognizedSignal(self.to_string())),
            };
        }

        let upper = trimmed.to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        Signal::from_str(&format!("SIG{}", bare))
            .map_err(|_| SignalError::UnrecognizedSignal(self.to_string()))
    }
}

impl IntoSignal for String {
    fn into_signal(self) -> SignalResult<Signal> {
        self.as_str().into_signal()
    }
}

impl IntoSignal for &String {
    fn into_signal(self) -> SignalResult<Signal> {
        self.as_str().into_signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_names() {
        assert_eq!(normalize("SIGINT").unwrap(), "INT");
        assert_eq!(normalize("INT").unwrap(), "INT");
        assert_eq!(normalize("term").unwrap(), "TERM");
        assert_eq!(normalize(" SIGHUP ").unwrap(), "HUP");
        assert_eq!(normalize(String::from("USR2")).unwrap(), "USR2");
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(normalize(2).unwrap(), "INT");
        assert_eq!(normalize(15).unwrap(), "TERM");
        assert_eq!(normalize("9").unwrap(), "KILL");
        assert_eq!(normalize(Signal::SIGUSR1 as i32).unwrap(), "USR1");
        assert_eq!(
            normalize((Signal::SIGUSR1 as i32).to_string()).unwrap(),
            "USR1"
        );
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    #[test]
    fn test_normalize_bsd_usr1() {
        assert_eq!(normalize("30").unwrap(), "USR1");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_normalize_linux_usr1() {
        assert_eq!(normalize("10").unwrap(), "USR1");
    }

    #[test]
    fn test_normalize_unrecognized() {
        assert!(matches!(
            normalize(1234),
            Err(SignalError::UnrecognizedSignal(s)) if s == "1234"
        ));
        assert!(matches!(
            normalize("0"),
            Err(SignalError::UnrecognizedSignal(_))
        ));
        assert!(matches!(
            normalize("HUMBABA"),
            Err(SignalError::UnrecognizedSignal(s)) if s == "HUMBABA"
        ));
        assert!(matches!(
            normalize("99999999999999"),
            Err(SignalError::UnrecognizedSignal(_))
        ));
        assert!(normalize("").is_err());
    }

    #[test]
    fn test_signal_table() {
        let table = signal_table();
        assert!(table.contains(&("INT", Signal::SIGINT as i32)));
        assert!(table.contains(&("TERM", Signal::SIGTERM as i32)));
        assert!(table.iter().all(|(name, _)| !name.starts_with("SIG")));
    }
}

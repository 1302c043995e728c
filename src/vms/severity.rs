//! `$SEVERITY` probing.
//!
//! The SSH2 server on OpenVMS does not report a usable exit status, so every
//! command is run as
//!
//! ```text
//! PIPE <command>; WRITE SYS$OUTPUT $SEVERITY
//! ```
//!
//! and the last output line carries the status:
//!
//! | Value | Symbol        | Meaning                                   |
//! |-------|---------------|-------------------------------------------|
//! | 0     | STS$K_WARNING | continues, unpredictable results          |
//! | 1     | STS$K_SUCCESS | continues, expected results               |
//! | 2     | STS$K_ERROR   | continues, erroneous results              |
//! | 3     | STS$K_INFO    | continues, informational message          |
//! | 4     | STS$K_SEVERE  | terminates, no output                     |
//! | 5-7   | reserved      |                                           |
//!
//! Odd values are success.

use crate::error::{Error, Result};
use std::fmt;

/// The severity field of an OpenVMS condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Success,
    Error,
    Info,
    Severe,
    Reserved(u8),
}

impl Severity {
    /// Maps a severity digit; `None` outside 0..=7.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Severity::Warning),
            1 => Some(Severity::Success),
            2 => Some(Severity::Error),
            3 => Some(Severity::Info),
            4 => Some(Severity::Severe),
            5..=7 => Some(Severity::Reserved(digit)),
            _ => None,
        }
    }

    pub fn digit(self) -> u8 {
        match self {
            Severity::Warning => 0,
            Severity::Success => 1,
            Severity::Error => 2,
            Severity::Info => 3,
            Severity::Severe => 4,
            Severity::Reserved(d) => d,
        }
    }

    /// Odd severities mean the command did what was asked.
    pub fn is_success(self) -> bool {
        self.digit() % 2 == 1
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "STS$K_WARNING"),
            Severity::Success => write!(f, "STS$K_SUCCESS"),
            Severity::Error => write!(f, "STS$K_ERROR"),
            Severity::Info => write!(f, "STS$K_INFO"),
            Severity::Severe => write!(f, "STS$K_SEVERE"),
            Severity::Reserved(d) => write!(f, "reserved ({})", d),
        }
    }
}

/// Wraps `command` so its output is followed by the `$SEVERITY` digit.
///
/// With a terminal width the command is preceded by `SET TERMINAL /WIDTH`
/// inside the same pipeline, so long lines are not wrapped.
pub fn probe_command(command: &str, terminal_width: Option<u16>) -> String {
    let width = terminal_width
        .map(|w| format!("SET TERMINAL /WIDTH={} & ", w))
        .unwrap_or_default();
    format!("PIPE {}{}; WRITE SYS$OUTPUT $SEVERITY", width, command)
}

/// Splits probed stdout into the command's own lines and its severity.
///
/// # Errors
///
/// Returns `Error::Protocol` when there is no output at all or the last
/// line is not a single severity digit.
pub fn split_severity(stdout: &str) -> Result<(Vec<String>, Severity)> {
    let mut lines: Vec<String> = stdout.lines().map(str::to_string).collect();
    let last = lines.pop().ok_or_else(|| {
        Error::Protocol("command produced no output, not even a severity line".to_string())
    })?;

    let digit = last.trim();
    let severity = digit
        .parse::<u8>()
        .ok()
        .filter(|_| digit.len() == 1)
        .and_then(Severity::from_digit)
        .ok_or_else(|| {
            Error::Protocol(format!(
                "expected a $SEVERITY digit as last output line, got '{}'",
                digit
            ))
        })?;

    Ok((lines, severity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_digits_succeed() {
        for digit in 0..=7u8 {
            let severity = Severity::from_digit(digit).unwrap();
            assert_eq!(severity.digit(), digit);
            assert_eq!(severity.is_success(), digit % 2 == 1, "digit {}", digit);
        }
        assert!(Severity::from_digit(8).is_none());
    }

    #[test]
    fn test_probe_command() {
        assert_eq!(
            probe_command("SHOW TIME", None),
            "PIPE SHOW TIME; WRITE SYS$OUTPUT $SEVERITY"
        );
        assert_eq!(
            probe_command("SHOW TIME", Some(132)),
            "PIPE SET TERMINAL /WIDTH=132 & SHOW TIME; WRITE SYS$OUTPUT $SEVERITY"
        );
    }

    #[test]
    fn test_split_severity() {
        let (lines, severity) = split_severity("  19-OCT-2026 10:00:00\r\n1\r\n").unwrap();
        assert_eq!(lines, vec!["  19-OCT-2026 10:00:00"]);
        assert_eq!(severity, Severity::Success);

        let (lines, severity) = split_severity("%DCL-W-IVVERB, unrecognized command verb\n0\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert!(!severity.is_success());

        let (lines, severity) = split_severity("3").unwrap();
        assert!(lines.is_empty());
        assert_eq!(severity, Severity::Info);
    }

    #[test]
    fn test_split_severity_rejects_garbage() {
        assert!(matches!(split_severity(""), Err(Error::Protocol(_))));
        assert!(matches!(split_severity("hello\n"), Err(Error::Protocol(_))));
        assert!(matches!(split_severity("out\n12\n"), Err(Error::Protocol(_))));
        assert!(matches!(split_severity("out\n9\n"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(Severity::Error.to_string(), "STS$K_ERROR");
        assert_eq!(Severity::Reserved(6).to_string(), "reserved (6)");
    }
}

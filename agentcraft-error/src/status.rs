//! Error status - where an error is allowed to travel

use std::fmt;

/// How far an error propagates.
///
/// Tool-level failures are `Recoverable`: they are rendered into a tool result and
/// handed back to the model so it can correct its request. `Fatal` errors end the
/// agent loop and surface to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Reported back to the model as a tool result
    Recoverable,
    /// Aborts the current run
    Fatal,
}

impl ErrorStatus {
    /// Returns the status as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Recoverable => "recoverable",
            ErrorStatus::Fatal => "fatal",
        }
    }

    /// Check if the error can be fed back to the model
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorStatus::Recoverable)
    }

    /// Escalate to fatal. A fatal status stays fatal.
    pub fn escalate(self) -> Self {
        ErrorStatus::Fatal
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(ErrorStatus::Recoverable.to_string(), "recoverable");
        assert_eq!(ErrorStatus::Fatal.to_string(), "fatal");
    }

    #[test]
    fn test_escalate() {
        assert!(ErrorStatus::Recoverable.is_recoverable());
        assert!(!ErrorStatus::Recoverable.escalate().is_recoverable());
        assert_eq!(ErrorStatus::Fatal.escalate(), ErrorStatus::Fatal);
    }
}

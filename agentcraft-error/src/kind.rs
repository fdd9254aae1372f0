//! Error kinds for agentcraft operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration
    ConfigInvalid,

    /// Invalid argument passed to a tool
    InvalidArgument,

    // =========================================================================
    // Sandbox errors
    // =========================================================================
    /// Path resolves outside the working root
    OutsideWorkingRoot,

    /// Path does not exist
    NotFound,

    /// Path exists but is not a regular file
    NotAFile,

    /// Path exists but is not a directory
    NotADirectory,

    /// File does not carry the expected extension
    WrongExtension,

    /// Script ran past its time budget
    ScriptTimeout,

    /// The model asked for a tool that is not registered
    UnknownTool,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// IO operation failed
    IoFailed,

    /// File content is not valid text
    DecodeFailed,

    // =========================================================================
    // Provider/LLM errors
    // =========================================================================
    /// Failure talking to the LLM provider
    TransportFailed,

    /// Provider rejected the credential
    AuthenticationFailed,

    /// Provider rate limited the request
    RateLimited,

    /// Provider returned something we could not interpret
    ResponseInvalid,

    // =========================================================================
    // Loop control errors
    // =========================================================================
    /// Iteration cap reached without a final answer
    IterationExhausted,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Sandbox
            ErrorKind::OutsideWorkingRoot => "OutsideWorkingRoot",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::NotAFile => "NotAFile",
            ErrorKind::NotADirectory => "NotADirectory",
            ErrorKind::WrongExtension => "WrongExtension",
            ErrorKind::ScriptTimeout => "ScriptTimeout",
            ErrorKind::UnknownTool => "UnknownTool",

            // IO
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::DecodeFailed => "DecodeFailed",

            // Provider
            ErrorKind::TransportFailed => "TransportFailed",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ResponseInvalid => "ResponseInvalid",

            // Loop control
            ErrorKind::IterationExhausted => "IterationExhausted",
        }
    }

    /// Check if this error kind is fed back to the model by default
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidArgument
                | ErrorKind::OutsideWorkingRoot
                | ErrorKind::NotFound
                | ErrorKind::NotAFile
                | ErrorKind::NotADirectory
                | ErrorKind::WrongExtension
                | ErrorKind::ScriptTimeout
                | ErrorKind::UnknownTool
                | ErrorKind::IoFailed
                | ErrorKind::DecodeFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

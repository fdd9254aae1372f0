//! The main Error type for agentcraft

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for all agentcraft operations.
///
/// This error type provides:
/// - `kind`: What type of error occurred
/// - `message`: Human-readable description (this is what the model sees)
/// - `status`: Whether the error goes back to the model or ends the run
/// - `operation`: What operation caused the error
/// - `context`: Key-value pairs for debugging
/// - `source`: The underlying error (if any)
///
/// # Example
///
/// ```rust
/// use agentcraft_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::TransportFailed, "connection reset")
///     .with_operation("agent::turn")
///     .with_context("model", "gemini-2.0-flash-001")
///     .with_context("iteration", "3");
///
/// assert_eq!(err.kind(), ErrorKind::TransportFailed);
/// assert_eq!(err.status(), ErrorStatus::Fatal);
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_recoverable() {
            ErrorStatus::Recoverable
        } else {
            ErrorStatus::Fatal
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Get the source error (if any)
    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the error status
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    // =========================================================================
    // Status mutations
    // =========================================================================

    /// Mark as fatal regardless of kind
    pub fn escalate(mut self) -> Self {
        self.status = self.status.escalate();
        self
    }

    /// Check if this error is handed back to the model
    pub fn is_recoverable(&self) -> bool {
        self.status.is_recoverable()
    }

    /// Render the error the way the model sees it in a tool result
    pub fn to_model_string(&self) -> String {
        format!("Error: {}", self.message)
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Convenient From implementations (be careful not to leak raw errors!)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an OutsideWorkingRoot error.
    ///
    /// `action` is the verb the model asked for ("read", "list", ...).
    pub fn outside_working_root(action: &str, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorKind::OutsideWorkingRoot,
            format!(
                "Cannot {} \"{}\" as it is outside the permitted working directory",
                action, path
            ),
        )
        .with_context("path", path)
    }

    /// Create a NotFound error
    pub fn not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorKind::NotFound, format!("\"{}\" does not exist", path))
            .with_context("path", path)
    }

    /// Create a NotAFile error
    pub fn not_a_file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorKind::NotAFile, format!("\"{}\" is not a regular file", path))
            .with_context("path", path)
    }

    /// Create a NotADirectory error
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorKind::NotADirectory, format!("\"{}\" is not a directory", path))
            .with_context("path", path)
    }

    /// Create a WrongExtension error
    pub fn wrong_extension(path: impl Into<String>, expected: &str) -> Self {
        let path = path.into();
        Self::new(
            ErrorKind::WrongExtension,
            format!("\"{}\" is not a .{} file", path, expected),
        )
        .with_context("path", path)
        .with_context("expected", expected)
    }

    /// Create a ScriptTimeout error, appending whatever output was captured
    pub fn script_timeout(path: impl Into<String>, secs: u64, partial_output: &str) -> Self {
        let path = path.into();
        let mut message = format!("Script \"{}\" timed out after {} seconds", path, secs);
        if !partial_output.is_empty() {
            message.push_str("\n\n");
            message.push_str(partial_output);
        }
        Self::new(ErrorKind::ScriptTimeout, message)
            .with_context("path", path)
            .with_context("timeout_secs", secs.to_string())
    }

    /// Create an UnknownTool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorKind::UnknownTool, format!("Unknown function: {}", name))
            .with_context("tool", name)
    }

    /// Create an IterationExhausted error
    pub fn iteration_exhausted(max: usize) -> Self {
        Self::new(
            ErrorKind::IterationExhausted,
            format!("Reached maximum number of iterations ({})", max),
        )
        .with_context("max_iterations", max.to_string())
    }
}

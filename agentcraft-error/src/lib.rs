//! # agentcraft-error
//!
//! Unified error handling for agentcraft.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., OutsideWorkingRoot, TransportFailed)
//! - **ErrorStatus**: Decide where it goes (Recoverable -> back to the model, Fatal -> to the user)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use agentcraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::NotFound, "\"main.py\" does not exist")
//!         .with_operation("gateway::read_file")
//!         .with_context("path", "main.py"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, agentcraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using agentcraft Error
pub type Result<T> = std::result::Result<T, Error>;

//! Common error types and macros for the writer.

use std::error::Error as StdError;
use std::sync::Arc;
use std::{io, result};

/// Error raised anywhere on the write path.
///
/// The variants mirror how an error affects the writer: `Schema` surfaces at
/// construction, `TypeMismatch` rejects a single record and leaves the writer
/// usable, `Encoding` and `Io` latch the writer into its failed state, and
/// `State` reports an operation invoked in the wrong writer state without
/// changing it.
#[derive(Debug)]
pub enum Error {
    /// Malformed tag, unknown type, duplicate name, or an illegal
    /// repetition combination. Raised while building a schema.
    Schema(String),
    /// A runtime value cannot be losslessly coerced to the declared
    /// physical type of its leaf. The offending record is rejected.
    TypeMismatch(String),
    /// An internal encoding invariant failed, e.g. a dictionary index
    /// overflow. Fatal to the writer.
    Encoding(String),
    /// The underlying byte sink failed. Fatal to the writer.
    Io(Box<dyn StdError + Send + Sync>),
    /// Operation invoked in the wrong writer state. Non-fatal.
    State(String),
    /// Replay of the first fatal error, returned from every call made
    /// after the writer failed.
    Latched(Arc<Error>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Schema(message) => write!(fmt, "Schema error: {message}"),
            Error::TypeMismatch(message) => write!(fmt, "Type mismatch: {message}"),
            Error::Encoding(message) => write!(fmt, "Encoding error: {message}"),
            Error::Io(e) => write!(fmt, "IO error: {e}"),
            Error::State(message) => write!(fmt, "State error: {message}"),
            Error::Latched(e) => e.fmt(fmt),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e.as_ref()),
            Error::Latched(e) => e.source(),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(Box::new(e))
    }
}

impl From<snap::Error> for Error {
    fn from(e: snap::Error) -> Error {
        Error::Io(Box::new(e))
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        io::Error::other(e)
    }
}

impl Error {
    /// Whether the error must latch the writer into its failed state.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Encoding(_) | Error::Io(_) => true,
            Error::Latched(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// A specialized `Result` for write-path errors.
pub type Result<T, E = Error> = result::Result<T, E>;

// ----------------------------------------------------------------------
// Convenient macros for the different error classes

macro_rules! schema_err {
    ($fmt:expr) => (crate::errors::Error::Schema($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::Schema(format!($fmt, $($args),*)));
}

macro_rules! type_err {
    ($fmt:expr) => (crate::errors::Error::TypeMismatch($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::TypeMismatch(format!($fmt, $($args),*)));
}

macro_rules! enc_err {
    ($fmt:expr) => (crate::errors::Error::Encoding($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::Encoding(format!($fmt, $($args),*)));
}

macro_rules! state_err {
    ($fmt:expr) => (crate::errors::Error::State($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::State(format!($fmt, $($args),*)));
}

// General-purpose error for wire-level failures that do not fit a more
// specific class; encoding is the closest writer-fatal category.
macro_rules! general_err {
    ($fmt:expr) => (crate::errors::Error::Encoding($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::Encoding(format!($fmt, $($args),*)));
}

//! Unified error types for the oslink crates
//!
//! This module provides a common error type [`OslinkError`] shared by the
//! schema, the model translators, and the document readers and writers.
//! Translation is fail-fast: any construct that cannot be represented on the
//! other side of a translation surfaces as a typed error instead of a
//! silently wrong model.
//!
//! # Example
//!
//! ```ignore
//! use oslink_core::{OslinkError, OslinkResult};
//!
//! fn convert(path: &str) -> OslinkResult<()> {
//!     let instance = read_instance(path)?;
//!     instance.validate()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all oslink operations.
///
/// Covers I/O, document parsing, schema validation, and the constructs a
/// translation cannot carry across (ranged rows, exotic variable types,
/// unknown instruction codes).
#[derive(Error, Debug)]
pub enum OslinkError {
    /// I/O errors (file access etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A problem or result document that does not follow the schema
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Sparse matrix data that is internally inconsistent
    #[error("Malformed matrix: {0}")]
    MalformedMatrix(String),

    /// An instruction tape that cannot be reduced to a single expression
    #[error("Malformed instruction tape: {0}")]
    MalformedTape(String),

    /// More than one objective function where exactly one is supported
    #[error("Multiple objectives: found {count}, exactly one is supported")]
    MultiObjective { count: usize },

    /// A row with two distinct finite bounds, which the native form cannot hold
    #[error("Ranged constraint: row {index} has two distinct finite bounds")]
    RangedConstraint { index: usize },

    /// A variable type outside the continuous/binary/integer set
    #[error("Unsupported variable type: column {index} has type {kind}")]
    UnsupportedVariableType { index: usize, kind: String },

    /// An instruction opcode the decoder does not recognize
    #[error("Unsupported instruction: opcode {opcode} at position {position}")]
    UnsupportedOpcode { opcode: i32, position: usize },

    /// An intrinsic function the decoder has no expression node for
    #[error("Unsupported function: code {func} at position {position}")]
    UnsupportedFunction { func: i32, position: usize },

    /// An expression operator built with fewer children than it requires
    #[error("Operator {op} needs at least {min} children, got {got}")]
    TooFewChildren {
        op: &'static str,
        min: usize,
        got: usize,
    },

    /// A feature the other side of the translation cannot express
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using OslinkError.
pub type OslinkResult<T> = Result<T, OslinkError>;

// Conversion from string-like types for convenience
impl From<String> for OslinkError {
    fn from(s: String) -> Self {
        OslinkError::Other(s)
    }
}

impl From<&str> for OslinkError {
    fn from(s: &str) -> Self {
        OslinkError::Other(s.to_string())
    }
}

//! Error types for the identity registry core.

use std::path::PathBuf;
use thiserror::Error;

/// Reason an identity number failed validation.
///
/// Reported separately so an interactive caller can tell the user which
/// rule was broken instead of a generic "invalid number".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationKind {
    /// The number does not have exactly 18 characters.
    #[error("expected 18 characters, found {found}")]
    WrongLength { found: usize },

    /// One of the first 17 characters is not a decimal digit.
    #[error("the first 17 characters must be decimal digits")]
    NonDigitBody,

    /// The check character does not match the weighted mod-11 checksum.
    #[error("check character does not match the checksum")]
    BadCheckChar,
}

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The candidate identity number is malformed. Recoverable; the record
    /// is rejected and nothing is written.
    #[error("invalid identity number: {0}")]
    Validation(ValidationKind),

    /// The name is already bound to a different identity number.
    /// Recoverable; no write is performed.
    #[error("name {name:?} is already bound to a different identity number")]
    Conflict { name: String },

    /// The administrative-area source could not be read or parsed.
    /// Fatal at startup: no partial index is usable.
    #[error("failed to load administrative area data: {0}")]
    DataLoad(String),

    /// An error originating from I/O operations on the record log or a
    /// batch-import file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch-import file is not valid UTF-8.
    #[error("file {path:?} is not valid UTF-8")]
    Encoding { path: PathBuf },
}

impl RegistryError {
    /// True for errors the caller can report and move past without
    /// abandoning the operation that produced them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RegistryError::Validation(_) | RegistryError::Conflict { .. }
        )
    }
}

/// A convenience `Result` type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, RegistryError>;

use thiserror::Error;

/// Errors raised by directory operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// A read or field-delete targeted a name with no directory entry.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// A registration attempt named a user that already has an entry.
    #[error("user already registered: {0}")]
    DuplicateRegistration(String),
}

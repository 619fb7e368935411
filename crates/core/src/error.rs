//! Errors returned across the capability boundary.

use dualvm_storage::StorageError;
use thiserror::Error;

/// Errors a native module may return to a VM-crossing caller.
#[derive(Error, Debug)]
pub enum KeeperError {
    /// Balance too low for the requested debit
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The referenced object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to perform the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Arguments rejected by the module
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Contract execution on the native side failed
    #[error("contract error: {0}")]
    Contract(String),

    /// Malformed address or kind
    #[error(transparent)]
    Types(#[from] dualvm_types::Error),

    /// Underlying store failure, including whitelist violations
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl KeeperError {
    /// Whether this error is a whitelist violation that must abort the execution
    pub fn is_access_violation(&self) -> bool {
        matches!(self, KeeperError::Store(e) if e.is_access_violation())
    }
}

/// Result type for keeper calls.
pub type KeeperResult<T> = Result<T, KeeperError>;

//! # DualVM RPC
//!
//! JSON-RPC query surface for the pointer registry.
//!
//! Methods live in the `pointer` namespace and read the latest committed
//! snapshot through a [`Querier`](dualvm_evm::Querier):
//! - `pointer_pointer(kind, pointee)` - pointer registered for an asset
//! - `pointer_pointee(kind, pointer)` - asset a pointer stands for
//!
//! ## Example
//!
//! ```rust,ignore
//! use dualvm_rpc::{RpcServer, RpcServerConfig};
//!
//! let mut server = RpcServer::new(RpcServerConfig::default(), Arc::new(querier));
//! let addr = server.start().await?;
//! server.wait().await;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod api;
pub mod server;

pub use api::{PointerApiClient, PointerApiImpl, PointerApiServer};
pub use server::{RpcServer, RpcServerConfig};

use dualvm_evm::QueryError;

/// Result type alias for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;

/// RPC error types
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Invalid parameters provided
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<QueryError> for RpcError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Unsupported(_) => RpcError::InvalidParams(err.to_string()),
            other => RpcError::Internal(other.to_string()),
        }
    }
}

impl From<RpcError> for jsonrpsee::types::ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        let code = match &err {
            RpcError::InvalidParams(_) => -32602,
            RpcError::Internal(_) => -32603,
        };
        jsonrpsee::types::ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
    }
}

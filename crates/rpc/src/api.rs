//! Pointer query methods (`pointer_*` namespace).
//!
//! Kinds travel as integers: ERC20=0, ERC721=1, NATIVE=2, CW20=3, CW721=4.

use crate::RpcError;
use async_trait::async_trait;
use dualvm_evm::{PointeeResponse, PointerResponse, Querier};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Pointer registry queries.
#[rpc(server, client, namespace = "pointer")]
pub trait PointerApi {
    /// Returns the pointer registered for `pointee`.
    ///
    /// A missing pointer answers with `exists = false` and the zero value of
    /// the pointer's address space.
    #[method(name = "pointer")]
    async fn pointer(&self, kind: i32, pointee: String) -> RpcResult<PointerResponse>;

    /// Returns the asset that `pointer` stands for.
    #[method(name = "pointee")]
    async fn pointee(&self, kind: i32, pointer: String) -> RpcResult<PointeeResponse>;
}

/// Implementation of the pointer API over a [`Querier`].
pub struct PointerApiImpl {
    querier: Arc<Querier>,
}

impl PointerApiImpl {
    /// Create a new pointer API implementation.
    pub fn new(querier: Arc<Querier>) -> Self {
        Self { querier }
    }
}

#[async_trait]
impl PointerApiServer for PointerApiImpl {
    #[instrument(skip(self), level = "debug")]
    async fn pointer(&self, kind: i32, pointee: String) -> RpcResult<PointerResponse> {
        let response = self
            .querier
            .pointer(kind, &pointee)
            .map_err(RpcError::from)?;
        debug!(kind, exists = response.exists, "pointer_pointer");
        Ok(response)
    }

    #[instrument(skip(self), level = "debug")]
    async fn pointee(&self, kind: i32, pointer: String) -> RpcResult<PointeeResponse> {
        let response = self
            .querier
            .pointee(kind, &pointer)
            .map_err(RpcError::from)?;
        debug!(kind, exists = response.exists, "pointer_pointee");
        Ok(response)
    }
}

//! RPC server implementation.
//!
//! A single HTTP endpoint serving the pointer API.

use crate::api::{PointerApiImpl, PointerApiServer};
use crate::RpcError;
use dualvm_evm::Querier;
use jsonrpsee::server::{BatchRequestConfig, ServerBuilder, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::info;

/// Configuration for the RPC server.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// HTTP server address; port 0 picks a free port.
    pub http_addr: SocketAddr,
    /// Maximum number of connections.
    pub max_connections: u32,
    /// Maximum request body size (bytes).
    pub max_request_size: u32,
    /// Maximum response body size (bytes).
    pub max_response_size: u32,
    /// Batch request limit.
    pub batch_request_limit: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 26658)),
            max_connections: 100,
            max_request_size: 1024 * 1024,
            max_response_size: 1024 * 1024,
            batch_request_limit: 50,
        }
    }
}

/// The pointer query server.
pub struct RpcServer {
    config: RpcServerConfig,
    querier: Arc<Querier>,
    handle: Option<ServerHandle>,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(config: RpcServerConfig, querier: Arc<Querier>) -> Self {
        Self {
            config,
            querier,
            handle: None,
        }
    }

    fn build_rpc_module(&self) -> Result<RpcModule<()>, RpcError> {
        let mut module = RpcModule::new(());
        let pointer_api = PointerApiImpl::new(self.querier.clone());
        module
            .merge(pointer_api.into_rpc())
            .map_err(|e| RpcError::Internal(format!("Failed to merge pointer API: {}", e)))?;
        Ok(module)
    }

    /// Start serving; returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, RpcError> {
        let module = self.build_rpc_module()?;

        let server = ServerBuilder::default()
            .max_connections(self.config.max_connections)
            .max_request_body_size(self.config.max_request_size)
            .max_response_body_size(self.config.max_response_size)
            .set_batch_request_config(BatchRequestConfig::Limit(self.config.batch_request_limit))
            .build(self.config.http_addr)
            .await
            .map_err(|e| RpcError::Internal(format!("Failed to build HTTP server: {}", e)))?;

        let addr = server
            .local_addr()
            .map_err(|e| RpcError::Internal(format!("Failed to read bound address: {}", e)))?;
        self.handle = Some(server.start(module));

        info!(%addr, "pointer RPC server started");
        Ok(addr)
    }

    /// Stop the server.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop().ok();
            info!("pointer RPC server stopped");
        }
    }

    /// Wait for the server to finish.
    pub async fn wait(&self) {
        if let Some(ref handle) = self.handle {
            handle.clone().stopped().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RpcServerConfig::default();
        assert_eq!(config.http_addr, "127.0.0.1:26658".parse().unwrap());
        assert_eq!(config.max_connections, 100);
    }
}

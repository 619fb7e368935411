//! # DualVM Core - Capability Boundary
//!
//! This crate defines what VM-crossing code is allowed to do to the native
//! ledger:
//!
//! - **Context**: the store and block header every call executes against,
//!   with cache-layer branching
//! - **Traits**: one narrow interface per native module and consumer need
//! - **Keepers**: the bundle of module implementations wired in by the host
//!
//! # Design
//!
//! All traits require `Send + Sync` so implementations can be shared behind
//! `Arc`. Calls are synchronous; block execution is single threaded and
//! deterministic.
//!
//! # Example
//!
//! ```
//! use dualvm_core::{BlockHeader, Context};
//! use dualvm_storage::MemStore;
//!
//! let mut store = MemStore::new(["bank"]);
//! let mut ctx = Context::new(&mut store, BlockHeader::default());
//! let res: Result<(), dualvm_core::KeeperError> = ctx.run_cached(|inner| {
//!     inner.kv_store("bank")?.set(b"balances/x", vec![1])?;
//!     Ok(())
//! });
//! assert!(res.is_ok());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

mod context;
mod error;
mod keepers;
pub mod traits;

pub use context::{BlockHeader, Branch, Context};
pub use error::{KeeperError, KeeperResult};
pub use keepers::Keepers;
pub use traits::*;

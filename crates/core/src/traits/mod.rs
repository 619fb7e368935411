//! Capability boundary traits.
//!
//! Each trait is the narrow surface one native module offers to code crossing
//! over from the EVM. Methods take an explicit [`Context`](crate::Context) and
//! typed arguments, and hand back domain values; none returns a store handle
//! or another keeper.
//!
//! Reads take `&Context`, writes take `&mut Context`, so a read-only
//! capability cannot be used to write.
//!
//! | Module | Traits |
//! |--------|--------|
//! | bank | [`BankKeeper`], [`EvmBalanceKeeper`] |
//! | evm | [`AddressMapper`], [`PointerReader`] |
//! | account | [`AccountKeeper`] |
//! | oracle | [`OracleKeeper`] |
//! | wasm | [`WasmdKeeper`], [`WasmdViewKeeper`] |
//! | staking | [`StakingKeeper`], [`StakingQuerier`] |
//! | gov | [`GovKeeper`] |
//! | distribution | [`DistributionKeeper`] |
//! | transfer | [`TransferKeeper`] |
//! | ibc | [`ClientKeeper`], [`ConnectionKeeper`], [`ChannelKeeper`] |

mod account;
mod bank;
mod distribution;
mod evm;
mod gov;
mod ibc;
mod oracle;
mod staking;
mod transfer;
mod wasm;

pub use account::*;
pub use bank::*;
pub use distribution::*;
pub use evm::*;
pub use gov::*;
pub use ibc::*;
pub use oracle::*;
pub use staking::*;
pub use transfer::*;
pub use wasm::*;

//! Account lifecycle capabilities.

use dualvm_types::NativeAddress;
use serde::{Deserialize, Serialize};

use crate::{Context, KeeperResult};

/// A native account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    /// Account address
    pub address: NativeAddress,
    /// Globally unique, assigned on creation
    pub account_number: u64,
    /// Transaction sequence
    pub sequence: u64,
}

/// Account creation and lookup
pub trait AccountKeeper: Send + Sync {
    /// Account record, if one exists
    fn get_account(&self, ctx: &Context<'_>, addr: &NativeAddress)
        -> KeeperResult<Option<BaseAccount>>;

    /// Whether an account record exists
    fn has_account(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<bool> {
        Ok(self.get_account(ctx, addr)?.is_some())
    }

    /// Store an account record
    fn set_account(&self, ctx: &mut Context<'_>, account: &BaseAccount) -> KeeperResult<()>;

    /// Delete an account record
    fn remove_account(&self, ctx: &mut Context<'_>, addr: &NativeAddress) -> KeeperResult<()>;

    /// Create an unsaved record with the next account number
    fn new_account_with_address(
        &self,
        ctx: &mut Context<'_>,
        addr: &NativeAddress,
    ) -> KeeperResult<BaseAccount>;
}

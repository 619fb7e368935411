//! Native smart-contract capabilities.

use dualvm_types::{Coin, NativeAddress};

use crate::{Context, KeeperResult};

/// Contract instantiation and execution
pub trait WasmdKeeper: Send + Sync {
    /// Instantiate stored code, returning the new contract address and init response
    #[allow(clippy::too_many_arguments)]
    fn instantiate(
        &self,
        ctx: &mut Context<'_>,
        code_id: u64,
        creator: &NativeAddress,
        admin: Option<&NativeAddress>,
        init_msg: &[u8],
        label: &str,
        deposit: &[Coin],
    ) -> KeeperResult<(NativeAddress, Vec<u8>)>;

    /// Execute a contract
    fn execute(
        &self,
        ctx: &mut Context<'_>,
        contract: &NativeAddress,
        caller: &NativeAddress,
        msg: &[u8],
        coins: &[Coin],
    ) -> KeeperResult<Vec<u8>>;

    /// Move a contract onto new code; only the admin may migrate
    fn migrate(
        &self,
        ctx: &mut Context<'_>,
        contract: &NativeAddress,
        caller: &NativeAddress,
        new_code_id: u64,
        msg: &[u8],
    ) -> KeeperResult<Vec<u8>>;
}

/// Read-only contract queries
pub trait WasmdViewKeeper: Send + Sync {
    /// Run a smart query against a contract
    fn query_smart(&self, ctx: &Context<'_>, contract: &NativeAddress, req: &[u8])
        -> KeeperResult<Vec<u8>>;
}

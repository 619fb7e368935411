//! Ledger balance capabilities.

use dualvm_types::{Coin, DenomMetadata, NativeAddress};

use crate::{Context, KeeperResult};

/// Balance, supply and metadata access offered to VM-crossing callers.
pub trait BankKeeper: Send + Sync {
    /// Move coins between two accounts
    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &NativeAddress,
        to: &NativeAddress,
        amount: &[Coin],
    ) -> KeeperResult<()>;

    /// Balance of one denomination; zero if the account holds none
    fn get_balance(&self, ctx: &Context<'_>, addr: &NativeAddress, denom: &str)
        -> KeeperResult<Coin>;

    /// Every non-zero balance of an account
    fn get_all_balances(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Vec<Coin>>;

    /// Registered display metadata of a denomination
    fn get_denom_metadata(&self, ctx: &Context<'_>, denom: &str)
        -> KeeperResult<Option<DenomMetadata>>;

    /// Total supply of a denomination
    fn get_supply(&self, ctx: &Context<'_>, denom: &str) -> KeeperResult<Coin>;

    /// Coins locked by vesting or similar schedules
    fn locked_coins(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Vec<Coin>>;

    /// Balances minus locked coins
    fn spendable_coins(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Vec<Coin>>;
}

/// Balance adjustment used only by the EVM state adapter to reconcile value
/// transfers made inside the EVM.
pub trait EvmBalanceKeeper: Send + Sync {
    /// Current balance of one denomination
    fn get_balance(&self, ctx: &Context<'_>, addr: &NativeAddress, denom: &str)
        -> KeeperResult<Coin>;

    /// Credit an account
    fn add_coins(&self, ctx: &mut Context<'_>, addr: &NativeAddress, coin: &Coin)
        -> KeeperResult<()>;

    /// Debit an account, failing if the spendable balance is too low
    fn sub_unlocked_coins(
        &self,
        ctx: &mut Context<'_>,
        addr: &NativeAddress,
        coin: &Coin,
    ) -> KeeperResult<()>;
}

use dualvm_core::{BankKeeper, Context, EvmBalanceKeeper, KeeperError, KeeperResult};
use dualvm_storage::partitions::BANK;
use dualvm_types::{Coin, DenomMetadata, NativeAddress};

use crate::{read, remove, scan, write};

/// Balances under `balances/{addr}/{denom}`, supply under `supply/{denom}`,
/// metadata under `metadata/{denom}` and vesting locks under `locked/{addr}/{denom}`.
#[derive(Debug, Default)]
pub struct MockBank;

impl MockBank {
    /// Create the mock
    pub fn new() -> Self {
        Self
    }

    /// Credit an account and grow supply
    pub fn mint(&self, ctx: &mut Context<'_>, addr: &NativeAddress, coin: &Coin) -> KeeperResult<()> {
        self.credit(ctx, addr, coin)?;
        let supply = self.amount(ctx, &supply_key(&coin.denom))?;
        write(ctx, BANK, &supply_key(&coin.denom), &(supply + coin.amount))
    }

    /// Register denomination metadata
    pub fn set_denom_metadata(&self, ctx: &mut Context<'_>, meta: &DenomMetadata) -> KeeperResult<()> {
        write(ctx, BANK, &format!("metadata/{}", meta.base), meta)
    }

    /// Lock part of an account's balance
    pub fn lock(&self, ctx: &mut Context<'_>, addr: &NativeAddress, coin: &Coin) -> KeeperResult<()> {
        write(ctx, BANK, &locked_key(addr, &coin.denom), &coin.amount)
    }

    fn amount(&self, ctx: &Context<'_>, key: &str) -> KeeperResult<u128> {
        Ok(read::<u128>(ctx, BANK, key)?.unwrap_or_default())
    }

    fn spendable(&self, ctx: &Context<'_>, addr: &NativeAddress, denom: &str) -> KeeperResult<u128> {
        let balance = self.amount(ctx, &balance_key(addr, denom))?;
        let locked = self.amount(ctx, &locked_key(addr, denom))?;
        Ok(balance.saturating_sub(locked))
    }

    fn credit(&self, ctx: &mut Context<'_>, addr: &NativeAddress, coin: &Coin) -> KeeperResult<()> {
        if coin.is_zero() {
            return Ok(());
        }
        let key = balance_key(addr, &coin.denom);
        let balance = self.amount(ctx, &key)?;
        let updated = balance
            .checked_add(coin.amount)
            .ok_or_else(|| KeeperError::InvalidRequest("balance overflow".into()))?;
        write(ctx, BANK, &key, &updated)
    }

    fn debit(&self, ctx: &mut Context<'_>, addr: &NativeAddress, coin: &Coin) -> KeeperResult<()> {
        if coin.is_zero() {
            return Ok(());
        }
        let spendable = self.spendable(ctx, addr, &coin.denom)?;
        if spendable < coin.amount {
            return Err(KeeperError::InsufficientFunds(format!(
                "{addr} has {spendable}{} spendable, needs {coin}",
                coin.denom
            )));
        }
        let key = balance_key(addr, &coin.denom);
        let remaining = self.amount(ctx, &key)? - coin.amount;
        if remaining == 0 {
            remove(ctx, BANK, &key)
        } else {
            write(ctx, BANK, &key, &remaining)
        }
    }

    fn coins_under(&self, ctx: &Context<'_>, prefix: &str) -> KeeperResult<Vec<Coin>> {
        Ok(scan::<u128>(ctx, BANK, prefix)?
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(denom, amount)| Coin::new(denom, amount))
            .collect())
    }
}

fn balance_key(addr: &NativeAddress, denom: &str) -> String {
    format!("balances/{addr}/{denom}")
}

fn locked_key(addr: &NativeAddress, denom: &str) -> String {
    format!("locked/{addr}/{denom}")
}

fn supply_key(denom: &str) -> String {
    format!("supply/{denom}")
}

impl BankKeeper for MockBank {
    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &NativeAddress,
        to: &NativeAddress,
        amount: &[Coin],
    ) -> KeeperResult<()> {
        for coin in amount {
            self.debit(ctx, from, coin)?;
            self.credit(ctx, to, coin)?;
        }
        Ok(())
    }

    fn get_balance(&self, ctx: &Context<'_>, addr: &NativeAddress, denom: &str) -> KeeperResult<Coin> {
        Ok(Coin::new(denom, self.amount(ctx, &balance_key(addr, denom))?))
    }

    fn get_all_balances(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Vec<Coin>> {
        self.coins_under(ctx, &format!("balances/{addr}/"))
    }

    fn get_denom_metadata(&self, ctx: &Context<'_>, denom: &str) -> KeeperResult<Option<DenomMetadata>> {
        read(ctx, BANK, &format!("metadata/{denom}"))
    }

    fn get_supply(&self, ctx: &Context<'_>, denom: &str) -> KeeperResult<Coin> {
        Ok(Coin::new(denom, self.amount(ctx, &supply_key(denom))?))
    }

    fn locked_coins(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Vec<Coin>> {
        self.coins_under(ctx, &format!("locked/{addr}/"))
    }

    fn spendable_coins(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Vec<Coin>> {
        let mut coins = Vec::new();
        for coin in self.get_all_balances(ctx, addr)? {
            let spendable = self.spendable(ctx, addr, &coin.denom)?;
            if spendable > 0 {
                coins.push(Coin::new(coin.denom, spendable));
            }
        }
        Ok(coins)
    }
}

impl EvmBalanceKeeper for MockBank {
    fn get_balance(&self, ctx: &Context<'_>, addr: &NativeAddress, denom: &str) -> KeeperResult<Coin> {
        BankKeeper::get_balance(self, ctx, addr, denom)
    }

    fn add_coins(&self, ctx: &mut Context<'_>, addr: &NativeAddress, coin: &Coin) -> KeeperResult<()> {
        self.credit(ctx, addr, coin)
    }

    fn sub_unlocked_coins(
        &self,
        ctx: &mut Context<'_>,
        addr: &NativeAddress,
        coin: &Coin,
    ) -> KeeperResult<()> {
        self.debit(ctx, addr, coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock_address_pair, test_header, test_store, TEST_DENOM};

    #[test]
    fn test_send_respects_locks() {
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let bank = MockBank::new();
        let (alice, _) = mock_address_pair(1);
        let (bob, _) = mock_address_pair(2);

        bank.mint(&mut ctx, &alice, &Coin::new(TEST_DENOM, 100)).unwrap();
        bank.lock(&mut ctx, &alice, &Coin::new(TEST_DENOM, 60)).unwrap();

        let err = bank
            .send_coins(&mut ctx, &alice, &bob, &[Coin::new(TEST_DENOM, 50)])
            .unwrap_err();
        assert!(matches!(err, KeeperError::InsufficientFunds(_)));

        bank.send_coins(&mut ctx, &alice, &bob, &[Coin::new(TEST_DENOM, 40)])
            .unwrap();
        assert_eq!(BankKeeper::get_balance(&bank, &ctx, &bob, TEST_DENOM).unwrap().amount, 40);
        assert_eq!(bank.spendable_coins(&ctx, &alice).unwrap(), vec![]);
        assert_eq!(bank.get_supply(&ctx, TEST_DENOM).unwrap().amount, 100);
    }

    #[test]
    fn test_all_balances_lists_denoms() {
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let bank = MockBank::new();
        let (alice, _) = mock_address_pair(1);

        bank.mint(&mut ctx, &alice, &Coin::new("uatom", 3)).unwrap();
        bank.mint(&mut ctx, &alice, &Coin::new(TEST_DENOM, 5)).unwrap();
        let balances = bank.get_all_balances(&ctx, &alice).unwrap();
        assert_eq!(balances, vec![Coin::new("uatom", 3), Coin::new(TEST_DENOM, 5)]);
    }
}

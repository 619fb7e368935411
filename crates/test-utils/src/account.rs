use dualvm_core::{AccountKeeper, BaseAccount, Context, KeeperResult};
use dualvm_storage::partitions::ACC;
use dualvm_types::NativeAddress;

use crate::{read, remove, write};

const NEXT_NUMBER_KEY: &str = "accounts/next_number";

/// Account records under `accounts/addr/{addr}`
#[derive(Debug, Default)]
pub struct MockAccounts;

impl MockAccounts {
    /// Create the mock
    pub fn new() -> Self {
        Self
    }
}

fn account_key(addr: &NativeAddress) -> String {
    format!("accounts/addr/{addr}")
}

impl AccountKeeper for MockAccounts {
    fn get_account(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Option<BaseAccount>> {
        read(ctx, ACC, &account_key(addr))
    }

    fn set_account(&self, ctx: &mut Context<'_>, account: &BaseAccount) -> KeeperResult<()> {
        write(ctx, ACC, &account_key(&account.address), account)
    }

    fn remove_account(&self, ctx: &mut Context<'_>, addr: &NativeAddress) -> KeeperResult<()> {
        remove(ctx, ACC, &account_key(addr))
    }

    fn new_account_with_address(
        &self,
        ctx: &mut Context<'_>,
        addr: &NativeAddress,
    ) -> KeeperResult<BaseAccount> {
        let number: u64 = read(ctx, ACC, NEXT_NUMBER_KEY)?.unwrap_or_default();
        write(ctx, ACC, NEXT_NUMBER_KEY, &(number + 1))?;
        Ok(BaseAccount {
            address: addr.clone(),
            account_number: number,
            sequence: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock_address_pair, test_header, test_store};

    #[test]
    fn test_account_lifecycle() {
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let accounts = MockAccounts::new();
        let (alice, _) = mock_address_pair(1);
        let (bob, _) = mock_address_pair(2);

        let a = accounts.new_account_with_address(&mut ctx, &alice).unwrap();
        let b = accounts.new_account_with_address(&mut ctx, &bob).unwrap();
        assert_eq!((a.account_number, b.account_number), (0, 1));
        assert!(!accounts.has_account(&ctx, &alice).unwrap());

        accounts.set_account(&mut ctx, &a).unwrap();
        assert_eq!(accounts.get_account(&ctx, &alice).unwrap(), Some(a));
        accounts.remove_account(&mut ctx, &alice).unwrap();
        assert!(!accounts.has_account(&ctx, &alice).unwrap());
    }
}

use std::sync::Arc;

use dualvm_core::{BankKeeper, Context, GovKeeper, KeeperError, KeeperResult, WeightedVoteOption};
use dualvm_storage::partitions::GOV;
use dualvm_types::{Coin, NativeAddress};
use serde::{Deserialize, Serialize};

use crate::{mock_address_pair, read, write, MockBank};

/// A proposal accepting deposits and votes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Deposit that opens the voting period
    pub min_deposit: Coin,
    /// Deposited so far, in the min deposit denom
    pub total_deposit: u128,
    /// Whether voting has started
    pub voting: bool,
}

/// Proposals under `proposals/{id}`, votes under `votes/{id}/{voter}`,
/// deposits under `deposits/{id}/{depositor}`.
///
/// Deposited coins move to a module account of `bank`.
#[derive(Debug)]
pub struct MockGov {
    bank: Arc<MockBank>,
    module: NativeAddress,
}

impl MockGov {
    /// Create the mock over `bank`
    pub fn new(bank: Arc<MockBank>) -> Self {
        Self {
            bank,
            module: mock_address_pair(0xc0).0,
        }
    }

    /// Account holding deposits
    pub fn module_account(&self) -> &NativeAddress {
        &self.module
    }

    /// Create a proposal in its deposit period
    pub fn submit_proposal(&self, ctx: &mut Context<'_>, id: u64, min_deposit: Coin) -> KeeperResult<()> {
        let proposal = Proposal {
            min_deposit,
            total_deposit: 0,
            voting: false,
        };
        write(ctx, GOV, &proposal_key(id), &proposal)
    }

    /// Stored proposal
    pub fn proposal(&self, ctx: &Context<'_>, id: u64) -> KeeperResult<Option<Proposal>> {
        read(ctx, GOV, &proposal_key(id))
    }

    /// Recorded vote of `voter`
    pub fn vote(&self, ctx: &Context<'_>, id: u64, voter: &NativeAddress) -> KeeperResult<Option<Vec<WeightedVoteOption>>> {
        read(ctx, GOV, &format!("votes/{id}/{voter}"))
    }

    fn existing(&self, ctx: &Context<'_>, id: u64) -> KeeperResult<Proposal> {
        self.proposal(ctx, id)?
            .ok_or_else(|| KeeperError::NotFound(format!("proposal {id}")))
    }
}

fn proposal_key(id: u64) -> String {
    format!("proposals/{id}")
}

impl GovKeeper for MockGov {
    fn add_vote(
        &self,
        ctx: &mut Context<'_>,
        proposal_id: u64,
        voter: &NativeAddress,
        options: &[WeightedVoteOption],
    ) -> KeeperResult<()> {
        let proposal = self.existing(ctx, proposal_id)?;
        if !proposal.voting {
            return Err(KeeperError::InvalidRequest(format!(
                "proposal {proposal_id} is not in voting period"
            )));
        }
        if options.is_empty() {
            return Err(KeeperError::InvalidRequest("empty vote".into()));
        }
        write(ctx, GOV, &format!("votes/{proposal_id}/{voter}"), &options.to_vec())
    }

    fn add_deposit(
        &self,
        ctx: &mut Context<'_>,
        proposal_id: u64,
        depositor: &NativeAddress,
        amount: &[Coin],
    ) -> KeeperResult<bool> {
        let mut proposal = self.existing(ctx, proposal_id)?;
        self.bank.send_coins(ctx, depositor, &self.module, amount)?;
        let added: u128 = amount
            .iter()
            .filter(|c| c.denom == proposal.min_deposit.denom)
            .map(|c| c.amount)
            .sum();

        let key = format!("deposits/{proposal_id}/{depositor}");
        let previous: u128 = read(ctx, GOV, &key)?.unwrap_or_default();
        write(ctx, GOV, &key, &(previous + added))?;

        proposal.total_deposit += added;
        let activated = !proposal.voting && proposal.total_deposit >= proposal.min_deposit.amount;
        proposal.voting |= activated;
        write(ctx, GOV, &proposal_key(proposal_id), &proposal)?;
        Ok(activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock_address_pair, test_header, test_store, TEST_DENOM};
    use dualvm_core::VoteOption;

    #[test]
    fn test_deposit_opens_voting() {
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let bank = Arc::new(MockBank::new());
        let gov = MockGov::new(bank.clone());
        let (voter, _) = mock_address_pair(4);
        bank.mint(&mut ctx, &voter, &Coin::new(TEST_DENOM, 12)).unwrap();
        gov.submit_proposal(&mut ctx, 1, Coin::new(TEST_DENOM, 10)).unwrap();

        let yes = [WeightedVoteOption {
            option: VoteOption::Yes,
            weight: "1".into(),
        }];
        assert!(gov.add_vote(&mut ctx, 1, &voter, &yes).is_err());

        assert!(!gov.add_deposit(&mut ctx, 1, &voter, &[Coin::new(TEST_DENOM, 4)]).unwrap());
        assert!(gov.add_deposit(&mut ctx, 1, &voter, &[Coin::new(TEST_DENOM, 6)]).unwrap());
        assert!(!gov.add_deposit(&mut ctx, 1, &voter, &[Coin::new(TEST_DENOM, 1)]).unwrap());
        assert!(matches!(
            gov.add_deposit(&mut ctx, 1, &voter, &[Coin::new(TEST_DENOM, 2)]),
            Err(KeeperError::InsufficientFunds(_))
        ));
        assert_eq!(
            BankKeeper::get_balance(bank.as_ref(), &ctx, gov.module_account(), TEST_DENOM)
                .unwrap()
                .amount,
            11
        );

        gov.add_vote(&mut ctx, 1, &voter, &yes).unwrap();
        assert_eq!(gov.vote(&ctx, 1, &voter).unwrap(), Some(yes.to_vec()));
        assert!(matches!(
            gov.add_vote(&mut ctx, 2, &voter, &yes),
            Err(KeeperError::NotFound(_))
        ));
    }
}

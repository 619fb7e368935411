//! Governance voting and deposits.

use dualvm_types::{Coin, NativeAddress};
use serde::{Deserialize, Serialize};

use crate::{Context, KeeperError, KeeperResult};

/// A vote choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    /// In favour
    Yes = 1,
    /// No opinion
    Abstain = 2,
    /// Against
    No = 3,
    /// Against, burning deposits
    NoWithVeto = 4,
}

impl TryFrom<u8> for VoteOption {
    type Error = KeeperError;

    fn try_from(value: u8) -> KeeperResult<Self> {
        match value {
            1 => Ok(VoteOption::Yes),
            2 => Ok(VoteOption::Abstain),
            3 => Ok(VoteOption::No),
            4 => Ok(VoteOption::NoWithVeto),
            other => Err(KeeperError::InvalidRequest(format!("vote option {other}"))),
        }
    }
}

/// One share of a split vote; weights are decimal strings summing to 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedVoteOption {
    /// Choice
    pub option: VoteOption,
    /// Weight
    pub weight: String,
}

/// Voting and deposits on proposals
pub trait GovKeeper: Send + Sync {
    /// Cast or replace a weighted vote
    fn add_vote(
        &self,
        ctx: &mut Context<'_>,
        proposal_id: u64,
        voter: &NativeAddress,
        options: &[WeightedVoteOption],
    ) -> KeeperResult<()>;

    /// Deposit on a proposal; returns whether the voting period started
    fn add_deposit(
        &self,
        ctx: &mut Context<'_>,
        proposal_id: u64,
        depositor: &NativeAddress,
        amount: &[Coin],
    ) -> KeeperResult<bool>;
}

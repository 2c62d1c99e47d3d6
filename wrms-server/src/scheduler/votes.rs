//! Per-item vote ledger
//!
//! Tracks which voters have up- or down-voted one item. A voter is in at
//! most one of the two sets at any time; every transition reports the weight
//! delta it implies so the caller can re-key the item in the queue.
//!
//! | state     | up             | down             | unvote          |
//! |-----------|----------------|------------------|-----------------|
//! | neutral   | upvoted, +1    | downvoted, -1    | rejected        |
//! | upvoted   | rejected       | downvoted, -2    | neutral, -1     |
//! | downvoted | upvoted, +2    | rejected         | neutral, +1     |

use std::collections::HashSet;
use uuid::Uuid;
use wrms_common::VoteAction;

/// Identity a vote is attributed to (the observer's connection id)
pub type VoterId = Uuid;

/// A voter's standing on one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Neutral,
    Upvoted,
    Downvoted,
}

/// Why a vote was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRejection {
    /// `up` from a voter who already upvoted
    AlreadyUpvoted,
    /// `down` from a voter who already downvoted
    AlreadyDownvoted,
    /// `unvote` from a voter with no active vote
    NotVoted,
}

/// Result of applying a vote to a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Applied { delta: i64, state: VoteState },
    Rejected(VoteRejection),
}

impl VoteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, VoteOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    upvoters: HashSet<VoterId>,
    downvoters: HashSet<VoterId>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, voter: &VoterId) -> VoteState {
        if self.upvoters.contains(voter) {
            VoteState::Upvoted
        } else if self.downvoters.contains(voter) {
            VoteState::Downvoted
        } else {
            VoteState::Neutral
        }
    }

    /// Apply `action` by `voter`, returning the weight delta on success
    pub fn apply(&mut self, voter: VoterId, action: VoteAction) -> VoteOutcome {
        let (delta, state) = match (self.state_of(&voter), action) {
            (VoteState::Upvoted, VoteAction::Up) => {
                return VoteOutcome::Rejected(VoteRejection::AlreadyUpvoted)
            }
            (VoteState::Downvoted, VoteAction::Down) => {
                return VoteOutcome::Rejected(VoteRejection::AlreadyDownvoted)
            }
            (VoteState::Neutral, VoteAction::Unvote) => {
                return VoteOutcome::Rejected(VoteRejection::NotVoted)
            }

            (VoteState::Neutral, VoteAction::Up) => {
                self.upvoters.insert(voter);
                (1, VoteState::Upvoted)
            }
            (VoteState::Neutral, VoteAction::Down) => {
                self.downvoters.insert(voter);
                (-1, VoteState::Downvoted)
            }
            (VoteState::Downvoted, VoteAction::Up) => {
                self.downvoters.remove(&voter);
                self.upvoters.insert(voter);
                (2, VoteState::Upvoted)
            }
            (VoteState::Upvoted, VoteAction::Down) => {
                self.upvoters.remove(&voter);
                self.downvoters.insert(voter);
                (-2, VoteState::Downvoted)
            }
            (VoteState::Upvoted, VoteAction::Unvote) => {
                self.upvoters.remove(&voter);
                (-1, VoteState::Neutral)
            }
            (VoteState::Downvoted, VoteAction::Unvote) => {
                self.downvoters.remove(&voter);
                (1, VoteState::Neutral)
            }
        };

        VoteOutcome::Applied { delta, state }
    }

    /// Net tally: upvoters minus downvoters
    pub fn net(&self) -> i64 {
        self.upvoters.len() as i64 - self.downvoters.len() as i64
    }

    pub fn upvote_count(&self) -> usize {
        self.upvoters.len()
    }

    pub fn downvote_count(&self) -> usize {
        self.downvoters.len()
    }

    #[cfg(test)]
    fn is_disjoint(&self) -> bool {
        self.upvoters.is_disjoint(&self.downvoters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(delta: i64, state: VoteState) -> VoteOutcome {
        VoteOutcome::Applied { delta, state }
    }

    #[test]
    fn test_transition_table() {
        let cases = [
            (VoteState::Neutral, VoteAction::Up, applied(1, VoteState::Upvoted)),
            (VoteState::Neutral, VoteAction::Down, applied(-1, VoteState::Downvoted)),
            (VoteState::Neutral, VoteAction::Unvote, VoteOutcome::Rejected(VoteRejection::NotVoted)),
            (VoteState::Upvoted, VoteAction::Up, VoteOutcome::Rejected(VoteRejection::AlreadyUpvoted)),
            (VoteState::Upvoted, VoteAction::Down, applied(-2, VoteState::Downvoted)),
            (VoteState::Upvoted, VoteAction::Unvote, applied(-1, VoteState::Neutral)),
            (VoteState::Downvoted, VoteAction::Up, applied(2, VoteState::Upvoted)),
            (VoteState::Downvoted, VoteAction::Down, VoteOutcome::Rejected(VoteRejection::AlreadyDownvoted)),
            (VoteState::Downvoted, VoteAction::Unvote, applied(1, VoteState::Neutral)),
        ];

        for (start, action, expected) in cases {
            let voter = Uuid::new_v4();
            let mut ledger = VoteLedger::new();
            match start {
                VoteState::Neutral => {}
                VoteState::Upvoted => {
                    ledger.apply(voter, VoteAction::Up);
                }
                VoteState::Downvoted => {
                    ledger.apply(voter, VoteAction::Down);
                }
            }
            let net_before = ledger.net();

            let outcome = ledger.apply(voter, action);
            assert_eq!(outcome, expected, "{:?} + {:?}", start, action);

            match outcome {
                VoteOutcome::Applied { delta, state } => {
                    assert_eq!(ledger.net() - net_before, delta);
                    assert_eq!(ledger.state_of(&voter), state);
                }
                VoteOutcome::Rejected(_) => {
                    assert_eq!(ledger.net(), net_before);
                    assert_eq!(ledger.state_of(&voter), start);
                }
            }
            assert!(ledger.is_disjoint());
        }
    }

    #[test]
    fn test_double_upvote_leaves_sets_unchanged() {
        let voter = Uuid::new_v4();
        let mut ledger = VoteLedger::new();

        assert!(ledger.apply(voter, VoteAction::Up).is_applied());
        assert!(!ledger.apply(voter, VoteAction::Up).is_applied());

        assert_eq!(ledger.upvote_count(), 1);
        assert_eq!(ledger.downvote_count(), 0);
        assert_eq!(ledger.net(), 1);
    }

    #[test]
    fn test_many_voters_net_weight() {
        let mut ledger = VoteLedger::new();
        let voters: Vec<VoterId> = (0..10).map(|_| Uuid::new_v4()).collect();
        let mut weight = 0;

        // Pseudo-random walk over actions for every voter
        let actions = [VoteAction::Up, VoteAction::Down, VoteAction::Unvote, VoteAction::Up];
        for round in 0..4 {
            for (i, voter) in voters.iter().enumerate() {
                let action = actions[(i * 7 + round * 3) % actions.len()];
                if let VoteOutcome::Applied { delta, .. } = ledger.apply(*voter, action) {
                    weight += delta;
                }
                assert!(ledger.is_disjoint());
            }
        }

        assert_eq!(weight, ledger.net());
        assert_eq!(
            weight,
            ledger.upvote_count() as i64 - ledger.downvote_count() as i64
        );
    }
}

use log::{debug, info};

use snafu::prelude::*;

use crate::model::*;
use crate::store::Store;

/// What happened to a single guarded cast.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CastOutcome {
    Cast,
    /// The voter had already voted for this position. Nothing was changed.
    AlreadyVoted,
}

/// The choice made for one position on a ballot.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Selection {
    Candidate(String),
    Skip,
}

/// All the choices of one voter, submitted at once.
///
/// ```
/// use ballot_box::{Ballot, Selection};
///
/// let ballot = Ballot::new("STU001")
///     .choose("Head Student", "Anna")
///     .skip("Sports Captain");
/// assert_eq!(ballot.weight, 1);
/// assert_eq!(ballot.selections[1].1, Selection::Skip);
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub voter_id: String,
    pub weight: u64,
    pub selections: Vec<(String, Selection)>,
}

impl Ballot {
    pub fn new(voter_id: &str) -> Ballot {
        Ballot {
            voter_id: voter_id.to_string(),
            weight: 1,
            selections: Vec::new(),
        }
    }

    pub fn choose(mut self, position: &str, candidate: &str) -> Ballot {
        self.selections.push((
            position.to_string(),
            Selection::Candidate(candidate.to_string()),
        ));
        self
    }

    pub fn skip(mut self, position: &str) -> Ballot {
        self.selections.push((position.to_string(), Selection::Skip));
        self
    }

    pub fn with_weight(mut self, weight: u64) -> Ballot {
        self.weight = weight;
        self
    }
}

/// The outcome of a submitted ballot, by position.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BallotReceipt {
    pub voter_id: String,
    pub cast: Vec<String>,
    pub already_voted: Vec<String>,
    pub skipped: Vec<String>,
}

/// Vote casting and eligibility on top of a [`Store`].
pub struct Ledger<'a> {
    store: &'a Store,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a Store) -> Ledger<'a> {
        Ledger { store }
    }

    pub fn has_voted(&self, voter_id: &str, position: &str) -> bool {
        self.store.load::<VoterRoll>().has_voted(voter_id, position)
    }

    /// Marks the position as voted for this voter. Recording twice is harmless.
    pub fn record(&self, voter_id: &str, position: &str) -> BallotResult<()> {
        self.store.update(|roll: &mut VoterRoll| {
            roll.record(voter_id, position);
            Ok(())
        })
    }

    /// Adds `weight` votes for the candidate and records the position for
    /// the voter. Both documents are written or neither is.
    ///
    /// This does not check whether the voter already voted for the position:
    /// calling it twice counts twice. Use [`Ledger::cast_once`] for the
    /// guarded version.
    pub fn cast(
        &self,
        position: &str,
        candidate: &str,
        voter_id: &str,
        weight: u64,
    ) -> BallotResult<()> {
        self.store
            .update_pair(|roll: &mut VoterRoll, tally: &mut VoteTally| {
                self.add_votes(tally, position, candidate, weight)?;
                roll.record(voter_id, position);
                Ok(())
            })
    }

    /// Checks and casts in one step: the voters document stays locked from
    /// the check until the position is recorded.
    pub fn cast_once(
        &self,
        position: &str,
        candidate: &str,
        voter_id: &str,
        weight: u64,
    ) -> BallotResult<CastOutcome> {
        self.store
            .update_pair(|roll: &mut VoterRoll, tally: &mut VoteTally| {
                if roll.has_voted(voter_id, position) {
                    debug!(
                        "cast_once: voter {:?} already voted for {:?}",
                        voter_id, position
                    );
                    return Ok(CastOutcome::AlreadyVoted);
                }
                self.add_votes(tally, position, candidate, weight)?;
                roll.record(voter_id, position);
                Ok(CastOutcome::Cast)
            })
    }

    /// Casts every selection of the ballot that the voter has not voted for yet.
    ///
    /// The whole ballot is validated against the roster first: a blank voter
    /// id, a zero weight or an unknown position or candidate rejects the ballot
    /// without casting anything.
    pub fn submit(&self, ballot: &Ballot) -> BallotResult<BallotReceipt> {
        let voter_id = ballot.voter_id.trim();
        ensure!(!voter_id.is_empty(), MissingVoterIdSnafu);
        ensure!(
            ballot.weight > 0,
            InvalidWeightSnafu {
                weight: ballot.weight
            }
        );

        let roster: Roster = self.store.load();
        for (position, selection) in ballot.selections.iter() {
            match selection {
                Selection::Candidate(candidate) => roster.check_running(position, candidate)?,
                Selection::Skip => {
                    ensure!(
                        roster.contains_position(position),
                        UnknownPositionSnafu {
                            position: position.as_str()
                        }
                    );
                }
            }
        }

        let mut receipt = BallotReceipt {
            voter_id: voter_id.to_string(),
            ..BallotReceipt::default()
        };
        for (position, selection) in ballot.selections.iter() {
            match selection {
                Selection::Skip => receipt.skipped.push(position.clone()),
                Selection::Candidate(candidate) => {
                    match self.cast_once(position, candidate, voter_id, ballot.weight)? {
                        CastOutcome::Cast => receipt.cast.push(position.clone()),
                        CastOutcome::AlreadyVoted => receipt.already_voted.push(position.clone()),
                    }
                }
            }
        }
        info!(
            "Ballot from {:?}: cast {}, already voted {}, skipped {}",
            receipt.voter_id,
            receipt.cast.len(),
            receipt.already_voted.len(),
            receipt.skipped.len()
        );
        Ok(receipt)
    }

    // Runs inside update_pair: the roster is locked after the voters and votes.
    fn add_votes(
        &self,
        tally: &mut VoteTally,
        position: &str,
        candidate: &str,
        weight: u64,
    ) -> BallotResult<u64> {
        ensure!(weight > 0, InvalidWeightSnafu { weight });
        let roster: Roster = self.store.load();
        roster.check_running(position, candidate)?;
        let count = tally.add(position, candidate, weight)?;
        debug!(
            "add_votes: {:?} / {:?} now at {}",
            position, candidate, count
        );
        Ok(count)
    }
}

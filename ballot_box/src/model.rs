// ********* Roster data structures ***********

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::{ensure, OptionExt, Snafu};

use crate::store::DocumentKind;

/// The number of empty positions created by a full reset.
pub const PLACEHOLDER_POSITION_COUNT: usize = 10;

/// One electable office and the candidates running for it, in display order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PositionEntry {
    pub name: String,
    pub candidates: Vec<String>,
}

/// The candidate lists of all the positions.
///
/// The order of the positions and of the candidates is the order in which
/// they were added. It only matters for display.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Roster {
    positions: Vec<PositionEntry>,
}

impl Roster {
    pub fn new() -> Roster {
        Roster::default()
    }

    /// Appends a position with its candidates.
    ///
    /// ```
    /// use ballot_box::Roster;
    ///
    /// let roster = Roster::new()
    ///     .with_position("Head Student", &["Anna", "Bob"])
    ///     .with_position("Sports Captain", &[]);
    /// assert_eq!(roster.len(), 2);
    /// assert!(roster.is_running("Head Student", "Bob"));
    /// ```
    pub fn with_position(mut self, name: &str, candidates: &[&str]) -> Roster {
        self.positions.push(PositionEntry {
            name: name.to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// `count` empty positions named `Position 1` to `Position <count>`.
    pub fn placeholders(count: usize) -> Roster {
        Roster {
            positions: (1..=count)
                .map(|idx| PositionEntry {
                    name: format!("Position {}", idx),
                    candidates: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn positions(&self) -> &[PositionEntry] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains_position(&self, position: &str) -> bool {
        self.positions.iter().any(|p| p.name == position)
    }

    pub fn candidates(&self, position: &str) -> Option<&[String]> {
        self.positions
            .iter()
            .find(|p| p.name == position)
            .map(|p| p.candidates.as_slice())
    }

    pub fn is_running(&self, position: &str, candidate: &str) -> bool {
        self.candidates(position)
            .map(|cs| cs.iter().any(|c| c == candidate))
            .unwrap_or(false)
    }

    /// True if the candidate runs for at least one position.
    pub fn is_registered(&self, candidate: &str) -> bool {
        self.positions
            .iter()
            .any(|p| p.candidates.iter().any(|c| c == candidate))
    }

    /// Fails unless the candidate is currently running for the position.
    pub fn check_running(&self, position: &str, candidate: &str) -> BallotResult<()> {
        let cands = self
            .candidates(position)
            .context(UnknownPositionSnafu { position })?;
        ensure!(
            cands.iter().any(|c| c == candidate),
            UnknownCandidateSnafu {
                position,
                candidate
            }
        );
        Ok(())
    }

    fn entry_mut(&mut self, position: &str) -> BallotResult<&mut PositionEntry> {
        self.positions
            .iter_mut()
            .find(|p| p.name == position)
            .context(UnknownPositionSnafu { position })
    }

    pub fn add_candidate(&mut self, position: &str, candidate: &str) -> BallotResult<()> {
        ensure!(!candidate.trim().is_empty(), EmptyNameSnafu { what: "candidate" });
        let entry = self.entry_mut(position)?;
        ensure!(
            !entry.candidates.iter().any(|c| c == candidate),
            DuplicateCandidateSnafu {
                position,
                candidate
            }
        );
        entry.candidates.push(candidate.to_string());
        Ok(())
    }

    pub fn remove_candidate(&mut self, position: &str, candidate: &str) -> BallotResult<()> {
        let entry = self.entry_mut(position)?;
        let idx = entry
            .candidates
            .iter()
            .position(|c| c == candidate)
            .context(UnknownCandidateSnafu {
                position,
                candidate,
            })?;
        entry.candidates.remove(idx);
        Ok(())
    }

    pub fn add_position(&mut self, position: &str) -> BallotResult<()> {
        ensure!(!position.trim().is_empty(), EmptyNameSnafu { what: "position" });
        ensure!(
            !self.contains_position(position),
            DuplicatePositionSnafu { position }
        );
        self.positions.push(PositionEntry {
            name: position.to_string(),
            candidates: Vec::new(),
        });
        Ok(())
    }

    pub fn remove_position(&mut self, position: &str) -> BallotResult<PositionEntry> {
        let idx = self
            .positions
            .iter()
            .position(|p| p.name == position)
            .context(UnknownPositionSnafu { position })?;
        Ok(self.positions.remove(idx))
    }

    /// Moves the candidate list of `old` to `new`.
    ///
    /// The position keeps its place in the roster. If `new` already exists,
    /// its list is replaced and `old` disappears. Tallies are keyed by the
    /// position name and are not touched.
    pub fn rename_position(&mut self, old: &str, new: &str) -> BallotResult<()> {
        ensure!(!new.trim().is_empty(), EmptyNameSnafu { what: "position" });
        ensure!(
            self.contains_position(old),
            UnknownPositionSnafu { position: old }
        );
        if old == new {
            return Ok(());
        }
        if self.contains_position(new) {
            let moved = self.remove_position(old)?;
            self.entry_mut(new)?.candidates = moved.candidates;
        } else {
            self.entry_mut(old)?.name = new.to_string();
        }
        Ok(())
    }
}

// ********* Vote records ***********

/// The key under which the votes of a candidate for a position are stored.
pub fn tally_key(position: &str, candidate: &str) -> String {
    format!("{}_{}", position, candidate)
}

/// Accumulated votes, keyed by [`tally_key`], in order of first vote.
///
/// Entries are never removed when the roster changes, only on reset.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VoteTally {
    pub(crate) counts: JSMap<String, JSValue>,
}

impl VoteTally {
    pub fn get(&self, position: &str, candidate: &str) -> u64 {
        self.counts
            .get(&tally_key(position, candidate))
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }

    /// Adds `weight` votes and returns the new count.
    ///
    /// A count that would not fit in a `u64` is refused and left unchanged.
    pub fn add(&mut self, position: &str, candidate: &str, weight: u64) -> BallotResult<u64> {
        let count = self
            .get(position, candidate)
            .checked_add(weight)
            .context(TallyOverflowSnafu {
                position,
                candidate,
            })?;
        self.counts
            .insert(tally_key(position, candidate), JSValue::from(count));
        Ok(count)
    }

    /// Raw entries, including the ones no longer reachable from the roster.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts
            .iter()
            .filter_map(|(k, v)| v.as_u64().map(|c| (k.as_str(), c)))
    }

    pub fn total(&self) -> u64 {
        self.entries()
            .fold(0, |acc: u64, (_, c)| acc.saturating_add(c))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

// ********* Voters ***********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoterRecord {
    pub voter_id: String,
    pub positions: Vec<String>,
}

/// The positions each voter already voted for, in order of first vote.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VoterRoll {
    pub(crate) voters: Vec<VoterRecord>,
}

impl VoterRoll {
    pub fn has_voted(&self, voter_id: &str, position: &str) -> bool {
        self.positions(voter_id)
            .map(|ps| ps.iter().any(|p| p == position))
            .unwrap_or(false)
    }

    pub fn positions(&self, voter_id: &str) -> Option<&[String]> {
        self.voters
            .iter()
            .find(|v| v.voter_id == voter_id)
            .map(|v| v.positions.as_slice())
    }

    /// Returns false if the position was already recorded for this voter.
    pub fn record(&mut self, voter_id: &str, position: &str) -> bool {
        if let Some(rec) = self.voters.iter_mut().find(|v| v.voter_id == voter_id) {
            if rec.positions.iter().any(|p| p == position) {
                return false;
            }
            rec.positions.push(position.to_string());
        } else {
            self.voters.push(VoterRecord {
                voter_id: voter_id.to_string(),
                positions: vec![position.to_string()],
            });
        }
        true
    }

    pub fn voters(&self) -> &[VoterRecord] {
        &self.voters
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}

// ********* Candidate symbols ***********

/// Image paths for the candidates. Purely cosmetic.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SymbolTable {
    pub(crate) symbols: JSMap<String, JSValue>,
}

impl SymbolTable {
    pub fn get(&self, candidate: &str) -> Option<&str> {
        self.symbols.get(candidate).and_then(|s| s.as_str())
    }

    /// The symbol path, only if the file is still present on disk.
    pub fn existing_path(&self, candidate: &str) -> Option<PathBuf> {
        self.get(candidate)
            .map(PathBuf::from)
            .filter(|p| p.exists())
    }

    pub fn set(&mut self, candidate: &str, path: &str) -> Option<String> {
        self.symbols
            .insert(candidate.to_string(), JSValue::from(path))
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// The other entries keep their order.
    pub fn remove(&mut self, candidate: &str) -> Option<String> {
        let previous = self.get(candidate)?.to_string();
        self.symbols = std::mem::take(&mut self.symbols)
            .into_iter()
            .filter(|(k, _)| k != candidate)
            .collect();
        Some(previous)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.symbols
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ******** Output data structures *********

/// One line of the exported results.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Candidate")]
    pub candidate: String,
    #[serde(rename = "Votes")]
    pub votes: u64,
}

/// Errors from the ledger and the admin operations.
///
/// None of them leave a partial change behind.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BallotError {
    #[snafu(display("Candidate {candidate:?} already exists for position {position:?}"))]
    DuplicateCandidate { position: String, candidate: String },

    #[snafu(display("Position {position:?} already exists"))]
    DuplicatePosition { position: String },

    #[snafu(display("Unknown position {position:?}"))]
    UnknownPosition { position: String },

    #[snafu(display("Candidate {candidate:?} is not running for position {position:?}"))]
    UnknownCandidate { position: String, candidate: String },

    #[snafu(display("Candidate {candidate:?} is not running for any position"))]
    UnregisteredCandidate { candidate: String },

    #[snafu(display("Please enter a {what} name"))]
    EmptyName { what: String },

    #[snafu(display("Voter ID is missing"))]
    MissingVoterId {},

    #[snafu(display("Vote weight must be at least 1, got {weight}"))]
    InvalidWeight { weight: u64 },

    #[snafu(display("Too many votes for {candidate:?} in position {position:?}"))]
    TallyOverflow { position: String, candidate: String },

    #[snafu(display("Error writing {:?} document to {}", kind, path.display()))]
    WritingDocument {
        source: std::io::Error,
        kind: DocumentKind,
        path: PathBuf,
    },

    #[snafu(display("Error serializing {kind:?} document"))]
    SerializingDocument {
        source: serde_json::Error,
        kind: DocumentKind,
    },
}

pub type BallotResult<T> = Result<T, BallotError>;

use log::{info, warn};

use snafu::prelude::*;

use crate::model::*;
use crate::store::{Document, DocumentKind, Store};
use crate::tally::{results, ElectionResults};

/// How much of the election data a reset removes.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ResetScope {
    /// Votes and voters. The roster stays.
    VotesOnly,
    /// Votes, voters and the roster, which is replaced by empty placeholder positions.
    Everything,
}

/// Roster management, resets and exports.
pub struct Admin<'a> {
    store: &'a Store,
    placeholder_positions: usize,
}

impl<'a> Admin<'a> {
    pub fn new(store: &'a Store) -> Admin<'a> {
        Admin {
            store,
            placeholder_positions: PLACEHOLDER_POSITION_COUNT,
        }
    }

    /// The number of positions created by a full reset.
    pub fn with_placeholder_positions(mut self, count: usize) -> Admin<'a> {
        self.placeholder_positions = count;
        self
    }

    pub fn roster(&self) -> Roster {
        self.store.load()
    }

    pub fn add_candidate(&self, position: &str, candidate: &str) -> BallotResult<()> {
        self.store
            .update(|roster: &mut Roster| roster.add_candidate(position, candidate))?;
        info!("Added {:?} to {:?}", candidate, position);
        Ok(())
    }

    /// Existing votes for the candidate stay in the votes document but no
    /// longer appear in the results.
    pub fn remove_candidate(&self, position: &str, candidate: &str) -> BallotResult<()> {
        self.store
            .update(|roster: &mut Roster| roster.remove_candidate(position, candidate))?;
        info!("Removed {:?} from {:?}", candidate, position);
        Ok(())
    }

    pub fn add_position(&self, position: &str) -> BallotResult<()> {
        self.store
            .update(|roster: &mut Roster| roster.add_position(position))?;
        info!("Added position {:?}", position);
        Ok(())
    }

    pub fn remove_position(&self, position: &str) -> BallotResult<()> {
        let removed = self
            .store
            .update(|roster: &mut Roster| roster.remove_position(position))?;
        info!(
            "Removed position {:?} and its {} candidates",
            position,
            removed.candidates.len()
        );
        Ok(())
    }

    /// Votes already cast stay keyed by the old name: they are not visible
    /// in the results under the new name.
    pub fn rename_position(&self, old: &str, new: &str) -> BallotResult<()> {
        self.store
            .update(|roster: &mut Roster| roster.rename_position(old, new))?;
        info!("Renamed {:?} to {:?}", old, new);
        Ok(())
    }

    /// All the documents of the scope are cleared, or none is.
    pub fn reset(&self, scope: ResetScope) -> BallotResult<()> {
        let _voters = self.store.guard(DocumentKind::Voters);
        let _votes = self.store.guard(DocumentKind::Votes);
        let _candidates = self.store.guard(DocumentKind::Candidates);
        let mut docs = vec![
            (DocumentKind::Voters, VoterRoll::default().to_json()),
            (DocumentKind::Votes, VoteTally::default().to_json()),
        ];
        if scope == ResetScope::Everything {
            docs.push((
                DocumentKind::Candidates,
                Roster::placeholders(self.placeholder_positions).to_json(),
            ));
        }
        self.store.commit(&docs)?;
        warn!("Election data reset ({:?})", scope);
        Ok(())
    }

    pub fn results(&self) -> ElectionResults {
        results(self.store)
    }

    /// One row per (position, candidate) of the current roster.
    pub fn export(&self) -> Vec<ResultRow> {
        let res = self.results();
        info!(
            "Exporting {} rows, {} votes in total",
            res.positions.iter().map(|p| p.tally.len()).sum::<usize>(),
            res.total_votes()
        );
        res.rows()
    }

    pub fn voters(&self) -> VoterRoll {
        self.store.load()
    }

    pub fn symbols(&self) -> SymbolTable {
        self.store.load()
    }

    /// Records the image path for a candidate. The file itself is not checked
    /// or copied.
    pub fn set_symbol(&self, candidate: &str, path: &str) -> BallotResult<()> {
        let roster = self.roster();
        ensure!(
            roster.is_registered(candidate),
            UnregisteredCandidateSnafu { candidate }
        );
        ensure!(!path.trim().is_empty(), EmptyNameSnafu { what: "symbol file" });
        let previous = self
            .store
            .update(|symbols: &mut SymbolTable| Ok(symbols.set(candidate, path)))?;
        info!(
            "Symbol for {:?} set to {:?} (was {:?})",
            candidate, path, previous
        );
        Ok(())
    }

    /// Returns false if the candidate had no symbol.
    pub fn remove_symbol(&self, candidate: &str) -> BallotResult<bool> {
        let previous = self
            .store
            .update(|symbols: &mut SymbolTable| Ok(symbols.remove(candidate)))?;
        Ok(previous.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path());
        store
            .initialize(
                &Roster::new()
                    .with_position("CM", &["A", "B"])
                    .with_position("DCM", &["C"]),
            )
            .unwrap();
        (dir, store)
    }

    #[test]
    fn roster_changes_are_persisted() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        admin.add_candidate("CM", "D").unwrap();
        admin.remove_candidate("DCM", "C").unwrap();
        admin.add_position("HM").unwrap();
        admin.remove_position("DCM").unwrap();
        let roster = Store::open(store.root()).load::<Roster>();
        assert_eq!(
            roster,
            Roster::new()
                .with_position("CM", &["A", "B", "D"])
                .with_position("HM", &[])
        );
    }

    #[test]
    fn duplicate_candidate_changes_nothing() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        let before = admin.roster();
        assert!(matches!(
            admin.add_candidate("CM", "B"),
            Err(BallotError::DuplicateCandidate { .. })
        ));
        assert_eq!(admin.roster(), before);
    }

    #[test]
    fn partial_reset_keeps_roster() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        let ledger = Ledger::new(&store);
        ledger.cast("CM", "A", "V1", 1).unwrap();
        ledger.cast("DCM", "C", "V1", 1).unwrap();
        let before = admin.roster();

        admin.reset(ResetScope::VotesOnly).unwrap();
        assert_eq!(admin.roster(), before);
        assert!(admin.voters().is_empty());
        assert!(store.load::<VoteTally>().is_empty());
        let res = admin.results();
        assert_eq!(res.get("CM", "A"), Some(0));
        assert_eq!(res.get("CM", "B"), Some(0));
        assert_eq!(res.get("DCM", "C"), Some(0));
        assert!(!ledger.has_voted("V1", "CM"));
    }

    #[test]
    fn full_reset_uses_placeholders() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        Ledger::new(&store).cast("CM", "A", "V1", 1).unwrap();

        admin.reset(ResetScope::Everything).unwrap();
        assert_eq!(admin.roster(), Roster::placeholders(10));
        assert!(admin.voters().is_empty());
        assert!(store.load::<VoteTally>().is_empty());

        let admin = Admin::new(&store).with_placeholder_positions(3);
        admin.reset(ResetScope::Everything).unwrap();
        assert_eq!(admin.roster().len(), 3);
    }

    #[test]
    fn failed_reset_keeps_everything() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        Ledger::new(&store).cast("CM", "A", "V1", 1).unwrap();
        let before = admin.roster();
        let tmp = store.path(DocumentKind::Candidates).with_extension("json.tmp");
        fs::create_dir(&tmp).unwrap();

        assert!(admin.reset(ResetScope::Everything).is_err());
        assert_eq!(admin.roster(), before);
        assert_eq!(store.load::<VoteTally>().get("CM", "A"), 1);
        assert!(Ledger::new(&store).has_voted("V1", "CM"));

        fs::remove_dir(&tmp).unwrap();
        admin.reset(ResetScope::Everything).unwrap();
        assert_eq!(admin.roster(), Roster::placeholders(10));
        assert!(admin.voters().is_empty());
    }

    #[test]
    fn rename_orphans_existing_votes() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        let ledger = Ledger::new(&store);
        ledger.cast("CM", "A", "V1", 1).unwrap();

        admin.rename_position("CM", "Chief Minister").unwrap();
        let res = admin.results();
        assert_eq!(res.get("Chief Minister", "A"), Some(0));
        assert_eq!(res.get("CM", "A"), None);
        // The old entry is still in the votes document.
        assert_eq!(store.load::<VoteTally>().get("CM", "A"), 1);
        // The voter history is keyed by the old name too.
        assert!(!ledger.has_voted("V1", "Chief Minister"));
    }

    #[test]
    fn removed_candidate_votes_are_hidden() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        Ledger::new(&store).cast("CM", "B", "V1", 1).unwrap();
        admin.remove_candidate("CM", "B").unwrap();
        let rows = admin.export();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.votes == 0));
        assert_eq!(store.load::<VoteTally>().total(), 1);
    }

    #[test]
    fn export_rows() {
        let (_dir, store) = setup();
        let admin = Admin::new(&store);
        let ledger = Ledger::new(&store);
        ledger.cast("CM", "B", "V1", 1).unwrap();
        ledger.cast("CM", "B", "V2", 1).unwrap();
        ledger.cast("DCM", "C", "V2", 1).unwrap();
        let rows = admin.export();
        assert_eq!(
            rows,
            vec![
                ResultRow {
                    position: "CM".to_string(),
                    candidate: "A".to_string(),
                    votes: 0
                },
                ResultRow {
                    position: "CM".to_string(),
                    candidate: "B".to_string(),
                    votes: 2
                },
                ResultRow {
                    position: "DCM".to_string(),
                    candidate: "C".to_string(),
                    votes: 1
                },
            ]
        );
    }

    #[test]
    fn symbols() {
        let (dir, store) = setup();
        let admin = Admin::new(&store);
        let image = dir.path().join("a.png");
        fs::write(&image, b"png").unwrap();
        let image_str = image.to_str().unwrap();

        admin.set_symbol("A", image_str).unwrap();
        admin.set_symbol("B", "missing.png").unwrap();
        assert!(matches!(
            admin.set_symbol("Nobody", image_str),
            Err(BallotError::UnregisteredCandidate { .. })
        ));

        let symbols = admin.symbols();
        assert_eq!(symbols.get("A"), Some(image_str));
        assert_eq!(symbols.existing_path("A"), Some(image.clone()));
        assert_eq!(symbols.existing_path("B"), None);

        assert!(admin.remove_symbol("B").unwrap());
        assert!(!admin.remove_symbol("B").unwrap());
    }
}

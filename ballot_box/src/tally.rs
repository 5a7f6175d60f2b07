use log::debug;

use crate::model::*;
use crate::store::Store;

/// The counts of one position, in roster order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PositionResult {
    pub name: String,
    pub tally: Vec<(String, u64)>,
}

impl PositionResult {
    pub fn count(&self, candidate: &str) -> Option<u64> {
        self.tally
            .iter()
            .find(|(name, _)| name == candidate)
            .map(|(_, count)| *count)
    }

    /// Candidates sorted by decreasing votes. Ties keep the roster order.
    pub fn standings(&self) -> Vec<(String, u64)> {
        let mut l = self.tally.clone();
        l.sort_by(|a, b| b.1.cmp(&a.1));
        l
    }

    /// The candidate with the most votes, if anybody got a vote at all.
    pub fn leader(&self) -> Option<(String, u64)> {
        self.standings().into_iter().next().filter(|(_, c)| *c > 0)
    }

    pub fn total(&self) -> u64 {
        self.tally
            .iter()
            .fold(0, |acc: u64, (_, c)| acc.saturating_add(*c))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionResults {
    pub positions: Vec<PositionResult>,
}

impl ElectionResults {
    pub fn position(&self, name: &str) -> Option<&PositionResult> {
        self.positions.iter().find(|p| p.name == name)
    }

    pub fn get(&self, position: &str, candidate: &str) -> Option<u64> {
        self.position(position).and_then(|p| p.count(candidate))
    }

    pub fn total_votes(&self) -> u64 {
        self.positions
            .iter()
            .fold(0, |acc: u64, p| acc.saturating_add(p.total()))
    }

    /// Flattens the results into one row per (position, candidate), in roster order.
    pub fn rows(&self) -> Vec<ResultRow> {
        self.positions
            .iter()
            .flat_map(|p| {
                p.tally.iter().map(move |(candidate, votes)| ResultRow {
                    position: p.name.clone(),
                    candidate: candidate.clone(),
                    votes: *votes,
                })
            })
            .collect()
    }
}

/// Looks up the votes of every candidate of the roster.
///
/// Votes are only reachable through the roster: the entries of candidates
/// or positions that were removed or renamed do not show up.
pub fn compute_results(roster: &Roster, tally: &VoteTally) -> ElectionResults {
    let positions: Vec<PositionResult> = roster
        .positions()
        .iter()
        .map(|p| PositionResult {
            name: p.name.clone(),
            tally: p
                .candidates
                .iter()
                .map(|c| (c.clone(), tally.get(&p.name, c)))
                .collect(),
        })
        .collect();
    let res = ElectionResults { positions };
    debug!(
        "compute_results: {} positions, {} of {} votes reachable",
        res.positions.len(),
        res.total_votes(),
        tally.total()
    );
    res
}

/// The current results, read from the store.
pub fn results(store: &Store) -> ElectionResults {
    let roster: Roster = store.load();
    let tally: VoteTally = store.load();
    compute_results(&roster, &tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new()
            .with_position("CM", &["A", "B", "C"])
            .with_position("HM", &[])
    }

    #[test]
    fn zero_for_every_roster_pair() {
        let res = compute_results(&roster(), &VoteTally::default());
        assert_eq!(res.positions.len(), 2);
        assert_eq!(
            res.position("CM").unwrap().tally,
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 0),
                ("C".to_string(), 0)
            ]
        );
        assert!(res.position("HM").unwrap().tally.is_empty());
        assert_eq!(res.total_votes(), 0);
        assert_eq!(res.position("CM").unwrap().leader(), None);
    }

    #[test]
    fn unreachable_entries_are_dropped() {
        let mut tally = VoteTally::default();
        tally.add("CM", "A", 2).unwrap();
        tally.add("CM", "Gone", 7).unwrap();
        tally.add("Old CM", "A", 3).unwrap();
        let res = compute_results(&roster(), &tally);
        assert_eq!(res.get("CM", "A"), Some(2));
        assert_eq!(res.get("CM", "Gone"), None);
        assert_eq!(res.total_votes(), 2);
    }

    #[test]
    fn standings_and_leader() {
        let mut tally = VoteTally::default();
        tally.add("CM", "B", 2).unwrap();
        tally.add("CM", "C", 2).unwrap();
        tally.add("CM", "A", 1).unwrap();
        let res = compute_results(&roster(), &tally);
        let cm = res.position("CM").unwrap();
        let standings = cm.standings();
        let order: Vec<&str> = standings.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, ["B", "C", "A"]);
        assert_eq!(cm.leader(), Some(("B".to_string(), 2)));
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn rows_in_roster_order() {
        let mut tally = VoteTally::default();
        tally.add("CM", "C", 4).unwrap();
        let rows = compute_results(&roster(), &tally).rows();
        let flat: Vec<(&str, &str, u64)> = rows
            .iter()
            .map(|r| (r.position.as_str(), r.candidate.as_str(), r.votes))
            .collect();
        assert_eq!(flat, [("CM", "A", 0), ("CM", "B", 0), ("CM", "C", 4)]);
    }
}

//! Flat JSON documents in a data directory.
//!
//! Loading never fails: a missing or unreadable document is treated as an
//! empty one, so that a damaged file never blocks voting. Writing goes
//! through a temporary file renamed over the target.

use log::{debug, info, warn};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::model::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum DocumentKind {
    Candidates,
    Votes,
    Voters,
    Symbols,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Candidates,
        DocumentKind::Votes,
        DocumentKind::Voters,
        DocumentKind::Symbols,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::Candidates => "candidates.json",
            DocumentKind::Votes => "votes.json",
            DocumentKind::Voters => "voters.json",
            DocumentKind::Symbols => "candidate_symbols.json",
        }
    }
}

/// A value persisted as one JSON object.
///
/// `from_json` is lenient: entries of the wrong shape are skipped.
pub trait Document: Default {
    const KIND: DocumentKind;

    fn from_json(js: &JSMap<String, JSValue>) -> Self;

    fn to_json(&self) -> JSValue;
}

impl Document for Roster {
    const KIND: DocumentKind = DocumentKind::Candidates;

    fn from_json(js: &JSMap<String, JSValue>) -> Roster {
        let mut roster = Roster::new();
        for (position, cands) in js.iter() {
            match cands.as_array() {
                Some(l) => {
                    let names: Vec<&str> = l.iter().filter_map(|c| c.as_str()).collect();
                    if names.len() != l.len() {
                        warn!("candidates: position {:?}: skipping non-string entries", position);
                    }
                    roster = roster.with_position(position, &names);
                }
                None => {
                    warn!("candidates: position {:?}: expected a list, got {}", position, cands);
                }
            }
        }
        roster
    }

    fn to_json(&self) -> JSValue {
        let mut m: JSMap<String, JSValue> = JSMap::new();
        for p in self.positions() {
            m.insert(p.name.clone(), json!(p.candidates));
        }
        JSValue::Object(m)
    }
}

impl Document for VoteTally {
    const KIND: DocumentKind = DocumentKind::Votes;

    fn from_json(js: &JSMap<String, JSValue>) -> VoteTally {
        let mut tally = VoteTally::default();
        for (key, count) in js.iter() {
            match count.as_u64() {
                Some(c) => {
                    tally.counts.insert(key.clone(), JSValue::from(c));
                }
                None => warn!("votes: {:?}: not a vote count: {}", key, count),
            }
        }
        tally
    }

    fn to_json(&self) -> JSValue {
        JSValue::Object(self.counts.clone())
    }
}

impl Document for VoterRoll {
    const KIND: DocumentKind = DocumentKind::Voters;

    fn from_json(js: &JSMap<String, JSValue>) -> VoterRoll {
        let mut roll = VoterRoll::default();
        for (voter_id, positions) in js.iter() {
            match positions.as_array() {
                Some(l) => roll.voters.push(VoterRecord {
                    voter_id: voter_id.clone(),
                    positions: l
                        .iter()
                        .filter_map(|p| p.as_str().map(|s| s.to_string()))
                        .collect(),
                }),
                None => warn!("voters: {:?}: expected a list, got {}", voter_id, positions),
            }
        }
        roll
    }

    fn to_json(&self) -> JSValue {
        let mut m: JSMap<String, JSValue> = JSMap::new();
        for v in self.voters() {
            m.insert(v.voter_id.clone(), json!(v.positions));
        }
        JSValue::Object(m)
    }
}

impl Document for SymbolTable {
    const KIND: DocumentKind = DocumentKind::Symbols;

    fn from_json(js: &JSMap<String, JSValue>) -> SymbolTable {
        let mut symbols = SymbolTable::default();
        for (candidate, path) in js.iter() {
            match path.as_str() {
                Some(s) => {
                    symbols.set(candidate, s);
                }
                None => warn!("symbols: {:?}: not a path: {}", candidate, path),
            }
        }
        symbols
    }

    fn to_json(&self) -> JSValue {
        JSValue::Object(self.symbols.clone())
    }
}

/// The data directory holding all the documents of one election.
///
/// Each document has its own lock. `update` holds it across the whole
/// load-modify-save sequence. When several documents are locked together,
/// the voters document is always locked before the votes document, and the
/// votes document before the candidates document.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    candidates_lock: Mutex<()>,
    votes_lock: Mutex<()>,
    voters_lock: Mutex<()>,
    symbols_lock: Mutex<()>,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Store {
        Store {
            root: root.into(),
            candidates_lock: Mutex::new(()),
            votes_lock: Mutex::new(()),
            voters_lock: Mutex::new(()),
            symbols_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn path(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Creates the data directory and the documents that do not exist yet.
    /// Existing files are left alone.
    pub fn initialize(&self, initial_roster: &Roster) -> BallotResult<()> {
        fs::create_dir_all(&self.root).context(WritingDocumentSnafu {
            kind: DocumentKind::Candidates,
            path: self.root.clone(),
        })?;
        if !self.path(DocumentKind::Candidates).exists() {
            info!(
                "Creating candidates document with {} positions",
                initial_roster.len()
            );
            self.save(initial_roster)?;
        }
        if !self.path(DocumentKind::Votes).exists() {
            self.save(&VoteTally::default())?;
        }
        if !self.path(DocumentKind::Voters).exists() {
            self.save(&VoterRoll::default())?;
        }
        if !self.path(DocumentKind::Symbols).exists() {
            self.save(&SymbolTable::default())?;
        }
        Ok(())
    }

    pub fn load<D: Document>(&self) -> D {
        let _guard = self.guard(D::KIND);
        self.read_document()
    }

    pub fn save<D: Document>(&self, doc: &D) -> BallotResult<()> {
        let _guard = self.guard(D::KIND);
        self.write_document(doc)
    }

    /// Loads a document, applies `f` and saves the result, without letting
    /// any other `update` of the same document in between.
    ///
    /// Nothing is written if `f` fails.
    pub fn update<D: Document, R>(
        &self,
        f: impl FnOnce(&mut D) -> BallotResult<R>,
    ) -> BallotResult<R> {
        let _guard = self.guard(D::KIND);
        let mut doc: D = self.read_document();
        let res = f(&mut doc)?;
        self.write_document(&doc)?;
        Ok(res)
    }

    /// Like `update`, for two documents that change together. `A` is locked
    /// first, see the lock order above.
    ///
    /// Either both documents are written or neither is.
    pub fn update_pair<A: Document, B: Document, R>(
        &self,
        f: impl FnOnce(&mut A, &mut B) -> BallotResult<R>,
    ) -> BallotResult<R> {
        debug_assert_ne!(A::KIND, B::KIND);
        let _first = self.guard(A::KIND);
        let _second = self.guard(B::KIND);
        let mut a: A = self.read_document();
        let mut b: B = self.read_document();
        let res = f(&mut a, &mut b)?;
        self.commit(&[(A::KIND, a.to_json()), (B::KIND, b.to_json())])?;
        Ok(res)
    }

    pub(crate) fn guard(&self, kind: DocumentKind) -> MutexGuard<'_, ()> {
        let lock = match kind {
            DocumentKind::Candidates => &self.candidates_lock,
            DocumentKind::Votes => &self.votes_lock,
            DocumentKind::Voters => &self.voters_lock,
            DocumentKind::Symbols => &self.symbols_lock,
        };
        // The guarded data lives on disk, a panicking holder cannot corrupt it.
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the documents in the given order. When a write fails, the
    /// documents already written get their previous contents back.
    ///
    /// The caller must hold the locks of all the documents.
    pub(crate) fn commit(&self, docs: &[(DocumentKind, JSValue)]) -> BallotResult<()> {
        let mut staged: Vec<(DocumentKind, String)> = Vec::with_capacity(docs.len());
        for (kind, js) in docs.iter() {
            let contents = serde_json::to_string_pretty(js)
                .context(SerializingDocumentSnafu { kind: *kind })?;
            staged.push((*kind, contents));
        }

        let mut written: Vec<(DocumentKind, Option<Vec<u8>>)> = Vec::new();
        for (kind, contents) in staged {
            let previous = fs::read(self.path(kind)).ok();
            if let Err(e) = self.replace_file(kind, contents.as_bytes()) {
                warn!(
                    "commit: writing {:?} failed, restoring {} documents",
                    kind,
                    written.len()
                );
                for (done, previous) in written.into_iter().rev() {
                    self.restore(done, previous);
                }
                return Err(e);
            }
            written.push((kind, previous));
        }
        Ok(())
    }

    fn restore(&self, kind: DocumentKind, previous: Option<Vec<u8>>) {
        let path = self.path(kind);
        let res = match previous {
            Some(bytes) => self.replace_file(kind, &bytes),
            None => fs::remove_file(&path).context(WritingDocumentSnafu {
                kind,
                path: path.clone(),
            }),
        };
        if let Err(e) = res {
            warn!("{:?}: cannot restore the previous contents: {}", path, e);
        }
    }

    fn read_document<D: Document>(&self) -> D {
        let path = self.path(D::KIND);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("{:?}: cannot read ({}); using empty document", path, e);
                return D::default();
            }
        };
        match serde_json::from_str::<JSValue>(&contents) {
            Ok(JSValue::Object(m)) => D::from_json(&m),
            Ok(other) => {
                warn!(
                    "{:?}: expected a JSON object, found {}; using empty document",
                    path, other
                );
                D::default()
            }
            Err(e) => {
                warn!("{:?}: cannot parse JSON ({}); using empty document", path, e);
                D::default()
            }
        }
    }

    fn write_document<D: Document>(&self, doc: &D) -> BallotResult<()> {
        let contents = serde_json::to_string_pretty(&doc.to_json())
            .context(SerializingDocumentSnafu { kind: D::KIND })?;
        self.replace_file(D::KIND, contents.as_bytes())
    }

    fn replace_file(&self, kind: DocumentKind, contents: &[u8]) -> BallotResult<()> {
        let path = self.path(kind);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).context(WritingDocumentSnafu {
            kind,
            path: tmp.clone(),
        })?;
        fs::rename(&tmp, &path).context(WritingDocumentSnafu {
            kind,
            path: path.clone(),
        })?;
        debug!("replace_file: wrote {:?}", path);
        Ok(())
    }
}

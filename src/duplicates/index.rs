//! Signature-ordered duplicate index.
//!
//! # Overview
//!
//! [`DuplicateIndex`] is a binary search tree stored in a flat arena. Each
//! [`FileRecord`] refers to its children and to the next record with the same
//! key through [`RecordId`]s instead of pointers:
//!
//! - `smaller` / `larger` order distinct keys
//! - `same` threads records sharing one key, in insertion order
//!
//! A candidate whose key matches an existing record is either handed to a
//! [`Resolver`] (duplicate elimination) or appended to the `same` chain
//! (reference and hard-link listing modes). Only survivors are stored, and
//! their path is copied into the arena at that point.
//!
//! # Example
//!
//! ```
//! use dupelink::duplicates::{Candidate, Collision, DuplicateIndex, Inserted, Statistics};
//! use dupelink::platform::FileId;
//! use dupelink::scanner::Signature;
//! use std::path::Path;
//!
//! let mut index = DuplicateIndex::new();
//! let mut stats = Statistics::new();
//! let candidate = Candidate {
//!     key: Signature::new(1, 2),
//!     identity: FileId::new(0, 42),
//!     link_count: 1,
//!     size: 10,
//!     path: Path::new("a.txt"),
//! };
//!
//! let inserted = index.insert(candidate, Collision::Chain, &mut stats).unwrap();
//! assert!(matches!(inserted, Inserted::Stored(_)));
//! assert_eq!(index.len(), 1);
//! ```

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::actions::{ActionError, Resolution};
use crate::platform::FileId;
use crate::scanner::Signature;

use super::{IndexError, Statistics};

/// Which value keys the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Content signature; collisions are verified and resolved.
    #[default]
    Content,
    /// Platform file identity; used to list hard-link groups.
    Identity,
}

/// Position of a record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u32);

impl RecordId {
    /// Arena slot.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A file that survived resolution and lives in the index.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Signature or identity, depending on [`IndexMode`].
    pub key: Signature,
    /// Identity of the data behind `path`.
    pub identity: FileId,
    /// Links reported at scan time, plus links this run created.
    pub link_count: u32,
    /// Length in bytes.
    pub size: u64,
    /// Path as matched.
    pub path: PathBuf,
    larger: Option<RecordId>,
    smaller: Option<RecordId>,
    same: Option<RecordId>,
}

impl FileRecord {
    /// Child with a larger key.
    #[must_use]
    pub fn larger(&self) -> Option<RecordId> {
        self.larger
    }

    /// Child with a smaller key.
    #[must_use]
    pub fn smaller(&self) -> Option<RecordId> {
        self.smaller
    }

    /// Next record with an equal key.
    #[must_use]
    pub fn same(&self) -> Option<RecordId> {
        self.same
    }
}

/// A file on its way into the index. Borrows its path until stored.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Signature or identity, depending on [`IndexMode`].
    pub key: Signature,
    /// Identity of the data behind `path`.
    pub identity: FileId,
    /// Links reported by the OS.
    pub link_count: u32,
    /// Length in bytes.
    pub size: u64,
    /// Path as matched.
    pub path: &'a Path,
}

/// Decides the fate of a candidate whose key matches a stored record.
pub trait Resolver {
    /// Resolve `candidate` against `established`.
    ///
    /// [`Resolution::NotDuplicate`] lets the search continue along the
    /// `same` chain; anything else consumes the candidate.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when a mutation fails and the run must stop.
    fn resolve(
        &mut self,
        candidate: &Candidate<'_>,
        established: &FileRecord,
        stats: &mut Statistics,
    ) -> Result<Resolution, ActionError>;
}

/// What to do when keys collide.
pub enum Collision<'r> {
    /// Ask the resolver, walking the chain until something resolves.
    Resolve(&'r mut dyn Resolver),
    /// Append to the end of the chain without comparing anything.
    Chain,
}

/// Outcome of [`DuplicateIndex::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// The candidate was stored.
    Stored(RecordId),
    /// The candidate was consumed by a resolution and not stored.
    Resolved(Resolution),
}

/// Arena-backed search tree with collision chains.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    records: Vec<FileRecord>,
}

impl DuplicateIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this index.
    #[must_use]
    pub fn get(&self, id: RecordId) -> &FileRecord {
        &self.records[id.index()]
    }

    /// Root of the tree, if any.
    #[must_use]
    pub fn root(&self) -> Option<RecordId> {
        (!self.records.is_empty()).then_some(RecordId(0))
    }

    /// Insert a candidate.
    ///
    /// Every call counts the candidate towards the total file and byte
    /// statistics, whether or not it ends up stored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Action`] when the resolver fails and
    /// [`IndexError::Exhausted`] when the arena cannot grow.
    pub fn insert(
        &mut self,
        candidate: Candidate<'_>,
        mut collision: Collision<'_>,
        stats: &mut Statistics,
    ) -> Result<Inserted, IndexError> {
        stats.record_indexed(candidate.size);

        let Some(mut current) = self.root() else {
            return self.store(&candidate).map(Inserted::Stored);
        };

        loop {
            let node = &self.records[current.index()];
            let next = match candidate.key.cmp(&node.key) {
                Ordering::Equal => {
                    if let Collision::Resolve(resolver) = &mut collision {
                        let resolution = resolver.resolve(&candidate, node, stats)?;
                        if resolution.is_definitive() {
                            if resolution == Resolution::Hardlinked {
                                self.records[current.index()].link_count += 1;
                            }
                            return Ok(Inserted::Resolved(resolution));
                        }
                    }
                    node.same
                }
                Ordering::Greater => node.larger,
                Ordering::Less => node.smaller,
            };

            if let Some(next) = next {
                current = next;
                continue;
            }

            let id = self.store(&candidate)?;
            let node = &mut self.records[current.index()];
            match candidate.key.cmp(&node.key) {
                Ordering::Equal => node.same = Some(id),
                Ordering::Greater => node.larger = Some(id),
                Ordering::Less => node.smaller = Some(id),
            }
            return Ok(Inserted::Stored(id));
        }
    }

    fn store(&mut self, candidate: &Candidate<'_>) -> Result<RecordId, IndexError> {
        let records = self.records.len();
        let id = u32::try_from(records).map_err(|_| IndexError::Exhausted { records })?;
        self.records
            .try_reserve(1)
            .map_err(|_| IndexError::Exhausted { records })?;
        self.records.push(FileRecord {
            key: candidate.key,
            identity: candidate.identity,
            link_count: candidate.link_count,
            size: candidate.size,
            path: candidate.path.to_path_buf(),
            larger: None,
            smaller: None,
            same: None,
        });
        Ok(RecordId(id))
    }

    /// Tree nodes in ascending key order. Chain members are not included.
    #[must_use]
    pub fn in_order(&self) -> InOrder<'_> {
        InOrder {
            index: self,
            stack: Vec::new(),
            next: self.root(),
        }
    }

    /// `start` followed by every record on its `same` chain.
    #[must_use]
    pub fn same_chain(&self, start: RecordId) -> SameChain<'_> {
        SameChain {
            index: self,
            next: Some(start),
        }
    }
}

/// Iterator returned by [`DuplicateIndex::in_order`].
pub struct InOrder<'a> {
    index: &'a DuplicateIndex,
    stack: Vec<RecordId>,
    next: Option<RecordId>,
}

impl<'a> Iterator for InOrder<'a> {
    type Item = (RecordId, &'a FileRecord);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.next {
            self.stack.push(id);
            self.next = self.index.get(id).smaller;
        }
        let id = self.stack.pop()?;
        let record = self.index.get(id);
        self.next = record.larger;
        Some((id, record))
    }
}

/// Iterator returned by [`DuplicateIndex::same_chain`].
pub struct SameChain<'a> {
    index: &'a DuplicateIndex,
    next: Option<RecordId>,
}

impl<'a> Iterator for SameChain<'a> {
    type Item = (RecordId, &'a FileRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let record = self.index.get(id);
        self.next = record.same;
        Some((id, record))
    }
}

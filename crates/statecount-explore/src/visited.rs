//! Visited stores keyed by fingerprint.

use std::collections::{HashMap, HashSet};

use crate::fingerprint::Fingerprint;

/// Breadth-first store: a grow-only set of discovered fingerprints.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<Fingerprint>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent. Returns true when the fingerprint is new.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Outcome of offering a fingerprint to a [`DepthMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Never seen before.
    New,
    /// Seen, but with less remaining budget than now.
    Raised { previous: u32 },
    /// Already explored at least this deep.
    Known,
}

impl Visit {
    /// Whether the state's successors need (re-)expanding.
    pub fn is_informative(&self) -> bool {
        !matches!(self, Visit::Known)
    }
}

/// Iterative-deepening store: fingerprint -> highest remaining depth budget
/// the state was ever expanded with. Stored budgets only ever increase.
#[derive(Debug, Default)]
pub struct DepthMap {
    best: HashMap<Fingerprint, u32>,
}

impl DepthMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or raise the stored budget if `budget` beats it.
    pub fn record(&mut self, fingerprint: Fingerprint, budget: u32) -> Visit {
        match self.best.get_mut(&fingerprint) {
            None => {
                self.best.insert(fingerprint, budget);
                Visit::New
            }
            Some(stored) if *stored < budget => {
                let previous = *stored;
                *stored = budget;
                Visit::Raised { previous }
            }
            Some(_) => Visit::Known,
        }
    }

    pub fn budget_of(&self, fingerprint: &Fingerprint) -> Option<u32> {
        self.best.get(fingerprint).copied()
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }
}

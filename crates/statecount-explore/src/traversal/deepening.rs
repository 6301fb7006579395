use tracing::debug;

use super::Enumerator;
use crate::adapter::{Action, Simulator};
use crate::fingerprint::{Fingerprint, FingerprintScheme};
use crate::visited::DepthMap;

/// Iterative-deepening enumeration with re-expansion.
///
/// Every call runs a fresh depth-first pass from the root, using the
/// simulator as the only live cursor: snapshot before each action, step,
/// recurse, restore. The depth map remembers the largest remaining budget
/// each state was expanded with. Reaching a state again with more budget
/// than that re-expands it, since a depth-limited pass may first reach a
/// state along a long path with no budget left for its children.
pub struct IterativeDeepening<H> {
    root: H,
    visited: DepthMap,
    scheme: FingerprintScheme,
    expansions: u64,
}

impl<H> IterativeDeepening<H> {
    /// Remember the simulator's current state as the root of every pass.
    pub fn new<S>(sim: &mut S, scheme: FingerprintScheme) -> Result<Self, S::Error>
    where
        S: Simulator<Handle = H>,
    {
        Ok(Self {
            root: sim.snapshot()?,
            visited: DepthMap::new(),
            scheme,
            expansions: 0,
        })
    }

    /// Highest remaining budget a state has been expanded with, if seen.
    pub fn remaining_budget(&self, fingerprint: &Fingerprint) -> Option<u32> {
        self.visited.budget_of(fingerprint)
    }

    /// Number of (re-)expansions so far, over all passes.
    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    fn descend<S>(
        &mut self,
        sim: &mut S,
        actions: &[Action],
        limit: u32,
        cap: Option<usize>,
    ) -> Result<(), S::Error>
    where
        S: Simulator<Handle = H>,
    {
        let fingerprint = self.scheme.extract(sim)?;
        if !self.visited.record(fingerprint, limit).is_informative() {
            return Ok(());
        }
        if limit == 0 || sim.is_terminal()? {
            return Ok(());
        }

        self.expansions += 1;
        for &action in actions {
            if cap.is_some_and(|cap| self.visited.len() >= cap) {
                break;
            }
            let undo = sim.snapshot()?;
            let outcome = sim
                .step(action)
                .and_then(|()| self.descend(sim, actions, limit - 1, cap));
            // Undo on every path, so siblings start from the same state
            sim.restore(&undo)?;
            outcome?;
        }
        Ok(())
    }
}

impl<S: Simulator> Enumerator<S> for IterativeDeepening<S::Handle> {
    fn expand_to(
        &mut self,
        sim: &mut S,
        limit: u32,
        cap: Option<usize>,
    ) -> Result<usize, S::Error> {
        let actions = sim.action_set();

        sim.restore(&self.root)?;
        self.descend(sim, &actions, limit, cap)?;

        debug!(
            limit,
            states = self.visited.len(),
            expansions = self.expansions,
            "iterative deepening pass complete"
        );
        Ok(self.visited.len())
    }

    fn name(&self) -> &str {
        "id"
    }
}

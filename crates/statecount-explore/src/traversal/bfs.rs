use std::collections::VecDeque;

use tracing::debug;

use super::Enumerator;
use crate::adapter::{Action, Simulator};
use crate::fingerprint::FingerprintScheme;
use crate::visited::VisitedSet;

/// A not-yet-expanded state: where to resume, and how far from the root it is.
#[derive(Debug)]
pub struct FrontierEntry<H> {
    pub handle: H,
    pub depth: u32,
}

/// Breadth-first enumeration over simulator snapshots.
///
/// A state is first discovered along a shortest path, so nothing is ever
/// re-expanded. The frontier and visited set persist across calls: each
/// `expand_to` drains only the layers below its limit and leaves deeper
/// entries queued for the next, larger limit.
pub struct BreadthFirst<H> {
    frontier: VecDeque<FrontierEntry<H>>,
    visited: VisitedSet,
    scheme: FingerprintScheme,
    expansions: u64,
}

impl<H> BreadthFirst<H> {
    /// Seed the search with the simulator's current state as the root.
    pub fn new<S>(sim: &mut S, scheme: FingerprintScheme) -> Result<Self, S::Error>
    where
        S: Simulator<Handle = H>,
    {
        let mut visited = VisitedSet::new();
        visited.insert(scheme.extract(sim)?);

        let mut frontier = VecDeque::new();
        // A terminal root is counted but has no successors
        if !sim.is_terminal()? {
            frontier.push_back(FrontierEntry {
                handle: sim.snapshot()?,
                depth: 0,
            });
        }

        Ok(Self {
            frontier,
            visited,
            scheme,
            expansions: 0,
        })
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Number of states expanded so far, over all calls.
    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    fn expand<S>(
        &mut self,
        sim: &mut S,
        entry: &FrontierEntry<H>,
        actions: &[Action],
        cap: Option<usize>,
    ) -> Result<(), S::Error>
    where
        S: Simulator<Handle = H>,
    {
        for &action in actions {
            sim.restore(&entry.handle)?;
            sim.step(action)?;
            let fingerprint = self.scheme.extract(sim)?;
            if !self.visited.insert(fingerprint) {
                continue;
            }
            // Past the cap the state still counts, but nothing new is queued
            let capped = cap.is_some_and(|cap| self.visited.len() >= cap);
            if !capped && !sim.is_terminal()? {
                self.frontier.push_back(FrontierEntry {
                    handle: sim.snapshot()?,
                    depth: entry.depth + 1,
                });
            }
        }
        self.expansions += 1;
        Ok(())
    }
}

impl<S: Simulator> Enumerator<S> for BreadthFirst<S::Handle> {
    fn expand_to(
        &mut self,
        sim: &mut S,
        limit: u32,
        cap: Option<usize>,
    ) -> Result<usize, S::Error> {
        let actions = sim.action_set();

        while let Some(front) = self.frontier.front() {
            if front.depth >= limit {
                break;
            }
            let Some(entry) = self.frontier.pop_front() else {
                break;
            };
            self.expand(sim, &entry, &actions, cap)?;
        }

        debug!(
            limit,
            states = self.visited.len(),
            frontier = self.frontier.len(),
            expansions = self.expansions,
            "bfs layer complete"
        );
        Ok(self.visited.len())
    }

    fn name(&self) -> &str {
        "bfs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::GraphSimulator;

    /// 0 -> {1, 2}, 1 -> {3, 0}, 2 -> {3, 4}, 3 and 4 loop to themselves.
    fn diamond() -> GraphSimulator {
        let mut sim = GraphSimulator::new(5, 2);
        sim.edge(0, 0, 1).edge(0, 1, 2);
        sim.edge(1, 0, 3).edge(1, 1, 0);
        sim.edge(2, 0, 3).edge(2, 1, 4);
        sim
    }

    #[test]
    fn test_layers_count_states_within_depth() {
        let mut sim = diamond();
        let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();

        assert_eq!(bfs.expand_to(&mut sim, 0, None).unwrap(), 1);
        assert_eq!(bfs.expand_to(&mut sim, 1, None).unwrap(), 3);
        assert_eq!(bfs.expand_to(&mut sim, 2, None).unwrap(), 5);
        assert_eq!(bfs.expand_to(&mut sim, 3, None).unwrap(), 5);
    }

    #[test]
    fn test_frontier_survives_between_limits() {
        let mut sim = diamond();
        let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();

        bfs.expand_to(&mut sim, 1, None).unwrap();
        // Nodes 1 and 2 wait at depth 1 for the next call
        assert_eq!(bfs.frontier_len(), 2);
        assert_eq!(bfs.expansions(), 1);

        // Jumping straight to a larger limit gives the same answer as stepping
        let mut fresh_sim = diamond();
        let mut fresh = BreadthFirst::new(&mut fresh_sim, FingerprintScheme::default()).unwrap();
        assert_eq!(
            fresh.expand_to(&mut fresh_sim, 2, None).unwrap(),
            bfs.expand_to(&mut sim, 2, None).unwrap()
        );
    }

    #[test]
    fn test_each_state_expanded_once() {
        let mut sim = diamond();
        let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();
        bfs.expand_to(&mut sim, 10, None).unwrap();

        for node in 0..5 {
            assert!(sim.expansions_from(node) <= 2, "node {node} re-expanded");
        }
        assert_eq!(bfs.expansions(), 5);
    }

    #[test]
    fn test_terminal_root_is_a_leaf() {
        let mut sim = diamond();
        sim.mark_terminal(0);
        let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();

        assert_eq!(bfs.expand_to(&mut sim, 5, None).unwrap(), 1);
        assert_eq!(sim.expansions_from(0), 0);
    }

    fn fan_out() -> GraphSimulator {
        let mut sim = GraphSimulator::new(7, 3);
        sim.edge(0, 0, 1).edge(0, 1, 2).edge(0, 2, 3);
        sim.edge(1, 0, 4).edge(1, 1, 5).edge(1, 2, 6);
        sim
    }

    #[test]
    fn test_cap_stops_queueing_but_counts_whole_layer() {
        let mut sim = fan_out();
        let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();

        // Cap 2 is crossed by the root's first child; its siblings are
        // still counted, but none of them is queued.
        assert_eq!(bfs.expand_to(&mut sim, 1, Some(2)).unwrap(), 4);
        assert_eq!(bfs.frontier_len(), 0);
        assert_eq!(bfs.expand_to(&mut sim, 2, Some(2)).unwrap(), 4);
    }

    #[test]
    fn test_cap_crossed_mid_layer_drains_the_layer() {
        let mut sim = fan_out();
        let reference = sim.reachable_within(2);
        let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();

        bfs.expand_to(&mut sim, 1, Some(5)).unwrap();
        // Cap 5 is crossed while expanding node 1; nodes 2 and 3 are
        // still expanded, so the count is the full depth-2 count.
        assert_eq!(bfs.expand_to(&mut sim, 2, Some(5)).unwrap(), reference);
        assert_eq!(reference, 7);
        assert_eq!(sim.expansions_from(3), 3);
    }
}

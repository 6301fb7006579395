use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;

use crate::adapter::{Action, Simulator};

/// Saved position of a [`GraphSimulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphHandle {
    node: usize,
    steps: u64,
}

/// Synthetic simulator: a finite directed graph with one edge per action
/// out of every node. Unset edges are self-loops.
///
/// Each node's memory defaults to its index as 4 little-endian bytes and
/// its auxiliary value to 0, so every node is a distinct state unless
/// [`GraphSimulator::set_observation`] says otherwise. The serialized state
/// also carries a step counter, which plays the part of emulator
/// bookkeeping that has no effect on behavior.
#[derive(Debug, Clone)]
pub struct GraphSimulator {
    edges: Vec<Vec<usize>>,
    observations: HashMap<usize, (Vec<u8>, i32)>,
    terminal: HashSet<usize>,
    start: usize,
    current: usize,
    steps: u64,
    /// Steps taken out of each node, across the simulator's lifetime.
    stepped_from: HashMap<usize, u64>,
}

impl GraphSimulator {
    /// `nodes` nodes, `actions` actions, every edge a self-loop, starting at node 0.
    pub fn new(nodes: usize, actions: usize) -> Self {
        Self {
            edges: (0..nodes).map(|n| vec![n; actions]).collect(),
            observations: HashMap::new(),
            terminal: HashSet::new(),
            start: 0,
            current: 0,
            steps: 0,
            stepped_from: HashMap::new(),
        }
    }

    /// Build from a transition table: `table[node][action]` is the successor.
    pub fn from_table(table: Vec<Vec<usize>>) -> Self {
        let actions = table.first().map_or(0, Vec::len);
        let mut sim = Self::new(table.len(), actions);
        sim.edges = table;
        sim
    }

    /// Route `action` out of `from` to `to`.
    pub fn edge(&mut self, from: usize, action: usize, to: usize) -> &mut Self {
        self.edges[from][action] = to;
        self
    }

    pub fn mark_terminal(&mut self, node: usize) -> &mut Self {
        self.terminal.insert(node);
        self
    }

    /// Override what a node looks like to the fingerprint extractor.
    pub fn set_observation(&mut self, node: usize, memory: Vec<u8>, aux: i32) -> &mut Self {
        self.observations.insert(node, (memory, aux));
        self
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// How many times `step` was called while at `node`.
    pub fn expansions_from(&self, node: usize) -> u64 {
        self.stepped_from.get(&node).copied().unwrap_or(0)
    }

    /// Reference count of nodes within `depth` steps of the start, never
    /// leaving a terminal node. Matches a fingerprint count only while no
    /// observations collide.
    pub fn reachable_within(&self, depth: u32) -> usize {
        let mut distance = HashMap::from([(self.start, 0u32)]);
        let mut queue = VecDeque::from([self.start]);
        while let Some(node) = queue.pop_front() {
            let d = distance[&node];
            if d == depth || self.terminal.contains(&node) {
                continue;
            }
            for &next in &self.edges[node] {
                if !distance.contains_key(&next) {
                    distance.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }
        distance.len()
    }

    fn observe(&self) -> (Vec<u8>, i32) {
        match self.observations.get(&self.current) {
            Some((memory, aux)) => (memory.clone(), *aux),
            None => ((self.current as u32).to_le_bytes().to_vec(), 0),
        }
    }
}

impl Simulator for GraphSimulator {
    type Handle = GraphHandle;
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Infallible> {
        self.current = self.start;
        self.steps = 0;
        Ok(())
    }

    fn action_set(&self) -> Vec<Action> {
        let count = self.edges.first().map_or(0, Vec::len);
        (0..count as i32).map(Action).collect()
    }

    fn step(&mut self, action: Action) -> Result<(), Infallible> {
        *self.stepped_from.entry(self.current).or_insert(0) += 1;
        // Unknown actions leave the state alone, like an unmapped input
        if let Some(&next) = usize::try_from(action.0)
            .ok()
            .and_then(|a| self.edges[self.current].get(a))
        {
            self.current = next;
        }
        self.steps += 1;
        Ok(())
    }

    fn is_terminal(&mut self) -> Result<bool, Infallible> {
        Ok(self.terminal.contains(&self.current))
    }

    fn snapshot(&mut self) -> Result<GraphHandle, Infallible> {
        Ok(GraphHandle {
            node: self.current,
            steps: self.steps,
        })
    }

    fn restore(&mut self, handle: &GraphHandle) -> Result<(), Infallible> {
        self.current = handle.node;
        self.steps = handle.steps;
        Ok(())
    }

    fn raw_memory(&mut self) -> Result<Vec<u8>, Infallible> {
        Ok(self.observe().0)
    }

    fn auxiliary_state(&mut self) -> Result<i32, Infallible> {
        Ok(self.observe().1)
    }

    fn serialized_state(&mut self) -> Result<Vec<u8>, Infallible> {
        let (mut bytes, aux) = self.observe();
        bytes.extend_from_slice(&aux.to_le_bytes());
        bytes.extend_from_slice(&self.steps.to_le_bytes());
        Ok(bytes)
    }
}

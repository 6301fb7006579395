pub mod bfs;
pub mod deepening;
pub mod runner;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adapter::Simulator;

/// A depth-layered enumeration of distinct states.
///
/// Implementations keep their visited store between calls, so calling
/// `expand_to` with increasing limits resumes rather than restarts.
pub trait Enumerator<S: Simulator> {
    /// Explore up to `limit` steps from the root and return the number of
    /// distinct states known afterwards. With `cap`, work for deeper
    /// layers stops once that many states are known: breadth-first search
    /// still drains the layer but queues nothing further, iterative
    /// deepening starts no new descent.
    fn expand_to(&mut self, sim: &mut S, limit: u32, cap: Option<usize>)
        -> Result<usize, S::Error>;

    /// Name of this enumeration (for logging).
    fn name(&self) -> &str;
}

/// Which traversal to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    #[default]
    Bfs,
    IterativeDeepening,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid search type: {0}")]
pub struct UnknownSearchKind(pub String);

impl FromStr for SearchKind {
    type Err = UnknownSearchKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfs" => Ok(SearchKind::Bfs),
            "id" => Ok(SearchKind::IterativeDeepening),
            other => Err(UnknownSearchKind(other.to_string())),
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKind::Bfs => f.write_str("bfs"),
            SearchKind::IterativeDeepening => f.write_str("id"),
        }
    }
}

//! Termination policy for layered enumeration.
//!
//! Runs an [`Enumerator`] layer by layer, either to a fixed depth or until a
//! state budget is crossed, and hands every completed layer to a report sink.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapter::Simulator;
use crate::report::{LayerReport, ReportSink};
use crate::traversal::Enumerator;

/// When to stop adding depth layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Report every depth from 0 through the given one.
    FixedDepth(u32),
    /// Keep deepening until this many distinct states are known. The layer
    /// that crosses the budget is reported in full.
    StateBudget(usize),
}

impl Default for StopPolicy {
    fn default() -> Self {
        StopPolicy::FixedDepth(10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyParseError {
    #[error("Invalid depth '{0}': expected a non-negative integer or budget=<states>")]
    Depth(String),
    #[error("Invalid state budget '{0}': expected a positive integer")]
    Budget(String),
}

impl FromStr for StopPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(budget) = s.strip_prefix("budget=") {
            return match budget.parse::<usize>() {
                Ok(cap) if cap > 0 => Ok(StopPolicy::StateBudget(cap)),
                _ => Err(PolicyParseError::Budget(budget.to_string())),
            };
        }
        s.parse::<u32>()
            .map(StopPolicy::FixedDepth)
            .map_err(|_| PolicyParseError::Depth(s.to_string()))
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPolicy::FixedDepth(depth) => write!(f, "{depth}"),
            StopPolicy::StateBudget(cap) => write!(f, "budget={cap}"),
        }
    }
}

/// Reason the layer loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The fixed depth was reported.
    DepthReached,
    /// The state budget was met or crossed.
    BudgetReached,
    /// A layer added nothing new, so no deeper layer can either.
    Exhausted,
}

/// Where a layered run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    /// Last depth reported.
    pub depth: u32,
    pub states: usize,
    pub reason: StopReason,
}

/// Error from a layered run.
#[derive(Debug, thiserror::Error)]
pub enum SearchError<E: std::error::Error + 'static> {
    #[error("Simulator fault: {0}")]
    Simulator(#[source] E),
    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

/// Drive `enumerator` layer by layer under `policy`, reporting each layer.
///
/// Every layer is explored uncapped; the budget is checked between layers,
/// so each reported count is exactly the states within that depth.
pub fn run_layers<S, E, R>(
    enumerator: &mut E,
    sim: &mut S,
    policy: StopPolicy,
    sink: &mut R,
) -> Result<LayerSummary, SearchError<S::Error>>
where
    S: Simulator,
    E: Enumerator<S> + ?Sized,
    R: ReportSink + ?Sized,
{
    let mut previous: Option<usize> = None;
    let mut depth = 0u32;

    loop {
        let started = Instant::now();
        let states = enumerator
            .expand_to(sim, depth, None)
            .map_err(SearchError::Simulator)?;
        sink.record(&LayerReport { depth, states })?;
        info!(
            search = enumerator.name(),
            depth,
            states,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "layer complete"
        );

        let reason = match policy {
            StopPolicy::FixedDepth(max) if depth >= max => Some(StopReason::DepthReached),
            StopPolicy::FixedDepth(_) => None,
            StopPolicy::StateBudget(cap) if states >= cap => Some(StopReason::BudgetReached),
            StopPolicy::StateBudget(_) if previous == Some(states) => Some(StopReason::Exhausted),
            StopPolicy::StateBudget(_) => None,
        };
        if let Some(reason) = reason {
            return Ok(LayerSummary {
                depth,
                states,
                reason,
            });
        }

        previous = Some(states);
        depth += 1;
    }
}

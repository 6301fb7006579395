use serde::{Deserialize, Serialize};
use tracing::info;

use super::bfs::BreadthFirst;
use super::deepening::IterativeDeepening;
use super::SearchKind;
use crate::adapter::Simulator;
use crate::fingerprint::FingerprintScheme;
use crate::limits::{run_layers, LayerSummary, SearchError, StopPolicy};
use crate::report::ReportSink;

/// What to count and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub kind: SearchKind,
    pub policy: StopPolicy,
    pub scheme: FingerprintScheme,
}

/// Count distinct states from the simulator's current state, which becomes
/// the root, and report every completed layer to `sink`.
pub fn run_search<S, R>(
    sim: &mut S,
    config: &SearchConfig,
    sink: &mut R,
) -> Result<LayerSummary, SearchError<S::Error>>
where
    S: Simulator,
    R: ReportSink + ?Sized,
{
    info!(
        search = %config.kind,
        policy = %config.policy,
        fingerprint = %config.scheme,
        actions = sim.action_set().len(),
        "starting enumeration"
    );

    let summary = match config.kind {
        SearchKind::Bfs => {
            let mut bfs = BreadthFirst::new(sim, config.scheme).map_err(SearchError::Simulator)?;
            run_layers(&mut bfs, sim, config.policy, sink)?
        }
        SearchKind::IterativeDeepening => {
            let mut id =
                IterativeDeepening::new(sim, config.scheme).map_err(SearchError::Simulator)?;
            run_layers(&mut id, sim, config.policy, sink)?
        }
    };
    info!(
        depth = summary.depth,
        states = summary.states,
        reason = ?summary.reason,
        "enumeration finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::GraphSimulator;
    use crate::report::LayerReport;

    #[test]
    fn test_both_kinds_report_the_same_table() {
        let build = || {
            let mut sim = GraphSimulator::new(6, 2);
            sim.edge(0, 0, 1).edge(0, 1, 2).edge(1, 0, 3);
            sim.edge(2, 1, 3).edge(3, 0, 4).edge(4, 1, 5);
            sim
        };

        let mut tables = Vec::new();
        for kind in [SearchKind::Bfs, SearchKind::IterativeDeepening] {
            let mut sim = build();
            let config = SearchConfig {
                kind,
                policy: StopPolicy::FixedDepth(5),
                ..Default::default()
            };
            let mut layers: Vec<LayerReport> = Vec::new();
            run_search(&mut sim, &config, &mut layers).unwrap();
            tables.push(layers);
        }

        let counts: Vec<usize> = tables[0].iter().map(|l| l.states).collect();
        assert_eq!(counts, vec![1, 3, 4, 5, 6, 6]);
        assert_eq!(tables[0], tables[1]);
    }

    #[test]
    fn test_config_from_json() {
        let config: SearchConfig = serde_json::from_str(
            r#"{"kind":"iterative_deepening","policy":{"state_budget":500}}"#,
        )
        .unwrap();
        assert_eq!(config.kind, SearchKind::IterativeDeepening);
        assert_eq!(config.policy, StopPolicy::StateBudget(500));
        assert_eq!(config.scheme, FingerprintScheme::MemoryAndAux);
    }
}

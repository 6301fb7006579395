//! Exhaustive enumeration of the distinct states a deterministic simulator
//! can reach within a bounded number of steps.
//!
//! The simulator is driven through [`Simulator`] as a single cursor with
//! snapshot/restore. States are deduplicated by [`Fingerprint`], and counted
//! layer by layer with breadth-first search or iterative deepening.

pub mod adapter;
pub mod fingerprint;
pub mod limits;
pub mod mock;
pub mod report;
pub mod traversal;
pub mod verify;
pub mod visited;

pub use adapter::{prepare_root, Action, Simulator};
pub use fingerprint::{Fingerprint, FingerprintScheme};
pub use limits::{run_layers, LayerSummary, SearchError, StopPolicy, StopReason};
pub use report::{CsvSink, JsonLinesSink, LayerReport, ReportSink};
pub use traversal::runner::{run_search, SearchConfig};
pub use traversal::{Enumerator, SearchKind};

//! Reporting sinks for per-layer state counts.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Distinct states known once every depth up to `depth` has been explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerReport {
    pub depth: u32,
    pub states: usize,
}

/// Consumer of completed layers. Never feeds back into the search.
pub trait ReportSink {
    fn record(&mut self, layer: &LayerReport) -> io::Result<()>;
}

/// `depth,states` table, one line per layer, flushed as it goes so long
/// runs show progress.
pub struct CsvSink<W: Write> {
    out: W,
}

impl<W: Write> CsvSink<W> {
    /// Write the header line immediately.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "depth,states")?;
        out.flush()?;
        Ok(Self { out })
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn record(&mut self, layer: &LayerReport) -> io::Result<()> {
        writeln!(self.out, "{},{}", layer.depth, layer.states)?;
        self.out.flush()
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn record(&mut self, layer: &LayerReport) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, layer)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl ReportSink for Vec<LayerReport> {
    fn record(&mut self, layer: &LayerReport) -> io::Result<()> {
        self.push(*layer);
        Ok(())
    }
}

/// Exponent `x` of the naive bound `actions^depth ≈ 10^x` on the number of
/// action sequences of length `depth`.
pub fn sequence_bound_exponent(actions: usize, depth: u32) -> f64 {
    if actions == 0 {
        return 0.0;
    }
    f64::from(depth) * (actions as f64).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_table() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.record(&LayerReport { depth: 0, states: 1 }).unwrap();
        sink.record(&LayerReport { depth: 1, states: 4 }).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "depth,states\n0,1\n1,4\n");
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&LayerReport { depth: 2, states: 9 }).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "{\"depth\":2,\"states\":9}\n");
        let parsed: LayerReport = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed, LayerReport { depth: 2, states: 9 });
    }

    #[test]
    fn test_sequence_bound() {
        assert_eq!(sequence_bound_exponent(10, 3), 3.0);
        assert_eq!(sequence_bound_exponent(0, 3), 0.0);
        assert_eq!(sequence_bound_exponent(18, 0), 0.0);
    }
}

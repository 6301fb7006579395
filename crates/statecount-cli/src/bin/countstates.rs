//! Count distinct reachable states of a program, one line per depth.

use std::io;

use statecount_cli::{boot_program, init_logging, load_config, parse_or_exit, CountArgs};
use statecount_explore::report::sequence_bound_exponent;
use statecount_explore::{
    run_search, CsvSink, JsonLinesSink, ReportSink, SearchConfig, Simulator, StopPolicy,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args: CountArgs = parse_or_exit();
    init_logging(args.verbose)?;

    let config = load_config(args.config.as_deref())?;
    let mut sim = boot_program(&args.program, &config)?;

    let actions = sim.action_set().len();
    info!("Number of legal actions: {actions}");
    if let StopPolicy::FixedDepth(depth) = args.limit {
        info!(
            "Upper bound on action sequences: {actions}^{depth} ≈ 10^{:.1}",
            sequence_bound_exponent(actions, depth)
        );
    }

    let search = SearchConfig {
        kind: args.search,
        policy: args.limit,
        scheme: args.fingerprint,
    };
    let stdout = io::stdout().lock();
    let mut sink: Box<dyn ReportSink> = if args.json {
        Box::new(JsonLinesSink::new(stdout))
    } else {
        Box::new(CsvSink::new(stdout)?)
    };

    run_search(&mut sim, &search, sink.as_mut())?;
    Ok(())
}

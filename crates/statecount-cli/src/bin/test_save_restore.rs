//! Replay a pseudo-random action sequence against a program and check that
//! save/restore reproduces every state it passes through.

use statecount_cli::{
    boot_program, init_logging, load_config, parse_or_exit, VerifyArgs, EXIT_INCONSISTENT,
};
use statecount_explore::verify::{check_replay, check_round_trip, random_actions};
use statecount_explore::{FingerprintScheme, Simulator};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let args: VerifyArgs = parse_or_exit();
    init_logging(args.verbose)?;

    let config = load_config(args.config.as_deref())?;
    let mut sim = boot_program(&args.program, &config)?;

    let actions = random_actions(&sim.action_set(), args.num_actions, args.seed);
    info!(
        "Checking {} actions: {:?}",
        actions.len(),
        actions.iter().map(|a| a.0).collect::<Vec<_>>()
    );

    let scheme = FingerprintScheme::default();
    let outcome = check_replay(&mut sim, &actions, scheme)
        .and_then(|_| check_round_trip(&mut sim, &actions, scheme));
    match outcome {
        Ok(()) => {
            println!("No inconsistencies found!");
            Ok(())
        }
        Err(e) if e.is_inconsistency() => {
            error!("{e}");
            std::process::exit(EXIT_INCONSISTENT);
        }
        Err(e) => Err(e.into()),
    }
}

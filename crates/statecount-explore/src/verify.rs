//! Save/restore consistency checks.
//!
//! Both checks rely only on the adapter contract: replaying the same actions
//! from the same snapshot must land on the same fingerprint, and restoring a
//! snapshot must reproduce the fingerprint observed when it was taken.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::adapter::{Action, Simulator};
use crate::fingerprint::{Fingerprint, FingerprintScheme};

/// Seed for the verification tool's action sequence.
pub const DEFAULT_SEED: u64 = 22;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError<E: std::error::Error + 'static> {
    #[error("Simulator fault: {0}")]
    Simulator(#[source] E),

    #[error(
        "Replay diverged\nexpected: {expected}\nactual:   {actual}\ndiffering offsets: {:?}",
        .expected.diff(.actual)
    )]
    Replay {
        expected: Fingerprint,
        actual: Fingerprint,
    },

    #[error(
        "Restore of snapshot {index} diverged\nexpected: {expected}\nactual:   {actual}\ndiffering offsets: {:?}",
        .expected.diff(.actual)
    )]
    RoundTrip {
        index: usize,
        expected: Fingerprint,
        actual: Fingerprint,
    },
}

impl<E: std::error::Error + 'static> VerifyError<E> {
    /// Whether the simulator broke its save/restore guarantee, as opposed
    /// to failing outright.
    pub fn is_inconsistency(&self) -> bool {
        !matches!(self, VerifyError::Simulator(_))
    }
}

/// `count` actions drawn uniformly from `actions` with a seeded ChaCha8 stream.
pub fn random_actions(actions: &[Action], count: usize, seed: u64) -> Vec<Action> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .filter_map(|_| actions.choose(&mut rng).copied())
        .collect()
}

/// Apply `actions` from the current state twice, restoring in between, and
/// require both runs to end on the same fingerprint. Leaves the simulator
/// at the state it started in.
pub fn check_replay<S: Simulator>(
    sim: &mut S,
    actions: &[Action],
    scheme: FingerprintScheme,
) -> Result<Fingerprint, VerifyError<S::Error>> {
    let root = sim.snapshot().map_err(VerifyError::Simulator)?;

    let play = |sim: &mut S| -> Result<Fingerprint, S::Error> {
        sim.restore(&root)?;
        for &action in actions {
            sim.step(action)?;
        }
        scheme.extract(sim)
    };
    let expected = play(sim).map_err(VerifyError::Simulator)?;
    let actual = play(sim).map_err(VerifyError::Simulator)?;
    sim.restore(&root).map_err(VerifyError::Simulator)?;

    debug!(steps = actions.len(), fingerprint = %expected, "replay check");
    if expected != actual {
        return Err(VerifyError::Replay { expected, actual });
    }
    Ok(expected)
}

/// Snapshot before each action, then restore every snapshot in turn and
/// require the fingerprint recorded when it was taken.
pub fn check_round_trip<S: Simulator>(
    sim: &mut S,
    actions: &[Action],
    scheme: FingerprintScheme,
) -> Result<(), VerifyError<S::Error>> {
    let mut checkpoints = Vec::with_capacity(actions.len());
    for &action in actions {
        let handle = sim.snapshot().map_err(VerifyError::Simulator)?;
        let fingerprint = scheme.extract(sim).map_err(VerifyError::Simulator)?;
        checkpoints.push((handle, fingerprint));
        sim.step(action).map_err(VerifyError::Simulator)?;
    }

    for (index, (handle, expected)) in checkpoints.into_iter().enumerate() {
        sim.restore(&handle).map_err(VerifyError::Simulator)?;
        let actual = scheme.extract(sim).map_err(VerifyError::Simulator)?;
        if actual != expected {
            return Err(VerifyError::RoundTrip {
                index,
                expected,
                actual,
            });
        }
    }
    debug!(snapshots = actions.len(), "round-trip check");
    Ok(())
}

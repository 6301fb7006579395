use std::fmt;

use serde::{Deserialize, Serialize};
use statecount_sandbox::{ProgramInstance, SandboxError, StateHandle};

/// An input the simulator accepts for one step, in the simulator's own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action(pub i32);

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait abstracting the deterministic simulator the search drives.
///
/// The search owns the one instance there is and uses it as a cursor:
/// `step` moves it forward, `snapshot`/`restore` move it anywhere it has
/// already been. A synthetic graph ([`crate::mock::GraphSimulator`]) and a
/// sandboxed WASM program both implement it.
pub trait Simulator {
    /// Opaque token for a resumable point in simulated time.
    type Handle;
    /// Adapter fault. Fatal to the run; the search never recovers from one.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Return to the canonical initial state.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// The minimal action set, in a stable order.
    fn action_set(&self) -> Vec<Action>;

    /// Advance one unit of simulated time with `action` applied.
    fn step(&mut self, action: Action) -> Result<(), Self::Error>;

    fn is_terminal(&mut self) -> Result<bool, Self::Error>;

    fn snapshot(&mut self) -> Result<Self::Handle, Self::Error>;

    /// Make every observable identical to what it was when `handle` was taken.
    fn restore(&mut self, handle: &Self::Handle) -> Result<(), Self::Error>;

    /// The full working memory, fixed size for a given simulator.
    fn raw_memory(&mut self) -> Result<Vec<u8>, Self::Error>;

    /// Persistent state that memory does not reflect (e.g. a paddle position).
    fn auxiliary_state(&mut self) -> Result<i32, Self::Error>;

    /// Everything the simulator would save, bookkeeping included.
    fn serialized_state(&mut self) -> Result<Vec<u8>, Self::Error>;

    /// Action to apply once after reset when the reset state is degenerate.
    fn warmup_action(&mut self) -> Result<Option<Action>, Self::Error> {
        Ok(None)
    }
}

/// Reset the simulator and apply its warm-up action, if it declares one.
/// The state this leaves behind is the search root.
pub fn prepare_root<S: Simulator>(sim: &mut S) -> Result<Option<Action>, S::Error> {
    sim.reset()?;
    let warmup = sim.warmup_action()?;
    if let Some(action) = warmup {
        sim.step(action)?;
    }
    Ok(warmup)
}

impl Simulator for ProgramInstance {
    type Handle = StateHandle;
    type Error = SandboxError;

    fn reset(&mut self) -> Result<(), SandboxError> {
        ProgramInstance::reset(self)
    }

    fn action_set(&self) -> Vec<Action> {
        self.actions().iter().copied().map(Action).collect()
    }

    fn step(&mut self, action: Action) -> Result<(), SandboxError> {
        ProgramInstance::step(self, action.0)
    }

    fn is_terminal(&mut self) -> Result<bool, SandboxError> {
        ProgramInstance::is_terminal(self)
    }

    fn snapshot(&mut self) -> Result<StateHandle, SandboxError> {
        ProgramInstance::snapshot(self)
    }

    fn restore(&mut self, handle: &StateHandle) -> Result<(), SandboxError> {
        ProgramInstance::restore(self, handle)
    }

    fn raw_memory(&mut self) -> Result<Vec<u8>, SandboxError> {
        Ok(self.ram())
    }

    fn auxiliary_state(&mut self) -> Result<i32, SandboxError> {
        self.aux_state()
    }

    fn serialized_state(&mut self) -> Result<Vec<u8>, SandboxError> {
        Ok(ProgramInstance::snapshot(self)?.to_bytes())
    }

    fn warmup_action(&mut self) -> Result<Option<Action>, SandboxError> {
        Ok(ProgramInstance::warmup_action(self)?.map(Action))
    }
}

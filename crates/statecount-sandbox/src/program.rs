//! Simulator programs: a WASM module playing the role of a console cartridge.
//!
//! Required exports: `memory`, `step(i32)`, `action_count() -> i32`,
//! `action_at(i32) -> i32`. Optional: `is_terminal() -> i32`,
//! `aux_state() -> i32`, `reset()`, `warmup_action() -> i32`.
//!
//! All program state must live in linear memory or in exported mutable
//! globals; nothing else survives a restore.

use std::path::Path;

use tracing::debug;
use wasmtime::{Memory, TypedFunc};

use crate::config::SandboxConfig;
use crate::sandbox::{LoadedModule, Sandbox, SandboxError, SandboxInstance, WasmVal};
use crate::snapshot::StateHandle;

const REQUIRED_FUNCS: [&str; 3] = ["step", "action_count", "action_at"];

/// A validated, compiled program that can be booted into instances.
pub struct Program {
    sandbox: Sandbox,
    module: LoadedModule,
}

impl Program {
    /// Load a program from a `.wasm` or `.wat` file.
    pub fn from_file(config: &SandboxConfig, path: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SandboxError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(config, &bytes)
    }

    /// Load a program from module bytes and check its export contract.
    pub fn from_bytes(config: &SandboxConfig, wasm_bytes: &[u8]) -> Result<Self, SandboxError> {
        if config.frame_skip == 0 {
            return Err(SandboxError::InvalidProgram {
                details: "frame_skip must be at least 1".to_string(),
            });
        }

        let sandbox = Sandbox::new(config)?;
        let module = sandbox.load_module(wasm_bytes)?;

        let exports = sandbox.list_exports(&module);
        let kind_of = |name: &str| {
            exports
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, kind)| kind.as_str())
        };
        if kind_of("memory") != Some("memory") {
            return Err(SandboxError::ExportNotFound {
                name: "memory".to_string(),
            });
        }
        for name in REQUIRED_FUNCS {
            match kind_of(name) {
                Some("func") => {}
                Some(_) => {
                    return Err(SandboxError::ExportNotFunction {
                        name: name.to_string(),
                    })
                }
                None => {
                    return Err(SandboxError::ExportNotFound {
                        name: name.to_string(),
                    })
                }
            }
        }

        Ok(Self { sandbox, module })
    }

    /// Instantiate the program and read its action set.
    pub fn boot(&self) -> Result<ProgramInstance, SandboxError> {
        let config = self.sandbox.config();
        let mut instance = self.sandbox.instantiate(&self.module)?;

        let memory = instance
            .instance
            .get_memory(&mut instance.store, "memory")
            .ok_or_else(|| SandboxError::ExportNotFound {
                name: "memory".to_string(),
            })?;
        let ram_end = (config.ram_base as usize)
            .checked_add(config.ram_size)
            .ok_or_else(|| SandboxError::InvalidProgram {
                details: format!(
                    "RAM window {}+{} overflows the address space",
                    config.ram_base, config.ram_size
                ),
            })?;
        if ram_end > memory.data_size(&instance.store) {
            return Err(SandboxError::InvalidProgram {
                details: format!(
                    "RAM window {}..{} exceeds linear memory of {} bytes",
                    config.ram_base,
                    ram_end,
                    memory.data_size(&instance.store)
                ),
            });
        }

        let step = instance
            .instance
            .get_typed_func::<i32, ()>(&mut instance.store, "step")
            .map_err(|e| SandboxError::TypeMismatch {
                details: format!("step must be (i32) -> (): {e}"),
            })?;
        let is_terminal = optional_query(&mut instance, "is_terminal")?;
        let aux_state = optional_query(&mut instance, "aux_state")?;
        let has_reset = instance.has_func("reset");

        let actions = read_action_set(&mut instance)?;
        debug!(actions = actions.len(), "program booted");

        let power_on = instance.snapshot()?;

        Ok(ProgramInstance {
            instance,
            memory,
            step,
            is_terminal,
            aux_state,
            has_reset,
            actions,
            power_on,
            frame_skip: config.frame_skip,
            ram_base: config.ram_base as usize,
            ram_size: config.ram_size,
        })
    }
}

fn optional_query(
    instance: &mut SandboxInstance,
    name: &str,
) -> Result<Option<TypedFunc<(), i32>>, SandboxError> {
    if !instance.has_func(name) {
        return Ok(None);
    }
    instance
        .instance
        .get_typed_func::<(), i32>(&mut instance.store, name)
        .map(Some)
        .map_err(|e| SandboxError::TypeMismatch {
            details: format!("{name} must be () -> i32: {e}"),
        })
}

fn read_action_set(instance: &mut SandboxInstance) -> Result<Vec<i32>, SandboxError> {
    let count = first_i32(instance.call_func("action_count", &[])?, "action_count")?;
    if count <= 0 {
        return Err(SandboxError::InvalidProgram {
            details: format!("action_count returned {count}, need at least one action"),
        });
    }
    let mut actions = Vec::with_capacity(count as usize);
    for i in 0..count {
        let action = first_i32(instance.call_func("action_at", &[i.into()])?, "action_at")?;
        actions.push(action);
    }
    Ok(actions)
}

fn first_i32(results: Vec<WasmVal>, name: &str) -> Result<i32, SandboxError> {
    results
        .first()
        .and_then(WasmVal::i32)
        .ok_or_else(|| SandboxError::TypeMismatch {
            details: format!("{name} must return a single i32"),
        })
}

/// A running program: the single mutable cursor the search drives.
pub struct ProgramInstance {
    instance: SandboxInstance,
    memory: Memory,
    step: TypedFunc<i32, ()>,
    is_terminal: Option<TypedFunc<(), i32>>,
    aux_state: Option<TypedFunc<(), i32>>,
    has_reset: bool,
    actions: Vec<i32>,
    power_on: StateHandle,
    frame_skip: u32,
    ram_base: usize,
    ram_size: usize,
}

impl ProgramInstance {
    /// The program's minimal action set, in the order it reported.
    pub fn actions(&self) -> &[i32] {
        &self.actions
    }

    /// Return to the post-instantiation image, then run the program's own
    /// `reset` export if it has one.
    pub fn reset(&mut self) -> Result<(), SandboxError> {
        let power_on = self.power_on.clone();
        self.instance.restore(&power_on)?;
        if self.has_reset {
            self.instance.call_func("reset", &[])?;
        }
        Ok(())
    }

    /// Advance `frame_skip` frames with the given action held.
    pub fn step(&mut self, action: i32) -> Result<(), SandboxError> {
        for _ in 0..self.frame_skip {
            self.instance.refuel()?;
            self.step
                .call(&mut self.instance.store, action)
                .map_err(SandboxError::from_call)?;
        }
        Ok(())
    }

    pub fn is_terminal(&mut self) -> Result<bool, SandboxError> {
        match self.is_terminal.clone() {
            Some(func) => Ok(self.query(&func)? != 0),
            None => Ok(false),
        }
    }

    /// Persistent state the program keeps outside its RAM window.
    pub fn aux_state(&mut self) -> Result<i32, SandboxError> {
        match self.aux_state.clone() {
            Some(func) => self.query(&func),
            None => Ok(0),
        }
    }

    /// Copy of the working RAM window.
    pub fn ram(&self) -> Vec<u8> {
        let data = self.memory.data(&self.instance.store);
        data[self.ram_base..self.ram_base + self.ram_size].to_vec()
    }

    /// The action the program asks to be applied once after power-on, if any.
    pub fn warmup_action(&mut self) -> Result<Option<i32>, SandboxError> {
        if !self.instance.has_func("warmup_action") {
            return Ok(None);
        }
        let results = self.instance.call_func("warmup_action", &[])?;
        first_i32(results, "warmup_action").map(Some)
    }

    pub fn snapshot(&mut self) -> Result<StateHandle, SandboxError> {
        self.instance.snapshot()
    }

    pub fn restore(&mut self, handle: &StateHandle) -> Result<(), SandboxError> {
        self.instance.restore(handle)
    }

    fn query(&mut self, func: &TypedFunc<(), i32>) -> Result<i32, SandboxError> {
        self.instance.refuel()?;
        func.call(&mut self.instance.store, ())
            .map_err(SandboxError::from_call)
    }
}

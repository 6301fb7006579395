use wasmtime::{Mutability, Val};

use crate::sandbox::{SandboxError, SandboxInstance};

/// A captured point in simulated time: linear memory, exported mutable
/// globals and remaining fuel. Restoring it is a memcpy, not a replay.
///
/// Handles are opaque to the traversal core. They are never compared or
/// hashed, only restored from.
#[derive(Debug, Clone)]
pub struct StateHandle {
    /// Serialized WASM memory contents.
    wasm_memory: Option<Vec<u8>>,
    /// Serialized WASM global values.
    wasm_globals: Vec<GlobalSnapshot>,
    /// Fuel remaining at snapshot time.
    fuel_remaining: Option<u64>,
}

#[derive(Debug, Clone)]
struct GlobalSnapshot {
    name: String,
    value: SerializedVal,
}

#[derive(Debug, Clone, Copy)]
enum SerializedVal {
    I32(i32),
    I64(i64),
    F32(u32),
    F64(u64),
}

impl SerializedVal {
    fn append_to(&self, out: &mut Vec<u8>) {
        match *self {
            SerializedVal::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            SerializedVal::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            SerializedVal::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            SerializedVal::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

impl SandboxInstance {
    /// Take a snapshot of this instance's WASM state.
    pub fn snapshot(&mut self) -> Result<StateHandle, SandboxError> {
        let wasm_memory = self.capture_memory();
        let wasm_globals = self.capture_globals();
        let fuel_remaining = self.store.get_fuel().ok();

        Ok(StateHandle {
            wasm_memory,
            wasm_globals,
            fuel_remaining,
        })
    }

    /// Restore this instance to a previously captured snapshot.
    pub fn restore(&mut self, snapshot: &StateHandle) -> Result<(), SandboxError> {
        if let Some(ref memory_data) = snapshot.wasm_memory {
            self.restore_memory(memory_data)?;
        }

        self.restore_globals(&snapshot.wasm_globals)?;

        if let Some(fuel) = snapshot.fuel_remaining {
            self.store.set_fuel(fuel)?;
        }

        Ok(())
    }

    fn capture_memory(&mut self) -> Option<Vec<u8>> {
        self.instance
            .get_memory(&mut self.store, "memory")
            .map(|memory| memory.data(&self.store).to_vec())
    }

    fn capture_globals(&mut self) -> Vec<GlobalSnapshot> {
        let export_names: Vec<String> = self
            .instance
            .exports(&mut self.store)
            .map(|e| e.name().to_string())
            .collect();

        let mut globals = Vec::new();
        for name in export_names {
            let Some(global) = self.instance.get_global(&mut self.store, &name) else {
                continue;
            };
            // Constants cannot diverge between snapshot and restore
            if !matches!(global.ty(&self.store).mutability(), Mutability::Var) {
                continue;
            }
            let value = match global.get(&mut self.store) {
                Val::I32(v) => SerializedVal::I32(v),
                Val::I64(v) => SerializedVal::I64(v),
                Val::F32(v) => SerializedVal::F32(v),
                Val::F64(v) => SerializedVal::F64(v),
                _ => continue,
            };
            globals.push(GlobalSnapshot { name, value });
        }
        globals
    }

    fn restore_memory(&mut self, data: &[u8]) -> Result<(), SandboxError> {
        let Some(memory) = self.instance.get_memory(&mut self.store, "memory") else {
            return Ok(());
        };

        let current_size = memory.data_size(&self.store);
        if data.len() > current_size {
            let pages_needed = (data.len() - current_size).div_ceil(65536);
            memory.grow(&mut self.store, pages_needed as u64)?;
        }

        let mem_data = memory.data_mut(&mut self.store);
        let copy_len = data.len().min(mem_data.len());
        mem_data[..copy_len].copy_from_slice(&data[..copy_len]);

        // Memory grown after the snapshot reads back as zero
        mem_data[copy_len..].fill(0);

        Ok(())
    }

    fn restore_globals(&mut self, globals: &[GlobalSnapshot]) -> Result<(), SandboxError> {
        for g in globals {
            if let Some(global) = self.instance.get_global(&mut self.store, &g.name) {
                let val = match g.value {
                    SerializedVal::I32(v) => Val::I32(v),
                    SerializedVal::I64(v) => Val::I64(v),
                    SerializedVal::F32(v) => Val::F32(v),
                    SerializedVal::F64(v) => Val::F64(v),
                };
                global.set(&mut self.store, val)?;
            }
        }
        Ok(())
    }
}

impl StateHandle {
    /// Flatten the handle into bytes: memory, then globals in export order,
    /// then remaining fuel. Includes engine bookkeeping (fuel), so two
    /// behaviorally identical states can serialize differently.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.wasm_memory.clone().unwrap_or_default();
        for g in &self.wasm_globals {
            g.value.append_to(&mut out);
        }
        if let Some(fuel) = self.fuel_remaining {
            out.extend_from_slice(&fuel.to_le_bytes());
        }
        out
    }

    /// Size of the captured linear memory image.
    pub fn memory_len(&self) -> usize {
        self.wasm_memory.as_ref().map_or(0, Vec::len)
    }
}

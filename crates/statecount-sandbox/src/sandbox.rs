use wasmtime::{Engine, ExternType, Linker, Module, Store, Trap, Val};

use crate::config::SandboxConfig;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("WASM engine error: {0}")]
    Engine(#[from] wasmtime::Error),

    #[error("Failed to read program '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Export not found: {name}")]
    ExportNotFound { name: String },

    #[error("Export '{name}' is not a function")]
    ExportNotFunction { name: String },

    #[error("Fuel exhausted during execution")]
    FuelExhausted,

    #[error("Type mismatch: {details}")]
    TypeMismatch { details: String },

    #[error("Invalid program: {details}")]
    InvalidProgram { details: String },
}

impl SandboxError {
    /// Classify a wasmtime call failure, pulling fuel exhaustion out of the trap chain.
    pub(crate) fn from_call(err: wasmtime::Error) -> Self {
        match err.downcast_ref::<Trap>() {
            Some(Trap::OutOfFuel) => SandboxError::FuelExhausted,
            _ => SandboxError::Engine(err),
        }
    }
}

/// Store data that implements resource limiting.
pub(crate) struct StoreData {
    memory_limit_bytes: u64,
}

impl wasmtime::ResourceLimiter for StoreData {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok((desired as u64) <= self.memory_limit_bytes)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(desired <= 10_000)
    }
}

/// The WASM sandbox: loads simulator programs with full isolation.
pub struct Sandbox {
    engine: Engine,
    config: SandboxConfig,
}

/// A loaded (but not yet instantiated) WASM module.
pub struct LoadedModule {
    module: Module,
}

/// A live WASM instance ready for function calls.
pub struct SandboxInstance {
    pub(crate) store: Store<StoreData>,
    pub(crate) instance: wasmtime::Instance,
    pub(crate) fuel_per_step: Option<u64>,
}

/// Wrapper around wasmtime::Val for a cleaner interface.
#[derive(Debug, Clone)]
pub struct WasmVal(Val);

impl WasmVal {
    pub fn i32(&self) -> Option<i32> {
        match &self.0 {
            Val::I32(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i32> for WasmVal {
    fn from(v: i32) -> Self {
        WasmVal(Val::I32(v))
    }
}

impl Sandbox {
    /// Create a new sandbox with the given configuration.
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let mut engine_config = wasmtime::Config::new();

        if config.fuel_per_step.is_some() {
            engine_config.consume_fuel(true);
        }

        // Single-threaded guest: a shared memory would break snapshot determinism
        engine_config.wasm_threads(false);

        let engine = Engine::new(&engine_config)?;
        Ok(Self {
            engine,
            config: config.clone(),
        })
    }

    /// Load a WASM module from bytes (binary or text format). Validates the module.
    pub fn load_module(&self, wasm_bytes: &[u8]) -> Result<LoadedModule, SandboxError> {
        let module = Module::new(&self.engine, wasm_bytes)?;
        Ok(LoadedModule { module })
    }

    /// Instantiate a loaded module with no imports (fully isolated).
    pub fn instantiate(&self, loaded: &LoadedModule) -> Result<SandboxInstance, SandboxError> {
        let data = StoreData {
            memory_limit_bytes: self.config.memory_limit_bytes,
        };
        let mut store = Store::new(&self.engine, data);
        store.limiter(|data| data);

        let fuel_per_step = self.config.fuel_per_step;
        if let Some(fuel) = fuel_per_step {
            store.set_fuel(fuel)?;
        }

        // No imports: the program cannot observe anything but its own memory
        let linker = Linker::new(&self.engine);
        let instance = linker.instantiate(&mut store, &loaded.module)?;

        Ok(SandboxInstance {
            store,
            instance,
            fuel_per_step,
        })
    }

    /// List all exports from a module as (name, kind) pairs.
    pub fn list_exports(&self, loaded: &LoadedModule) -> Vec<(String, String)> {
        loaded
            .module
            .exports()
            .map(|export| {
                let kind = match export.ty() {
                    ExternType::Func(_) => "func",
                    ExternType::Global(_) => "global",
                    ExternType::Memory(_) => "memory",
                    ExternType::Table(_) => "table",
                    _ => "other",
                };
                (export.name().to_string(), kind.to_string())
            })
            .collect()
    }

    /// Get the sandbox configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

impl SandboxInstance {
    /// Call an exported function by name with the given arguments.
    /// Returns the result values, or an error if the call fails.
    pub fn call_func(
        &mut self,
        name: &str,
        args: &[WasmVal],
    ) -> Result<Vec<WasmVal>, SandboxError> {
        self.refuel()?;

        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| SandboxError::ExportNotFound {
                name: name.to_string(),
            })?;

        let func_ty = func.ty(&self.store);
        if func_ty.params().len() != args.len() {
            return Err(SandboxError::TypeMismatch {
                details: format!(
                    "'{name}' takes {} params, got {}",
                    func_ty.params().len(),
                    args.len()
                ),
            });
        }
        let result_count = func_ty.results().len();

        let wasm_args: Vec<Val> = args.iter().map(|a| a.0).collect();
        let mut results = vec![Val::I32(0); result_count];

        func.call(&mut self.store, &wasm_args, &mut results)
            .map_err(SandboxError::from_call)?;
        Ok(results.into_iter().map(WasmVal).collect())
    }

    /// Reset fuel to the per-step budget. Called before every guest entry.
    pub fn refuel(&mut self) -> Result<(), SandboxError> {
        if let Some(fuel) = self.fuel_per_step {
            self.store.set_fuel(fuel)?;
        }
        Ok(())
    }

    /// Whether the module exports a function with this name.
    pub fn has_func(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }
}

//! Sandbox configuration: memory limit, fuel metering, RAM window, frame skip.
use serde::{Deserialize, Serialize};

/// Size of the emulated console's working RAM, in bytes.
pub const DEFAULT_RAM_SIZE: usize = 128;

/// Configuration for the program sandbox.
///
/// Programs get no imports at all: no filesystem, no clock, no entropy.
/// That is what makes every step a pure function of (state, action).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum linear memory in bytes (default: 16 MB).
    pub memory_limit_bytes: u64,
    /// Fuel budget per `step` call. None = unlimited (not recommended).
    pub fuel_per_step: Option<u64>,
    /// How many times `step` is invoked per action (default: 1).
    pub frame_skip: u32,
    /// Offset of the working RAM inside linear memory.
    pub ram_base: u32,
    /// Length of the working RAM window.
    pub ram_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 16 * 1024 * 1024, // 16 MB
            fuel_per_step: Some(1_000_000),
            frame_skip: 1,
            ram_base: 0,
            ram_size: DEFAULT_RAM_SIZE,
        }
    }
}

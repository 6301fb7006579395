//! Deterministic WASM sandbox standing in for the emulated console.
//!
//! A program is loaded once, booted into a single [`program::ProgramInstance`]
//! and then driven frame by frame, with [`snapshot::StateHandle`]s for
//! save/restore.

pub mod config;
pub mod program;
pub mod sandbox;
pub mod snapshot;

pub use config::SandboxConfig;
pub use program::{Program, ProgramInstance};
pub use sandbox::SandboxError;
pub use snapshot::StateHandle;

//! State fingerprints: the equality key for deduplication.
//!
//! The canonical scheme is working memory followed by the auxiliary
//! register. Memory alone undercounts programs with persistent state
//! outside RAM (paddle games); the full serialized state overcounts,
//! because it carries emulator bookkeeping that never affects behavior.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adapter::Simulator;

/// Canonical byte representation of the action-relevant simulator state.
///
/// Fixed size for a given simulator and scheme. Totally ordered and hashable.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(Box<[u8]>);

impl Fingerprint {
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Fingerprint(bytes.into())
    }

    /// Memory bytes followed by the auxiliary value, little-endian.
    pub fn from_memory_and_aux(memory: &[u8], aux: i32) -> Self {
        let mut bytes = Vec::with_capacity(memory.len() + 4);
        bytes.extend_from_slice(memory);
        bytes.extend_from_slice(&aux.to_le_bytes());
        Fingerprint(bytes.into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Byte offsets at which two fingerprints disagree. A length mismatch
    /// reports every offset past the shorter one.
    pub fn diff(&self, other: &Fingerprint) -> Vec<usize> {
        let longest = self.len().max(other.len());
        (0..longest)
            .filter(|&i| self.0.get(i) != other.0.get(i))
            .collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Which observables define state equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintScheme {
    /// Working memory plus the auxiliary register.
    #[default]
    MemoryAndAux,
    /// Working memory only.
    MemoryOnly,
    /// The simulator's complete serialized state.
    FullState,
}

impl FingerprintScheme {
    /// Read the simulator's current state. Call only right after a `step`
    /// or `restore`, before anything else mutates the simulator.
    pub fn extract<S: Simulator>(self, sim: &mut S) -> Result<Fingerprint, S::Error> {
        match self {
            FingerprintScheme::MemoryAndAux => {
                let memory = sim.raw_memory()?;
                let aux = sim.auxiliary_state()?;
                Ok(Fingerprint::from_memory_and_aux(&memory, aux))
            }
            FingerprintScheme::MemoryOnly => Ok(Fingerprint::from_bytes(sim.raw_memory()?)),
            FingerprintScheme::FullState => Ok(Fingerprint::from_bytes(sim.serialized_state()?)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FingerprintScheme::MemoryAndAux => "memory+aux",
            FingerprintScheme::MemoryOnly => "memory",
            FingerprintScheme::FullState => "full",
        }
    }
}

/// Fingerprint the current state with the canonical scheme.
pub fn fingerprint<S: Simulator>(sim: &mut S) -> Result<Fingerprint, S::Error> {
    FingerprintScheme::default().extract(sim)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown fingerprint scheme '{0}' (expected memory+aux, memory or full)")]
pub struct UnknownScheme(pub String);

impl FromStr for FingerprintScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory+aux" | "ram+aux" => Ok(FingerprintScheme::MemoryAndAux),
            "memory" | "ram" => Ok(FingerprintScheme::MemoryOnly),
            "full" => Ok(FingerprintScheme::FullState),
            other => Err(UnknownScheme(other.to_string())),
        }
    }
}

impl fmt::Display for FingerprintScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

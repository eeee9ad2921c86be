use serde::{Deserialize, Serialize};

/// Logical simulation time. Unrelated to wall-clock time.
pub type SimTime = f64;

/// Identifier of a process owned by the simulation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub(crate) u64);

impl ProcessId {
    /// Get the raw numeric id
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier of a resource registered with the simulation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    /// Index of the resource in registration order
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

//! Process-wide tunables, collected into one struct rather than scattered
//! free-standing globals.

pub use cloister_envelope::MIN_DERIVATION_ROUNDS;

/// History length at or above which [`crate::engine::FormatEngine::optimise`]
/// is worth running even with no destructive commands present.
pub const DEFAULT_FLATTEN_THRESHOLD: usize = 1000;

/// Maximum size of a single attachment blob, in bytes.
pub const MAX_ATTACHMENT_BYTES: u64 = 200 * 1024 * 1024;

/// Length of a generated attachment key / random string.
pub const ATTACHMENTS_KEY_LEN: usize = 48;

/// Engine-wide configuration. Cheap to clone; typically constructed once
/// per process and shared by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// History length at or above which flattening is considered due even
    /// absent a destructive command.
    pub flatten_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { flatten_threshold: DEFAULT_FLATTEN_THRESHOLD }
    }
}

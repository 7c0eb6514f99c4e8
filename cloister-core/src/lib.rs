//! Vault data engine: the command log, the replayed tree, the merge
//! protocol, and the peripheral subsystems (attachments, search,
//! credential storage) built around them.
//!
//! [`engine::FormatEngine`] is the entry point most embedders want: it
//! owns a vault's tree and history and exposes `initialise`/mutators/
//! `load`/`save`/`optimise`. The lower-level [`command`], [`model`], and
//! [`merge`] modules are public for embedders that need to replay or
//! reconcile histories without going through the engine's state machine
//! (for example, a merge tool operating on two files at rest).

pub mod attachment;
pub mod command;
pub mod config;
pub mod credential_store;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod facade;
pub mod flatten;
pub mod merge;
pub mod model;
pub mod search;
pub mod share;

pub use engine::{EngineEvent, EngineListener, EngineState, FormatEngine};
pub use error::VaultError;
pub use model::{Entry, Group, Vault};

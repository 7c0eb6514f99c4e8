//! The format engine: owns the history and the replayed tree, routes
//! mutations through the command executors, and orchestrates the
//! encrypted save/load round-trip.

use std::sync::Arc;

use chrono::Utc;
use cloister_envelope::{codec, compress, Cryptor, EnvelopeError};
use tracing::{debug, info, warn};

use crate::command::{encode_command, execute, generate_padding_line, parse_line, Opcode};
use crate::config::EngineConfig;
use crate::datasource::DatasourceBackend;
use crate::error::{EngineError, VaultError};
use crate::flatten;
use crate::model::Vault;

/// `Empty → Initialised → Mutable ↔ ReadOnly → Sealed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Empty,
    Initialised,
    Mutable,
    ReadOnly,
    Sealed,
}

/// Typed lifecycle events, replacing the string-keyed observer callbacks
/// this engine's ancestor used.
#[derive(Debug, Clone)]
pub enum EngineEvent<'a> {
    CommandsExecuted { commands: &'a [String] },
    Updated,
}

/// Receives [`EngineEvent`]s as they happen. Implementors must not block;
/// a slow sink should hand off to its own background task.
pub trait EngineListener: Send + Sync {
    fn on_event(&self, vault_id: Option<&str>, event: &EngineEvent<'_>);
}

/// Logs every event through `tracing` at the levels called for by each
/// event kind. The default listener; embedders may add their own.
#[derive(Debug, Default)]
pub struct TracingListener;

impl EngineListener for TracingListener {
    fn on_event(&self, vault_id: Option<&str>, event: &EngineEvent<'_>) {
        match event {
            EngineEvent::CommandsExecuted { commands } => {
                debug!(vault_id, commands = commands.len(), "commands executed");
            }
            EngineEvent::Updated => {
                info!(vault_id, "vault saved");
            }
        }
    }
}

fn opcode_of(line: &str) -> Option<Opcode> {
    parse_line(line).ok().map(|p| p.opcode)
}

/// Owns `(tree, history, state, dirty)` for one vault and exposes the
/// mutating operations an embedder drives a vault through.
pub struct FormatEngine {
    tree: Vault,
    history: Vec<String>,
    state: EngineState,
    dirty: bool,
    config: EngineConfig,
    listener: Arc<dyn EngineListener>,
}

impl Default for FormatEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FormatEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { tree: Vault::new(), history: Vec::new(), state: EngineState::Empty, dirty: false, config, listener: Arc::new(TracingListener) }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EngineListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.state == EngineState::ReadOnly
    }

    pub fn tree(&self) -> &Vault {
        &self.tree
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn get_format(&self) -> Option<u32> {
        self.tree.format_tag
    }

    fn emit(&self, event: EngineEvent<'_>) {
        self.listener.on_event(self.tree.id.as_deref(), &event);
    }

    /// `Empty → Initialised`. Emits `fmt` then `aid <uuid>` with no padding
    /// between or after them — unlike `execute()`, these two lines are the
    /// root of the history, not a padded command.
    pub fn initialise(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Empty {
            return Err(EngineError::AlreadyInitialised);
        }
        let vault_id = uuid::Uuid::new_v4().to_string();
        let ts = Utc::now();
        let mut applied = Vec::with_capacity(2);
        for (opcode, args) in [(Opcode::Fmt, vec!["2".to_string()]), (Opcode::Aid, vec![vault_id])] {
            execute(&mut self.tree, None, opcode, &args, ts)?;
            let line = encode_command(None, opcode, &args);
            self.history.push(line.clone());
            applied.push(line);
        }

        self.state = EngineState::Initialised;
        self.dirty = true;
        self.emit(EngineEvent::CommandsExecuted { commands: &applied });
        info!(vault_id = self.tree.id.as_deref(), "vault initialised");
        Ok(())
    }

    /// Routes one or more already-formed commands through their executors,
    /// appending each to history, then appends exactly one padding line for
    /// the whole batch unless its last command was itself `pad`. Fails with
    /// `EngineError::ReadOnly` in read-only mode, `NotInitialised` before
    /// `initialise()`. Atomic per command: a failing command is not
    /// appended and does not partially mutate the tree, but commands
    /// earlier in the same batch remain applied.
    pub fn execute(&mut self, opcode: Opcode, args: Vec<String>) -> Result<(), EngineError> {
        self.apply_batch(vec![(opcode, args)])
    }

    pub fn execute_batch(&mut self, ops: Vec<(Opcode, Vec<String>)>) -> Result<(), EngineError> {
        self.apply_batch(ops)
    }

    fn apply_batch(&mut self, ops: Vec<(Opcode, Vec<String>)>) -> Result<(), EngineError> {
        if self.state == EngineState::ReadOnly {
            return Err(EngineError::ReadOnly);
        }
        if self.state == EngineState::Empty {
            return Err(EngineError::NotInitialised);
        }

        let ts = Utc::now();
        let last_is_pad = ops.last().is_some_and(|(opcode, _)| *opcode == Opcode::Pad);
        let mut applied = Vec::with_capacity(ops.len());
        for (opcode, args) in ops {
            execute(&mut self.tree, None, opcode, &args, ts)?;
            let line = encode_command(None, opcode, &args);
            self.history.push(line.clone());
            applied.push(line);
        }
        if !last_is_pad {
            self.history.push(generate_padding_line());
        }

        self.dirty = true;
        if self.state == EngineState::Initialised {
            self.state = EngineState::Mutable;
        }
        self.emit(EngineEvent::CommandsExecuted { commands: &applied });
        Ok(())
    }

    pub fn create_group(&mut self, parent_id: &str, group_id: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Cgr, vec![parent_id.to_string(), group_id.to_string()])
    }

    pub fn set_group_title(&mut self, group_id: &str, title: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Tgr, vec![group_id.to_string(), title.to_string()])
    }

    pub fn move_group(&mut self, group_id: &str, new_parent_id: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Mgr, vec![group_id.to_string(), new_parent_id.to_string()])
    }

    pub fn delete_group(&mut self, group_id: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Dgr, vec![group_id.to_string()])
    }

    pub fn set_group_attribute(&mut self, group_id: &str, key: &str, value: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Sga, vec![group_id.to_string(), key.to_string(), value.to_string()])
    }

    pub fn delete_group_attribute(&mut self, group_id: &str, key: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Dga, vec![group_id.to_string(), key.to_string()])
    }

    pub fn create_entry(&mut self, group_id: &str, entry_id: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Cen, vec![group_id.to_string(), entry_id.to_string()])
    }

    pub fn move_entry(&mut self, entry_id: &str, new_group_id: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Men, vec![entry_id.to_string(), new_group_id.to_string()])
    }

    pub fn delete_entry(&mut self, entry_id: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Den, vec![entry_id.to_string()])
    }

    pub fn set_entry_property(&mut self, entry_id: &str, key: &str, value: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Sep, vec![entry_id.to_string(), key.to_string(), value.to_string()])
    }

    pub fn delete_entry_property(&mut self, entry_id: &str, key: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Dep, vec![entry_id.to_string(), key.to_string()])
    }

    pub fn set_entry_attribute(&mut self, entry_id: &str, key: &str, value: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Sea, vec![entry_id.to_string(), key.to_string(), value.to_string()])
    }

    pub fn delete_entry_attribute(&mut self, entry_id: &str, key: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Dea, vec![entry_id.to_string(), key.to_string()])
    }

    pub fn set_vault_attribute(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Saa, vec![key.to_string(), value.to_string()])
    }

    pub fn delete_vault_attribute(&mut self, key: &str) -> Result<(), EngineError> {
        self.execute(Opcode::Daa, vec![key.to_string()])
    }

    /// Freezes or unfreezes mutation. The flag is authoritative; there is
    /// no bypass.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.state = match (read_only, self.state) {
            (true, EngineState::Mutable | EngineState::Initialised) => EngineState::ReadOnly,
            (false, EngineState::ReadOnly) => EngineState::Mutable,
            (_, other) => other,
        };
    }

    /// Compacts history when due (see [`flatten::can_be_flattened`)]. Returns
    /// whether flattening actually happened.
    pub fn optimise(&mut self) -> bool {
        let has_destructive = self.history.iter().any(|l| opcode_of(l).map(Opcode::is_destructive).unwrap_or(false));
        if !flatten::can_be_flattened(self.history.len(), has_destructive, &self.config) {
            return false;
        }
        self.history = flatten::flatten(&self.tree);
        info!(vault_id = self.tree.id.as_deref(), commands = self.history.len(), "history flattened");
        true
    }

    /// Clears the tree and history, returning to `Empty`.
    pub fn clear(&mut self) {
        self.tree = Vault::new();
        self.history.clear();
        self.state = EngineState::Empty;
        self.dirty = false;
    }

    /// Replaces history and tree from a freshly-lexed set of lines,
    /// replaying each against a new vault. Used by `load` and by callers
    /// reconstructing an engine from an already-decrypted history.
    pub fn replay_history(&mut self, lines: Vec<String>) -> Result<(), EngineError> {
        let mut tree = Vault::new();
        let ts = Utc::now();
        for line in &lines {
            let parsed = parse_line(line)?;
            execute(&mut tree, parsed.share_id.as_deref(), parsed.opcode, &parsed.args, ts)?;
        }
        self.tree = tree;
        self.history = lines;
        self.state = EngineState::Mutable;
        self.dirty = false;
        Ok(())
    }

    /// Reads, verifies, decrypts, decompresses, and replays a vault file.
    pub async fn load(&mut self, backend: &dyn DatasourceBackend, path: &str, password: &str) -> Result<(), VaultError> {
        let bytes = backend.get_file_contents(path)?;
        let body = codec::strip_signature(&bytes).map_err(EnvelopeError::from)?;
        let compressed = Cryptor::decrypt_buffer(body, password).await.map_err(EnvelopeError::from)?;
        let text = compress::decompress_text(&compressed).map_err(EnvelopeError::from)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        self.replay_history(lines)?;
        info!(vault_id = self.tree.id.as_deref(), path, "vault loaded");
        Ok(())
    }

    /// Compresses, encrypts, signs, and writes the current history.
    /// Emits [`EngineEvent::Updated`] after the write resolves.
    pub async fn save(&mut self, backend: &dyn DatasourceBackend, path: &str, password: &str) -> Result<(), VaultError> {
        let text = self.history.join("\n");
        let compressed = compress::compress_text(&text);
        let ciphertext = Cryptor::encrypt_buffer(&compressed, password).await.map_err(EnvelopeError::from)?;
        let signed = codec::sign(&ciphertext);
        backend.put_file_contents(path, &signed)?;
        self.dirty = false;
        self.emit(EngineEvent::Updated);
        Ok(())
    }
}

/// Optimises `engine`'s history, warning instead of failing if nothing
/// was due for compaction — a caller-facing convenience over
/// [`FormatEngine::optimise`] for periodic maintenance callers that don't
/// care whether it ran.
pub fn optimise_if_due(engine: &mut FormatEngine) {
    if !engine.optimise() {
        warn!(vault_id = engine.tree().id.as_deref(), "optimise skipped: not due");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::InMemoryBackend;
    use crate::model::ROOT;

    #[test]
    fn initialise_sets_format_and_id() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        assert_eq!(engine.get_format(), Some(2));
        assert!(engine.tree().id.is_some());
        assert_eq!(engine.state(), EngineState::Initialised);
        // fmt + aid, no padding around the root commands
        assert_eq!(engine.history().len(), 2);
        assert_eq!(engine.history()[0], "fmt 2");
    }

    #[test]
    fn execute_batch_pads_once_after_the_whole_batch() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        let history_before = engine.history().len();
        engine
            .execute_batch(vec![(Opcode::Cgr, vec![ROOT.to_string(), "G1".to_string()]), (Opcode::Tgr, vec!["G1".to_string(), "Home".to_string()])])
            .unwrap();
        // two commands plus exactly one trailing padding line
        assert_eq!(engine.history().len(), history_before + 3);
        assert!(opcode_of(engine.history().last().unwrap()) == Some(Opcode::Pad));
    }

    #[test]
    fn double_initialise_fails() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        assert_eq!(engine.initialise(), Err(EngineError::AlreadyInitialised));
    }

    #[test]
    fn execute_before_initialise_fails() {
        let mut engine = FormatEngine::default();
        assert_eq!(engine.create_group(ROOT, "G1"), Err(EngineError::NotInitialised));
    }

    #[test]
    fn read_only_freezes_mutation() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        engine.set_read_only(true);
        assert_eq!(engine.create_group(ROOT, "G1"), Err(EngineError::ReadOnly));
        engine.set_read_only(false);
        engine.create_group(ROOT, "G1").unwrap();
    }

    #[test]
    fn failing_command_does_not_mutate_tree() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        let err = engine.set_group_title("UNKNOWN", "x").unwrap_err();
        assert!(matches!(err, EngineError::Replay(_)));
        assert!(!engine.tree().group_exists("UNKNOWN"));
    }

    #[test]
    fn create_and_read_scenario() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        engine.create_group(ROOT, "G1").unwrap();
        engine.set_group_title("G1", "Home").unwrap();
        engine.create_entry("G1", "E1").unwrap();
        engine.set_entry_property("E1", "username", "alice").unwrap();

        assert_eq!(engine.tree().root_group_order, vec!["G1".to_string()]);
        assert_eq!(engine.tree().groups["G1"].title, "Home");
        assert_eq!(engine.tree().entries["E1"].properties["username"], "alice");
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let backend = InMemoryBackend::new();
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        engine.create_group(ROOT, "G1").unwrap();
        engine.set_group_title("G1", "Home").unwrap();
        engine.save(&backend, "vault.bin", "hunter2").await.unwrap();

        let mut reopened = FormatEngine::default();
        reopened.load(&backend, "vault.bin", "hunter2").await.unwrap();
        assert_eq!(reopened.tree().groups["G1"].title, "Home");
        assert_eq!(reopened.tree().id, engine.tree().id);
    }

    #[tokio::test]
    async fn load_with_wrong_password_fails() {
        let backend = InMemoryBackend::new();
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        engine.save(&backend, "vault.bin", "hunter2").await.unwrap();

        let mut reopened = FormatEngine::default();
        assert!(reopened.load(&backend, "vault.bin", "wrong-password").await.is_err());
    }

    #[test]
    fn optimise_is_a_noop_below_threshold_without_destructive_commands() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        let history_before = engine.history().len();
        assert!(!engine.optimise());
        assert_eq!(engine.history().len(), history_before);
    }

    #[test]
    fn optimise_runs_after_a_destructive_command() {
        let mut engine = FormatEngine::default();
        engine.initialise().unwrap();
        engine.create_group(ROOT, "G1").unwrap();
        engine.create_group(ROOT, "G2").unwrap();
        engine.delete_group("G2").unwrap();
        assert!(engine.optimise());
        assert!(engine.tree().group_exists("G1"));
        assert!(!engine.tree().group_exists("G2"));
    }
}

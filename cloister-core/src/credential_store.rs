//! Process-wide registry of unlocked vault key material.
//!
//! The source this engine is drawn from keeps a module-scope mapping of
//! credentials-IDs to credential payloads. This is the same idea, made
//! explicit: entries are created when a vault is unlocked and dropped when
//! it is locked. There is exactly one store per process, reached through
//! [`CredentialStore::global`].

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use zeroize::Zeroize;

/// Derived key material for one unlocked vault. Zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct CredentialPayload {
    key: Vec<u8>,
}

impl CredentialPayload {
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPayload").field("key", &"<redacted>").finish()
    }
}

/// Process-wide `put`/`get`/`drop` registry keyed by vault id.
#[derive(Default)]
pub struct CredentialStore {
    entries: RwLock<HashMap<String, CredentialPayload>>,
}

impl CredentialStore {
    /// The single process-wide instance.
    pub fn global() -> &'static CredentialStore {
        static INSTANCE: OnceLock<CredentialStore> = OnceLock::new();
        INSTANCE.get_or_init(CredentialStore::default)
    }

    /// Registers key material for a vault, typically right after it is
    /// unlocked.
    pub fn put(&self, vault_id: impl Into<String>, payload: CredentialPayload) {
        self.entries.write().unwrap().insert(vault_id.into(), payload);
    }

    /// Looks up key material for a still-unlocked vault.
    pub fn get(&self, vault_id: &str) -> Option<CredentialPayload> {
        self.entries.read().unwrap().get(vault_id).cloned()
    }

    /// Removes and zeroizes key material for a vault, typically when it is
    /// locked.
    pub fn drop_vault(&self, vault_id: &str) {
        self.entries.write().unwrap().remove(vault_id);
    }

    pub fn contains(&self, vault_id: &str) -> bool {
        self.entries.read().unwrap().contains_key(vault_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_drop_lifecycle() {
        let store = CredentialStore::default();
        assert!(!store.contains("v1"));
        store.put("v1", CredentialPayload::new(vec![1, 2, 3]));
        assert!(store.contains("v1"));
        assert_eq!(store.get("v1").unwrap().key(), &[1, 2, 3]);
        store.drop_vault("v1");
        assert!(!store.contains("v1"));
        assert!(store.get("v1").is_none());
    }

    #[test]
    fn global_instance_is_shared() {
        CredentialStore::global().put("global-test", CredentialPayload::new(vec![9]));
        assert!(CredentialStore::global().contains("global-test"));
        CredentialStore::global().drop_vault("global-test");
    }
}

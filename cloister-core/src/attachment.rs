//! Encrypted binary blobs referenced by vault entries: sized-bounded and
//! independently keyed off a per-vault attachment key.

use chrono::{DateTime, Utc};
use cloister_envelope::{Cryptor, EnvelopeError};
use serde::{Deserialize, Serialize};

use crate::config::{ATTACHMENTS_KEY_LEN, MAX_ATTACHMENT_BYTES};
use crate::datasource::DatasourceBackend;
use crate::error::{AttachmentError, IoError, VaultError};
use crate::model::{Vault, ATTR_ATTACHMENTS_KEY, ATTR_ATTACHMENT_PREFIX};

/// Metadata describing one attachment, stored as JSON in an entry attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDetails {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size_original: u64,
    pub size_encrypted: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

fn attribute_key(attachment_id: &str) -> String {
    format!("{ATTR_ATTACHMENT_PREFIX}{attachment_id}")
}

/// Returns the vault's attachment key, generating and storing a fresh one
/// on first use. The caller is responsible for persisting the vault (via
/// the normal save path) before the first attachment write, per the
/// key-management contract.
pub fn ensure_attachments_key(vault: &mut Vault) -> String {
    if let Some(existing) = vault.attributes.get(ATTR_ATTACHMENTS_KEY) {
        return existing.clone();
    }
    let key = Cryptor::random_string(ATTACHMENTS_KEY_LEN);
    vault.attributes.insert(ATTR_ATTACHMENTS_KEY.to_string(), key.clone());
    key
}

fn vault_id_of(vault: &Vault) -> Result<String, VaultError> {
    vault
        .id
        .clone()
        .ok_or_else(|| VaultError::Io(IoError::Other("vault has no id".into())))
}

/// Encrypts `data` under the vault's attachment key and stores it through
/// `backend`, recording an entry attribute with its details.
pub async fn put(
    vault: &mut Vault,
    backend: &dyn DatasourceBackend,
    entry_id: &str,
    name: &str,
    content_type: &str,
    data: &[u8],
) -> Result<AttachmentDetails, VaultError> {
    if data.len() as u64 > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge { size: data.len() as u64, max: MAX_ATTACHMENT_BYTES }.into());
    }
    if !vault.entry_exists(entry_id) {
        return Err(VaultError::Io(IoError::NotFound(entry_id.to_string())));
    }

    let key = ensure_attachments_key(vault);
    let encrypted = Cryptor::encrypt_buffer(data, &key).await.map_err(EnvelopeError::from)?;

    if let Some(available) = backend.available_storage() {
        if encrypted.len() as u64 > available {
            return Err(AttachmentError::OutOfSpace.into());
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let details = AttachmentDetails {
        id: id.clone(),
        name: name.to_string(),
        content_type: content_type.to_string(),
        size_original: data.len() as u64,
        size_encrypted: encrypted.len() as u64,
        created: now,
        updated: now,
    };
    let details_json = serde_json::to_string(&details)
        .map_err(|e| VaultError::Io(IoError::Other(format!("serialize attachment details: {e}"))))?;

    let vault_id = vault_id_of(vault)?;
    backend.put_attachment(&vault_id, &id, &encrypted, &details_json)?;

    let entry = vault.entries.get_mut(entry_id).expect("checked above");
    entry.attributes.insert(attribute_key(&id), details_json);

    Ok(details)
}

/// Reads and decrypts an attachment's blob and details.
pub async fn get(
    vault: &Vault,
    backend: &dyn DatasourceBackend,
    entry_id: &str,
    attachment_id: &str,
) -> Result<(Vec<u8>, AttachmentDetails), VaultError> {
    let details = get_details(vault, entry_id, attachment_id)?;
    let key = vault
        .attributes
        .get(ATTR_ATTACHMENTS_KEY)
        .ok_or_else(|| VaultError::Io(IoError::Other("vault has no attachments key".into())))?;
    let vault_id = vault_id_of(vault)?;
    let encrypted = backend.get_attachment(&vault_id, attachment_id)?;
    let data = Cryptor::decrypt_buffer(&encrypted, key).await.map_err(EnvelopeError::from)?;
    Ok((data, details))
}

/// Removes an attachment's stored blob and its entry attribute.
pub fn remove(
    vault: &mut Vault,
    backend: &dyn DatasourceBackend,
    entry_id: &str,
    attachment_id: &str,
) -> Result<(), VaultError> {
    let vault_id = vault_id_of(vault)?;
    backend.remove_attachment(&vault_id, attachment_id)?;
    if let Some(entry) = vault.entries.get_mut(entry_id) {
        entry.attributes.remove(&attribute_key(attachment_id));
    }
    Ok(())
}

/// Lists every attachment's details recorded on an entry.
pub fn list(vault: &Vault, entry_id: &str) -> Vec<AttachmentDetails> {
    let Some(entry) = vault.entries.get(entry_id) else { return Vec::new() };
    entry
        .attributes
        .iter()
        .filter(|(k, _)| k.starts_with(ATTR_ATTACHMENT_PREFIX))
        .filter_map(|(_, v)| serde_json::from_str(v).ok())
        .collect()
}

/// Looks up one attachment's details, failing with
/// [`AttachmentError::NotFound`] if no record exists.
pub fn get_details(vault: &Vault, entry_id: &str, attachment_id: &str) -> Result<AttachmentDetails, AttachmentError> {
    let entry = vault
        .entries
        .get(entry_id)
        .ok_or_else(|| AttachmentError::NotFound(attachment_id.to_string()))?;
    let raw = entry
        .attributes
        .get(&attribute_key(attachment_id))
        .ok_or_else(|| AttachmentError::NotFound(attachment_id.to_string()))?;
    serde_json::from_str(raw).map_err(|_| AttachmentError::NotFound(attachment_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::InMemoryBackend;
    use crate::model::ROOT;

    fn vault_with_entry() -> Vault {
        let mut vault = Vault::new();
        vault.id = Some("vault-1".into());
        vault.groups.insert("G1".into(), crate::model::Group::new("G1", ROOT));
        vault.entries.insert("E1".into(), crate::model::Entry::new("E1", "G1"));
        vault
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let mut vault = vault_with_entry();
        let backend = InMemoryBackend::new();
        let details = put(&mut vault, &backend, "E1", "photo.png", "image/png", b"binary-data").await.unwrap();
        assert_eq!(details.size_original, 11);

        let (data, fetched) = get(&vault, &backend, "E1", &details.id).await.unwrap();
        assert_eq!(data, b"binary-data");
        assert_eq!(fetched.id, details.id);
    }

    #[tokio::test]
    async fn quota_exceeded_rejects_write_without_setting_attribute() {
        let mut vault = vault_with_entry();
        let backend = InMemoryBackend::new();
        backend.set_available_storage(Some(100));
        // 150 bytes of plaintext encrypts to well over 100 bytes once the
        // AEAD header and tag are included.
        let data = vec![0u8; 150];
        let err = put(&mut vault, &backend, "E1", "blob", "application/octet-stream", &data).await.unwrap_err();
        assert_eq!(err, VaultError::Attachment(AttachmentError::OutOfSpace));
        assert!(list(&vault, "E1").is_empty());
    }

    #[test]
    fn get_missing_attachment_is_not_found() {
        let vault = vault_with_entry();
        let err = get_details(&vault, "E1", "nope").unwrap_err();
        assert_eq!(err, AttachmentError::NotFound("nope".into()));
    }

    #[tokio::test]
    async fn remove_deletes_blob_and_attribute() {
        let mut vault = vault_with_entry();
        let backend = InMemoryBackend::new();
        let details = put(&mut vault, &backend, "E1", "f", "t", b"data").await.unwrap();
        remove(&mut vault, &backend, "E1", &details.id).unwrap();
        assert!(list(&vault, "E1").is_empty());
        assert!(get(&vault, &backend, "E1", &details.id).await.is_err());
    }
}

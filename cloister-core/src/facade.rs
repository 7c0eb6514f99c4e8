//! Plain-data snapshots of vault contents, and detection of such snapshots
//! in untyped JSON received from a host.

use serde::Serialize;
use serde_json::Value;

use crate::model::{Entry, Group, Vault};

/// A JSON-serializable snapshot of a vault, handed to embedders instead of
/// direct tree access.
#[derive(Debug, Clone, Serialize)]
pub struct Facade {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub groups: Vec<GroupFacade>,
    pub entries: Vec<EntryFacade>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupFacade {
    pub id: String,
    pub title: String,
    #[serde(rename = "parentID")]
    pub parent_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryFacade {
    pub id: String,
    #[serde(rename = "parentGroupID")]
    pub parent_group_id: String,
    pub properties: std::collections::BTreeMap<String, String>,
}

impl From<&Group> for GroupFacade {
    fn from(g: &Group) -> Self {
        GroupFacade { id: g.id.clone(), title: g.title.clone(), parent_id: g.parent_id.clone() }
    }
}

impl From<&Entry> for EntryFacade {
    fn from(e: &Entry) -> Self {
        EntryFacade {
            id: e.id.clone(),
            parent_group_id: e.parent_group_id.clone(),
            properties: e.properties.clone(),
        }
    }
}

/// Builds a flat facade snapshot of every group and entry in `vault`.
pub fn snapshot(vault: &Vault) -> Facade {
    Facade {
        kind: "vault",
        id: vault.id.clone().unwrap_or_default(),
        groups: vault.groups.values().map(GroupFacade::from).collect(),
        entries: vault.entries.values().map(EntryFacade::from).collect(),
    }
}

/// A value is a vault facade iff it's a non-null mapping with
/// `type == "vault"`, a string `id`, and both `groups` and `entries`
/// present (their element types are not checked further).
pub fn is_vault_facade(value: &Value) -> bool {
    let Some(map) = value.as_object() else { return false };
    if map.get("type").and_then(Value::as_str) != Some("vault") {
        return false;
    }
    if !matches!(map.get("id"), Some(Value::String(_))) {
        return false;
    }
    map.contains_key("groups") && map.contains_key("entries")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_valid_facade() {
        let v = json!({"type": "vault", "id": "1", "groups": [], "entries": []});
        assert!(is_vault_facade(&v));
    }

    #[test]
    fn rejects_missing_id() {
        let v = json!({"type": "vault", "groups": [], "entries": []});
        assert!(!is_vault_facade(&v));
    }

    #[test]
    fn rejects_null() {
        assert!(!is_vault_facade(&Value::Null));
    }

    #[test]
    fn rejects_wrong_type_tag() {
        let v = json!({"type": "group", "id": "1", "groups": [], "entries": []});
        assert!(!is_vault_facade(&v));
    }

    #[test]
    fn snapshot_reflects_tree() {
        let mut vault = Vault::new();
        vault.id = Some("vault-1".into());
        vault.groups.insert("G1".into(), Group::new("G1", crate::model::ROOT));
        let snap = snapshot(&vault);
        assert_eq!(snap.kind, "vault");
        assert_eq!(snap.id, "vault-1");
        assert_eq!(snap.groups.len(), 1);
    }
}

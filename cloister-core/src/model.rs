//! The in-memory vault tree: groups, entries, attributes, and per-property
//! change history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parent-group sentinel meaning "this group is at the vault root".
pub const ROOT: &str = "0";

/// Reserved vault attribute holding the per-vault attachment key.
pub const ATTR_ATTACHMENTS_KEY: &str = "bc_attachments_key";

/// Entry-attribute key prefix identifying an attachment record.
pub const ATTR_ATTACHMENT_PREFIX: &str = "BC_ATTACHMENT:";

/// One entry in a property's append-only change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyHistoryItem {
    pub property: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub ts: DateTime<Utc>,
}

/// A credential entry: properties (username/password/url/...), engine
/// attributes, and per-property history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub parent_group_id: String,
    pub properties: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
    pub history: Vec<PropertyHistoryItem>,
}

impl Entry {
    pub fn new(id: impl Into<String>, parent_group_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_group_id: parent_group_id.into(),
            properties: BTreeMap::new(),
            attributes: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Records a property write, appending the prior value to history.
    pub fn set_property(&mut self, key: &str, value: &str, ts: DateTime<Utc>) {
        let old_value = self.properties.insert(key.to_string(), value.to_string());
        self.history.push(PropertyHistoryItem {
            property: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
            ts,
        });
    }

    /// Deletes a property, recording the removal in history.
    pub fn delete_property(&mut self, key: &str, ts: DateTime<Utc>) {
        let old_value = self.properties.remove(key);
        self.history.push(PropertyHistoryItem {
            property: key.to_string(),
            old_value,
            new_value: None,
            ts,
        });
    }
}

/// A group (folder) of entries and child groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub title: String,
    pub parent_id: String,
    pub attributes: BTreeMap<String, String>,
    pub child_group_order: Vec<String>,
    pub child_entry_order: Vec<String>,
}

impl Group {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            parent_id: parent_id.into(),
            attributes: BTreeMap::new(),
            child_group_order: Vec::new(),
            child_entry_order: Vec::new(),
        }
    }
}

/// A vault: metadata plus a flat map of groups/entries, linked by id, with
/// explicit ordering vectors so tree order survives moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: Option<String>,
    pub format_tag: Option<u32>,
    pub attributes: BTreeMap<String, String>,
    pub groups: BTreeMap<String, Group>,
    pub entries: BTreeMap<String, Entry>,
    pub root_group_order: Vec<String>,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl Vault {
    pub fn new() -> Self {
        Self {
            id: None,
            format_tag: None,
            attributes: BTreeMap::new(),
            groups: BTreeMap::new(),
            entries: BTreeMap::new(),
            root_group_order: Vec::new(),
        }
    }

    pub fn group_exists(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    pub fn entry_exists(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// True if `parent` is `candidate` or a (possibly indirect) descendant
    /// of `candidate`, i.e. reparenting `candidate` under `parent` would
    /// create a cycle.
    pub fn is_descendant_or_self(&self, candidate: &str, parent: &str) -> bool {
        if candidate == parent {
            return true;
        }
        let mut cursor = parent.to_string();
        loop {
            if cursor == ROOT {
                return false;
            }
            if cursor == candidate {
                return true;
            }
            match self.groups.get(&cursor) {
                Some(g) => cursor = g.parent_id.clone(),
                None => return false,
            }
        }
    }

    /// Detaches a group id from its current parent's child order (root or group).
    pub fn detach_group(&mut self, id: &str) {
        let parent_id = self.groups.get(id).map(|g| g.parent_id.clone());
        match parent_id {
            Some(ref p) if p == ROOT => {
                self.root_group_order.retain(|g| g != id);
            }
            Some(ref p) => {
                if let Some(parent) = self.groups.get_mut(p) {
                    parent.child_group_order.retain(|g| g != id);
                }
            }
            None => {}
        }
    }

    /// Attaches a group id to a new parent's child order (root or group).
    pub fn attach_group(&mut self, id: &str, parent_id: &str) {
        if parent_id == ROOT {
            self.root_group_order.push(id.to_string());
        } else if let Some(parent) = self.groups.get_mut(parent_id) {
            parent.child_group_order.push(id.to_string());
        }
    }

    pub fn detach_entry(&mut self, id: &str) {
        if let Some(entry) = self.entries.get(id) {
            let parent = entry.parent_group_id.clone();
            if let Some(group) = self.groups.get_mut(&parent) {
                group.child_entry_order.retain(|e| e != id);
            }
        }
    }

    pub fn attach_entry(&mut self, id: &str, group_id: &str) {
        if let Some(group) = self.groups.get_mut(group_id) {
            group.child_entry_order.push(id.to_string());
        }
    }

    /// Removes a group and every descendant group/entry beneath it.
    pub fn remove_group_subtree(&mut self, id: &str) {
        self.detach_group(id);
        self.remove_group_subtree_inner(id);
    }

    fn remove_group_subtree_inner(&mut self, id: &str) {
        let Some(group) = self.groups.remove(id) else { return };
        for entry_id in &group.child_entry_order {
            self.entries.remove(entry_id);
        }
        for child_id in &group.child_group_order {
            self.remove_group_subtree_inner(child_id);
        }
    }

    /// Pre-order walk of every group reachable from the root, yielding
    /// `(depth, group_id)`. Used by the flattener to re-emit a minimal
    /// construction sequence.
    pub fn groups_preorder(&self) -> Vec<String> {
        let mut out = Vec::new();
        for id in &self.root_group_order {
            self.walk_preorder(id, &mut out);
        }
        out
    }

    fn walk_preorder(&self, id: &str, out: &mut Vec<String>) {
        out.push(id.to_string());
        if let Some(group) = self.groups.get(id) {
            for child in &group.child_group_order {
                self.walk_preorder(child, out);
            }
        }
    }
}

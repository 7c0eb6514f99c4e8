//! One pure function per opcode, mutating the in-memory tree.
//!
//! Replay is a pure function of `(tree, history, share-mapping)`: the
//! acting share id is an explicit parameter rather than read from shared
//! mutable state, even though none of the current executors branch on it.

use chrono::{DateTime, Utc};

use crate::error::ReplayError;
use crate::model::{Group, Entry, Vault, ROOT};

use super::opcode::Opcode;

/// Executes one already-lexed command against `vault`. Total within its
/// precondition: returns `Err` without partially mutating `vault` whenever
/// a precondition is violated on the first structural check.
pub fn execute(
    vault: &mut Vault,
    _share_id: Option<&str>,
    opcode: Opcode,
    args: &[String],
    ts: DateTime<Utc>,
) -> Result<(), ReplayError> {
    match opcode {
        Opcode::Fmt => {
            let tag: u32 = args[0]
                .parse()
                .map_err(|_| ReplayError::InvalidState(format!("bad format tag: {}", args[0])))?;
            vault.format_tag = Some(tag);
        }
        Opcode::Aid => {
            vault.id = Some(args[0].clone());
        }
        Opcode::Cmm | Opcode::Pad => {
            // no-ops
        }
        Opcode::Cgr => {
            let parent_id = &args[0];
            let group_id = &args[1];
            if vault.group_exists(group_id) {
                return Err(ReplayError::DuplicateID(group_id.clone()));
            }
            if parent_id != ROOT && !vault.group_exists(parent_id) {
                return Err(ReplayError::MissingParent(parent_id.clone()));
            }
            vault.groups.insert(group_id.clone(), Group::new(group_id.clone(), parent_id.clone()));
            vault.attach_group(group_id, parent_id);
        }
        Opcode::Tgr => {
            let group_id = &args[0];
            let title = &args[1];
            let group = vault
                .groups
                .get_mut(group_id)
                .ok_or_else(|| ReplayError::UnknownID(group_id.clone()))?;
            group.title = title.clone();
        }
        Opcode::Mgr => {
            let group_id = args[0].clone();
            let new_parent = args[1].clone();
            if !vault.group_exists(&group_id) {
                return Err(ReplayError::UnknownID(group_id));
            }
            if new_parent != ROOT && !vault.group_exists(&new_parent) {
                return Err(ReplayError::MissingParent(new_parent));
            }
            if vault.is_descendant_or_self(&group_id, &new_parent) {
                return Err(ReplayError::Cycle(group_id));
            }
            vault.detach_group(&group_id);
            if let Some(group) = vault.groups.get_mut(&group_id) {
                group.parent_id = new_parent.clone();
            }
            vault.attach_group(&group_id, &new_parent);
        }
        Opcode::Dgr => {
            let group_id = &args[0];
            if !vault.group_exists(group_id) {
                return Err(ReplayError::UnknownID(group_id.clone()));
            }
            vault.remove_group_subtree(group_id);
        }
        Opcode::Sga => {
            let group_id = &args[0];
            let key = &args[1];
            let value = &args[2];
            let group = vault
                .groups
                .get_mut(group_id)
                .ok_or_else(|| ReplayError::UnknownID(group_id.clone()))?;
            group.attributes.insert(key.clone(), value.clone());
        }
        Opcode::Dga => {
            let group_id = &args[0];
            let key = &args[1];
            let group = vault
                .groups
                .get_mut(group_id)
                .ok_or_else(|| ReplayError::UnknownID(group_id.clone()))?;
            group.attributes.remove(key);
        }
        Opcode::Cen => {
            let group_id = &args[0];
            let entry_id = &args[1];
            if vault.entry_exists(entry_id) {
                return Err(ReplayError::DuplicateID(entry_id.clone()));
            }
            if !vault.group_exists(group_id) {
                return Err(ReplayError::MissingParent(group_id.clone()));
            }
            vault.entries.insert(entry_id.clone(), Entry::new(entry_id.clone(), group_id.clone()));
            vault.attach_entry(entry_id, group_id);
        }
        Opcode::Men => {
            let entry_id = args[0].clone();
            let group_id = args[1].clone();
            if !vault.entry_exists(&entry_id) {
                return Err(ReplayError::UnknownID(entry_id));
            }
            if !vault.group_exists(&group_id) {
                return Err(ReplayError::MissingParent(group_id));
            }
            vault.detach_entry(&entry_id);
            if let Some(entry) = vault.entries.get_mut(&entry_id) {
                entry.parent_group_id = group_id.clone();
            }
            vault.attach_entry(&entry_id, &group_id);
        }
        Opcode::Den => {
            let entry_id = &args[0];
            if !vault.entry_exists(entry_id) {
                return Err(ReplayError::UnknownID(entry_id.clone()));
            }
            vault.detach_entry(entry_id);
            vault.entries.remove(entry_id);
        }
        Opcode::Sep => {
            let entry_id = &args[0];
            let key = &args[1];
            let value = &args[2];
            let entry = vault
                .entries
                .get_mut(entry_id)
                .ok_or_else(|| ReplayError::UnknownID(entry_id.clone()))?;
            entry.set_property(key, value, ts);
        }
        Opcode::Dep => {
            let entry_id = &args[0];
            let key = &args[1];
            let entry = vault
                .entries
                .get_mut(entry_id)
                .ok_or_else(|| ReplayError::UnknownID(entry_id.clone()))?;
            entry.delete_property(key, ts);
        }
        Opcode::Sea => {
            let entry_id = &args[0];
            let key = &args[1];
            let value = &args[2];
            let entry = vault
                .entries
                .get_mut(entry_id)
                .ok_or_else(|| ReplayError::UnknownID(entry_id.clone()))?;
            entry.attributes.insert(key.clone(), value.clone());
        }
        Opcode::Dea => {
            let entry_id = &args[0];
            let key = &args[1];
            let entry = vault
                .entries
                .get_mut(entry_id)
                .ok_or_else(|| ReplayError::UnknownID(entry_id.clone()))?;
            entry.attributes.remove(key);
        }
        Opcode::Saa => {
            let key = &args[0];
            let value = &args[1];
            vault.attributes.insert(key.clone(), value.clone());
        }
        Opcode::Daa => {
            let key = &args[0];
            vault.attributes.remove(key);
        }
    }
    Ok(())
}

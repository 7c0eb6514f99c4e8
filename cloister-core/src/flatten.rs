//! Compacts a history by folding prior state into a minimal equivalent
//! construction sequence.

use crate::command::{encode_command, Opcode};
use crate::config::EngineConfig;
use crate::model::Vault;

/// True when a history is worth flattening: long enough on its own, or
/// carrying any destructive command (whose effects can be folded away
/// entirely once the tree reflects them).
pub fn can_be_flattened(history_len: usize, has_destructive: bool, config: &EngineConfig) -> bool {
    has_destructive || history_len >= config.flatten_threshold
}

/// Re-emits `vault`'s current tree as a minimal construction sequence:
/// `fmt`, `aid`, the vault's own attributes, then for each group
/// (pre-order) `cgr` + `tgr` + `sga*`, and for each of its entries `cen` +
/// `sep*` + `sea*`. Property histories are not reproduced; replaying the
/// result starts fresh history for every property.
pub fn flatten(vault: &Vault) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(encode_command(None, Opcode::Fmt, &[vault.format_tag.unwrap_or(0).to_string()]));
    lines.push(encode_command(None, Opcode::Aid, &[vault.id.clone().unwrap_or_default()]));

    for (key, value) in &vault.attributes {
        lines.push(encode_command(None, Opcode::Saa, &[key.clone(), value.clone()]));
    }

    for group_id in vault.groups_preorder() {
        let group = &vault.groups[&group_id];
        lines.push(encode_command(None, Opcode::Cgr, &[group.parent_id.clone(), group.id.clone()]));
        if !group.title.is_empty() {
            lines.push(encode_command(None, Opcode::Tgr, &[group.id.clone(), group.title.clone()]));
        }
        for (key, value) in &group.attributes {
            lines.push(encode_command(None, Opcode::Sga, &[group.id.clone(), key.clone(), value.clone()]));
        }
        for entry_id in &group.child_entry_order {
            let entry = &vault.entries[entry_id];
            lines.push(encode_command(None, Opcode::Cen, &[group.id.clone(), entry.id.clone()]));
            for (key, value) in &entry.properties {
                lines.push(encode_command(None, Opcode::Sep, &[entry.id.clone(), key.clone(), value.clone()]));
            }
            for (key, value) in &entry.attributes {
                lines.push(encode_command(None, Opcode::Sea, &[entry.id.clone(), key.clone(), value.clone()]));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::execute;
    use crate::model::ROOT;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn replay(vault: &mut Vault, lines: &[String]) {
        for line in lines {
            let parsed = crate::command::parse_line(line).unwrap();
            execute(vault, parsed.share_id.as_deref(), parsed.opcode, &parsed.args, now()).unwrap();
        }
    }

    #[test]
    fn flatten_preserves_final_tree() {
        let mut vault = Vault::new();
        let original = vec![
            encode_command(None, Opcode::Fmt, &["2".into()]),
            encode_command(None, Opcode::Aid, &["vault-1".into()]),
            encode_command(None, Opcode::Cgr, &[ROOT.into(), "G1".into()]),
            encode_command(None, Opcode::Tgr, &["G1".into(), "Home".into()]),
            encode_command(None, Opcode::Cen, &["G1".into(), "E1".into()]),
            encode_command(None, Opcode::Sep, &["E1".into(), "username".into(), "alice".into()]),
            encode_command(None, Opcode::Sep, &["E1".into(), "username".into(), "alice2".into()]),
        ];
        replay(&mut vault, &original);

        let flattened = flatten(&vault);
        let mut replayed = Vault::new();
        replay(&mut replayed, &flattened);

        assert_eq!(replayed.id, vault.id);
        assert_eq!(replayed.groups, vault.groups);
        assert_eq!(replayed.entries.get("E1").unwrap().properties, vault.entries.get("E1").unwrap().properties);
        // history is folded away; only the final write survives.
        assert_eq!(replayed.entries.get("E1").unwrap().history.len(), 1);
    }

    #[test]
    fn flatten_is_due_on_destructive_command_regardless_of_length() {
        let config = EngineConfig::default();
        assert!(can_be_flattened(2, true, &config));
        assert!(!can_be_flattened(2, false, &config));
        assert!(can_be_flattened(config.flatten_threshold, false, &config));
    }
}

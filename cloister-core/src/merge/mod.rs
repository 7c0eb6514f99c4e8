//! Reconciles two histories that evolved from a shared prefix into one
//! merged, re-validated, re-padded history.

use chrono::Utc;

use crate::command::{encode_command, execute, generate_padding_line, parse_line, Opcode};
use crate::error::MergeError;
use crate::model::Vault;

fn longest_common_prefix(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn opcode_of(line: &str) -> Option<Opcode> {
    parse_line(line).ok().map(|p| p.opcode)
}

/// The first non-pad line in `prefix` must be `fmt`, the second `aid`.
fn has_valid_root(prefix: &[String]) -> bool {
    let mut non_pad = prefix.iter().filter(|l| opcode_of(l) != Some(Opcode::Pad));
    matches!(non_pad.next().and_then(|l| opcode_of(l)), Some(Opcode::Fmt))
        && matches!(non_pad.next().and_then(|l| opcode_of(l)), Some(Opcode::Aid))
}

/// Drops every destructive command (`dgr`, `dga`, `den`, `dep`, `dea`,
/// `daa`) from a losing side's history, per the manifest's uniform
/// destructive-command list.
pub fn prepare_history_for_merge(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| match opcode_of(line) {
            Some(op) => !op.is_destructive(),
            None => true, // malformed lines pass through; revalidation downgrades them
        })
        .cloned()
        .collect()
}

fn strip_padding(lines: &[String]) -> Vec<String> {
    lines.iter().filter(|l| opcode_of(l) != Some(Opcode::Pad)).cloned().collect()
}

fn replay_onto(vault: &mut Vault, lines: &[String]) {
    for line in lines {
        if let Ok(parsed) = parse_line(line) {
            let _ = execute(vault, parsed.share_id.as_deref(), parsed.opcode, &parsed.args, Utc::now());
        }
    }
}

/// Replays `lines` onto `vault` one at a time; any line that fails to
/// parse or replay is demoted to a `cmm` comment carrying the original
/// text, preserving auditability without losing the rest of the merge.
fn revalidate(vault: &mut Vault, lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let keep = match parse_line(&line) {
            Ok(parsed) => execute(vault, parsed.share_id.as_deref(), parsed.opcode, &parsed.args, Utc::now()).is_ok(),
            Err(_) => false,
        };
        if keep {
            out.push(line);
        } else {
            out.push(encode_command(None, Opcode::Cmm, &[line]));
        }
    }
    out
}

/// Merges `local` and `remote` histories sharing a common prefix,
/// returning the merged, re-padded history.
pub fn merge(local: &[String], remote: &[String]) -> Result<Vec<String>, MergeError> {
    let prefix_len = longest_common_prefix(local, remote);
    let prefix = &local[..prefix_len];
    if !has_valid_root(prefix) {
        return Err(MergeError::NoCommonRoot);
    }

    let a = strip_padding(&local[prefix_len..]);
    let b_prepared = prepare_history_for_merge(&remote[prefix_len..]);
    let b = strip_padding(&b_prepared);

    let mut vault = Vault::new();
    replay_onto(&mut vault, prefix);

    let mut suffix: Vec<String> = Vec::with_capacity(a.len() + b.len());
    suffix.extend(a);
    suffix.extend(b);
    let validated_suffix = revalidate(&mut vault, suffix);

    let mut merged = Vec::with_capacity(prefix.len() + validated_suffix.len() * 2);
    merged.extend_from_slice(prefix);
    for line in validated_suffix {
        merged.push(line);
        merged.push(generate_padding_line());
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ROOT;

    fn cmd(op: Opcode, args: &[&str]) -> String {
        encode_command(None, op, &args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    fn base() -> Vec<String> {
        vec![cmd(Opcode::Fmt, &["2"]), cmd(Opcode::Aid, &["vault-1"]), cmd(Opcode::Cgr, &[ROOT, "G1"])]
    }

    #[test]
    fn rejects_histories_without_a_common_root() {
        let local = vec![cmd(Opcode::Fmt, &["2"])];
        let remote = vec![cmd(Opcode::Fmt, &["3"])];
        assert_eq!(merge(&local, &remote), Err(MergeError::NoCommonRoot));
    }

    #[test]
    fn concurrent_delete_is_dropped_and_concurrent_edit_survives() {
        let mut local = base();
        local.push(cmd(Opcode::Cen, &["G1", "E1"]));
        local.push(cmd(Opcode::Sep, &["E1", "password", "old"]));

        let mut remote = local.clone();

        local.push(cmd(Opcode::Sep, &["E1", "password", "x"]));
        remote.push(cmd(Opcode::Den, &["E1"]));

        let merged = merge(&local, &remote).unwrap();
        let mut vault = Vault::new();
        replay_onto(&mut vault, &merged);

        assert!(vault.entry_exists("E1"));
        assert_eq!(vault.entries["E1"].properties["password"], "x");
    }

    #[test]
    fn daa_is_dropped_like_any_other_destructive_opcode() {
        let mut local = base();
        local.push(cmd(Opcode::Saa, &["theme", "dark"]));
        let mut remote = local.clone();
        remote.push(cmd(Opcode::Daa, &["theme"]));

        let merged = merge(&local, &remote).unwrap();
        let mut vault = Vault::new();
        replay_onto(&mut vault, &merged);

        assert_eq!(vault.attributes.get("theme"), Some(&"dark".to_string()));
    }

    #[test]
    fn merged_history_has_no_consecutive_padding() {
        let mut local = base();
        local.push(cmd(Opcode::Tgr, &["G1", "Home"]));
        let remote = local.clone();
        local.push(cmd(Opcode::Sga, &["G1", "color", "red"]));

        let merged = merge(&local, &remote).unwrap();
        let mut prev_was_pad = false;
        for line in &merged {
            let is_pad = opcode_of(line) == Some(Opcode::Pad);
            assert!(!(is_pad && prev_was_pad), "two padding lines in a row");
            prev_was_pad = is_pad;
        }
    }

    #[test]
    fn unknown_id_reference_in_the_losing_side_is_downgraded_to_comment() {
        let local = base();
        let mut remote = local.clone();
        remote.push(cmd(Opcode::Sep, &["GHOST", "username", "nope"]));

        let merged = merge(&local, &remote).unwrap();
        assert!(merged.iter().any(|l| opcode_of(l) == Some(Opcode::Cmm)));
    }
}

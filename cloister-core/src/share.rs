//! Demultiplexes `$<uuid> <cmd>` lines into per-share sub-histories and a
//! base history.

use std::collections::BTreeMap;

use crate::command::is_valid_uuid;

/// Result of [`extract_shares`]: the un-prefixed base lines, plus one
/// un-prefixed sub-history per share id, each in original relative order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedShares {
    pub base: Vec<String>,
    pub shares: BTreeMap<String, Vec<String>>,
}

/// Splits `$<uuid>` off the front of a line if present and valid, returning
/// `(share_id, rest_of_line)`.
fn split_share_prefix(line: &str) -> (Option<&str>, &str) {
    let Some(rest) = line.strip_prefix('$') else { return (None, line) };
    let Some((candidate, tail)) = rest.split_once(' ') else { return (None, line) };
    if is_valid_uuid(candidate) {
        (Some(candidate), tail)
    } else {
        (None, line)
    }
}

/// Pure and reversible given the mapping: every line lands in exactly one
/// bucket, unprefixed, in its original relative order within that bucket.
pub fn extract_shares(history: &[String]) -> ExtractedShares {
    let mut result = ExtractedShares::default();
    for line in history {
        match split_share_prefix(line) {
            (Some(share_id), rest) => {
                result.shares.entry(share_id.to_string()).or_default().push(rest.to_string());
            }
            (None, _) => result.base.push(line.clone()),
        }
    }
    result
}

/// Re-prefixes every line in `lines` with `share_id`, the inverse of
/// stripping performed by [`extract_shares`] for one bucket.
pub fn reprefix(share_id: &str, lines: &[String]) -> Vec<String> {
    lines.iter().map(|l| format!("${share_id} {l}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn routes_share_prefixed_lines_separately() {
        let history = lines(&[
            "fmt 2",
            "aid abc",
            "$11111111-1111-1111-1111-111111111111 cmm note-one",
            "cgr 0 G1",
            "$11111111-1111-1111-1111-111111111111 cmm note-two",
        ]);
        let extracted = extract_shares(&history);
        assert_eq!(extracted.base, lines(&["fmt 2", "aid abc", "cgr 0 G1"]));
        assert_eq!(
            extracted.shares["11111111-1111-1111-1111-111111111111"],
            lines(&["cmm note-one", "cmm note-two"])
        );
    }

    #[test]
    fn malformed_share_prefix_is_treated_as_base() {
        let history = lines(&["$not-a-uuid cmm note"]);
        let extracted = extract_shares(&history);
        assert_eq!(extracted.base, history);
        assert!(extracted.shares.is_empty());
    }

    #[test]
    fn reprefix_is_the_inverse_of_stripping() {
        let share_lines = lines(&["cmm note-one", "cmm note-two"]);
        let reprefixed = reprefix("11111111-1111-1111-1111-111111111111", &share_lines);
        let extracted = extract_shares(&reprefixed);
        assert_eq!(extracted.shares["11111111-1111-1111-1111-111111111111"], share_lines);
        assert!(extracted.base.is_empty());
    }

    #[test]
    fn history_with_no_shares_is_all_base() {
        let history = lines(&["fmt 2", "aid abc"]);
        let extracted = extract_shares(&history);
        assert_eq!(extracted.base, history);
        assert!(extracted.shares.is_empty());
    }
}

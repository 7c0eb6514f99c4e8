//! Parses a command line into `(share_id?, opcode, args)`.

use crate::error::LexError;

use super::opcode::Opcode;

/// A parsed command line, with any `$<uuid>` share prefix extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub share_id: Option<String>,
    pub opcode: Opcode,
    pub args: Vec<String>,
}

/// `^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$`, checked
/// by hand rather than pulling in a regex engine for one shape.
pub fn is_valid_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    let expected_lens = [8, 4, 4, 4, 12];
    if groups.len() != expected_lens.len() {
        return false;
    }
    groups
        .iter()
        .zip(expected_lens)
        .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()))
}

/// Splits a line into whitespace-separated tokens, honoring `"..."`
/// quoting with doubled-quote escaping.
fn tokenize(line: &str) -> Result<Vec<String>, LexError> {
    let chars: Vec<char> = line.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < n {
        while i < n && chars[i] == ' ' {
            i += 1;
        }
        if i >= n {
            break;
        }
        if chars[i] == '"' {
            i += 1;
            let mut tok = String::new();
            loop {
                if i >= n {
                    return Err(LexError::Unterminated);
                }
                if chars[i] == '"' {
                    if i + 1 < n && chars[i + 1] == '"' {
                        tok.push('"');
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                tok.push(chars[i]);
                i += 1;
            }
            tokens.push(tok);
        } else {
            let start = i;
            while i < n && chars[i] != ' ' {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    Ok(tokens)
}

/// Parses one command line, extracting a share prefix if present and
/// validating opcode/arity.
pub fn parse_line(line: &str) -> Result<ParsedCommand, LexError> {
    let mut tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Err(LexError::Malformed(line.to_string()));
    }

    let share_id = if let Some(first) = tokens.first() {
        if let Some(candidate) = first.strip_prefix('$') {
            if !is_valid_uuid(candidate) {
                return Err(LexError::Malformed(line.to_string()));
            }
            let id = candidate.to_string();
            tokens.remove(0);
            Some(id)
        } else {
            None
        }
    } else {
        None
    };

    if tokens.is_empty() {
        return Err(LexError::Malformed(line.to_string()));
    }

    let opcode_token = tokens.remove(0);
    let opcode = Opcode::from_token(&opcode_token).ok_or(LexError::UnknownOpcode(opcode_token))?;

    let expected = opcode.arity();
    if tokens.len() != expected {
        return Err(LexError::WrongArity {
            opcode: opcode.token().to_string(),
            expected,
            got: tokens.len(),
        });
    }

    Ok(ParsedCommand { share_id, opcode, args: tokens })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_command() {
        let parsed = parse_line("fmt 2").unwrap();
        assert_eq!(parsed.share_id, None);
        assert_eq!(parsed.opcode, Opcode::Fmt);
        assert_eq!(parsed.args, vec!["2"]);
    }

    #[test]
    fn parses_quoted_arg_with_escaped_quote() {
        let parsed = parse_line(r#"sep E1 username "ali""ce""#).unwrap();
        assert_eq!(parsed.args, vec!["E1", "username", r#"ali"ce"#]);
    }

    #[test]
    fn parses_share_prefix() {
        let parsed = parse_line("$11111111-1111-1111-1111-111111111111 cmm note").unwrap();
        assert_eq!(parsed.share_id.as_deref(), Some("11111111-1111-1111-1111-111111111111"));
        assert_eq!(parsed.opcode, Opcode::Cmm);
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert_eq!(parse_line(r#"sep E1 username "alice"#), Err(LexError::Unterminated));
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(matches!(parse_line("fmt"), Err(LexError::WrongArity { .. })));
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert!(matches!(parse_line("xyz a"), Err(LexError::UnknownOpcode(_))));
    }

    #[test]
    fn uuid_validation() {
        assert!(is_valid_uuid("11111111-1111-1111-1111-111111111111"));
        assert!(!is_valid_uuid("not-a-uuid"));
        assert!(!is_valid_uuid("11111111-1111-1111-1111-11111111111")); // too short
    }
}

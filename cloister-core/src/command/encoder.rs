//! Encodes `(opcode, args)` back into a command line, with escaping and
//! padding-line generation.

use super::opcode::Opcode;

/// True iff `s` can be emitted without quoting: `^[A-Za-z0-9]+$`.
pub fn is_raw_safe(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Encodes a single argument, quoting and escaping doubled-quotes if needed.
pub fn encode_arg(s: &str) -> String {
    if is_raw_safe(s) {
        s.to_string()
    } else {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for ch in s.chars() {
            if ch == '"' {
                out.push('"');
                out.push('"');
            } else {
                out.push(ch);
            }
        }
        out.push('"');
        out
    }
}

/// Encodes a full command line, optionally share-prefixed.
pub fn encode_command(share_id: Option<&str>, opcode: Opcode, args: &[String]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(args.len() + 2);
    if let Some(id) = share_id {
        parts.push(format!("${id}"));
    }
    parts.push(opcode.token().to_string());
    parts.extend(args.iter().map(|a| encode_arg(a)));
    parts.join(" ")
}

/// Generates a `pad <nonce>` line with a fresh random nonce.
pub fn generate_padding_line() -> String {
    let nonce = cloister_envelope::Cryptor::random_string(16);
    encode_command(None, Opcode::Pad, std::slice::from_ref(&nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_safe_args_are_unquoted() {
        assert_eq!(encode_arg("alice123"), "alice123");
    }

    #[test]
    fn unsafe_args_are_quoted_and_escaped() {
        assert_eq!(encode_arg(r#"ali"ce"#), r#""ali""ce""#);
        assert_eq!(encode_arg("hello world"), r#""hello world""#);
        assert_eq!(encode_arg(""), r#""""#);
    }

    #[test]
    fn encodes_full_command_with_share_prefix() {
        let line = encode_command(
            Some("11111111-1111-1111-1111-111111111111"),
            Opcode::Sep,
            &["E1".into(), "username".into(), "alice".into()],
        );
        assert_eq!(line, "$11111111-1111-1111-1111-111111111111 sep E1 username alice");
    }

    #[test]
    fn padding_line_round_trips_through_the_lexer() {
        let line = generate_padding_line();
        let parsed = crate::command::lexer::parse_line(&line).unwrap();
        assert_eq!(parsed.opcode, Opcode::Pad);
        assert_eq!(parsed.args.len(), 1);
    }
}

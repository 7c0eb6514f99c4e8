//! Command opcodes, lexing, encoding, and the per-opcode executors that
//! mutate the in-memory vault tree.

mod encoder;
mod executors;
mod lexer;
mod opcode;

pub use encoder::{encode_arg, encode_command, generate_padding_line, is_raw_safe};
pub use executors::execute;
pub use lexer::{is_valid_uuid, parse_line, ParsedCommand};
pub use opcode::{Opcode, OpcodeInfo};

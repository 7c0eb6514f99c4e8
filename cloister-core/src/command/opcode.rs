//! The opcode manifest: a closed tagged variant with an exhaustive match,
//! rather than a runtime string-keyed dispatch table.

/// Arity and destructiveness for one opcode, looked up by [`Opcode::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub token: &'static str,
    pub arity: usize,
    pub destructive: bool,
}

/// The full command manifest (see the command lexer/encoder component design).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Fmt,
    Aid,
    Cmm,
    Pad,
    Cgr,
    Tgr,
    Mgr,
    Dgr,
    Sga,
    Dga,
    Cen,
    Men,
    Den,
    Sep,
    Dep,
    Sea,
    Dea,
    Saa,
    Daa,
}

impl Opcode {
    /// Parses a token, accepting both spellings of the aliased
    /// property opcodes (`sep`/`sem`, `dep`/`dem`).
    pub fn from_token(token: &str) -> Option<Opcode> {
        Some(match token {
            "fmt" => Opcode::Fmt,
            "aid" => Opcode::Aid,
            "cmm" => Opcode::Cmm,
            "pad" => Opcode::Pad,
            "cgr" => Opcode::Cgr,
            "tgr" => Opcode::Tgr,
            "mgr" => Opcode::Mgr,
            "dgr" => Opcode::Dgr,
            "sga" => Opcode::Sga,
            "dga" => Opcode::Dga,
            "cen" => Opcode::Cen,
            "men" => Opcode::Men,
            "den" => Opcode::Den,
            "sep" | "sem" => Opcode::Sep,
            "dep" | "dem" => Opcode::Dep,
            "sea" => Opcode::Sea,
            "dea" => Opcode::Dea,
            "saa" => Opcode::Saa,
            "daa" => Opcode::Daa,
            _ => return None,
        })
    }

    pub fn info(self) -> OpcodeInfo {
        let (token, arity, destructive) = match self {
            Opcode::Fmt => ("fmt", 1, false),
            Opcode::Aid => ("aid", 1, false),
            Opcode::Cmm => ("cmm", 1, false),
            Opcode::Pad => ("pad", 1, false),
            Opcode::Cgr => ("cgr", 2, false),
            Opcode::Tgr => ("tgr", 2, false),
            Opcode::Mgr => ("mgr", 2, false),
            Opcode::Dgr => ("dgr", 1, true),
            Opcode::Sga => ("sga", 3, false),
            Opcode::Dga => ("dga", 2, true),
            Opcode::Cen => ("cen", 2, false),
            Opcode::Men => ("men", 2, false),
            Opcode::Den => ("den", 1, true),
            Opcode::Sep => ("sep", 3, false),
            Opcode::Dep => ("dep", 2, true),
            Opcode::Sea => ("sea", 3, false),
            Opcode::Dea => ("dea", 2, true),
            Opcode::Saa => ("saa", 2, false),
            Opcode::Daa => ("daa", 1, true),
        };
        OpcodeInfo { token, arity, destructive }
    }

    pub fn token(self) -> &'static str {
        self.info().token
    }

    pub fn arity(self) -> usize {
        self.info().arity
    }

    pub fn is_destructive(self) -> bool {
        self.info().destructive
    }

    /// Every destructive opcode, in manifest order. Used by the merge
    /// engine's `prepareHistoryForMerge` to strip a losing side's
    /// destructive commands uniformly — including `daa`.
    pub const DESTRUCTIVE: &'static [Opcode] =
        &[Opcode::Dgr, Opcode::Dga, Opcode::Den, Opcode::Dep, Opcode::Dea, Opcode::Daa];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_same_opcode() {
        assert_eq!(Opcode::from_token("sep"), Opcode::from_token("sem"));
        assert_eq!(Opcode::from_token("dep"), Opcode::from_token("dem"));
    }

    #[test]
    fn every_opcode_round_trips_through_its_canonical_token() {
        let all = [
            Opcode::Fmt, Opcode::Aid, Opcode::Cmm, Opcode::Pad, Opcode::Cgr, Opcode::Tgr,
            Opcode::Mgr, Opcode::Dgr, Opcode::Sga, Opcode::Dga, Opcode::Cen, Opcode::Men,
            Opcode::Den, Opcode::Sep, Opcode::Dep, Opcode::Sea, Opcode::Dea, Opcode::Saa,
            Opcode::Daa,
        ];
        for op in all {
            assert_eq!(Opcode::from_token(op.token()), Some(op));
        }
    }

    #[test]
    fn destructive_flags_match_manifest() {
        for op in Opcode::DESTRUCTIVE {
            assert!(op.is_destructive());
        }
        assert!(!Opcode::Sep.is_destructive());
    }
}

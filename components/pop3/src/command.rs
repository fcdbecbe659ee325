use std::fmt::{Display, Formatter};

/// The twelve POP3 verbs this engine recognizes.
///
/// Digest authentication (`APOP`) and SASL negotiation (`AUTH`) are
/// deliberately absent: the engine's credential check is a pluggable
/// static username/password predicate, never a challenge-response or SASL
/// exchange, so those two tokens fall through to the same "command not
/// recognized" path as any other unrecognized 4-letter token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `QUIT` — valid in every state; ends the session.
    Quit,
    /// `CAPA` — valid in every state; lists server capabilities.
    Capa,
    /// `NOOP` — valid in every state; does nothing.
    Noop,
    /// `USER <name>` — only valid in the `START` state.
    User,
    /// `PASS <password>` — only valid in the `USER` state.
    Pass,
    /// `RSET` — restores every message's `active` flag.
    Rset,
    /// `STAT` — reports active message count and total size.
    Stat,
    /// `LIST [n]` — scan listing for one or all active messages.
    List,
    /// `UIDL [n]` — unique-id listing for one or all active messages.
    Uidl,
    /// `DELE n` — marks message `n` inactive for this session.
    Dele,
    /// `RETR n` — streams the full contents of message `n`.
    Retr,
    /// `TOP n 0` — streams the header prefix of message `n`.
    Top,
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let v = match self {
            Command::Quit => "QUIT",
            Command::Capa => "CAPA",
            Command::Noop => "NOOP",
            Command::User => "USER",
            Command::Pass => "PASS",
            Command::Rset => "RSET",
            Command::Stat => "STAT",
            Command::List => "LIST",
            Command::Uidl => "UIDL",
            Command::Dele => "DELE",
            Command::Retr => "RETR",
            Command::Top => "TOP",
        };
        write!(f, "{}", v)
    }
}

impl Command {
    /// Recognize a 4-character, already-lowercased command token (see
    /// [`crate::line::read_command_token`]). Returns `None` for any token
    /// that isn't one of the twelve recognized verbs.
    pub fn from_token(token: &str) -> Option<Command> {
        Some(match token {
            "quit" => Command::Quit,
            "capa" => Command::Capa,
            "noop" => Command::Noop,
            "user" => Command::User,
            "pass" => Command::Pass,
            "rset" => Command::Rset,
            "stat" => Command::Stat,
            "list" => Command::List,
            "uidl" => Command::Uidl,
            "dele" => Command::Dele,
            "retr" => Command::Retr,
            "top " => Command::Top,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_command() {
        for (token, cmd) in [
            ("quit", Command::Quit),
            ("capa", Command::Capa),
            ("noop", Command::Noop),
            ("user", Command::User),
            ("pass", Command::Pass),
            ("rset", Command::Rset),
            ("stat", Command::Stat),
            ("list", Command::List),
            ("uidl", Command::Uidl),
            ("dele", Command::Dele),
            ("retr", Command::Retr),
            ("top ", Command::Top),
        ] {
            assert_eq!(Command::from_token(token), Some(cmd));
        }
    }

    #[test]
    fn rejects_apop_and_auth() {
        assert_eq!(Command::from_token("apop"), None);
        assert_eq!(Command::from_token("auth"), None);
    }
}

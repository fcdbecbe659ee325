//! `postman-pop3` implements the POP3 session engine: bounded line
//! input, command recognition, username canonicalization, the
//! authorization/transaction state machine, and message streaming.
//!
//! It covers:
//! - bounded line/argument reading with CRLF tolerance ([`line`])
//! - the twelve recognized verbs ([`command`])
//! - username canonicalization and numeric index parsing ([`parse`],
//!   [`parse_top`])
//! - the session state machine and `RETR`/`TOP` streaming ([`session`])

pub mod command;
pub mod error;
pub mod line;
pub mod parse;
pub mod parse_top;
pub mod session;

pub use command::Command;
pub use error::Pop3Error;
pub use session::{CredentialCheck, Phase, Session};

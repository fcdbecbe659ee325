//! Bounded line input for the POP3 command loop (§4.F): a 4-byte command
//! token followed by an argument terminated by CRLF (lone CR or lone LF
//! tolerated, with an operator-log warning).

use std::io::Read;

use crate::error::Pop3Error;

/// Longest argument this reader will hand back before reporting
/// "Parameters too long".
pub const LINE_LIMIT: usize = 1023;

/// The recognized shape of a command token: four characters (alphabetic
/// ones case-folded to lowercase, anything else padded with spaces) plus
/// whether the byte immediately following it was a valid separator
/// (space, CR, or LF).
pub struct CommandToken {
    pub text: String,
    pub valid_shape: bool,
}

/// What came back from reading an argument line.
pub enum ArgumentOutcome {
    /// The argument, with its CRLF/CR/LF terminator already consumed.
    Line(Vec<u8>),
    /// The line exceeded [`LINE_LIMIT`] bytes; the remainder has already
    /// been discarded and its terminator consumed.
    TooLong,
}

/// Wraps a byte stream with a one-byte pushback buffer, standing in for
/// a C-style `ungetc`.
pub struct LineReader<R> {
    inner: R,
    pushback: Option<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        LineReader {
            inner,
            pushback: None,
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Pop3Error> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn unread_byte(&mut self, b: u8) {
        debug_assert!(self.pushback.is_none(), "only one byte of pushback is ever needed");
        self.pushback = Some(b);
    }

    /// Read the 4-byte command token that starts every command line.
    ///
    /// Returns `Ok(None)` on a clean EOF anywhere during the 4-byte
    /// token read — the caller should end the session normally in that
    /// case, since no response has been sent for this command yet. An
    /// EOF after the token (the separator check, or argument reading) is
    /// fatal, since a client that disappears mid-line left the protocol
    /// in an undefined state.
    pub fn read_command_token(&mut self) -> Result<Option<CommandToken>, Pop3Error> {
        let mut token = [b' '; 4];
        let mut terminated = false;
        for slot in token.iter_mut() {
            if terminated {
                continue;
            }
            let b = match self.read_byte()? {
                None => return Ok(None),
                Some(b) => b,
            };
            if b.is_ascii_alphabetic() {
                *slot = b.to_ascii_lowercase();
            } else {
                log::warn!("saw non-alphabetic byte {b:#04x} while reading command token");
                self.unread_byte(b);
                terminated = true;
            }
        }
        let next = self.read_byte()?.ok_or(Pop3Error::UnexpectedEof)?;
        self.unread_byte(next);
        let valid_shape = matches!(next, b' ' | b'\r' | b'\n');
        Ok(Some(CommandToken {
            text: String::from_utf8_lossy(&token).into_owned(),
            valid_shape,
        }))
    }

    /// Consume a CRLF, lone CR, or lone LF terminator. Accepts all three,
    /// but logs a warning for the non-canonical cases, matching §4.F.
    fn eat_newline(&mut self) -> Result<(), Pop3Error> {
        let c = self.read_byte()?.ok_or(Pop3Error::UnexpectedEof)?;
        if c == b'\n' {
            log::warn!("unpaired \\n in input");
            return Ok(());
        }
        if c != b'\r' {
            return Err(Pop3Error::UnexpectedEof);
        }
        match self.read_byte()? {
            Some(b'\n') => {}
            Some(other) => {
                self.unread_byte(other);
                log::warn!("unpaired \\r in input");
            }
            None => log::warn!("unpaired \\r at end of input"),
        }
        Ok(())
    }

    /// Discard everything up to (and including) the next line terminator,
    /// with no length limit. Used for commands whose argument, if any, is
    /// ignored entirely (`QUIT`, `CAPA`, `NOOP`, `STAT`, `RSET`).
    pub fn consume_to_eol(&mut self) -> Result<(), Pop3Error> {
        self.discard_rest_of_line()
    }

    /// Read the argument portion of a command line: everything after the
    /// 4-byte token, up to (not including) the line terminator, capped at
    /// [`LINE_LIMIT`] bytes.
    pub fn read_argument(&mut self) -> Result<ArgumentOutcome, Pop3Error> {
        let mut buf = Vec::with_capacity(64);
        loop {
            let b = self.read_byte()?.ok_or(Pop3Error::UnexpectedEof)?;
            if b == b'\r' || b == b'\n' {
                self.unread_byte(b);
                self.eat_newline()?;
                return Ok(ArgumentOutcome::Line(buf));
            }
            if buf.len() == LINE_LIMIT {
                self.unread_byte(b);
                self.discard_rest_of_line()?;
                return Ok(ArgumentOutcome::TooLong);
            }
            buf.push(b);
        }
    }

    fn discard_rest_of_line(&mut self) -> Result<(), Pop3Error> {
        loop {
            let b = self.read_byte()?.ok_or(Pop3Error::UnexpectedEof)?;
            if b == b'\r' || b == b'\n' {
                self.unread_byte(b);
                return self.eat_newline();
            }
        }
    }
}

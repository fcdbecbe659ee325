//! The POP3 session state machine (§4.H) and message streaming (§4.I).
//!
//! A `Session` owns one command loop over a single connection: it reads
//! command lines with [`LineReader`], dispatches them against the current
//! [`Phase`], and on a successful login holds a private, writable
//! [`Maildrop`] snapshot that `DELE`/`RSET` mutate in place.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use postman_journal::{meta, Maildrop};

use crate::command::Command;
use crate::error::Pop3Error;
use crate::line::{ArgumentOutcome, LineReader};
use crate::parse::{self, IndexError};
use crate::parse_top::{self, TopArgError};

/// The four phases a session moves through. There is no way back except
/// forward; a session that fails login stays in `User` and can retry
/// `PASS`, or abandon and `QUIT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Start,
    User,
    Login,
    Quit,
}

/// `read_argument`'s result still carries the command's separator byte
/// read straight off the wire (the single space between the 4-byte token
/// and the digits, or more, if a client sends extra blanks) — `strtoumax`
/// in the original skips that leading whitespace before parsing, so the
/// numeric-argument handlers (`LIST`, `UIDL`, `DELE`, `RETR`, `TOP`) do
/// too, once they've already used the untrimmed argument to tell "no
/// argument at all" apart from "blank argument present".
fn strip_leading_whitespace(arg: &str) -> &str {
    arg.trim_start_matches(|c: char| c.is_ascii_whitespace())
}

/// Tag advertised in `CAPA`'s `IMPLEMENTATION` line.
const IMPLEMENTATION_TAG: &str = "postman-pop3";

const SIZE_OF_COPY_BUFFER: usize = 8192;

/// Pluggable credential check (§6): username and raw password bytes in,
/// pass/fail out. A config-less server passes a predicate that always
/// returns `true`.
pub type CredentialCheck<'a> = Box<dyn Fn(&str, &[u8]) -> bool + 'a>;

pub struct Session<'a, R, W> {
    reader: LineReader<R>,
    writer: W,
    journal: &'a File,
    mail_dir: PathBuf,
    check_credentials: CredentialCheck<'a>,
    phase: Phase,
    pending_username: Option<String>,
    maildrop: Option<Maildrop>,
}

impl<'a, R: Read, W: Write> Session<'a, R, W> {
    pub fn new(
        input: R,
        output: W,
        journal: &'a File,
        mail_dir: PathBuf,
        check_credentials: CredentialCheck<'a>,
    ) -> Self {
        Session {
            reader: LineReader::new(input),
            writer: output,
            journal,
            mail_dir,
            check_credentials,
            phase: Phase::Start,
            pending_username: None,
            maildrop: None,
        }
    }

    /// Drive the session to completion: send the greeting, then dispatch
    /// commands until `QUIT` or a clean EOF at a command boundary. Any
    /// `Err` returned here is fatal to the process (exit 1 for protocol
    /// errors, exit 2 for output write failures — the binary decides
    /// which based on the error variant).
    pub fn run(&mut self) -> Result<(), Pop3Error> {
        self.send("+OK POP3 server ready")?;
        loop {
            let token = match self.reader.read_command_token()? {
                None => return Ok(()),
                Some(t) => t,
            };
            if !token.valid_shape {
                self.reader.consume_to_eol()?;
                self.send("-ERR command not recognized")?;
                continue;
            }
            let command = match Command::from_token(&token.text) {
                Some(c) => c,
                None => {
                    self.reader.consume_to_eol()?;
                    self.send("-ERR command not recognized")?;
                    continue;
                }
            };
            self.dispatch(command)?;
            if self.phase == Phase::Quit {
                return Ok(());
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<(), Pop3Error> {
        match command {
            Command::Quit => self.handle_quit(),
            Command::Capa => self.handle_capa(),
            Command::Noop => self.handle_noop(),
            Command::User => self.handle_user(),
            Command::Pass => self.handle_pass(),
            Command::Rset => self.handle_rset(),
            Command::Stat => self.handle_stat(),
            Command::List => self.handle_list(),
            Command::Uidl => self.handle_uidl(),
            Command::Dele => self.handle_dele(),
            Command::Retr => self.handle_retr(),
            Command::Top => self.handle_top(),
        }
    }

    fn send(&mut self, line: &str) -> Result<(), Pop3Error> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\r\n"))
            .map_err(|_| Pop3Error::WriteFailed)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Pop3Error> {
        self.writer
            .write_all(bytes)
            .map_err(|_| Pop3Error::WriteFailed)
    }

    // -- state-independent commands -----------------------------------

    fn handle_quit(&mut self) -> Result<(), Pop3Error> {
        // This engine never writes deletions back to the journal, so
        // the "deletions will not take effect" branch can never actually
        // fire in this build. It is kept as a placeholder for a future
        // durable-delete implementation rather than removed outright.
        let persistence_of_deletes_failed = false;
        if persistence_of_deletes_failed {
            self.send("-ERR unable to delete some messages")?;
        } else {
            self.send("+OK bye")?;
        }
        self.phase = Phase::Quit;
        Ok(())
    }

    fn handle_capa(&mut self) -> Result<(), Pop3Error> {
        self.reader.consume_to_eol()?;
        self.send("+OK capabilities list follows")?;
        self.send("USER")?;
        self.send("UIDL")?;
        self.send("TOP")?;
        self.send("EXPIRE NEVER")?;
        self.send(&format!("IMPLEMENTATION {IMPLEMENTATION_TAG}"))?;
        self.send(".")
    }

    fn handle_noop(&mut self) -> Result<(), Pop3Error> {
        self.reader.consume_to_eol()?;
        self.send("+OK did nothing")
    }

    // -- authorization phase commands ----------------------------------

    fn handle_user(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::Start {
            return self.send("-ERR command out of sequence");
        }
        if arg.is_empty() {
            return self.send("-ERR unrecognized command");
        }
        let start = match arg.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => i,
            None => return self.send("-ERR parameter required for user command"),
        };
        match parse::canonicalize_username(&arg[start..]) {
            Some(canon) => {
                self.pending_username = Some(canon);
                self.phase = Phase::User;
                self.send("+OK got username")
            }
            None => self.send("-ERR invalid username"),
        }
    }

    fn handle_pass(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::User {
            return self.send("-ERR command out of sequence");
        }
        if arg.first() != Some(&b' ') {
            return self.send("-ERR unrecognized command");
        }
        let password = &arg[1..];
        let username = self
            .pending_username
            .clone()
            .expect("phase User implies a pending username was recorded");
        if !(self.check_credentials)(&username, password) {
            return self.send("-ERR invalid password");
        }
        let limit = meta::resolve_limit(self.journal, &username)?;
        let maildrop = Maildrop::load(self.journal, limit)?;
        self.maildrop = Some(maildrop);
        self.phase = Phase::Login;
        self.send("+OK got password")
    }

    // -- transaction phase commands -------------------------------------

    fn handle_rset(&mut self) -> Result<(), Pop3Error> {
        self.reader.consume_to_eol()?;
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        for record in self.maildrop_mut().records_mut() {
            record.set_active(true);
        }
        self.send("+OK reset complete")
    }

    fn handle_stat(&mut self) -> Result<(), Pop3Error> {
        self.reader.consume_to_eol()?;
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        let (count, total) = self
            .maildrop_ref()
            .records()
            .iter()
            .filter(|r| r.active())
            .fold((0usize, 0i64), |(n, sz), r| (n + 1, sz + r.size));
        self.send(&format!("+OK {count} {total}"))
    }

    fn handle_list(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        let arg = String::from_utf8_lossy(&arg).into_owned();
        if arg.is_empty() {
            self.send("+OK maildrop follows")?;
            let lines: Vec<String> = self
                .maildrop_ref()
                .records()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.active())
                .map(|(i, r)| format!("{} {}", i + 1, r.size))
                .collect();
            for line in lines {
                self.send(&line)?;
            }
            return self.send(".");
        }
        let digits = strip_leading_whitespace(&arg);
        match self.resolve_index(digits, "list") {
            Ok(index) => {
                let size = self.maildrop_ref().records()[index].size;
                self.send(&format!("+OK {} {}", index + 1, size))
            }
            Err(message) => self.send(&message),
        }
    }

    fn handle_uidl(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        let arg = String::from_utf8_lossy(&arg).into_owned();
        if arg.is_empty() {
            self.send("+OK unique-id listing follows")?;
            let lines: Vec<String> = self
                .maildrop_ref()
                .records()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.active())
                .map(|(i, r)| format!("{} {}", i + 1, r.name()))
                .collect();
            for line in lines {
                self.send(&line)?;
            }
            return self.send(".");
        }
        let digits = strip_leading_whitespace(&arg);
        match self.resolve_index(digits, "uidl") {
            Ok(index) => {
                let name = self.maildrop_ref().records()[index].name().to_string();
                self.send(&format!("+OK {} {}", index + 1, name))
            }
            Err(message) => self.send(&message),
        }
    }

    fn handle_dele(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        let arg = String::from_utf8_lossy(&arg).into_owned();
        if arg.is_empty() {
            return self.send("-ERR arg required for dele command");
        }
        let digits = strip_leading_whitespace(&arg);
        match self.resolve_index(digits, "dele") {
            Ok(index) => {
                self.maildrop_mut().records_mut()[index].set_active(false);
                self.send("+OK marked for deletion")
            }
            Err(message) => self.send(&message),
        }
    }

    fn handle_retr(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        let arg = String::from_utf8_lossy(&arg).into_owned();
        if arg.is_empty() {
            return self.send("-ERR arg required for retr command");
        }
        let digits = strip_leading_whitespace(&arg);
        let index = match self.resolve_index(digits, "retr") {
            Ok(index) => index,
            Err(message) => return self.send(&message),
        };
        let record = self.maildrop_ref().records()[index];
        self.send("+OK message follows")?;
        // Unlike `TOP`, `RETR` streams the whole file verbatim and emits
        // no trailing dot line. This mirrors an observed deficiency
        // rather than fixing it — see the design notes on dot-stuffing.
        if !self.stream_file(record.name(), record.size)? {
            return self.send("-ERR internal server error");
        }
        Ok(())
    }

    fn handle_top(&mut self) -> Result<(), Pop3Error> {
        let arg = match self.reader.read_argument()? {
            ArgumentOutcome::TooLong => return self.send("-ERR Parameters too long"),
            ArgumentOutcome::Line(bytes) => bytes,
        };
        if self.phase != Phase::Login {
            return self.send("-ERR unauthenticated");
        }
        let arg = String::from_utf8_lossy(&arg).into_owned();
        let arg = strip_leading_whitespace(&arg);
        let digits = match parse_top::split_top_arg(arg) {
            Ok(digits) => digits,
            Err(TopArgError::MissingArgs) => {
                return self.send("-ERR missing args to top command")
            }
            Err(TopArgError::NonzeroSecondArg) => {
                return self.send("-ERR top arg 2 of nonzero value unsupported")
            }
        };
        let index = match self.resolve_index(digits, "top") {
            Ok(index) => index,
            Err(message) => return self.send(&message),
        };
        let record = self.maildrop_ref().records()[index];
        self.send("+OK message follows")?;
        let delivered = self.stream_file(record.name(), record.top_limit)?;
        if !delivered {
            return self.send("-ERR internal server error");
        }
        self.send(".")
    }

    // -- shared helpers --------------------------------------------------

    fn maildrop_ref(&self) -> &Maildrop {
        self.maildrop
            .as_ref()
            .expect("phase Login implies a loaded maildrop")
    }

    fn maildrop_mut(&mut self) -> &mut Maildrop {
        self.maildrop
            .as_mut()
            .expect("phase Login implies a loaded maildrop")
    }

    /// Parse and bounds/deleted-check a decimal index argument, producing
    /// the already-formatted `-ERR` text on failure so call sites can stay
    /// one-liners. `command` names the caller for the error text, e.g.
    /// `-ERR index out of bounds for dele command`.
    fn resolve_index(&self, arg: &str, command: &str) -> Result<usize, String> {
        let num_emails = self.maildrop_ref().num_emails();
        let records = self.maildrop_ref().records();
        parse::parse_index(arg, num_emails, |i| records[i].active()).map_err(|e| match e {
            IndexError::NotNumeric => format!("-ERR invalid index to {command} command"),
            IndexError::OutOfBounds => format!("-ERR index out of bounds for {command} command"),
            IndexError::Deleted => "-ERR Invalid index".to_string(),
        })
    }

    /// Stream `len` bytes of `<mail_dir>/<name>` to the client in fixed
    /// chunks, resuming on short writes. Returns `false` (and writes
    /// nothing) if the file can't be opened at all — the caller turns
    /// that into `-ERR internal server error`.
    fn stream_file(&mut self, name: &str, len: i64) -> Result<bool, Pop3Error> {
        let path = self.mail_dir.join(name);
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(_) => return Ok(false),
        };
        let mut remaining = len.max(0) as u64;
        let mut buf = [0u8; SIZE_OF_COPY_BUFFER];
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = file.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            self.write_raw(&buf[..n])?;
            remaining -= n as u64;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use postman_journal::record::Record;

    fn write_record(buf: &mut Vec<u8>, name: &str, size: i64, top_limit: i64) {
        let record = Record::new(name, size, top_limit).unwrap();
        buf.extend_from_slice(record.as_bytes());
    }

    fn make_journal(dir: &tempfile::TempDir, records: &[(&str, i64, i64)]) -> File {
        use std::io::{Seek, SeekFrom, Write as _};
        use std::os::unix::io::AsRawFd;

        let path = dir.path().join("journal");
        let mut file = File::options()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let mut bytes = Vec::new();
        for (name, size, top_limit) in records {
            write_record(&mut bytes, name, *size, *top_limit);
        }
        file.write_all(&bytes).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let data_end = bytes.len() as i64;
        let c_attr = std::ffi::CString::new("user.data_end").unwrap();
        let rc = unsafe {
            libc::fsetxattr(
                file.as_raw_fd(),
                c_attr.as_ptr(),
                (&data_end as *const i64).cast(),
                std::mem::size_of::<i64>(),
                0,
            )
        };
        assert_eq!(rc, 0);
        file
    }

    fn run_session(journal: &File, mail_dir: PathBuf, script: &str) -> String {
        let input = Cursor::new(script.replace('\n', "\r\n").into_bytes());
        let mut output = Vec::new();
        {
            let mut session = Session::new(
                input,
                &mut output,
                journal,
                mail_dir,
                Box::new(|_, _| true),
            );
            session.run().unwrap();
        }
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn empty_maildrop_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let journal = make_journal(&dir, &[]);
        let transcript = run_session(
            &journal,
            dir.path().to_path_buf(),
            "USER alice\nPASS x\nSTAT\nQUIT\n",
        );
        assert!(transcript.starts_with("+OK POP3 server ready\r\n"));
        assert!(transcript.contains("+OK got username\r\n"));
        assert!(transcript.contains("+OK got password\r\n"));
        assert!(transcript.contains("+OK 0 0\r\n"));
        assert!(transcript.ends_with("+OK bye\r\n"));
    }

    #[test]
    fn list_retrieve_delete_reset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m1"), vec![b'a'; 100]).unwrap();
        std::fs::write(dir.path().join("m2"), vec![b'b'; 200]).unwrap();
        let journal = make_journal(&dir, &[("m1", 100, 40), ("m2", 200, 80)]);
        let transcript = run_session(
            &journal,
            dir.path().to_path_buf(),
            "USER bob\nPASS y\nLIST\nDELE 1\nSTAT\nRSET\nSTAT\nQUIT\n",
        );
        assert!(transcript.contains("+OK maildrop follows\r\n1 100\r\n2 200\r\n.\r\n"));
        assert!(transcript.contains("+OK marked for deletion\r\n"));
        assert!(transcript.contains("+OK 1 200\r\n"));
        assert!(transcript.contains("+OK reset complete\r\n"));
        assert!(transcript.contains("+OK 2 300\r\n"));
    }

    #[test]
    fn top_rejects_nonzero_second_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m2"), vec![b'x'; 200]).unwrap();
        let journal = make_journal(&dir, &[("m2", 200, 80)]);
        let transcript = run_session(
            &journal,
            dir.path().to_path_buf(),
            "USER bob\nPASS y\nTOP 1 5\nQUIT\n",
        );
        assert!(transcript.contains("-ERR top arg 2 of nonzero value unsupported\r\n"));
    }

    #[test]
    fn retr_and_dele_tolerate_extra_separator_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m1"), vec![b'a'; 5]).unwrap();
        let journal = make_journal(&dir, &[("m1", 5, 5)]);
        let transcript = run_session(
            &journal,
            dir.path().to_path_buf(),
            "USER bob\nPASS y\nRETR  1\nDELE  1\nQUIT\n",
        );
        assert!(transcript.contains("+OK message follows\r\naaaaa"));
        assert!(transcript.contains("+OK marked for deletion\r\n"));
    }

    #[test]
    fn commands_out_of_sequence_before_login() {
        let dir = tempfile::tempdir().unwrap();
        let journal = make_journal(&dir, &[]);
        let transcript = run_session(&journal, dir.path().to_path_buf(), "STAT\nQUIT\n");
        assert!(transcript.contains("-ERR unauthenticated\r\n"));
    }
}

//! `postman-journal` implements the on-disk maildrop journal: a flat,
//! fixed-record index over a directory of RFC-822 messages whose commit
//! boundary is an extended attribute, not the file's length.
//!
//! It covers:
//! - the record layout and journal validity rules ([`record`], [`meta`])
//! - fresh/rebuild initialization with atomic directory-entry exchange
//!   ([`init`])
//! - the exclusive-lock, crash-safe appender ([`append`])
//! - the per-user access-window manager ([`access`])
//! - the private-mapping snapshot loader POP3 sessions read from
//!   ([`snapshot`])

pub mod access;
pub mod append;
pub mod error;
pub mod init;
pub mod meta;
pub mod record;
pub mod snapshot;
mod xattr;

pub use access::Action;
pub use error::JournalError;
pub use record::{Record, NAME_LEN, RECORD_SIZE};
pub use snapshot::Maildrop;

use std::fs::{File, OpenOptions};
use std::path::Path;

/// Open an existing journal read-only and validate it (§4.A): refuses to
/// hand back a file whose `data_end` is missing, negative, or not a
/// multiple of the record size.
pub fn open_readonly(path: &Path) -> Result<File, JournalError> {
    let file = OpenOptions::new().read(true).open(path)?;
    meta::read_data_end(&file)?;
    Ok(file)
}

/// Open an existing journal read/write (used by the appender and the
/// access-window manager) and validate it.
pub fn open_read_write(path: &Path) -> Result<File, JournalError> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    meta::read_data_end(&file)?;
    Ok(file)
}

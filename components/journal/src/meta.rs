use std::fs::File;
use std::os::unix::io::AsRawFd;

use crate::error::JournalError;
use crate::record::RECORD_SIZE;
use crate::xattr;

pub const DATA_END_ATTR: &str = "data_end";
pub const TOP_LIMIT_ATTR: &str = "top_limit";

fn limit_attr(username: &str) -> String {
    format!("{username}_limit")
}

/// Read the commit marker (`data_end`) from an open journal file and
/// validate it: must exist, be non-negative, and be a multiple of the
/// record size. A journal that fails this check must not be operated on.
pub fn read_data_end(journal: &File) -> Result<i64, JournalError> {
    let data_end = xattr::get_i64(journal.as_raw_fd(), DATA_END_ATTR)?
        .ok_or_else(|| JournalError::MissingAttr(DATA_END_ATTR.to_string()))?;
    validate_data_end(data_end)?;
    Ok(data_end)
}

pub fn validate_data_end(data_end: i64) -> Result<(), JournalError> {
    if data_end < 0 {
        return Err(JournalError::NegativeDataEnd);
    }
    if data_end as usize % RECORD_SIZE != 0 {
        return Err(JournalError::MisalignedDataEnd {
            data_end,
            record_size: RECORD_SIZE,
        });
    }
    Ok(())
}

/// Write the initial commit marker onto a just-created journal file. No
/// flag restriction: the attribute has never existed on this fd before.
pub fn write_initial_data_end(journal: &File, data_end: i64) -> Result<(), JournalError> {
    xattr::set_i64(journal.as_raw_fd(), DATA_END_ATTR, data_end, 0)
}

/// Advance the commit marker on a live journal. Uses `XATTR_REPLACE`: the
/// appender is the only writer of this attribute on an already-initialized
/// journal, and a missing attribute here means the journal was never
/// initialized — that must be a hard error, not a silent create.
pub fn advance_data_end(journal: &File, data_end: i64) -> Result<(), JournalError> {
    xattr::set_i64(
        journal.as_raw_fd(),
        DATA_END_ATTR,
        data_end,
        libc::XATTR_REPLACE,
    )
}

/// Resolve the visible prefix length for `username`: the user's own limit
/// if one is set, otherwise the journal's global commit marker.
pub fn resolve_limit(journal: &File, username: &str) -> Result<i64, JournalError> {
    match xattr::get_i64(journal.as_raw_fd(), &limit_attr(username))? {
        Some(limit) => Ok(limit),
        None => read_data_end(journal),
    }
}

/// `deny`: create `<user>_limit` at the current `data_end`; fails if the
/// attribute is already present.
pub fn deny(journal: &File, username: &str) -> Result<(), JournalError> {
    let data_end = read_data_end(journal)?;
    xattr::set_i64(
        journal.as_raw_fd(),
        &limit_attr(username),
        data_end,
        libc::XATTR_CREATE,
    )
}

/// `update`: set `<user>_limit` to the current `data_end`, create-or-replace.
pub fn update(journal: &File, username: &str) -> Result<(), JournalError> {
    let data_end = read_data_end(journal)?;
    xattr::set_i64(journal.as_raw_fd(), &limit_attr(username), data_end, 0)
}

/// `grant`: remove `<user>_limit`, so the user falls back to the global
/// commit marker. A never-denied user is a no-op success.
pub fn grant(journal: &File, username: &str) -> Result<(), JournalError> {
    read_data_end(journal)?;
    xattr::remove(journal.as_raw_fd(), &limit_attr(username))
}

/// Read the `top_limit` extended attribute set on a mail message file at
/// ingest time.
pub fn read_top_limit(file: &File) -> Result<i64, JournalError> {
    xattr::get_i64(file.as_raw_fd(), TOP_LIMIT_ATTR)?
        .ok_or_else(|| JournalError::MissingAttr(TOP_LIMIT_ATTR.to_string()))
}

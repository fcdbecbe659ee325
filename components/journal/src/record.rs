use bytemuck::{Pod, Zeroable};

use crate::error::JournalError;

/// Length of the NUL-terminated `name` field inside a [`Record`].
pub const NAME_LEN: usize = 31;

/// On-disk size of a single journal record, in bytes.
///
/// This is part of the journal's on-disk contract: `data_end` is only ever
/// a multiple of this constant, and the layout below must never change
/// without a format migration.
pub const RECORD_SIZE: usize = std::mem::size_of::<Record>();

/// A single 48-byte, packed, host-endian message record.
///
/// Field order and sizes mirror the C `struct email` this format was
/// ported from: two `off_t`-sized integers, a boolean flag, and a
/// NUL-terminated basename. No padding is introduced because the fields
/// already sum to a multiple of 8.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct Record {
    /// Total byte length of the message file at ingest time.
    pub size: i64,
    /// Header-block end offset, `0 <= top_limit <= size`.
    pub top_limit: i64,
    /// Session-local "not deleted" flag, stored as 0/1.
    active: u8,
    name: [u8; NAME_LEN],
}

const _: () = assert!(RECORD_SIZE == 48, "Record must stay 48 bytes on the wire");

impl Record {
    /// Build a record for a freshly-ingested message file.
    ///
    /// `name` must be a valid basename: non-empty, no interior NUL, no
    /// path separator, and short enough to leave room for the
    /// terminating NUL in the 31-byte field.
    pub fn new(name: &str, size: i64, top_limit: i64) -> Result<Self, JournalError> {
        if size < 0 {
            return Err(JournalError::InvalidRecord("negative size".into()));
        }
        if top_limit < 0 || top_limit > size {
            return Err(JournalError::InvalidRecord(
                "top_limit out of range".into(),
            ));
        }
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.contains(&b'/') || bytes.contains(&0) {
            return Err(JournalError::InvalidRecord(format!(
                "\"{name}\" is not a valid basename"
            )));
        }
        if bytes.len() >= NAME_LEN {
            return Err(JournalError::InvalidRecord(format!(
                "filename \"{name}\" is too long"
            )));
        }
        let mut field = [0u8; NAME_LEN];
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(Record {
            size,
            top_limit,
            active: 1,
            name: field,
        })
    }

    pub fn active(&self) -> bool {
        self.active != 0
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active as u8;
    }

    /// The basename of the message file within the mail directory.
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        // ingest only ever writes valid UTF-8 basenames (see `Record::new`);
        // a non-UTF-8 byte here means the journal was built some other way.
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        bytemuck::must_cast_ref(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_48_bytes() {
        assert_eq!(RECORD_SIZE, 48);
    }

    #[test]
    fn rejects_path_separators() {
        assert!(Record::new("sub/dir", 10, 5).is_err());
    }

    #[test]
    fn rejects_oversize_name() {
        let name = "a".repeat(NAME_LEN);
        assert!(Record::new(&name, 10, 5).is_err());
    }

    #[test]
    fn rejects_top_limit_past_size() {
        assert!(Record::new("m1", 10, 11).is_err());
    }

    #[test]
    fn round_trips_name_and_flags() {
        let mut r = Record::new("m1", 100, 40).unwrap();
        assert_eq!(r.name(), "m1");
        assert!(r.active());
        r.set_active(false);
        assert!(!r.active());
    }
}

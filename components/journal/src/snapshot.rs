//! The maildrop snapshot: a private, writable view of the committed
//! prefix of a journal, as chosen by [`crate::meta::resolve_limit`].

use std::fs::File;

use bytemuck::cast_slice_mut;
use memmap2::{MmapMut, MmapOptions};

use crate::error::JournalError;
use crate::record::{Record, RECORD_SIZE};

/// A session's private view of the journal: `limit` bytes mapped
/// copy-on-write so that in-session mutations (the `active` flag flipped
/// by `DELE`, restored by `RSET`) are visible only to this process and
/// never written back to disk.
pub struct Maildrop {
    mapping: Option<MmapMut>,
    num_emails: usize,
}

impl Maildrop {
    /// Load the snapshot for a chosen `limit` (already resolved from
    /// either a per-user limit or the global commit marker). A limit of
    /// zero yields an empty maildrop with no mapping at all — `mmap`
    /// itself refuses a zero-length mapping, and there is nothing useful
    /// to map in that case anyway.
    pub fn load(journal: &File, limit: i64) -> Result<Self, JournalError> {
        if limit == 0 {
            return Ok(Maildrop {
                mapping: None,
                num_emails: 0,
            });
        }
        let len = limit as usize;
        let num_emails = len / RECORD_SIZE;
        let mapping = unsafe {
            MmapOptions::new()
                .len(len)
                .map_copy(journal)
                .map_err(JournalError::Io)?
        };
        Ok(Maildrop {
            mapping: Some(mapping),
            num_emails,
        })
    }

    pub fn num_emails(&self) -> usize {
        self.num_emails
    }

    pub fn records(&self) -> &[Record] {
        match &self.mapping {
            Some(m) => bytemuck::cast_slice(&m[..]),
            None => &[],
        }
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        match &mut self.mapping {
            Some(m) => cast_slice_mut(&mut m[..]),
            None => &mut [],
        }
    }
}

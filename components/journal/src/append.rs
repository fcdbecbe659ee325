//! The appender: the only component allowed to extend a live journal.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;

use nix::fcntl::{flock, FlockArg};

use crate::error::JournalError;
use crate::meta;

const COPY_CHUNK: usize = 64 * 1024;

/// Append every byte from `input` onto `journal`, advancing the commit
/// marker exactly once, after input reaches EOF.
///
/// Callers are expected to have opened `journal` read/write themselves;
/// this function takes the exclusive advisory lock for its own duration
/// (the sole serialization mechanism between concurrent appenders) and
/// releases it when it returns, by virtue of the fd being closed or the
/// lock being dropped by the caller.
///
/// `input` is trusted to be a sequence of whole records — this layer does
/// not validate record boundaries, mirroring the original: a crash
/// mid-record is harmless because `data_end` is only advanced once, after
/// all of `input` has been consumed and synced.
pub fn append<R: Read>(journal: &mut File, input: &mut R) -> Result<(), JournalError> {
    flock(journal.as_raw_fd(), FlockArg::LockExclusive)
        .map_err(|e| JournalError::Xattr(format!("flock failed: {e}")))?;

    let mut data_end = meta::read_data_end(journal)?;
    journal.seek(SeekFrom::Start(data_end as u64))?;

    let mut buf = [0u8; COPY_CHUNK];
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let mut written = 0;
        while written < n {
            let w = journal.write(&buf[written..n])?;
            written += w;
            data_end += w as i64;
        }
    }

    journal.sync_data()?;
    meta::advance_data_end(journal, data_end)?;
    journal.sync_data()?;
    Ok(())
}

//! Journal initialization: fresh creation and rebuild-with-atomic-exchange.

use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use nix::fcntl::{renameat2, RenameFlags};

use crate::error::JournalError;
use crate::meta::{self, DATA_END_ATTR};
use crate::record::Record;
use crate::xattr;

const JOURNAL_MODE: u32 = 0o600;

/// Mode 1: create a brand new, empty journal at `path`.
///
/// Uses `O_CREAT | O_EXCL` so this refuses to clobber an existing file.
/// `data_end` starts at zero.
pub fn create_fresh(path: &Path) -> Result<(), JournalError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(JOURNAL_MODE)
        .open(path)?;
    meta::write_initial_data_end(&file, 0)?;
    file.sync_data()?;
    Ok(())
}

/// Mode 2: rebuild `journal_path` from the contents of `mail_dir`, using
/// `temp_path` as scratch space, then atomically exchange it into place.
///
/// On success, `journal_path` refers to the freshly built journal and
/// `temp_path` has been unlinked (after briefly holding the old journal's
/// bytes, immediately post-exchange). On any failure before the exchange,
/// `journal_path` is untouched; a failure between the exchange and the
/// unlink leaves an orphaned `temp_path` but a correct `journal_path`.
pub fn rebuild(journal_path: &Path, temp_path: &Path, mail_dir: &Path) -> Result<(), JournalError> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(JOURNAL_MODE)
        .open(temp_path)?;

    load_emails(&mut temp_file, mail_dir)?;
    replicate_xattrs(&temp_file, journal_path)?;

    // `write_with_retry` above advances the file's own offset as it writes,
    // so the current stream position *is* the new data_end.
    let data_end = std::io::Seek::stream_position(&mut temp_file)? as i64;
    meta::write_initial_data_end(&temp_file, data_end)?;
    temp_file.sync_data()?;
    drop(temp_file);

    exchange(journal_path, temp_path)?;

    fs::remove_file(temp_path)?;
    Ok(())
}

fn write_with_retry(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    let mut off = 0;
    while off < bytes.len() {
        off += file.write(&bytes[off..])?;
    }
    Ok(())
}

fn load_emails(journal_file: &mut File, mail_dir: &Path) -> Result<(), JournalError> {
    for entry in fs::read_dir(mail_dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        // skip non-regular files (symlinks, directories, etc); symlinks are
        // never followed because `file_type()` reports the link itself.
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| JournalError::InvalidBasename(entry.path().display().to_string()))?;

        let mail_file = File::open(entry.path())?;
        let stat = mail_file.metadata()?;
        let top_limit = meta::read_top_limit(&mail_file)?;

        let record = Record::new(name, stat.len() as i64, top_limit)?;
        write_with_retry(journal_file, record.as_bytes())?;
    }
    Ok(())
}

/// Copy every `user.*` xattr from `src_path` onto `target`, except
/// `data_end` — that one gets recomputed, not copied.
fn replicate_xattrs(target: &File, src_path: &Path) -> Result<(), JournalError> {
    for name in xattr::list_user_attrs(src_path)? {
        if name == DATA_END_ATTR {
            continue;
        }
        let value = xattr::get_i64_by_path(src_path, &name)?;
        xattr::set_i64(target.as_raw_fd(), &name, value, 0)?;
    }
    Ok(())
}

/// Atomically swap the directory entries of `journal_path` and
/// `temp_path` via `renameat2(..., RENAME_EXCHANGE)`. A plain two-step
/// rename would expose a window where `journal_path` doesn't exist or
/// points at the wrong file; that is forbidden by the format's crash
/// safety story.
fn exchange(journal_path: &Path, temp_path: &Path) -> Result<(), JournalError> {
    let journal_c = path_to_cstring(journal_path)?;
    let temp_c = path_to_cstring(temp_path)?;
    renameat2(
        None,
        journal_c.as_c_str(),
        None,
        temp_c.as_c_str(),
        RenameFlags::RENAME_EXCHANGE,
    )
    .map_err(|e| JournalError::Xattr(format!("renameat2 exchange failed: {e}")))?;
    Ok(())
}

fn path_to_cstring(path: &Path) -> Result<CString, JournalError> {
    CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|_| JournalError::InvalidBasename(path.display().to_string()))
}

//! Thin wrappers around `fsetxattr(2)`/`fgetxattr(2)`/`flistxattr(2)` in the
//! `user.*` namespace.
//!
//! The journal's commit-marker discipline depends on an xattr write being a
//! single atomic unit at the kernel interface (see the design notes this
//! crate implements); no higher-level crate in the ecosystem exposes
//! `XATTR_CREATE`/`XATTR_REPLACE` flag control, so this goes straight to
//! `libc`, mirroring the original C implementation almost call-for-call.

use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::path::Path;

use crate::error::JournalError;

/// Linux's `XATTR_NAME_MAX`: the longest an extended attribute name
/// (including its `user.` namespace prefix) may be.
const XATTR_NAME_MAX: usize = 255;

fn user_attr(name: &str) -> Result<CString, JournalError> {
    let full = format!("user.{name}");
    if full.len() > XATTR_NAME_MAX {
        return Err(JournalError::UsernameTooLong(name.to_string()));
    }
    CString::new(full).map_err(|_| JournalError::UsernameTooLong(name.to_string()))
}

/// Read an 8-byte signed integer xattr from an open file descriptor.
///
/// Returns `Ok(None)` if the attribute does not exist, `Err` for any other
/// failure (including "exists but wrong size").
pub fn get_i64(fd: RawFd, name: &str) -> Result<Option<i64>, JournalError> {
    let attr = user_attr(name)?;
    let mut buf = [0u8; 8];
    let ret = unsafe {
        libc::fgetxattr(
            fd,
            attr.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if ret < 0 {
        let err = std::io::Error::last_os_error();
        return match err.raw_os_error() {
            Some(libc::ENODATA) => Ok(None),
            _ => Err(JournalError::Xattr(format!("fgetxattr {name}: {err}"))),
        };
    }
    if ret as usize != buf.len() {
        return Err(JournalError::MalformedAttr(name.to_string()));
    }
    Ok(Some(i64::from_ne_bytes(buf)))
}

/// Write an 8-byte signed integer xattr onto an open file descriptor.
pub fn set_i64(fd: RawFd, name: &str, value: i64, flags: i32) -> Result<(), JournalError> {
    let attr = user_attr(name)?;
    let bytes = value.to_ne_bytes();
    let ret = unsafe {
        libc::fsetxattr(
            fd,
            attr.as_ptr(),
            bytes.as_ptr() as *const libc::c_void,
            bytes.len(),
            flags,
        )
    };
    if ret < 0 {
        let err = std::io::Error::last_os_error();
        if flags == libc::XATTR_CREATE && err.raw_os_error() == Some(libc::EEXIST) {
            return Err(JournalError::AttrExists(name.to_string()));
        }
        return Err(JournalError::Xattr(format!("fsetxattr {name}: {err}")));
    }
    Ok(())
}

/// Remove a `user.*` xattr from an open file descriptor. Treats "attribute
/// does not exist" as success.
pub fn remove(fd: RawFd, name: &str) -> Result<(), JournalError> {
    let attr = user_attr(name)?;
    let ret = unsafe { libc::fremovexattr(fd, attr.as_ptr()) };
    if ret < 0 {
        let err = std::io::Error::last_os_error();
        return match err.raw_os_error() {
            Some(libc::ENODATA) => Ok(()),
            _ => Err(JournalError::Xattr(format!("fremovexattr {name}: {err}"))),
        };
    }
    Ok(())
}

/// List every `user.*` attribute name (without the `user.` prefix) set on
/// the file at `path`.
pub fn list_user_attrs(path: &Path) -> Result<Vec<String>, JournalError> {
    let c_path =
        CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
            JournalError::Xattr(format!("path \"{}\" contains a NUL byte", path.display()))
        })?;
    let needed = unsafe { libc::listxattr(c_path.as_ptr(), std::ptr::null_mut(), 0) };
    if needed < 0 {
        return Err(JournalError::Xattr(format!(
            "listxattr {}: {}",
            path.display(),
            std::io::Error::last_os_error()
        )));
    }
    let mut buf = vec![0u8; needed as usize];
    if needed > 0 {
        let ret =
            unsafe { libc::listxattr(c_path.as_ptr(), buf.as_mut_ptr() as *mut i8, buf.len()) };
        if ret < 0 {
            return Err(JournalError::Xattr(format!(
                "listxattr {}: {}",
                path.display(),
                std::io::Error::last_os_error()
            )));
        }
        buf.truncate(ret as usize);
    }
    let mut names = Vec::new();
    for chunk in buf.split(|&b| b == 0).filter(|c| !c.is_empty()) {
        if let Some(rest) = chunk.strip_prefix(b"user.") {
            if let Ok(s) = std::str::from_utf8(rest) {
                names.push(s.to_string());
            }
        }
    }
    Ok(names)
}

/// Read an 8-byte signed integer xattr given a path, rather than an fd.
pub fn get_i64_by_path(path: &Path, name: &str) -> Result<i64, JournalError> {
    let attr = user_attr(name)?;
    let c_path =
        CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
            JournalError::Xattr(format!("path \"{}\" contains a NUL byte", path.display()))
        })?;
    let mut buf = [0u8; 8];
    let ret = unsafe {
        libc::getxattr(
            c_path.as_ptr(),
            attr.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if ret < 0 {
        return Err(JournalError::Xattr(format!(
            "getxattr {}: {}",
            name,
            std::io::Error::last_os_error()
        )));
    }
    if ret as usize != buf.len() {
        return Err(JournalError::MalformedAttr(name.to_string()));
    }
    Ok(i64::from_ne_bytes(buf))
}

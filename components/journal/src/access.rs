//! Per-user access window management: deny / update / grant.

use std::fs::File;

use crate::error::JournalError;
use crate::meta;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Pin a user's visible window to the current `data_end`; fails if the
    /// user already has a limit set.
    Deny,
    /// Pin a user's visible window to the current `data_end`, replacing
    /// any existing limit.
    Update,
    /// Remove a user's limit; they fall back to the global commit marker.
    Grant,
}

/// Apply `action` for each of `usernames` in order, on an already-open
/// journal file. Usernames are applied left to right; a failure partway
/// through stops the remaining usernames from being processed (mirroring
/// the original's unconditional `err(1, ...)` on first failure).
pub fn apply_all<'a>(
    journal: &File,
    action: Action,
    usernames: impl IntoIterator<Item = &'a str>,
) -> Result<(), JournalError> {
    for username in usernames {
        match action {
            Action::Deny => meta::deny(journal, username)?,
            Action::Update => meta::update(journal, username)?,
            Action::Grant => meta::grant(journal, username)?,
        }
    }
    Ok(())
}

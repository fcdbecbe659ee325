use thiserror::Error;

/// Errors that terminate a POP3 session outright (as opposed to the
/// per-command `-ERR` responses handled entirely inside the session loop).
#[derive(Debug, Error)]
pub enum Pop3Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal error: {0}")]
    Journal(#[from] postman_journal::JournalError),

    #[error("unexpected end of input mid-command")]
    UnexpectedEof,

    #[error("failed to write response to client")]
    WriteFailed,
}

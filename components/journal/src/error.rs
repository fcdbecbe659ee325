use thiserror::Error;

/// Errors raised by the journal format, initializer, appender, access
/// manager, and snapshot loader.
///
/// All of these are fatal at the call site that encounters them — the
/// journal engine never attempts partial recovery, only the surrounding
/// binary decides whether that means exit 1 or something else.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extended attribute error: {0}")]
    Xattr(String),

    #[error("journal is missing required attribute \"{0}\"")]
    MissingAttr(String),

    #[error("journal attribute \"{0}\" has the wrong size")]
    MalformedAttr(String),

    #[error("journal \"data_end\" is negative")]
    NegativeDataEnd,

    #[error("journal \"data_end\" ({data_end}) is not a multiple of the record size ({record_size})")]
    MisalignedDataEnd { data_end: i64, record_size: usize },

    #[error("attribute \"{0}\" already exists")]
    AttrExists(String),

    #[error("username \"{0}\" is too long for an extended attribute name")]
    UsernameTooLong(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("mail directory entry \"{0}\" is not a valid basename")]
    InvalidBasename(String),
}

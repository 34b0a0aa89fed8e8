use thiserror::Error;

use crate::table::RowId;

pub type CsvEditResult<T> = Result<T, CsvEditError>;

#[derive(Error, Debug)]
pub enum CsvEditError {
    #[error("ERR : IO Error =\n{0}")]
    Io(IoErrorWithMeta),
    #[error("ERR : Failed to decode csv =\n{0}")]
    Decode(#[from] DecodeError),
    #[error("ERR : Document has no records")]
    EmptyDocument,
    #[error("ERR : Row \"{0}\" doesn't exist")]
    RowNotFound(RowId),
    #[error("ERR : Column index \"{index}\" is out of range for {width} columns")]
    ColumnOutOfRange { index: usize, width: usize },
    #[error("ERR : Schema was already set for this document")]
    SchemaAlreadySet,
    #[error("ERR : Document is not ready for editing")]
    NotReady,
    #[error("ERR : No open edit for row \"{0}\"")]
    DraftNotOpen(RowId),
    #[error("ERR : Invalid options =\n{0}")]
    InvalidOptions(String),
    #[cfg(feature = "cli")]
    #[error("ERR : Command line error =\n{0}")]
    Cli(String),
}

impl CsvEditError {
    pub fn io_error(err: std::io::Error, meta: &str) -> Self {
        Self::Io(IoErrorWithMeta::new(err, meta))
    }
}

/// Malformed input found while decoding a record
///
/// `offset` is the byte position in the source stream where decoding failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} (at byte {offset})")]
pub struct DecodeError {
    pub offset: u64,
    pub reason: String,
}

impl DecodeError {
    pub fn new(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

pub struct IoErrorWithMeta {
    error: std::io::Error,
    meta: String,
}

impl IoErrorWithMeta {
    pub fn new(error: std::io::Error, meta: &str) -> Self {
        Self {
            error,
            meta: meta.to_owned(),
        }
    }
}

impl std::fmt::Debug for IoErrorWithMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} :: {}", self.error, self.meta)
    }
}

impl std::fmt::Display for IoErrorWithMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} :: {}", self.error, self.meta)
    }
}

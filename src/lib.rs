//! Csvedit, a streaming csv ingestion and edit tracking backend
//!
//! ### Install
//!
//! ```bash
//! cargo install csvedit --features cli --locked
//! ```
//!
//! ### Library usage
//!
//! ```rust
//! use csvedit::{DocumentSession, RowId};
//!
//! # fn main() -> csvedit::CsvEditResult<()> {
//! let mut session = DocumentSession::default();
//! session.load_blocking("name,age\nBob,25\n".as_bytes(), Some("people.csv"), None)?;
//!
//! // Edit a single row through a draft
//! let draft = session.begin_edit(RowId(1))?;
//! let draft = session.update_draft(draft, 1, "26")?;
//! session.commit(draft)?;
//! assert!(session.has_any_changes());
//!
//! // Regenerate csv text with edits applied
//! let csv = session.export()?;
//! assert_eq!(csv, "name,age\nBob,26\n");
//!
//! // Restore the document as loaded
//! session.reset()?;
//! # Ok(())
//! # }
//! ```
//!
//! Large inputs can be loaded on a background thread with
//! `DocumentSession::load` and drained with `poll` or `wait`.
//!
//! ### Binary usage
//!
//! ```bash
//! # Print version
//! csvedit --version
//! # Print help
//! csvedit --help
//!
//! # Start csvedit with a file
//! csvedit file.csv
//! ```
//!
//! **Shell command**
//!
//! ```bash
//! # Print whole document
//! >> print
//!
//! # View a row by id
//! >> view 3
//!
//! # Edit a cell of a row. Column is a name or an index
//! >> edit 3 age 31
//!
//! # List edited rows
//! >> changes
//!
//! # Discard every edit
//! >> reset
//!
//! # Export to a file, or to stdout without a file
//! >> export out.csv
//! ```
//!
//! Logging is controlled with RUST_LOG, and the parsing dialect with
//! CSVEDIT_DELIMITER, CSVEDIT_QUOTE and CSVEDIT_CHUNK_SIZE.


#[cfg(feature = "cli")]
pub mod cli;

pub mod config;
pub mod edit;
pub mod error;
pub mod export;
pub mod parser;
pub mod schema;
pub mod session;
pub mod table;

// ----------
// RE-EXPORTS

pub use config::{IngestOptions, ParseOptions};
pub use edit::{CommitResult, Draft, EditTracker};
pub use error::{CsvEditError, CsvEditResult, DecodeError};
pub use export::{export, write_csv};
pub use parser::{parse, ParseEvent, StreamingParser};
pub use schema::{build_schema, Column, Schema};
pub use session::{Callbacks, DocumentSession, IngestObserver, LoadStatus, LoadSummary};
pub use table::{OriginalSnapshot, Row, RowId, Table};

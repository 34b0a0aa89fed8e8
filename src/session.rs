use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::config::IngestOptions;
use crate::edit::{self, CommitResult, Draft, EditTracker};
use crate::error::{CsvEditError, CsvEditResult, DecodeError};
use crate::export;
use crate::parser::{ParseEvent, StreamingParser};
use crate::schema::{build_schema, Schema};
use crate::table::{OriginalSnapshot, Row, RowId, Table};

const DEFAULT_EXPORT_NAME: &str = "edited.csv";

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    /// Input held no records at all
    Empty,
    /// Decoding stopped, rows read before the failure are kept
    Failed(DecodeError),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: usize,
    pub columns: usize,
}

/// Receiver of ingestion notifications
pub trait IngestObserver: Send {
    fn on_progress(&mut self, _ratio: f64) {}
    fn on_error(&mut self, _error: &DecodeError) {}
    /// Load reached the end of input. An empty document reports zero columns
    fn on_complete(&mut self, _summary: &LoadSummary) {}
}

/// Observer built from three closures
pub struct Callbacks<P, E, C> {
    progress: P,
    error: E,
    complete: C,
}

impl<P, E, C> Callbacks<P, E, C>
where
    P: FnMut(f64) + Send,
    E: FnMut(&DecodeError) + Send,
    C: FnMut(&LoadSummary) + Send,
{
    pub fn new(progress: P, error: E, complete: C) -> Self {
        Self {
            progress,
            error,
            complete,
        }
    }
}

impl<P, E, C> IngestObserver for Callbacks<P, E, C>
where
    P: FnMut(f64) + Send,
    E: FnMut(&DecodeError) + Send,
    C: FnMut(&LoadSummary) + Send,
{
    fn on_progress(&mut self, ratio: f64) {
        (self.progress)(ratio)
    }

    fn on_error(&mut self, error: &DecodeError) {
        (self.error)(error)
    }

    fn on_complete(&mut self, summary: &LoadSummary) {
        (self.complete)(summary)
    }
}

/// Editing state of one loaded document
///
/// Replaced as a whole when a new load starts.
struct Document {
    name: Option<String>,
    table: Table,
    snapshot: Option<OriginalSnapshot>,
    tracker: EditTracker,
    open_draft: Option<RowId>,
    status: LoadStatus,
    progress: f64,
    revision: u64,
    exported_revision: u64,
}

impl Document {
    fn new(name: Option<&str>, status: LoadStatus) -> Self {
        Self {
            name: name.map(str::to_owned),
            table: Table::new(),
            snapshot: None,
            tracker: EditTracker::new(),
            open_draft: None,
            status,
            progress: 0.0,
            revision: 0,
            exported_revision: 0,
        }
    }
}

/// Background producer of parse events
struct Ingestion {
    events: Receiver<ParseEvent>,
    cancel: Arc<AtomicBool>,
    _handle: JoinHandle<()>,
}

impl Drop for Ingestion {
    fn drop(&mut self) {
        // The producer also stops on its next send once the receiver is gone
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn ready_snapshot<'a>(
    snapshot: &'a Option<OriginalSnapshot>,
    status: &LoadStatus,
) -> CsvEditResult<&'a OriginalSnapshot> {
    match (snapshot, status) {
        (Some(snapshot), _) => Ok(snapshot),
        (None, LoadStatus::Empty) => Err(CsvEditError::EmptyDocument),
        (None, _) => Err(CsvEditError::NotReady),
    }
}

/// Command interface over one document
///
/// The session exclusively owns the table, the original snapshot and the
/// dirty set. Callers read through accessors and change state only through
/// the commands below.
pub struct DocumentSession {
    options: IngestOptions,
    document: Document,
    ingestion: Option<Ingestion>,
    observers: Vec<Box<dyn IngestObserver>>,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(IngestOptions::default())
    }
}

impl DocumentSession {
    pub fn new(options: IngestOptions) -> Self {
        Self {
            options,
            document: Document::new(None, LoadStatus::Idle),
            ingestion: None,
            observers: vec![],
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    pub fn subscribe(&mut self, observer: impl IngestObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn subscribe_callbacks(
        &mut self,
        progress: impl FnMut(f64) + Send + 'static,
        error: impl FnMut(&DecodeError) + Send + 'static,
        complete: impl FnMut(&LoadSummary) + Send + 'static,
    ) {
        self.subscribe(Callbacks::new(progress, error, complete));
    }

    /// Start loading a document on a background thread
    ///
    /// Any load in flight is cancelled and all editing state is replaced.
    /// Events are applied by [`poll`](Self::poll) or [`wait`](Self::wait).
    pub fn load<R>(&mut self, reader: R, name: Option<&str>, total_len: Option<u64>) -> CsvEditResult<()>
    where
        R: Read + Send + 'static,
    {
        let parser = StreamingParser::new(reader, self.options.parse)?.with_total_len(total_len);
        self.begin_document(name);

        let (sender, events) = mpsc::sync_channel(self.options.channel_capacity.max(1));
        let cancel = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&cancel);
        let handle = std::thread::Builder::new()
            .name("csvedit-ingest".to_string())
            .spawn(move || {
                for event in parser {
                    if stop.load(Ordering::Relaxed) || sender.send(event).is_err() {
                        debug!("Ingestion producer stopped early");
                        return;
                    }
                }
            })
            .map_err(|err| CsvEditError::io_error(err, "Failed to spawn ingestion thread"))?;

        self.ingestion.replace(Ingestion {
            events,
            cancel,
            _handle: handle,
        });
        Ok(())
    }

    /// Load a document on the calling thread
    pub fn load_blocking<R: Read>(
        &mut self,
        reader: R,
        name: Option<&str>,
        total_len: Option<u64>,
    ) -> CsvEditResult<LoadStatus> {
        let parser = StreamingParser::new(reader, self.options.parse)?.with_total_len(total_len);
        self.begin_document(name);
        for event in parser {
            self.apply(event)?;
        }
        Ok(self.document.status.clone())
    }

    /// Apply every event already produced, without blocking
    ///
    /// Returns the number of applied events.
    pub fn poll(&mut self) -> CsvEditResult<usize> {
        let mut applied = 0;
        loop {
            let next = match &self.ingestion {
                Some(ingestion) => ingestion.events.try_recv(),
                None => return Ok(applied),
            };
            match next {
                Ok(event) => {
                    applied += 1;
                    self.apply(event)?;
                }
                Err(TryRecvError::Empty) => return Ok(applied),
                Err(TryRecvError::Disconnected) => {
                    self.producer_vanished();
                    return Ok(applied);
                }
            }
        }
    }

    /// Block until the current load finishes
    pub fn wait(&mut self) -> CsvEditResult<LoadStatus> {
        loop {
            let next = match &self.ingestion {
                Some(ingestion) => ingestion.events.recv(),
                None => return Ok(self.document.status.clone()),
            };
            match next {
                Ok(event) => self.apply(event)?,
                Err(_) => self.producer_vanished(),
            }
        }
    }

    /// Stop the load in flight
    ///
    /// Rows appended so far stay readable. No snapshot is taken, so editing
    /// and export stay unavailable.
    pub fn cancel_load(&mut self) {
        if self.ingestion.take().is_some() {
            warn!(
                rows = self.document.table.get_row_count(),
                "Csv load cancelled"
            );
            self.document.status = LoadStatus::Cancelled;
        }
    }

    fn begin_document(&mut self, name: Option<&str>) {
        if self.ingestion.take().is_some() {
            debug!("Discarding load in flight");
        }
        info!(name = name.unwrap_or_default(), "Loading csv document");
        self.document = Document::new(name, LoadStatus::Loading);
    }

    fn producer_vanished(&mut self) {
        self.ingestion = None;
        if self.document.status == LoadStatus::Loading {
            let err = DecodeError::new(0, "Ingestion ended before completing");
            self.fail(err);
        }
    }

    fn apply(&mut self, event: ParseEvent) -> CsvEditResult<()> {
        match event {
            ParseEvent::HeaderRecord(fields) => {
                self.document.table.set_schema(build_schema(&fields))?;
            }
            ParseEvent::DataRecord(fields) => {
                self.document.table.append(fields)?;
            }
            ParseEvent::Progress(ratio) => {
                let doc = &mut self.document;
                doc.progress = doc.progress.max(ratio);
                for observer in self.observers.iter_mut() {
                    observer.on_progress(doc.progress);
                }
            }
            ParseEvent::Error(err) => {
                self.ingestion = None;
                self.fail(err);
            }
            ParseEvent::Complete => {
                self.ingestion = None;
                self.complete();
            }
        }
        Ok(())
    }

    fn complete(&mut self) {
        let doc = &mut self.document;
        doc.progress = 1.0;
        if doc.table.schema().is_none() {
            info!("Csv document is empty");
            doc.status = LoadStatus::Empty;
        } else {
            doc.snapshot.replace(doc.table.snapshot());
            doc.status = LoadStatus::Ready;
        }

        // An empty document completes with zero columns
        let summary = LoadSummary {
            rows: doc.table.get_row_count(),
            columns: doc.table.width(),
        };
        info!(rows = summary.rows, columns = summary.columns, "Csv document loaded");
        for observer in self.observers.iter_mut() {
            observer.on_complete(&summary);
        }
    }

    // Rows read before the failure stay editable against a partial snapshot
    fn fail(&mut self, err: DecodeError) {
        let doc = &mut self.document;
        warn!(
            offset = err.offset,
            rows = doc.table.get_row_count(),
            "Csv load failed : {}",
            err.reason
        );
        if doc.table.schema().is_some() {
            doc.snapshot.replace(doc.table.snapshot());
        }
        for observer in self.observers.iter_mut() {
            observer.on_error(&err);
        }
        doc.status = LoadStatus::Failed(err);
    }

    pub fn status(&self) -> &LoadStatus {
        &self.document.status
    }

    pub fn is_loading(&self) -> bool {
        self.document.status == LoadStatus::Loading
    }

    pub fn progress(&self) -> f64 {
        self.document.progress
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.name.as_deref()
    }

    pub fn get_schema(&self) -> Option<&Schema> {
        self.document.table.schema()
    }

    /// Column names in order, empty until a header is read
    pub fn column_names(&self) -> Vec<String> {
        self.document
            .table
            .schema()
            .map(|schema| schema.names().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn get_row(&self, id: RowId) -> CsvEditResult<Row> {
        self.document.table.find(id).cloned()
    }

    pub fn rows(&self) -> &[Row] {
        self.document.table.rows()
    }

    pub fn get_row_count(&self) -> usize {
        self.document.table.get_row_count()
    }

    /// Open a draft of a row, replacing any draft already open
    pub fn begin_edit(&mut self, id: RowId) -> CsvEditResult<Draft> {
        let doc = &mut self.document;
        ready_snapshot(&doc.snapshot, &doc.status)?;
        let draft = edit::begin_edit(&doc.table, id)?;
        doc.open_draft.replace(id);
        Ok(draft)
    }

    pub fn update_draft(
        &self,
        draft: Draft,
        column: usize,
        value: impl Into<String>,
    ) -> CsvEditResult<Draft> {
        draft.update(column, value)
    }

    pub fn cancel_edit(&mut self) {
        self.document.open_draft = None;
    }

    /// Whether the draft differs from the originally loaded row
    pub fn is_dirty(&self, draft: &Draft) -> CsvEditResult<bool> {
        let doc = &self.document;
        let snapshot = ready_snapshot(&doc.snapshot, &doc.status)?;
        Ok(edit::is_dirty(draft, snapshot.find(draft.row_id())?))
    }

    pub fn commit(&mut self, draft: Draft) -> CsvEditResult<CommitResult> {
        let doc = &mut self.document;
        let snapshot = ready_snapshot(&doc.snapshot, &doc.status)?;
        let id = draft.row_id();
        doc.table.find(id)?;
        if doc.open_draft != Some(id) {
            return Err(CsvEditError::DraftNotOpen(id));
        }

        let result = doc.tracker.commit(&mut doc.table, snapshot, draft)?;
        doc.open_draft = None;
        if result.changed {
            doc.revision += 1;
        }
        Ok(result)
    }

    pub fn has_any_changes(&self) -> bool {
        self.document.tracker.has_any_changes()
    }

    pub fn dirty_rows(&self) -> Vec<RowId> {
        self.document.tracker.dirty_rows().collect()
    }

    /// Discard every edit and restore the table as loaded
    ///
    /// This cannot be undone. Callers are expected to confirm with the user
    /// beforehand.
    pub fn reset(&mut self) -> CsvEditResult<()> {
        let doc = &mut self.document;
        let snapshot = ready_snapshot(&doc.snapshot, &doc.status)?;
        if doc.tracker.has_any_changes() {
            doc.revision += 1;
        }
        doc.table.reset_to(snapshot);
        doc.tracker.clear_all();
        doc.open_draft = None;
        debug!("Document reset to original snapshot");
        Ok(())
    }

    pub fn export(&mut self) -> CsvEditResult<String> {
        let doc = &mut self.document;
        ready_snapshot(&doc.snapshot, &doc.status)?;
        let csv = export::export(&doc.table, &self.options.parse)?;
        doc.exported_revision = doc.revision;
        Ok(csv)
    }

    pub fn export_to<W: Write>(&mut self, writer: W) -> CsvEditResult<()> {
        let doc = &mut self.document;
        ready_snapshot(&doc.snapshot, &doc.status)?;
        export::write_csv(&doc.table, &self.options.parse, writer)?;
        doc.exported_revision = doc.revision;
        Ok(())
    }

    /// File name suggested for an exported document
    pub fn export_file_name(&self) -> String {
        self.document
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_EXPORT_NAME.to_string())
    }

    /// Whether the table changed since the last export
    pub fn has_unexported_changes(&self) -> bool {
        self.document.revision != self.document.exported_revision
    }
}

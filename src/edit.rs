use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{CsvEditError, CsvEditResult};
use crate::table::{OriginalSnapshot, Row, RowId, Table};

/// Uncommitted copy of a single row's values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    row_id: RowId,
    values: Vec<String>,
}

impl Draft {
    pub fn row_id(&self) -> RowId {
        self.row_id
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Return a draft with one column replaced
    ///
    /// The table is untouched until the draft is committed.
    pub fn update(mut self, column: usize, value: impl Into<String>) -> CsvEditResult<Self> {
        let width = self.values.len();
        let cell = self
            .values
            .get_mut(column)
            .ok_or(CsvEditError::ColumnOutOfRange {
                index: column,
                width,
            })?;
        *cell = value.into();
        Ok(self)
    }
}

pub fn begin_edit(table: &Table, id: RowId) -> CsvEditResult<Draft> {
    let row = table.find(id)?;
    Ok(Draft {
        row_id: row.id,
        values: row.values.clone(),
    })
}

/// Whether a draft diverges from the row as originally ingested
///
/// `original` should come from the [`OriginalSnapshot`], not the live table,
/// so that reverting a field counts as clean again.
pub fn is_dirty(draft: &Draft, original: &Row) -> bool {
    draft.values.len() != original.values.len()
        || draft
            .values
            .iter()
            .zip(original.values.iter())
            .any(|(current, origin)| current != origin)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitResult {
    pub row_id: RowId,
    /// Live row changed by this commit
    pub changed: bool,
    /// Row differs from the snapshot after this commit
    pub dirty: bool,
    pub has_any_changes: bool,
}

/// Set of rows diverging from the original snapshot
#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    dirty: BTreeSet<RowId>,
}

impl EditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a draft into the table and reconcile its dirty state
    ///
    /// Dirtiness is recomputed against the snapshot after every commit, so a
    /// row edited back to its original values leaves the set.
    pub fn commit(
        &mut self,
        table: &mut Table,
        snapshot: &OriginalSnapshot,
        draft: Draft,
    ) -> CsvEditResult<CommitResult> {
        let id = draft.row_id;
        let changed = table.find(id)?.values != draft.values;
        let dirty = is_dirty(&draft, snapshot.find(id)?);

        if changed {
            table.replace(id, draft.values)?;
        }
        if dirty {
            self.dirty.insert(id);
        } else {
            self.dirty.remove(&id);
        }
        debug!(row = %id, changed, dirty, "Committed row edit");

        Ok(CommitResult {
            row_id: id,
            changed,
            dirty,
            has_any_changes: self.has_any_changes(),
        })
    }

    pub fn has_any_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.dirty.contains(&id)
    }

    /// Dirty row ids in ascending order
    pub fn dirty_rows(&self) -> impl Iterator<Item = RowId> + '_ {
        self.dirty.iter().copied()
    }

    pub fn clear_all(&mut self) {
        self.dirty.clear();
    }
}

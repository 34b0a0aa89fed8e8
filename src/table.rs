use crate::error::{CsvEditError, CsvEditResult};
use crate::schema::Schema;

/// Stable row identifier
///
/// Ids start at 1 and follow ingestion order. They are never reused or
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RowId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(RowId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub(crate) id: RowId,
    pub(crate) values: Vec<String>,
}

impl Row {
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Values ordered by column index
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

// Ids are dense and rows are never removed, so an id maps to a fixed slot
fn slot_of(rows: &[Row], id: RowId) -> Option<usize> {
    let slot = usize::try_from(id.0.checked_sub(1)?).ok()?;
    rows.get(slot).filter(|row| row.id == id).map(|_| slot)
}

/// Live, editable rows of one document
#[derive(Debug, Clone)]
pub struct Table {
    schema: Option<Schema>,
    rows: Vec<Row>,
    next_id: u64,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Self {
            schema: None,
            rows: vec![],
            next_id: 1,
        }
    }

    pub fn set_schema(&mut self, schema: Schema) -> CsvEditResult<()> {
        if self.schema.is_some() {
            return Err(CsvEditError::SchemaAlreadySet);
        }
        self.schema.replace(schema);
        Ok(())
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn width(&self) -> usize {
        self.schema.as_ref().map_or(0, Schema::len)
    }

    /// Append a record as a new row
    ///
    /// Missing trailing cells become empty strings and extra cells are dropped.
    pub fn append(&mut self, mut values: Vec<String>) -> CsvEditResult<&Row> {
        let width = match &self.schema {
            Some(schema) => schema.len(),
            None => return Err(CsvEditError::NotReady),
        };
        values.resize(width, String::new());
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, values });
        Ok(&self.rows[self.rows.len() - 1])
    }

    pub fn find(&self, id: RowId) -> CsvEditResult<&Row> {
        slot_of(&self.rows, id)
            .map(|slot| &self.rows[slot])
            .ok_or(CsvEditError::RowNotFound(id))
    }

    /// Swap values of a row in place, keeping its id and position
    pub fn replace(&mut self, id: RowId, mut values: Vec<String>) -> CsvEditResult<()> {
        let slot = slot_of(&self.rows, id).ok_or(CsvEditError::RowNotFound(id))?;
        values.resize(self.width(), String::new());
        self.rows[slot].values = values;
        Ok(())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get_row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn snapshot(&self) -> OriginalSnapshot {
        OriginalSnapshot {
            schema: self.schema.clone().unwrap_or_default(),
            rows: self.rows.clone(),
        }
    }

    /// Replace every row with a copy of the snapshot's rows
    pub fn reset_to(&mut self, snapshot: &OriginalSnapshot) {
        self.rows = snapshot.rows.clone();
    }
}

/// Table as it was when ingestion finished
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalSnapshot {
    schema: Schema,
    rows: Vec<Row>,
}

impl OriginalSnapshot {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn find(&self, id: RowId) -> CsvEditResult<&Row> {
        slot_of(&self.rows, id)
            .map(|slot| &self.rows[slot])
            .ok_or(CsvEditError::RowNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_schema;

    fn values(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> CsvEditResult<Table> {
        let mut table = Table::new();
        table.set_schema(build_schema(&["a", "b", "c"]))?;
        table.append(values(&["1", "2", "3"]))?;
        table.append(values(&["4"]))?;
        table.append(values(&["5", "6", "7", "8"]))?;
        Ok(table)
    }

    #[test]
    fn append_assigns_ids_and_normalizes_width() -> CsvEditResult<()> {
        let table = sample()?;
        let ids = table.rows().iter().map(Row::id).collect::<Vec<_>>();
        assert_eq!(ids, vec![RowId(1), RowId(2), RowId(3)]);
        assert_eq!(table.find(RowId(2))?.values(), values(&["4", "", ""]).as_slice());
        assert_eq!(table.find(RowId(3))?.values(), values(&["5", "6", "7"]).as_slice());
        Ok(())
    }

    #[test]
    fn schema_is_set_once() -> CsvEditResult<()> {
        let mut table = sample()?;
        let result = table.set_schema(build_schema(&["x"]));
        assert!(matches!(result, Err(CsvEditError::SchemaAlreadySet)));
        assert_eq!(table.width(), 3);
        Ok(())
    }

    #[test]
    fn append_requires_schema() {
        let mut table = Table::new();
        assert!(matches!(table.append(values(&["1"])), Err(CsvEditError::NotReady)));
    }

    #[test]
    fn missing_rows_are_not_found() -> CsvEditResult<()> {
        let mut table = sample()?;
        for id in [RowId(0), RowId(4), RowId(u64::MAX)] {
            assert!(matches!(table.find(id), Err(CsvEditError::RowNotFound(missing)) if missing == id));
        }
        let before = table.rows().to_vec();
        assert!(table.replace(RowId(9), values(&["x", "y", "z"])).is_err());
        assert_eq!(table.rows(), before.as_slice());
        Ok(())
    }

    #[test]
    fn replace_and_reset_keep_order_and_ids() -> CsvEditResult<()> {
        let mut table = sample()?;
        let snapshot = table.snapshot();
        table.replace(RowId(2), values(&["x", "y", "z"]))?;
        assert_eq!(table.rows()[1].id(), RowId(2));
        assert_eq!(table.rows()[1].get(1), Some("y"));
        assert_eq!(snapshot.find(RowId(2))?.get(1), Some(""));

        table.reset_to(&snapshot);
        assert_eq!(table.rows(), snapshot.rows());
        table.reset_to(&snapshot);
        assert_eq!(table.rows(), snapshot.rows());
        Ok(())
    }
}

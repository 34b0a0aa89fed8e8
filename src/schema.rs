/// Positional column of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub(crate) index: usize,
    pub(crate) name: String,
}

impl Column {
    pub fn new(index: usize, name: &str) -> Self {
        let name = if name.is_empty() {
            format!("col_{}", index)
        } else {
            name.to_string()
        };
        Self { index, name }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered columns derived from a header record
///
/// Columns are keyed by index. Duplicate names are kept as is so that two
/// columns sharing a header never merge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }

    /// First column with the given name
    pub fn try_get_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .map(|col| col.index)
    }
}

pub fn build_schema(header_fields: &[impl AsRef<str>]) -> Schema {
    let columns = header_fields
        .iter()
        .enumerate()
        .map(|(index, field)| Column::new(index, field.as_ref()))
        .collect();
    Schema { columns }
}

use std::io::{ErrorKind, Write};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::config::ParseOptions;
use crate::error::{CsvEditError, CsvEditResult};
use crate::table::Table;

// Fields are quoted only when they hold the delimiter, the quote char or a
// line break. A record made of one empty field is written as a quoted pair.
fn csv_writer<W: Write>(options: &ParseOptions, writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote(options.quote_char)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer)
}

fn write_error(err: csv::Error, meta: &str) -> CsvEditError {
    CsvEditError::io_error(err.into(), meta)
}

/// Render the table as csv text
///
/// Header first, then rows in table order. Every record ends with a single LF.
pub fn export(table: &Table, options: &ParseOptions) -> CsvEditResult<String> {
    let mut buffer = vec![];
    write_csv(table, options, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| {
        CsvEditError::io_error(
            std::io::Error::new(ErrorKind::InvalidData, err),
            "Exported csv is not valid utf-8",
        )
    })
}

/// Stream the table as csv text into a writer
pub fn write_csv<W: Write>(table: &Table, options: &ParseOptions, writer: W) -> CsvEditResult<()> {
    let schema = match table.schema() {
        Some(schema) => schema,
        None => return Ok(()),
    };
    let mut writer = csv_writer(options, writer);
    writer
        .write_record(schema.names())
        .map_err(|err| write_error(err, "Failed to write csv header"))?;

    for row in table.rows() {
        writer
            .write_record(row.values())
            .map_err(|err| write_error(err, &format!("Failed to write row {}", row.id())))?;
    }
    writer
        .flush()
        .map_err(|err| CsvEditError::io_error(err, "Failed to flush csv output"))?;
    Ok(())
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = export(self, &ParseOptions::default()).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", text)
    }
}

use crate::error::{CsvEditError, CsvEditResult};
use std::io::Write;

pub(crate) fn write_to_stdout(src: &str) -> CsvEditResult<()> {
    write!(std::io::stdout(), "{}", src)
        .map_err(|err| CsvEditError::io_error(err, "Failed to write to stdout"))?;
    std::io::stdout()
        .flush()
        .map_err(|err| CsvEditError::io_error(err, "Failed to flush stdout"))?;
    Ok(())
}

pub(crate) fn write_to_stderr(src: &str) -> CsvEditResult<()> {
    write!(std::io::stderr(), "{}", src)
        .map_err(|err| CsvEditError::io_error(err, "Failed to write to stderr"))?;
    std::io::stderr()
        .flush()
        .map_err(|err| CsvEditError::io_error(err, "Failed to flush stderr"))?;
    Ok(())
}

/// Read a line, returning read byte count. Zero means end of input
pub(crate) fn read_stdin_until_eof(strip_newline: bool, input: &mut String) -> CsvEditResult<usize> {
    let read_byte = std::io::stdin()
        .read_line(input)
        .map_err(|err| CsvEditError::io_error(err, "Failed to read stdin from source"))?;
    if strip_newline && (input.ends_with('\n') || input.ends_with("\r\n")) {
        *input = input.trim().to_owned();
    }
    Ok(read_byte)
}

pub(crate) fn confirm(question: &str) -> CsvEditResult<bool> {
    write_to_stdout(&format!("{} (y/N) : ", question))?;
    let mut input = String::new();
    read_stdin_until_eof(true, &mut input)?;
    Ok(input.eq_ignore_ascii_case("y"))
}

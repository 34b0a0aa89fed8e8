use super::utils;
use crate::error::CsvEditResult;

const BINARY_HELP: &str = include_str!("../help/bin.txt");
const COMMAND_HELP: &str = include_str!("../help/commands.txt");

pub fn print_binary_help_text() -> CsvEditResult<()> {
    utils::write_to_stdout(BINARY_HELP)
}

pub fn print_help_text() -> CsvEditResult<()> {
    utils::write_to_stdout(COMMAND_HELP)
}

pub fn print_version() -> CsvEditResult<()> {
    utils::write_to_stdout(&format!("csvedit, {}\n", env!("CARGO_PKG_VERSION")))
}

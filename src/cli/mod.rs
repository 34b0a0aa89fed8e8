mod command;
mod command_loop;
pub mod help;
pub mod parse;
pub mod utils;

pub use command::{Command, CommandType, Editor};
pub use command_loop::{start_main_loop, CommandLoop};
pub use parse::{Flag, FlagType, Parser};

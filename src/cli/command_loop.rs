use super::command::{Command, CommandType, Editor};
use super::parse::{FlagType, Parser};
use super::{help, utils};
use crate::config::IngestOptions;
use crate::error::CsvEditResult;
use crate::session::DocumentSession;
use std::path::Path;

pub fn start_main_loop() -> CsvEditResult<()> {
    let args: Vec<String> = std::env::args().collect();
    let flags = Parser::new().parse_from_vec(args.get(1..).unwrap_or_default());

    let mut command_loop = CommandLoop::new(DocumentSession::new(IngestOptions::from_env()));
    let mut import = None;
    let mut command = None;

    for item in flags.iter() {
        match item.ftype {
            FlagType::Version => return help::print_version(),
            FlagType::Help => return help::print_binary_help_text(),
            FlagType::Yes => command_loop.editor.assume_yes = true,
            FlagType::Argument => {
                if !item.option.is_empty() {
                    import.replace(item.option.clone());
                }
            }
            FlagType::Command => {
                if !item.option.is_empty() {
                    command.replace(item.option.clone());
                } else {
                    utils::write_to_stderr("WRN : Command is empty thus not executed\n")?;
                }
            }
            FlagType::None => (),
        }
    }

    if let Some(file) = import.as_ref() {
        if let Err(err) = command_loop.editor.import_file(Path::new(file)) {
            utils::write_to_stderr(&(err.to_string() + "\n"))?;
            return Ok(());
        }
    }

    if let Some(cmd) = command.as_ref() {
        for src in cmd.split_terminator(';') {
            command_loop.feed_command(&Command::from_str(src)?, true)?;
        }
        return Ok(());
    }

    // Handle error inside loop
    if let Some(err) = command_loop.start_loop().err() {
        utils::write_to_stderr(&(err.to_string() + "\n"))?;
    }
    Ok(())
}

pub struct CommandLoop {
    pub(crate) editor: Editor,
}

impl CommandLoop {
    pub fn new(session: DocumentSession) -> Self {
        Self {
            editor: Editor::new(session),
        }
    }

    /// Execute a command, returning errors only when `panic` is set
    pub fn feed_command(&mut self, command: &Command, panic: bool) -> CsvEditResult<()> {
        if let Err(err) = self.editor.execute_command(command) {
            if panic {
                return Err(err);
            }
            utils::write_to_stderr(&(err.to_string() + "\n"))?;
        }
        Ok(())
    }

    /// Start a loop until exit
    pub fn start_loop(&mut self) -> CsvEditResult<()> {
        utils::write_to_stdout("Csvedit, a csv editor\n")?;
        loop {
            utils::write_to_stdout(">> ")?;
            let mut input = String::new();
            if utils::read_stdin_until_eof(true, &mut input)? == 0 {
                break;
            }
            if input.is_empty() {
                continue;
            }
            let command = match Command::from_str(&input) {
                Ok(command) => command,
                Err(err) => {
                    utils::write_to_stderr(&(err.to_string() + "\n"))?;
                    continue;
                }
            };
            if command.command_type == CommandType::Exit && self.confirm_exit()? {
                break;
            }
            self.feed_command(&command, false)?;
        }
        Ok(())
    }

    fn confirm_exit(&self) -> CsvEditResult<bool> {
        if self.editor.assume_yes || !self.editor.has_unexported_changes() {
            return Ok(true);
        }
        utils::confirm(&format!(
            "Edits were not exported to \"{}\". Quit anyway?",
            self.editor.export_file_name()
        ))
    }
}

use super::{help, utils};
use crate::error::{CsvEditError, CsvEditResult};
use crate::session::{DocumentSession, LoadStatus};
use crate::table::RowId;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(30);

#[derive(PartialEq, Eq, Debug)]
pub enum CommandType {
    Version,
    Help,
    Import,
    Print,
    View,
    Edit,
    Changes,
    Reset,
    Export,
    Exit,
    None(String),
}

impl CommandType {
    pub fn from_str(src: &str) -> Self {
        match src.to_lowercase().trim() {
            "version" => Self::Version,
            "help" | "h" => Self::Help,
            "import" | "i" => Self::Import,
            "print" | "p" => Self::Print,
            "view" | "v" => Self::View,
            "edit" | "e" => Self::Edit,
            "changes" | "c" => Self::Changes,
            "reset" | "r" => Self::Reset,
            "export" | "x" => Self::Export,
            "exit" | "quit" | "q" => Self::Exit,
            _ => Self::None(src.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct Command {
    pub command_type: CommandType,
    pub arguments: Vec<String>,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            command_type: CommandType::Print,
            arguments: vec![],
        }
    }
}

impl Command {
    pub fn from_str(src: &str) -> CsvEditResult<Self> {
        let src: Vec<&str> = src.split_whitespace().collect();
        let (command, arguments) = src
            .split_first()
            .ok_or_else(|| CsvEditError::Cli("Empty command".to_string()))?;
        Ok(Self {
            command_type: CommandType::from_str(command),
            arguments: arguments.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Presentation layer over a document session
pub struct Editor {
    pub(crate) session: DocumentSession,
    pub(crate) assume_yes: bool,
}

impl Editor {
    pub fn new(session: DocumentSession) -> Self {
        Self {
            session,
            assume_yes: false,
        }
    }

    pub fn execute_command(&mut self, command: &Command) -> CsvEditResult<()> {
        match &command.command_type {
            CommandType::Version => help::print_version()?,
            CommandType::Help => help::print_help_text()?,
            CommandType::None(src) => {
                return Err(CsvEditError::Cli(format!("No such command \"{src}\"")))
            }
            CommandType::Import => self.import_file_from_args(&command.arguments)?,
            CommandType::Print => self.print()?,
            CommandType::View => self.view_row_from_args(&command.arguments)?,
            CommandType::Edit => self.edit_cell_from_args(&command.arguments)?,
            CommandType::Changes => self.print_changes()?,
            CommandType::Reset => self.reset()?,
            CommandType::Export => self.export_from_args(&command.arguments)?,
            // Handled by the command loop
            CommandType::Exit => (),
        }
        Ok(())
    }

    fn import_file_from_args(&mut self, args: &[String]) -> CsvEditResult<()> {
        let path = args
            .first()
            .ok_or_else(|| CsvEditError::Cli("Insufficient arguments for import".to_string()))?;
        self.import_file(Path::new(path))
    }

    pub fn import_file(&mut self, path: &Path) -> CsvEditResult<()> {
        let file = File::open(path).map_err(|err| {
            CsvEditError::io_error(err, &format!("Failed to read file \"{}\"", path.display()))
        })?;
        let total_len = file.metadata().ok().map(|meta| meta.len());
        let name = path.file_name().map(|name| name.to_string_lossy().into_owned());

        self.session.load(file, name.as_deref(), total_len)?;
        while self.session.is_loading() {
            self.session.poll()?;
            utils::write_to_stderr(&format!(
                "\rLoading... {:>3.0}%",
                self.session.progress() * 100.0
            ))?;
            std::thread::sleep(PROGRESS_INTERVAL);
        }
        utils::write_to_stderr("\n")?;

        let rows = self.session.get_row_count();
        match self.session.status() {
            LoadStatus::Ready => utils::write_to_stdout(&format!("Loaded {} rows\n", rows))?,
            LoadStatus::Empty => utils::write_to_stdout("Document is empty\n")?,
            LoadStatus::Failed(err) => utils::write_to_stderr(&format!(
                "Failed to load : {}\n{} rows were kept\n",
                err, rows
            ))?,
            LoadStatus::Idle | LoadStatus::Loading | LoadStatus::Cancelled => (),
        }
        Ok(())
    }

    fn print(&self) -> CsvEditResult<()> {
        let schema = match self.session.get_schema() {
            Some(schema) => schema,
            None => return utils::write_to_stdout("No document loaded\n"),
        };
        let dirty = self.session.dirty_rows().into_iter().collect::<HashSet<_>>();

        let mut out = format!("id | {}\n", schema.names().collect::<Vec<_>>().join(" | "));
        for row in self.session.rows() {
            let marker = if dirty.contains(&row.id()) { "*" } else { "" };
            out.push_str(&format!("{}{} | {}\n", row.id(), marker, row.values().join(" | ")));
        }
        utils::write_to_stdout(&out)
    }

    fn view_row_from_args(&self, args: &[String]) -> CsvEditResult<()> {
        let id = parse_row_id(args.first())?;
        let row = self.session.get_row(id)?;
        let schema = self.session.get_schema().ok_or(CsvEditError::NotReady)?;
        let mut out = String::new();
        for (column, value) in schema.columns().iter().zip(row.values()) {
            out.push_str(&format!("{} = {}\n", column.name(), value));
        }
        utils::write_to_stdout(&out)
    }

    fn edit_cell_from_args(&mut self, args: &[String]) -> CsvEditResult<()> {
        if args.len() < 3 {
            return Err(CsvEditError::Cli(
                "Insufficient arguments for edit".to_string(),
            ));
        }
        let id = parse_row_id(args.first())?;
        let column = self.column_index(&args[1])?;
        let value = args[2..].join(" ");

        let draft = self.session.begin_edit(id)?;
        let draft = self.session.update_draft(draft, column, value)?;
        let result = self.session.commit(draft)?;
        if result.dirty {
            utils::write_to_stdout(&format!("Row \"{}\" edited\n", id))
        } else {
            utils::write_to_stdout(&format!("Row \"{}\" matches the original\n", id))
        }
    }

    fn column_index(&self, src: &str) -> CsvEditResult<usize> {
        let schema = self.session.get_schema().ok_or(CsvEditError::NotReady)?;
        schema
            .try_get_column_index(src)
            .or_else(|| src.parse::<usize>().ok().filter(|index| *index < schema.len()))
            .ok_or_else(|| CsvEditError::Cli(format!("Column : \"{}\" is not valid", src)))
    }

    fn print_changes(&self) -> CsvEditResult<()> {
        let dirty = self.session.dirty_rows();
        if dirty.is_empty() {
            return utils::write_to_stdout("No changes\n");
        }
        let ids = dirty.iter().map(RowId::to_string).collect::<Vec<_>>();
        utils::write_to_stdout(&format!("Edited rows : {}\n", ids.join(", ")))
    }

    fn reset(&mut self) -> CsvEditResult<()> {
        if !self.assume_yes && !utils::confirm("All changes will be lost. Are you sure?")? {
            return Ok(());
        }
        self.session.reset()?;
        utils::write_to_stdout("Document restored\n")
    }

    fn export_from_args(&mut self, args: &[String]) -> CsvEditResult<()> {
        let path = match args.first() {
            Some(path) => path,
            None => {
                let csv = self.session.export()?;
                return utils::write_to_stdout(&csv);
            }
        };
        let file = File::create(path).map_err(|err| {
            CsvEditError::io_error(err, &format!("Failed to create file \"{}\"", path))
        })?;
        self.session.export_to(BufWriter::new(file))?;
        utils::write_to_stdout(&format!("Exported to \"{}\"\n", path))
    }

    pub fn has_unexported_changes(&self) -> bool {
        self.session.has_unexported_changes()
    }

    pub fn export_file_name(&self) -> String {
        self.session.export_file_name()
    }
}

fn parse_row_id(src: Option<&String>) -> CsvEditResult<RowId> {
    let src = src.ok_or_else(|| CsvEditError::Cli("Row id is required".to_string()))?;
    src.parse::<RowId>()
        .map_err(|_| CsvEditError::Cli(format!("\"{}\" is not a valid row id", src)))
}

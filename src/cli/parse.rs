/// Command line flag parser
pub struct Parser {
    flags: Vec<Flag>,
    accept_flag_option: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            flags: vec![],
            accept_flag_option: false,
        }
    }

    pub fn parse_from_vec(&mut self, source: &[impl AsRef<str>]) -> Vec<Flag> {
        for item in source {
            let should_break = self.find_word_variant(item.as_ref());
            if should_break {
                break;
            }
        }
        self.accept_flag_option = false;
        std::mem::take(&mut self.flags)
    }

    /// Check word variant
    ///
    /// * - Return : If loop should break
    fn find_word_variant(&mut self, word: &str) -> bool {
        if self.accept_flag_option {
            if let Some(flag) = self.flags.last_mut() {
                flag.option = word.to_string();
            }
            self.accept_flag_option = false;
            return false;
        }

        if !word.starts_with('-') {
            self.flags.push(Flag::argument(word));
            return false;
        }

        let flag = Self::match_word(word);
        if flag.early_exit {
            self.flags = vec![flag];
            return true;
        }
        if flag.need_option {
            self.accept_flag_option = true;
        }
        if flag.ftype != FlagType::None {
            self.flags.push(flag);
        }
        false
    }

    fn match_word(word: &str) -> Flag {
        match word.trim() {
            "--version" | "-v" => Flag::early(FlagType::Version),
            "--help" | "-h" => Flag::early(FlagType::Help),
            "--yes" | "-y" => Flag::switch(FlagType::Yes),
            "--command" | "-c" => Flag::with_option(FlagType::Command),
            _ => Flag::switch(FlagType::None),
        }
    }
}

#[derive(Debug)]
pub struct Flag {
    pub ftype: FlagType,
    pub need_option: bool,
    pub option: String,
    pub early_exit: bool,
}

impl Flag {
    fn new(ftype: FlagType, need_option: bool, early_exit: bool) -> Self {
        Self {
            ftype,
            need_option,
            option: String::new(),
            early_exit,
        }
    }

    pub fn argument(arg: &str) -> Self {
        let mut flag = Self::new(FlagType::Argument, false, false);
        flag.option = arg.to_string();
        flag
    }

    fn switch(ftype: FlagType) -> Self {
        Self::new(ftype, false, false)
    }

    fn with_option(ftype: FlagType) -> Self {
        Self::new(ftype, true, false)
    }

    fn early(ftype: FlagType) -> Self {
        Self::new(ftype, false, true)
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum FlagType {
    Argument,
    Command,
    Help,
    Version,
    Yes,
    None,
}

use crate::error::{CsvEditError, CsvEditResult};

pub const DEFAULT_DELIMITER: u8 = b',';
pub const DEFAULT_QUOTE: u8 = b'"';
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Dialect and buffering options shared by the parser and the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub delimiter: u8,
    pub quote_char: u8,
    pub chunk_size_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            quote_char: DEFAULT_QUOTE,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ParseOptions {
    /// Read options from environment, falling back to defaults per value
    ///
    /// * CSVEDIT_DELIMITER  : single ascii character, or "tab"
    /// * CSVEDIT_QUOTE      : single ascii character
    /// * CSVEDIT_CHUNK_SIZE : chunk size in bytes
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(delimiter) = env_byte("CSVEDIT_DELIMITER") {
            options.delimiter = delimiter;
        }
        if let Some(quote) = env_byte("CSVEDIT_QUOTE") {
            options.quote_char = quote;
        }
        if let Some(size) = env_usize("CSVEDIT_CHUNK_SIZE") {
            options.chunk_size_bytes = size;
        }
        options
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size_bytes: usize) -> Self {
        self.chunk_size_bytes = chunk_size_bytes;
        self
    }

    pub fn validate(&self) -> CsvEditResult<()> {
        if self.chunk_size_bytes == 0 {
            return Err(CsvEditError::InvalidOptions(
                "Chunk size should be bigger than 0".to_string(),
            ));
        }
        for (name, byte) in [("Delimiter", self.delimiter), ("Quote", self.quote_char)] {
            if !byte.is_ascii() || byte == b'\r' || byte == b'\n' {
                return Err(CsvEditError::InvalidOptions(format!(
                    "{} \"{}\" should be an ascii character other than a line break",
                    name,
                    byte.escape_ascii()
                )));
            }
        }
        if self.delimiter == self.quote_char {
            return Err(CsvEditError::InvalidOptions(
                "Delimiter and quote should be different characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for a background load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub parse: ParseOptions,
    /// Bound of the event channel between producer and session
    pub channel_capacity: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl IngestOptions {
    pub fn from_env() -> Self {
        Self {
            parse: ParseOptions::from_env(),
            channel_capacity: env_usize("CSVEDIT_CHANNEL_CAPACITY")
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY),
        }
    }

    pub fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|num| *num > 0)
}

fn env_byte(key: &str) -> Option<u8> {
    let value = std::env::var(key).ok()?;
    if value.eq_ignore_ascii_case("tab") {
        return Some(b'\t');
    }
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Some(*byte),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let options = ParseOptions::default();
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.quote_char, b'"');
        assert_eq!(options.chunk_size_bytes, 1_048_576);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_dialects() {
        assert!(ParseOptions::default().with_chunk_size(0).validate().is_err());
        assert!(ParseOptions::default().with_delimiter(b'\n').validate().is_err());
        assert!(ParseOptions::default().with_delimiter(b'"').validate().is_err());
        assert!(ParseOptions::default().with_quote_char(0xC3).validate().is_err());
        assert!(ParseOptions::default().with_delimiter(b';').validate().is_ok());
    }
}

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use crate::config::ParseOptions;
use crate::error::{CsvEditResult, DecodeError};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Single step of an ingestion
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    HeaderRecord(Vec<String>),
    DataRecord(Vec<String>),
    Progress(f64),
    Error(DecodeError),
    Complete,
}

impl ParseEvent {
    /// Complete and Error end the sequence
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }
}

/// Create a lazy event sequence over a reader
pub fn parse<R: Read>(reader: R, options: ParseOptions) -> CsvEditResult<StreamingParser<R>> {
    StreamingParser::new(reader, options)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Incremental record decoder
///
/// Bytes may be fed in slices of any size. Decoded records are pushed to the
/// given queue as soon as their terminating line break is seen, so a record
/// split across chunk boundaries decodes the same as an unsplit one.
pub(crate) struct RecordDecoder {
    delimiter: u8,
    quote: u8,
    state: FieldState,
    field: Vec<u8>,
    fields: Vec<String>,
    // Absolute offset of the next byte
    offset: u64,
    field_start: u64,
    quote_start: u64,
    // Current field opened with a quote
    quoted: bool,
    skip_lf: bool,
    // Matched BOM prefix length while the document start is still undecided
    bom: Option<usize>,
}

impl RecordDecoder {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            delimiter: options.delimiter,
            quote: options.quote_char,
            state: FieldState::Start,
            field: vec![],
            fields: vec![],
            offset: 0,
            field_start: 0,
            quote_start: 0,
            quoted: false,
            skip_lf: false,
            bom: Some(0),
        }
    }

    pub fn feed(
        &mut self,
        bytes: &[u8],
        out: &mut VecDeque<Vec<String>>,
    ) -> Result<(), DecodeError> {
        for &byte in bytes {
            let pos = self.offset;
            self.offset += 1;

            if let Some(matched) = self.bom {
                if byte == UTF8_BOM[matched] {
                    self.bom = if matched + 1 == UTF8_BOM.len() {
                        self.field_start = self.offset;
                        None
                    } else {
                        Some(matched + 1)
                    };
                    continue;
                }
                self.bom = None;
                self.replay_bom_prefix(matched, out)?;
            }

            self.consume(byte, pos, out)?;
        }
        Ok(())
    }

    /// Flush the trailing record at end of input
    pub fn finish(&mut self, out: &mut VecDeque<Vec<String>>) -> Result<(), DecodeError> {
        if let Some(matched) = self.bom.take() {
            self.replay_bom_prefix(matched, out)?;
        }
        match self.state {
            FieldState::Quoted => Err(DecodeError::new(
                self.quote_start,
                "Unterminated quoted field",
            )),
            FieldState::Start if self.fields.is_empty() => Ok(()),
            _ => self.end_record(self.offset, out),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    // Bytes looked like a BOM but weren't, decode them as content
    fn replay_bom_prefix(
        &mut self,
        matched: usize,
        out: &mut VecDeque<Vec<String>>,
    ) -> Result<(), DecodeError> {
        for (index, byte) in UTF8_BOM[..matched].iter().enumerate() {
            self.consume(*byte, index as u64, out)?;
        }
        Ok(())
    }

    fn consume(
        &mut self,
        byte: u8,
        pos: u64,
        out: &mut VecDeque<Vec<String>>,
    ) -> Result<(), DecodeError> {
        if self.skip_lf {
            self.skip_lf = false;
            if byte == b'\n' {
                self.field_start = pos + 1;
                return Ok(());
            }
        }

        match self.state {
            FieldState::Start => {
                if byte == self.quote {
                    self.state = FieldState::Quoted;
                    self.quote_start = pos;
                    self.quoted = true;
                } else if byte == self.delimiter {
                    self.end_field(pos)?;
                } else if byte == b'\r' || byte == b'\n' {
                    self.skip_lf = byte == b'\r';
                    self.end_record(pos, out)?;
                } else {
                    self.field.push(byte);
                    self.state = FieldState::Unquoted;
                }
            }
            FieldState::Unquoted => {
                if byte == self.delimiter {
                    self.end_field(pos)?;
                } else if byte == b'\r' || byte == b'\n' {
                    self.skip_lf = byte == b'\r';
                    self.end_record(pos, out)?;
                } else {
                    // A quote inside an unquoted field is literal
                    self.field.push(byte);
                }
            }
            FieldState::Quoted => {
                if byte == self.quote {
                    self.state = FieldState::QuoteInQuoted;
                } else {
                    self.field.push(byte);
                }
            }
            FieldState::QuoteInQuoted => {
                if byte == self.quote {
                    self.field.push(byte);
                    self.state = FieldState::Quoted;
                } else if byte == self.delimiter {
                    self.end_field(pos)?;
                } else if byte == b'\r' || byte == b'\n' {
                    self.skip_lf = byte == b'\r';
                    self.end_record(pos, out)?;
                } else {
                    return Err(DecodeError::new(
                        pos,
                        format!(
                            "Unexpected character \"{}\" after closing quote",
                            byte.escape_ascii()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn end_field(&mut self, pos: u64) -> Result<(), DecodeError> {
        let bytes = std::mem::take(&mut self.field);
        let value = String::from_utf8(bytes)
            .map_err(|_| DecodeError::new(self.field_start, "Field is not valid utf-8"))?;
        self.fields.push(value);
        self.state = FieldState::Start;
        self.quoted = false;
        self.field_start = pos + 1;
        Ok(())
    }

    fn end_record(&mut self, pos: u64, out: &mut VecDeque<Vec<String>>) -> Result<(), DecodeError> {
        let quoted = self.quoted;
        self.end_field(pos)?;
        let record = std::mem::take(&mut self.fields);
        // Blank line. A quoted empty field is still a record
        if record.len() == 1 && record[0].is_empty() && !quoted {
            return Ok(());
        }
        out.push_back(record);
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Reading,
    Finished,
}

/// Chunked csv reader yielding [`ParseEvent`]s
///
/// At most one chunk of `chunk_size_bytes` is buffered at a time. Dropping the
/// parser before the terminal event releases the chunk buffer and the partial
/// record without further reads.
pub struct StreamingParser<R> {
    reader: R,
    decoder: RecordDecoder,
    chunk: Vec<u8>,
    records: VecDeque<Vec<String>>,
    pending: VecDeque<ParseEvent>,
    total_len: Option<u64>,
    consumed: u64,
    chunks_read: u64,
    last_progress: f64,
    header_emitted: bool,
    phase: Phase,
}

impl<R: Read> StreamingParser<R> {
    pub fn new(reader: R, options: ParseOptions) -> CsvEditResult<Self> {
        options.validate()?;
        Ok(Self {
            reader,
            decoder: RecordDecoder::new(&options),
            chunk: vec![0; options.chunk_size_bytes],
            records: VecDeque::new(),
            pending: VecDeque::new(),
            total_len: None,
            consumed: 0,
            chunks_read: 0,
            last_progress: 0.0,
            header_emitted: false,
            phase: Phase::Reading,
        })
    }

    /// Set the total input size used for byte based progress
    pub fn with_total_len(mut self, total_len: Option<u64>) -> Self {
        self.total_len = total_len.filter(|len| *len > 0);
        self
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    fn advance(&mut self) {
        let read = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(read) => break read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(offset = self.consumed, "Failed to read csv input : {}", err);
                    self.fail(DecodeError::new(
                        self.consumed,
                        format!("Failed to read input : {}", err),
                    ));
                    return;
                }
            }
        };

        if read == 0 {
            let result = self.decoder.finish(&mut self.records);
            self.queue_records();
            match result {
                Ok(()) => {
                    self.last_progress = 1.0;
                    self.pending.push_back(ParseEvent::Progress(1.0));
                    self.pending.push_back(ParseEvent::Complete);
                    self.phase = Phase::Finished;
                    debug!(
                        bytes = self.consumed,
                        chunks = self.chunks_read,
                        "Finished reading csv input"
                    );
                }
                Err(err) => self.fail(err),
            }
            return;
        }

        self.consumed += read as u64;
        self.chunks_read += 1;
        debug!(bytes = read, chunk = self.chunks_read, "Read csv chunk");

        let result = self.decoder.feed(&self.chunk[..read], &mut self.records);
        // Records decoded before a failure stay valid
        self.queue_records();
        match result {
            Ok(()) => {
                let progress = self.estimate_progress();
                self.pending.push_back(ParseEvent::Progress(progress));
            }
            Err(err) => self.fail(err),
        }
    }

    fn queue_records(&mut self) {
        while let Some(record) = self.records.pop_front() {
            if self.header_emitted {
                self.pending.push_back(ParseEvent::DataRecord(record));
            } else {
                self.header_emitted = true;
                self.pending.push_back(ParseEvent::HeaderRecord(record));
            }
        }
    }

    fn fail(&mut self, err: DecodeError) {
        warn!(offset = err.offset, "Csv decoding failed : {}", err.reason);
        self.pending.push_back(ParseEvent::Error(err));
        self.phase = Phase::Finished;
    }

    // Never reports 1.0 before the end of input is observed
    fn estimate_progress(&mut self) -> f64 {
        let estimate = match self.total_len {
            Some(total) => self.consumed as f64 / total as f64,
            None => self.chunks_read as f64 / (self.chunks_read + 1) as f64,
        };
        let estimate = estimate.clamp(0.0, 0.99);
        self.last_progress = self.last_progress.max(estimate);
        self.last_progress
    }
}

impl<R: Read> Iterator for StreamingParser<R> {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            match self.phase {
                Phase::Finished => return None,
                Phase::Reading => self.advance(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn events(input: &[u8], chunk_size: usize) -> Vec<ParseEvent> {
        let options = ParseOptions::default().with_chunk_size(chunk_size);
        parse(input, options)
            .expect("Options should be valid")
            .collect()
    }

    fn records(events: &[ParseEvent]) -> Vec<Vec<String>> {
        events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::HeaderRecord(fields) | ParseEvent::DataRecord(fields) => {
                    Some(fields.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn quoted_delimiter_with_single_byte_chunks() {
        let events = events(b"name,age\n\"Doe, Jane\",30\nBob,25\n", 1);
        assert!(events.contains(&ParseEvent::HeaderRecord(row(&["name", "age"]))));
        assert_eq!(
            records(&events),
            vec![
                row(&["name", "age"]),
                row(&["Doe, Jane", "30"]),
                row(&["Bob", "25"]),
            ]
        );
        assert_eq!(events.last(), Some(&ParseEvent::Complete));
    }

    #[test]
    fn chunk_boundaries_do_not_change_records() {
        let input = b"id,note\r\n1,\"multi\r\nline, \"\"quoted\"\"\"\r\n2,plain\r\n\r\n3,\"\"\n";
        let expected = records(&events(input, input.len()));
        assert_eq!(
            expected,
            vec![
                row(&["id", "note"]),
                row(&["1", "multi\r\nline, \"quoted\""]),
                row(&["2", "plain"]),
                row(&["3", ""]),
            ]
        );
        for chunk_size in 1..input.len() {
            assert_eq!(records(&events(input, chunk_size)), expected, "chunk {chunk_size}");
        }
    }

    #[test]
    fn line_break_styles_and_empty_lines() {
        let events = events(b"a,b\r1,2\n\n\r\n3,4\r\n,\n5,6", 4);
        assert_eq!(
            records(&events),
            vec![
                row(&["a", "b"]),
                row(&["1", "2"]),
                row(&["3", "4"]),
                row(&["", ""]),
                row(&["5", "6"]),
            ]
        );
    }

    #[test]
    fn exactly_one_header_before_data() {
        let events = events(b"\n\nh1,h2\nx,y\nz,w\n", 3);
        let headers = events
            .iter()
            .filter(|e| matches!(e, ParseEvent::HeaderRecord(_)))
            .count();
        assert_eq!(headers, 1);
        let first_record = events
            .iter()
            .find(|e| matches!(e, ParseEvent::HeaderRecord(_) | ParseEvent::DataRecord(_)));
        assert_eq!(first_record, Some(&ParseEvent::HeaderRecord(row(&["h1", "h2"]))));
    }

    #[test]
    fn unterminated_quote_reports_offset_without_complete() {
        let events = events(b"a,b\n1,2\n3,\"open\n", 2);
        assert_eq!(records(&events), vec![row(&["a", "b"]), row(&["1", "2"])]);
        assert_eq!(
            events.last(),
            Some(&ParseEvent::Error(DecodeError::new(10, "Unterminated quoted field")))
        );
        assert!(!events.contains(&ParseEvent::Complete));
        let errors = events.iter().filter(|e| matches!(e, ParseEvent::Error(_))).count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn garbage_after_closing_quote_is_an_error() {
        let events = events(b"a\n\"x\"y\n", 1024);
        match events.last() {
            Some(ParseEvent::Error(err)) => assert_eq!(err.offset, 5),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let events = events(b"a,b\n1,\xff\xfe\n", 1024);
        match events.last() {
            Some(ParseEvent::Error(err)) => assert_eq!(err.offset, 6),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[test]
    fn multibyte_text_split_across_chunks() {
        let input = "이름,city\n김철수,Zürich\n".as_bytes();
        assert_eq!(
            records(&events(input, 1)),
            vec![row(&["이름", "city"]), row(&["김철수", "Zürich"])]
        );
    }

    #[test]
    fn quote_inside_unquoted_field_is_literal() {
        let events = events(b"a\n5\"x\n", 1024);
        assert_eq!(records(&events), vec![row(&["a"]), row(&["5\"x"])]);
    }

    #[test]
    fn bom_is_stripped_even_when_split() {
        let mut input = UTF8_BOM.to_vec();
        input.extend_from_slice(b"a,b\n1,2\n");
        assert_eq!(
            records(&events(&input, 1)),
            vec![row(&["a", "b"]), row(&["1", "2"])]
        );
        // Partial bom prefix is decoded as content
        let events = events(b"\xEF\xBBa\n", 1);
        assert!(matches!(events.last(), Some(ParseEvent::Error(err)) if err.offset == 0));
    }

    #[test]
    fn missing_trailing_newline_still_yields_record() {
        let events = events(b"a,b\n1,", 1024);
        assert_eq!(records(&events), vec![row(&["a", "b"]), row(&["1", ""])]);
    }

    #[test]
    fn empty_input_completes_without_records() {
        let events = events(b"", 16);
        assert_eq!(events, vec![ParseEvent::Progress(1.0), ParseEvent::Complete]);
    }

    #[test]
    fn progress_is_monotonic_and_converges() {
        let input = b"a,b\n1,2\n3,4\n5,6\n";
        let total = input.len() as u64;
        for total_len in [Some(total), None, Some(4)] {
            let parser = parse(&input[..], ParseOptions::default().with_chunk_size(3))
                .expect("Options should be valid")
                .with_total_len(total_len);
            let progress = parser
                .filter_map(|e| match e {
                    ParseEvent::Progress(p) => Some(p),
                    _ => None,
                })
                .collect::<Vec<_>>();
            assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
            assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
            assert_eq!(progress.last(), Some(&1.0));
        }
    }

    #[test]
    fn custom_dialect() {
        let options = ParseOptions::default()
            .with_delimiter(b';')
            .with_quote_char(b'\'')
            .with_chunk_size(2);
        let events = parse(&b"a;b\n'x;''y''';z\n"[..], options)
            .expect("Options should be valid")
            .collect::<Vec<_>>();
        assert_eq!(records(&events), vec![row(&["a", "b"]), row(&["x;'y'", "z"])]);
    }

    struct CountingReader<'a> {
        inner: &'a [u8],
        reads: Rc<Cell<usize>>,
    }

    impl Read for CountingReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads.set(self.reads.get() + 1);
            self.inner.read(buf)
        }
    }

    #[test]
    fn dropping_parser_stops_reading() {
        let reads = Rc::new(Cell::new(0));
        let reader = CountingReader {
            inner: b"a\n1\n2\n3\n",
            reads: Rc::clone(&reads),
        };
        let mut parser = parse(reader, ParseOptions::default().with_chunk_size(1))
            .expect("Options should be valid");
        assert_eq!(reads.get(), 0);
        assert!(matches!(parser.next(), Some(ParseEvent::Progress(_))));
        assert_eq!(parser.next(), Some(ParseEvent::HeaderRecord(row(&["a"]))));
        assert_eq!(reads.get(), 2);

        drop(parser);
        assert_eq!(Rc::strong_count(&reads), 1);
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn quoted_empty_field_is_not_a_blank_line() {
        let events = events(b"a\n\"\"\n\nb\r\n\"\"", 1);
        assert_eq!(
            records(&events),
            vec![row(&["a"]), row(&[""]), row(&["b"]), row(&[""])]
        );
    }
}

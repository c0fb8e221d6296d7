use std::io::Read;
use std::path::Path;

mod errors;
mod feature_table;
mod field;
mod locus;
mod location;
mod misc;
mod streaming_parser;
use self::streaming_parser::StreamParser;
use crate::seq::{Location, Record};

pub use crate::errors::RecordParseError;

/// Lazily parses a GenBank stream, one `Record` at a time
#[derive(Debug)]
pub struct RecordReader<T: Read> {
    parser: StreamParser<T>,
}

impl<T: Read> Iterator for RecordReader<T> {
    type Item = Result<Record, RecordParseError>;

    fn next(&mut self) -> Option<Result<Record, RecordParseError>> {
        self.parser.read_one_record().transpose()
    }
}

const READ_BUF_SIZE: usize = 64 * 1024;

impl<T: Read> RecordReader<T> {
    pub fn new(data: T) -> RecordReader<T> {
        RecordReader {
            parser: StreamParser::new(data, READ_BUF_SIZE),
        }
    }
}

/// Parse an entire file at once
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Record>, RecordParseError> {
    let file = std::fs::File::open(path)?;
    RecordReader::new(file).collect()
}

/// Parse every record in `data`
pub fn parse_slice(data: &[u8]) -> Result<Vec<Record>, RecordParseError> {
    RecordReader::new(data).collect()
}

/// used by `Location::from_gb_format`
pub(crate) fn parse_location(data: &[u8]) -> Result<Location, RecordParseError> {
    match location::location(data) {
        Ok((rest, l)) if rest.is_empty() => Ok(l),
        Ok((rest, _)) => Err(RecordParseError::SyntaxError(format!(
            "Trailing input after location: {}",
            String::from_utf8_lossy(rest)
        ))),
        Err(e) => Err(RecordParseError::SyntaxError(format!("{:?}", e))),
    }
}

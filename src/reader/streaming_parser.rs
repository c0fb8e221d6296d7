use std::cmp;
use std::io::Error as IoError;
use std::io::Read;
use std::io::Result as IoResult;
use std::mem;

use nom::error::ErrorKind;
use nom::{IResult, Offset};

use crate::errors::RecordParseError;
use crate::reader::feature_table::{feature, features_header};
use crate::reader::field::{field, fill_record_fields};
use crate::reader::locus::locus;
use crate::reader::misc::{base_count, blank_line, contig, double_slash, origin_tag, skip_preamble};
use crate::seq::{Record, REASONABLE_SEQ_LEN};

#[derive(Debug)]
pub struct StreamParser<T: Read> {
    buffer: circular::Buffer,
    stream: T,
    capacity: usize,
    is_eof: bool,
}

// Owns a little of the input so errors keep their context once the buffer
// has moved on
const MAX_CONTEXT_BYTES: usize = 50;

enum StreamParserError {
    Io(IoError),
    Syntax(Option<Vec<u8>>, ErrorKind),
    Eof,
}

impl From<IoError> for StreamParserError {
    fn from(e: IoError) -> StreamParserError {
        StreamParserError::Io(e)
    }
}

impl From<StreamParserError> for RecordParseError {
    fn from(e: StreamParserError) -> RecordParseError {
        match e {
            StreamParserError::Io(e) => RecordParseError::from(e),
            StreamParserError::Eof => RecordParseError::SyntaxError("Unexpected EOF".into()),
            StreamParserError::Syntax(Some(context), e) => RecordParseError::SyntaxError(format!(
                "Error {:?} while parsing [{}]",
                e,
                String::from_utf8_lossy(&context)
            )),
            StreamParserError::Syntax(None, e) => {
                RecordParseError::SyntaxError(format!("Parse error: {:?}", e))
            }
        }
    }
}

impl<T: Read> StreamParser<T> {
    pub fn new(stream: T, capacity: usize) -> StreamParser<T> {
        StreamParser {
            stream,
            capacity,
            buffer: circular::Buffer::with_capacity(capacity),
            is_eof: false,
        }
    }

    fn fill_buffer(&mut self) -> IoResult<usize> {
        if self.is_eof {
            return Ok(0);
        }
        // a refill requested on a full buffer means one item doesn't fit
        if self.buffer.available_space() == 0 {
            if self.buffer.position() > 0 {
                self.buffer.shift();
            } else {
                self.capacity *= 2;
                self.buffer.grow(self.capacity);
                debug!("Increasing read buffer capacity to {} b", self.capacity);
            }
        }
        let bytes_read = self.stream.read(self.buffer.space())?;
        if bytes_read == 0 {
            self.is_eof = true;
        } else {
            self.buffer.fill(bytes_read);
        }
        Ok(bytes_read)
    }

    /// Apply a nom parser to the buffered input, reading more whenever the
    /// parser reports that it needs it
    fn run_parser<U>(
        &mut self,
        parser: impl Fn(&[u8]) -> IResult<&[u8], U>,
        detailed_errors: bool,
    ) -> Result<U, StreamParserError> {
        loop {
            let res = match parser(self.buffer.data()) {
                Ok((i, o)) => Some((self.buffer.data().offset(i), o)),
                Err(nom::Err::Incomplete(_)) => None,
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    let context = if detailed_errors {
                        Some(e.input[..cmp::min(e.input.len(), MAX_CONTEXT_BYTES)].to_owned())
                    } else {
                        None
                    };
                    return Err(StreamParserError::Syntax(context, e.code));
                }
            };

            match res {
                Some((length, o)) => {
                    self.buffer.consume(length);
                    return Ok(o);
                }
                None => {
                    if self.fill_buffer()? == 0 {
                        return Err(StreamParserError::Eof);
                    }
                }
            }
        }
    }

    /// Try to apply a nom parser, `None` if it doesn't match
    fn try_run_parser<U>(
        &mut self,
        parser: impl Fn(&[u8]) -> IResult<&[u8], U>,
        fail_on_eof: bool,
    ) -> Result<Option<U>, RecordParseError> {
        match self.run_parser(parser, false) {
            Ok(o) => Ok(Some(o)),
            Err(StreamParserError::Eof) if !fail_on_eof => Ok(None),
            Err(StreamParserError::Syntax(_, _)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a nom parser until it fails
    fn run_parser_many0<U>(
        &mut self,
        parser: impl Fn(&[u8]) -> IResult<&[u8], U>,
    ) -> IoResult<Vec<U>> {
        let mut res = Vec::new();
        loop {
            match self.run_parser(&parser, false) {
                Ok(o) => res.push(o),
                Err(StreamParserError::Io(e)) => return Err(e),
                Err(_) => break,
            }
        }
        Ok(res)
    }

    /// Reads the ORIGIN block, skipping whitespace and line numbers
    fn parse_seq_data(&mut self, len: Option<usize>) -> Result<Vec<u8>, RecordParseError> {
        let mut s = match len {
            Some(len) => Vec::with_capacity(cmp::min(len, REASONABLE_SEQ_LEN)),
            None => Vec::new(),
        };
        loop {
            let mut bytes_read = 0;
            let mut end_of_sequence = false;
            for &b in self.buffer.data() {
                match b {
                    b if b.is_ascii_alphabetic() => s.push(b),
                    b'/' => {
                        end_of_sequence = true;
                        break;
                    }
                    b if b.is_ascii_digit() => {}
                    b' ' | b'\r' | b'\n' => {}
                    x => {
                        return Err(RecordParseError::SyntaxError(format!(
                            "Unexpected char '{}' ({}) in sequence",
                            String::from_utf8_lossy(&[x]),
                            x
                        )));
                    }
                }
                bytes_read += 1;
            }
            self.buffer.consume(bytes_read);
            if end_of_sequence {
                match len {
                    Some(len) if len != s.len() && !s.is_empty() => {
                        return Err(RecordParseError::SyntaxError(format!(
                            "Got {} bytes of sequence, LOCUS promised {}",
                            s.len(),
                            len
                        )));
                    }
                    Some(len) if len != s.len() => {
                        warn!("ORIGIN is empty, LOCUS promised {} bp", len);
                    }
                    _ => {}
                }
                break;
            }
            if self.fill_buffer()? == 0 {
                if len == Some(s.len()) {
                    warn!("Unexpected EOF while parsing sequence data. Length is correct, continuing.");
                    break;
                } else {
                    return Err(RecordParseError::SyntaxError("Unexpected EOF!".into()));
                }
            }
        }
        Ok(s)
    }

    /// Discards input up to and including the next `//` line, or to the
    /// end of the stream
    fn skip_to_record_end(&mut self) -> IoResult<()> {
        loop {
            let data = self.buffer.data();
            match data.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    let terminator = data.starts_with(b"//");
                    self.buffer.consume(end + 1);
                    if terminator {
                        return Ok(());
                    }
                }
                None => {
                    if self.fill_buffer()? == 0 {
                        let rest = self.buffer.available_data();
                        self.buffer.consume(rest);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Everything after the LOCUS line
    fn read_record_body(&mut self, record: &mut Record) -> Result<(), RecordParseError> {
        let fields = self.run_parser_many0(field)?;
        *record = fill_record_fields(mem::replace(record, Record::empty()), fields);
        if self.try_run_parser(features_header, true)?.is_some() {
            record.features = self.run_parser_many0(feature)?;
        }
        self.try_run_parser(base_count, true)?;
        self.try_run_parser(contig, true)?;
        if self.try_run_parser(origin_tag, true)?.is_some() {
            record.seq = self.parse_seq_data(record.len)?;
        }

        // tolerate a missing '//' at the very end of the stream
        if self.buffer.empty() && self.is_eof {
            return Ok(());
        }

        self.run_parser(double_slash, true)?;
        self.run_parser_many0(blank_line)?;
        Ok(())
    }

    /// Reads the next record. A syntax error inside a record skips the
    /// rest of it and returns `RecordParseError::Malformed`, so the next
    /// call picks up at the following record.
    pub fn read_one_record(&mut self) -> Result<Option<Record>, RecordParseError> {
        self.try_run_parser(skip_preamble, false)?;
        let locus = match self.run_parser(locus, true) {
            Ok(locus) => locus,
            Err(StreamParserError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut record = locus.into_record();
        record.id = record.name.clone().unwrap_or_default();
        match self.read_record_body(&mut record) {
            Ok(()) => Ok(Some(record)),
            Err(RecordParseError::SyntaxError(reason)) => {
                self.skip_to_record_end()?;
                Err(RecordParseError::Malformed {
                    id: record.id,
                    reason,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TWO_RECORDS: &[u8] = b"LOCUS       AB000001                  12 bp    DNA     linear   INV 01-JAN-2020
DEFINITION  Test record one.
ACCESSION   AB000001
VERSION     AB000001.1
FEATURES             Location/Qualifiers
     CDS             1..6
                     /gene=\"COI\"
ORIGIN
        1 acgtac gtacgt
//

LOCUS       AB000002                   4 bp    DNA     linear   INV 01-JAN-2020
ACCESSION   AB000002
VERSION     AB000002.2
ORIGIN
        1 ttaa
//
";

    #[test]
    fn small_buffer() {
        // a tiny buffer forces every parser through the refill path
        let mut parser = StreamParser::new(TWO_RECORDS, 8);
        let first = parser.read_one_record().unwrap().unwrap();
        assert_eq!(first.id, "AB000001.1");
        assert_eq!(first.seq, b"acgtacgtacgt");
        assert_eq!(first.features.len(), 1);
        let second = parser.read_one_record().unwrap().unwrap();
        assert_eq!(second.id, "AB000002.2");
        assert_eq!(second.seq, b"ttaa");
        assert!(parser.read_one_record().unwrap().is_none());
    }

    #[test]
    fn length_mismatch() {
        let data = b"LOCUS       AB000003                  10 bp    DNA     linear   INV 01-JAN-2020
ORIGIN
        1 acgt
//
";
        let mut parser = StreamParser::new(&data[..], 1024);
        match parser.read_one_record() {
            Err(RecordParseError::Malformed { id, .. }) => assert_eq!(id, "AB000003"),
            x => panic!("{:?}", x),
        }
        assert!(parser.read_one_record().unwrap().is_none());
    }

    #[test]
    fn resync_after_bad_record() {
        let data = b"LOCUS       AB000004                   4 bp    DNA     linear   INV 01-JAN-2020
ACCESSION   AB000004
VERSION     AB000004.1
FEATURES             Location/Qualifiers
     misc_feature    2.5
     CDS             1..4
                     /gene=\"COI\"
ORIGIN
        1 acgt
//
LOCUS       AB000005                   4 bp    DNA     linear   INV 01-JAN-2020
VERSION     AB000005.1
ORIGIN
        1 ttaa
//
";
        for capacity in &[8, 1024] {
            let mut parser = StreamParser::new(&data[..], *capacity);
            match parser.read_one_record() {
                Err(RecordParseError::Malformed { id, .. }) => assert_eq!(id, "AB000004.1"),
                x => panic!("{:?}", x),
            }
            let next = parser.read_one_record().unwrap().unwrap();
            assert_eq!(next.id, "AB000005.1");
            assert_eq!(next.seq, b"ttaa");
            assert!(parser.read_one_record().unwrap().is_none());
        }
    }
}

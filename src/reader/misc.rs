use nom::branch::alt;
use nom::bytes::streaming::tag;
use nom::character::streaming::{line_ending, not_line_ending, space0};
use nom::combinator::{map_res, not, value};
use nom::multi::fold_many0;
use nom::sequence::delimited;
use nom::{IResult, Parser};
use std::str;

use crate::reader::field::{field_bytes, field_string};

/// Any line that doesn't open one of the sections we handle separately
pub fn ignored_line(input: &[u8]) -> IResult<&[u8], &str> {
    delimited(
        not(alt((tag("ORIGIN"), tag("CONTIG"), tag("FEATURES"), tag("//")))),
        map_res(not_line_ending, str::from_utf8),
        line_ending,
    )
    .parse(input)
}

// Skips anything before the next LOCUS line, such as the blank lines NCBI
// puts between records or the header of a GenBank release file
pub fn skip_preamble(i: &[u8]) -> IResult<&[u8], ()> {
    fold_many0(
        delimited(
            not(tag("LOCUS")),
            map_res(not_line_ending, str::from_utf8),
            line_ending,
        ),
        || (),
        |_, line| {
            if !line.trim().is_empty() {
                warn!("Ignoring line: {}", line)
            }
        },
    )
    .parse(i)
}

pub fn origin_tag(i: &[u8]) -> IResult<&[u8], ()> {
    value((), (tag("ORIGIN"), not_line_ending, line_ending)).parse(i)
}

pub fn double_slash(i: &[u8]) -> IResult<&[u8], ()> {
    value((), tag("//")).parse(i)
}

// Deprecated, but still turns up after the feature table
pub fn base_count(i: &[u8]) -> IResult<&[u8], ()> {
    value((), field_string(0, "BASE COUNT", false)).parse(i)
}

// Scaffold records list their parts instead of carrying a sequence
pub fn contig(i: &[u8]) -> IResult<&[u8], ()> {
    value((), field_bytes(0, "CONTIG", false)).parse(i)
}

pub fn blank_line(i: &[u8]) -> IResult<&[u8], ()> {
    value((), (space0, line_ending)).parse(i)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_skip_preamble() {
        let input = b"\n\nGBINV1.SEQ          Genetic Sequence Data Bank\nLOCUS       X";
        let (rest, _) = skip_preamble(input).unwrap();
        assert_eq!(rest, b"LOCUS       X");
    }

    #[test]
    fn test_ignored_line() {
        assert!(ignored_line(b"REFERENCE   1  (bases 1 to 658)\n").is_ok());
        assert!(ignored_line(b"FEATURES             Location/Qualifiers\n").is_err());
        assert!(ignored_line(b"//\n").is_err());
    }
}

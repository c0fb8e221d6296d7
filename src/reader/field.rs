use std::iter::once;
use std::str;

use itertools::intersperse;
use nom::branch::alt;
use nom::bytes::streaming::{is_a, tag};
use nom::character::streaming::{char, line_ending, not_line_ending};
use nom::combinator::{map, map_res, opt};
use nom::multi::{fold, many0};
use nom::sequence::{delimited, terminated};
use nom::{IResult, Parser};

use crate::reader::misc;
use crate::seq::{Annotation, Record};

/// Matches `indent` spaces
pub fn space_indent<'a>(
    indent: usize,
) -> impl Parser<&'a [u8], Output = (), Error = nom::error::Error<&'a [u8]>> {
    fold(indent, char(' '), || (), |_, _| ())
}

pub fn field_string<'a>(
    indent: usize,
    name: &'static str,
    keep_ws: bool,
) -> impl Parser<&'a [u8], Output = String, Error = nom::error::Error<&'a [u8]>> {
    map_res(field_bytes(indent, name, keep_ws), String::from_utf8)
}

/// Concatenates lines, optionally interpolating with newlines
fn concat_lines<'a, T: Iterator<Item = &'a [u8]>>(lines: T, keep_linebreaks: bool) -> Vec<u8> {
    if keep_linebreaks {
        intersperse(lines, b"\n").flatten().cloned().collect()
    } else {
        lines.flatten().cloned().collect()
    }
}

// An (optionally) indented keyword followed by one or more lines of free
// text, continuation lines being indented to the start of the text
pub fn field_bytes(
    indent: usize,
    name: &'static str,
    keep_ws: bool,
) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<u8>> {
    move |i| {
        let (i, _) = space_indent(indent).parse(i)?;
        let (i, _) = tag(name).parse(i)?;
        let (i, spaces) = map(opt(is_a(" ")), |s: Option<&[u8]>| s.map_or(0, <[_]>::len)).parse(i)?;
        let (i, first_line) = terminated(not_line_ending, line_ending).parse(i)?;
        let (i, more_lines) = many0(delimited(
            space_indent(indent + spaces + name.len()),
            not_line_ending,
            line_ending,
        ))
        .parse(i)?;
        Ok((
            i,
            concat_lines(once(first_line).chain(more_lines), keep_ws),
        ))
    }
}

/// The header fields we keep. Anything else is skipped line by line.
#[derive(Debug)]
pub enum Field {
    Definition(String),
    Accession(String),
    Version(String),
    Keywords(String),
    Source(String, Option<String>),
    Comment(String),
    Skipped(String),
}

fn source(i: &[u8]) -> IResult<&[u8], Field> {
    let (i, source) = field_string(0, "SOURCE", true).parse(i)?;
    let (i, organism) = opt(field_string(2, "ORGANISM", true)).parse(i)?;
    Ok((i, Field::Source(source, organism)))
}

pub fn field(i: &[u8]) -> IResult<&[u8], Field> {
    alt((
        map(field_string(0, "DEFINITION", true), Field::Definition),
        map(field_string(0, "ACCESSION", true), Field::Accession),
        map(field_string(0, "VERSION", true), Field::Version),
        map(field_string(0, "KEYWORDS", true), Field::Keywords),
        source,
        map(field_string(0, "COMMENT", true), Field::Comment),
        map(misc::ignored_line, |line| Field::Skipped(line.into())),
    ))
    .parse(i)
}

/// Standard header sections that carry nothing this tool reads
const UNUSED_FIELDS: &[&str] = &[
    "REFERENCE", "AUTHORS", "CONSRTM", "TITLE", "JOURNAL", "PUBMED", "REMARK", "DBLINK",
    "DBSOURCE", "PROJECT", "SEGMENT", "PRIMARY", "NID",
];

/// The keyword of a skipped line that starts a field we don't know about.
/// Continuation lines and the standard sections give `None`.
fn unknown_field(line: &str) -> Option<&str> {
    if line.starts_with(' ') {
        return None;
    }
    let keyword = line.split_whitespace().next()?;
    if UNUSED_FIELDS.contains(&keyword) {
        None
    } else {
        Some(keyword)
    }
}

fn one_line(s: &str) -> String {
    s.split('\n').map(str::trim).collect::<Vec<_>>().join(" ")
}

/// Splits a `;`-separated GenBank list, dropping the terminating `.`
fn split_list(s: &str) -> Vec<String> {
    one_line(s)
        .trim()
        .trim_end_matches('.')
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Copy header fields into `record` and settle its identifier
pub fn fill_record_fields(mut record: Record, fields: Vec<Field>) -> Record {
    let mut version = None;
    for item in fields {
        match item {
            Field::Definition(text) => record.description = Some(one_line(&text)),
            Field::Accession(text) => {
                let accessions = text.split_whitespace().map(String::from).collect();
                record.annotate("accessions", Annotation::List(accessions));
            }
            Field::Version(text) => {
                version = text.split_whitespace().next().map(String::from);
            }
            Field::Keywords(text) => {
                record.annotate("keywords", Annotation::List(split_list(&text)));
            }
            Field::Source(source, organism) => {
                record.annotate("source", Annotation::Text(one_line(&source)));
                if let Some(organism) = organism {
                    let mut lines = organism.splitn(2, '\n');
                    let name = lines.next().unwrap_or_default().trim();
                    record.annotate("organism", Annotation::Text(name.into()));
                    let lineage = lines.next().map(split_list).unwrap_or_default();
                    record.annotate("taxonomy", Annotation::List(lineage));
                }
            }
            Field::Comment(text) => {
                record.annotate("comment", Annotation::Text(one_line(&text)));
            }
            Field::Skipped(line) => {
                if let Some(keyword) = unknown_field(&line) {
                    warn!("Skipping unknown field {}: {}", keyword, line);
                }
            }
        }
    }
    let first_accession = match record.annotation("accessions") {
        Some(Annotation::List(accessions)) => accessions.first().cloned(),
        _ => None,
    };
    record.id = version
        .or(first_accession)
        .or_else(|| record.name.clone())
        .unwrap_or_default();
    record
}

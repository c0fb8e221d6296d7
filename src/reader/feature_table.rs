use std::str;

use nom::branch::alt;
use nom::bytes::streaming::{is_a, is_not, tag};
use nom::character::streaming::{line_ending, none_of, one_of, space1};
use nom::combinator::{map, map_res, peek, value};
use nom::error::ErrorKind::MapRes;
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::Err::{Error, Incomplete};
use nom::{IResult, Needed, Parser};

use crate::reader::errors::NomParserError;
use crate::reader::field::space_indent;
use crate::reader::location::location;
use crate::seq::{Feature, Location};
use crate::{FeatureKind, QualifierKey};

pub fn features_header(input: &[u8]) -> IResult<&[u8], ()> {
    value(
        (),
        (
            tag("FEATURES"),
            space1,
            tag("Location/Qualifiers"),
            line_ending,
        ),
    )
    .parse(input)
}

/// An unquoted value, which may continue on following lines as long as
/// they are indented and don't start a new qualifier
fn bare_value_bytes(indent: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<u8>> {
    move |mut i| {
        let mut res = Vec::with_capacity(64);
        loop {
            let end = i.iter().position(|&b| b == b'\r' || b == b'\n');
            let Some(end) = end else {
                return Err(Incomplete(Needed::new(1)));
            };
            res.extend_from_slice(&i[..end]);
            let (j, _) = line_ending(&i[end..])?;
            i = j;
            match preceded(space_indent(indent), peek(none_of("/"))).parse(i) {
                Ok((j, _)) => {
                    i = j;
                }
                Err(Incomplete(n)) => return Err(Incomplete(n)),
                Err(_) => break,
            }
        }
        Ok((i, res))
    }
}

fn location_text<'a>(
    indent: usize,
) -> impl Parser<&'a [u8], Output = Location, Error = nom::error::Error<&'a [u8]>> {
    map_res(bare_value_bytes(indent), |r| match location(&r) {
        Ok((rest, l)) if rest.is_empty() => Ok(l),
        _ => Err(NomParserError::Location),
    })
}

fn bare_value(indent: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    move |i| map_res(bare_value_bytes(indent), String::from_utf8).parse(i)
}

/// What a line break inside a quoted value stands for
#[derive(Clone, Copy)]
enum Wrap {
    /// Free text wraps at word boundaries
    Space,
    /// Sequences wrap anywhere
    Nothing,
}

impl<'a> From<&'a QualifierKey> for Wrap {
    fn from(q: &'a QualifierKey) -> Wrap {
        match *q {
            qualifier_key!("translation") => Wrap::Nothing,
            _ => Wrap::Space,
        }
    }
}

fn quoted_escape<'a>(
    indent: usize,
) -> impl Parser<&'a [u8], Output = Option<u8>, Error = nom::error::Error<&'a [u8]>> {
    alt((
        value(Some(b'"'), tag("\"\"")),
        // "" split over a line boundary
        value(
            Some(b'"'),
            delimited(tag("\""), pair(line_ending, space_indent(indent)), tag("\"")),
        ),
        value(None, pair(line_ending, space_indent(indent))),
    ))
}

// A quoted value, which may span multiple lines, with quotes escaped as ""
fn quoted_value(indent: usize, wrap: Wrap) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    move |input| {
        let (mut i, _) = tag("\"").parse(input)?;
        let mut res = Vec::with_capacity(128);
        loop {
            let end = i
                .iter()
                .position(|&b| b == b'"' || b == b'\r' || b == b'\n')
                .unwrap_or(i.len());
            res.extend_from_slice(&i[..end]);
            i = &i[end..];
            match quoted_escape(indent).parse(i) {
                Ok((j, Some(b))) => {
                    res.push(b);
                    i = j;
                }
                Ok((j, None)) => {
                    if let Wrap::Space = wrap {
                        res.push(b' ');
                    }
                    i = j;
                }
                Err(Incomplete(n)) => return Err(Incomplete(n)),
                Err(_) => break,
            }
        }
        let (j, _) = pair(tag("\""), line_ending).parse(i)?;
        let mut s = String::from_utf8(res).map_err(|_| Error(nom::error::Error::new(input, MapRes)))?;
        s.shrink_to_fit();
        Ok((j, s))
    }
}

// needs to be a macro because qualifier_key! is a macro
macro_rules! match_qk {
    ($tag:tt) => {
        terminated(value(qualifier_key!($tag), tag($tag)), peek(one_of("=\r\n")))
    };
}

fn qualifier_key(input: &[u8]) -> IResult<&[u8], QualifierKey> {
    alt((
        match_qk!("db_xref"),
        match_qk!("note"),
        match_qk!("gene_synonym"),
        match_qk!("gene"),
        match_qk!("product"),
        match_qk!("protein_id"),
        match_qk!("translation"),
        match_qk!("country"),
        match_qk!("collection_date"),
        match_qk!("collected_by"),
        match_qk!("lat_lon"),
        match_qk!("organism"),
        match_qk!("mol_type"),
        map(map_res(is_not("=\r\n"), str::from_utf8), QualifierKey::from),
    ))
    .parse(input)
}

fn qualifier(indent: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], (QualifierKey, Option<String>)> {
    move |i| {
        let (i, _) = space_indent(indent).parse(i)?;
        let (i, _) = tag("/").parse(i)?;
        let (i, key) = qualifier_key(i)?;
        let wrap = Wrap::from(&key);
        let (i, val) = alt((
            preceded(
                tag("="),
                map(alt((quoted_value(indent, wrap), bare_value(indent))), Some),
            ),
            value(None, line_ending),
        ))
        .parse(i)?;
        Ok((i, (key, val)))
    }
}

// needs to be a macro because feature_kind! is a macro
macro_rules! match_fk {
    ($tag:tt) => {
        terminated(value(feature_kind!($tag), tag($tag)), peek(one_of(" ")))
    };
}

fn feature_kind(input: &[u8]) -> IResult<&[u8], FeatureKind> {
    alt((
        match_fk!("gene"),
        match_fk!("CDS"),
        match_fk!("source"),
        match_fk!("mRNA"),
        match_fk!("rRNA"),
        match_fk!("tRNA"),
        match_fk!("misc_feature"),
        map(map_res(is_not(" "), str::from_utf8), FeatureKind::from),
    ))
    .parse(input)
}

pub fn feature(i: &[u8]) -> IResult<&[u8], Feature> {
    let (i, spaces_before) = map(is_a(" "), <[_]>::len).parse(i)?;
    let (i, kind) = feature_kind(i)?;
    let (i, spaces_after) = map(is_a(" "), <[_]>::len).parse(i)?;
    let indent = spaces_before + kind.len() + spaces_after;
    let (i, location) = location_text(indent).parse(i)?;
    let (i, qualifiers) = many0(qualifier(indent)).parse(i)?;
    Ok((
        i,
        Feature {
            kind,
            location,
            qualifiers,
        },
    ))
}

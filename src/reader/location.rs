/// Parsers for location specifiers. These run on an already collected
/// location string, so they use the `complete` combinators.
use std::str;

use nom::branch::alt;
use nom::bytes::complete::{is_not, tag};
use nom::character::complete::{char, i64};
use nom::combinator::{map, map_opt, map_res, opt, value};
use nom::error::Error;
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};

use crate::seq::{After, Before, GapLength, Location};

fn location_single(input: &[u8]) -> IResult<&[u8], Location> {
    map(i64, |i| Location::single(i - 1)).parse(input)
}

fn location_between(input: &[u8]) -> IResult<&[u8], Location> {
    // adjacent positions, or last^1 on a circular molecule
    map_opt(separated_pair(i64, char('^'), i64), |(a, b)| {
        ((a - b).abs() == 1 || ((a == 1) ^ (b == 1))).then_some(Location::Between(a - 1, b - 1))
    })
    .parse(input)
}

fn location_span(input: &[u8]) -> IResult<&[u8], Location> {
    map(
        (opt(char('<')), i64, tag(".."), opt(char('>')), i64),
        |(before, a, _, after, b)| {
            Location::Range((a - 1, Before(before.is_some())), (b, After(after.is_some())))
        },
    )
    .parse(input)
}

/// `name(inner)`
fn operator<'a, O>(
    name: &'static str,
    inner: impl Parser<&'a [u8], Output = O, Error = Error<&'a [u8]>>,
) -> impl Parser<&'a [u8], Output = O, Error = Error<&'a [u8]>> {
    delimited((tag(name), char('(')), inner, char(')'))
}

fn location_compound(input: &[u8]) -> IResult<&[u8], Location> {
    fn list<'a>(
        name: &'static str,
        constructor: fn(Vec<Location>) -> Location,
    ) -> impl Parser<&'a [u8], Output = Location, Error = Error<&'a [u8]>> {
        map(operator(name, separated_list1(char(','), location)), constructor)
    }
    alt((
        list("join", Location::Join),
        list("order", Location::Order),
        list("bond", Location::Bond),
        list("one-of", Location::OneOf),
    ))
    .parse(input)
}

fn location_complement(input: &[u8]) -> IResult<&[u8], Location> {
    map(operator("complement", location), |l| {
        Location::Complement(Box::new(l))
    })
    .parse(input)
}

fn location_gap(input: &[u8]) -> IResult<&[u8], Location> {
    let gap_length = alt((
        map(i64, GapLength::Known),
        value(GapLength::Unk100, tag("unk100")),
        value(GapLength::Unknown, tag("")),
    ));
    map(operator("gap", gap_length), Location::Gap).parse(input)
}

/// Locations that can appear after `ACCESSION:`
fn location_local(input: &[u8]) -> IResult<&[u8], Location> {
    alt((
        location_span,
        location_compound,
        location_complement,
        location_between,
        location_single,
        location_gap,
    ))
    .parse(input)
}

fn location_external(input: &[u8]) -> IResult<&[u8], Location> {
    let accession = map_res(is_not(": \t\r\n(),"), str::from_utf8);
    map(
        (accession, opt(preceded(tag(":"), location_local))),
        |(accession, l)| Location::External(accession.to_owned(), l.map(Box::new)),
    )
    .parse(input)
}

pub fn location(input: &[u8]) -> IResult<&[u8], Location> {
    alt((location_local, location_external)).parse(input)
}

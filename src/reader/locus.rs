use std::str;

use nom::branch::alt;
use nom::bytes::streaming::{is_not, tag};
use nom::character::streaming::{alpha1, line_ending, not_line_ending, space0, space1, u64};
use nom::combinator::{map, map_res, opt};
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};

use crate::seq::{Annotation, Record};

/// Everything the LOCUS line tells us
#[derive(Debug, Default)]
pub struct Locus {
    pub name: Option<String>,
    pub len: Option<usize>,
    pub molecule_type: Option<String>,
    pub topology: Option<String>,
    pub division: Option<String>,
    pub date: Option<String>,
}

impl Locus {
    /// Starts a record carrying the LOCUS information
    pub fn into_record(self) -> Record {
        let mut record = Record {
            name: self.name,
            len: self.len,
            ..Record::empty()
        };
        let fields = [
            ("molecule_type", self.molecule_type),
            ("topology", self.topology),
            ("data_file_division", self.division),
            ("date", self.date),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                record.annotate(key, Annotation::Text(value));
            }
        }
        record
    }
}

fn word(input: &[u8]) -> IResult<&[u8], String> {
    map(map_res(is_not(" \t\r\n"), str::from_utf8), String::from).parse(input)
}

fn name(input: &[u8]) -> IResult<&[u8], String> {
    map(map_res(is_not(": \t\r\n"), str::from_utf8), String::from).parse(input)
}

fn topology(input: &[u8]) -> IResult<&[u8], String> {
    map(alt((tag("linear"), tag("circular"))), |t: &[u8]| {
        String::from_utf8_lossy(t).into_owned()
    })
    .parse(input)
}

fn division(input: &[u8]) -> IResult<&[u8], String> {
    map(map_res(alpha1, str::from_utf8), String::from).parse(input)
}

fn locus_full(input: &[u8]) -> IResult<&[u8], Locus> {
    map(
        (
            name,
            preceded(space1, u64),
            preceded(space1, alt((tag("bp"), tag("aa")))),
            preceded(space1, word),
            opt(preceded(space1, topology)),
            opt(preceded(space1, division)),
            opt(preceded(space1, word)),
        ),
        |(name, len, _, molecule_type, topology, division, date)| Locus {
            name: Some(name),
            len: Some(len as usize),
            molecule_type: Some(molecule_type),
            topology,
            division,
            date,
        },
    )
    .parse(input)
}

// Give up on anything unusual, we only need the identifier from VERSION
fn locus_tag_only(input: &[u8]) -> IResult<&[u8], Locus> {
    map(not_line_ending, |stuff: &[u8]| {
        warn!("Failed to parse LOCUS line: {}", String::from_utf8_lossy(stuff));
        Locus::default()
    })
    .parse(input)
}

pub fn locus(input: &[u8]) -> IResult<&[u8], Locus> {
    delimited(
        (tag("LOCUS"), space1),
        alt((locus_full, locus_tag_only)),
        (space0, line_ending),
    )
    .parse(input)
}

#[cfg(test)]
mod test {
    use nom::Err::Incomplete;

    use super::*;

    #[test]
    fn test_parse_locus() {
        let loci = [
            "LOCUS       MN123456                 658 bp    DNA     linear   INV 20-JAN-2020\n",
            "LOCUS       NC_012920              16569 bp    DNA     circular PRI 13-NOV-2023\n",
            "LOCUS       pBAD30       4923 bp    DNA   circular            \n",
        ];
        for l in &loci {
            let lb = l.as_bytes();
            match locus(lb) {
                Ok((i, _)) => assert!(i.is_empty()),
                Err(e) => panic!("{:?}", e),
            }
            incomplete_test(lb, b"", &locus);
        }
        let (_, mn) = locus(loci[0].as_bytes()).unwrap();
        assert_eq!(mn.name.as_deref(), Some("MN123456"));
        assert_eq!(mn.len, Some(658));
        assert_eq!(mn.division.as_deref(), Some("INV"));
        assert_eq!(mn.date.as_deref(), Some("20-JAN-2020"));
        let (_, pbad) = locus(loci[2].as_bytes()).unwrap();
        assert_eq!(pbad.topology.as_deref(), Some("circular"));
    }

    #[test]
    fn test_into_record() {
        let (_, l) = locus(b"LOCUS       MN123456                 658 bp    DNA     linear   INV 20-JAN-2020\n").unwrap();
        let record = l.into_record();
        assert_eq!(record.len, Some(658));
        assert_eq!(
            record.annotation("molecule_type"),
            Some(&Annotation::Text("DNA".into()))
        );
    }

    fn incomplete_test<T: ::std::fmt::Debug>(
        input: &[u8],
        remainder: &[u8],
        parser: impl Fn(&[u8]) -> IResult<&[u8], T>,
    ) {
        match parser(input) {
            Ok((i, _)) => {
                assert_eq!(i, remainder);
            }
            x => panic!("{:#?}", x),
        }
        for n in 0..(input.len() - remainder.len()) {
            match parser(&input[..n]) {
                Err(Incomplete(_)) => {}
                x => panic!("{:?} => {:#?}", &input[..n], x),
            }
        }
    }
}

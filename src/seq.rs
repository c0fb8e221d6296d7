use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::dna::revcomp;
use crate::errors::RecordParseError;
use crate::reader::parse_location;
pub use crate::{FeatureKind, QualifierKey};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum GapLength {
    /// gap(n)
    Known(i64),
    /// gap()
    Unknown,
    /// gap(unk100)
    Unk100,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Before(pub bool);
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct After(pub bool);

/// A feature location as written in the FEATURES table. See
/// <http://www.insdc.org/files/feature_table.html>.
///
/// Coordinates are 0-based and ranges are exclusive at the end, so the
/// GenBank location `1..3` is `Range((0, Before(false)), (3, After(false)))`.
/// `Before`/`After` record the `<` and `>` partial markers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub enum Location {
    Range((i64, Before), (i64, After)),
    /// `n^n+1`, a site between two adjacent bases
    Between(i64, i64),
    Complement(Box<Location>),
    Join(Vec<Location>),
    Order(Vec<Location>),
    Bond(Vec<Location>),
    OneOf(Vec<Location>),
    /// A location on another record, `ACCESSION:location`
    External(String, Option<Box<Location>>),
    Gap(GapLength),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Can't extract ambiguous location: {0}")]
    Ambiguous(Location),
    #[error("Location refers to another record: {0}")]
    External(Location),
    #[error("Location refers to a location outside of the sequence: {0}")]
    OutOfBounds(Location),
    #[error("Empty location list encountered")]
    Empty,
}

impl Location {
    pub fn simple_range(a: i64, b: i64) -> Location {
        Location::Range((a, Before(false)), (b, After(false)))
    }

    pub fn single(a: i64) -> Location {
        Location::simple_range(a, a + 1)
    }

    pub fn to_gb_format(&self) -> String {
        fn location_list(locations: &[Location]) -> String {
            locations
                .iter()
                .map(Location::to_gb_format)
                .collect::<Vec<_>>()
                .join(",")
        }
        match *self {
            Location::Between(a, b) => format!("{}^{}", a + 1, b + 1),
            Location::Range((a, Before(false)), (b, After(false))) if b == a + 1 => {
                format!("{}", b)
            }
            Location::Range((a, Before(before)), (b, After(after))) => format!(
                "{}{}..{}{}",
                if before { "<" } else { "" },
                a + 1,
                if after { ">" } else { "" },
                b
            ),
            Location::Complement(ref p) => format!("complement({})", p.to_gb_format()),
            Location::Join(ref ls) => format!("join({})", location_list(ls)),
            Location::Order(ref ls) => format!("order({})", location_list(ls)),
            Location::Bond(ref ls) => format!("bond({})", location_list(ls)),
            Location::OneOf(ref ls) => format!("one-of({})", location_list(ls)),
            Location::External(ref name, Some(ref l)) => format!("{}:{}", name, l.to_gb_format()),
            Location::External(ref name, None) => name.clone(),
            Location::Gap(GapLength::Known(n)) => format!("gap({})", n),
            Location::Gap(GapLength::Unknown) => "gap()".into(),
            Location::Gap(GapLength::Unk100) => "gap(unk100)".into(),
        }
    }

    pub fn from_gb_format(s: &str) -> Result<Location, RecordParseError> {
        parse_location(s.as_bytes())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_gb_format())
    }
}

/// An annotated region of a record. A qualifier key may occur several times
/// with distinct values, so qualifiers are kept as an ordered list; the
/// order is the order of the FEATURES table and is never rearranged.
/// Flag qualifiers such as `/pseudo` carry no value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct Feature {
    pub kind: FeatureKind,
    pub location: Location,
    pub qualifiers: Vec<(QualifierKey, Option<String>)>,
}

impl Feature {
    /// Returns all the values for a given key, skipping value-less flags
    pub fn qualifier_values(&self, key: QualifierKey) -> impl Iterator<Item = &str> {
        self.qualifiers
            .iter()
            .filter(move |&(k, _)| k == &key)
            .filter_map(|(_, v)| v.as_deref())
    }

    /// Every qualifier value in table order, paired with its key
    pub fn values(&self) -> impl Iterator<Item = (&QualifierKey, &str)> {
        self.qualifiers
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
    }
}

/// A record-level annotation. Free text fields are `Text`, fields that
/// GenBank writes as a separated list (lineage, keywords, accessions) are
/// `List`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub enum Annotation {
    Text(String),
    List(Vec<String>),
}

impl Annotation {
    /// Renders the annotation as a single line; list entries are joined the
    /// way GenBank joins a lineage.
    pub fn render(&self) -> String {
        match self {
            Annotation::Text(s) => s.clone(),
            Annotation::List(items) => items.join("; "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Annotation::Text(s) => s.is_empty(),
            Annotation::List(items) => items.is_empty(),
        }
    }
}

/// Maximum length for which the buffer holding the sequence will be
/// preallocated.
#[doc(hidden)]
pub const REASONABLE_SEQ_LEN: usize = 500 * 1000 * 1000;

/// One entry of a GenBank stream
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct Record {
    /// Versioned accession (`VERSION`), falling back to the first
    /// `ACCESSION` and then to the LOCUS name
    pub id: String,
    /// Name as specified in the LOCUS line
    pub name: Option<String>,
    /// Length as specified in the LOCUS line
    pub len: Option<usize>,
    pub description: Option<String>,
    pub annotations: BTreeMap<String, Annotation>,
    pub features: Vec<Feature>,
    #[cfg_attr(all(feature = "serde", feature = "serde_bytes"), serde(with = "serde_bytes"))]
    pub seq: Vec<u8>,
}

impl Record {
    pub fn empty() -> Record {
        Record {
            id: String::new(),
            name: None,
            len: None,
            description: None,
            annotations: BTreeMap::new(),
            features: vec![],
            seq: vec![],
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&Annotation> {
        self.annotations.get(key)
    }

    pub fn annotate(&mut self, key: &str, value: Annotation) {
        self.annotations.insert(key.to_owned(), value);
    }

    /// Extract the bases covered by `l`. Joins and orders are concatenated,
    /// complements are reverse complemented. Locations that can't be mapped
    /// onto this record's own sequence are errors.
    pub fn extract_location(&self, l: &Location) -> Result<Vec<u8>, LocationError> {
        use Location::*;
        let res = match *l {
            Range((a, _), (b, _)) => {
                if a < 0 || b < a {
                    return Err(LocationError::OutOfBounds(l.clone()));
                }
                self.seq
                    .get(a as usize..b as usize)
                    .ok_or_else(|| LocationError::OutOfBounds(l.clone()))?
                    .to_vec()
            }
            Join(ref ls) | Order(ref ls) => {
                if ls.is_empty() {
                    return Err(LocationError::Empty);
                }
                let mut res = Vec::new();
                for l in ls {
                    res.extend_from_slice(&self.extract_location(l)?);
                }
                res
            }
            Complement(ref inner) => revcomp(&self.extract_location(inner)?),
            External(..) => return Err(LocationError::External(l.clone())),
            _ => return Err(LocationError::Ambiguous(l.clone())),
        };
        Ok(res)
    }
}

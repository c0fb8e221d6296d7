//! Bulk retrieval of GenBank records and extraction of one target gene.
//!
//! Accession identifiers are fetched from NCBI in chunks, each returned
//! record is searched for a feature naming the gene (by default COI), and
//! the gene sequence is written to a FASTA file together with a table of
//! annotations. Records that can't be resolved end up in a log.
//!
//! The GenBank flat file reader in `reader` is usable on its own:
//!
//! ```no_run
//! use gb_harvest::reader::RecordReader;
//!
//! let file = std::fs::File::open("records.gb").unwrap();
//! for record in RecordReader::new(file) {
//!     let record = record.unwrap();
//!     println!("{} has {} features", record.id, record.features.len());
//! }
//! ```

#[macro_use]
extern crate log;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

include!(concat!(env!("OUT_DIR"), "/atoms.rs")); // for QualifierKey, FeatureKind

mod errors;

pub mod annotate;
pub mod chunk;
pub mod config;
pub mod dna;
pub mod fetch;
pub mod pipeline;
pub mod reader;
pub mod resolve;
pub mod seq;
pub mod writer;

pub use crate::errors::{ConfigError, HarvestError, RecordParseError};
pub use crate::fetch::FetchError;
pub use crate::pipeline::{Pipeline, RunSummary};
pub use crate::seq::LocationError;

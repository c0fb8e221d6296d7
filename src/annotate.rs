//! Filling the table row of a resolved record

use crate::config::HeaderList;
use crate::seq::{QualifierKey, Record};

/// Column filled with the extracted gene sequence
pub const SEQUENCE_COLUMN: &str = "sequence";
/// Column filled with the record lineage
pub const TAXONOMY_COLUMN: &str = "taxonomy";

/// One cell per header, in header order. A header that names nothing in
/// the record gives an empty cell, so rows always line up with the header
/// row.
pub fn extract(record: &Record, sequence: &str, headers: &HeaderList) -> Vec<String> {
    headers
        .iter()
        .map(|header| clean_cell(&cell(record, sequence, header)))
        .collect()
}

fn cell(record: &Record, sequence: &str, header: &str) -> String {
    match header {
        SEQUENCE_COLUMN => sequence.to_owned(),
        TAXONOMY_COLUMN => record
            .annotation(TAXONOMY_COLUMN)
            .map(|a| a.render())
            .unwrap_or_default(),
        _ => qualifier_value(record, header).unwrap_or_default(),
    }
}

/// The first non-empty value of qualifier `key` over all features
fn qualifier_value(record: &Record, key: &str) -> Option<String> {
    let key = QualifierKey::from(key);
    record
        .features
        .iter()
        .flat_map(|f| f.qualifier_values(key.clone()))
        .find(|v| !v.is_empty())
        .map(String::from)
}

/// Tabs and line breaks would break the row apart
fn clean_cell(s: &str) -> String {
    s.replace(['\t', '\r', '\n'], " ")
}

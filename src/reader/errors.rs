use thiserror::Error;

/// Errors raised inside nom parsers through `map_res`
#[derive(Debug, Error)]
pub enum NomParserError {
    #[error("Failed parsing location specifier")]
    Location,
}

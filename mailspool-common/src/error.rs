//! Error types shared across the mailspool crates.

use thiserror::Error;

/// Errors raised while parsing addresses supplied by operators or configuration.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Nothing to parse.
    #[error("Empty address")]
    Empty,

    /// The input parsed to more than one address where one was expected.
    #[error("Expected a single address, got: {0}")]
    NotSingle(String),

    /// The input could not be parsed.
    #[error("Malformed address {0}: {1}")]
    Malformed(String, String),
}

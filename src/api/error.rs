use std::net::AddrParseError;

use thiserror::Error;

/// Failures raised by [`PrefixTrie`](super::routing_trie::PrefixTrie).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    #[error("Key Error: no inserted prefix satisfies the lookup")]
    KeyNotFound,
    #[error("Value Error: value is not attached to the key")]
    ValueNotFound,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Address Error: {input} is not a dotted-decimal IPv4 address")]
    InvalidAddress {
        input: String,
        #[source]
        source: AddrParseError,
    },
    #[error("Mask Error: {0} is not a prefix length between 0 and 32")]
    InvalidMask(u8),
    #[error(transparent)]
    Trie(#[from] TrieError),
}

impl ClassifierError {
    /// True when the error is a logical miss rather than malformed input.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClassifierError::Trie(TrieError::KeyNotFound))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File Error: {}", message)]
    FileError { message: String },
    #[error("Parse Error on line {}: {}", line, message)]
    ParseError { line: usize, message: String },
}

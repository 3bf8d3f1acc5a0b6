//! Longest-prefix classification of IPv4 addresses over a binary prefix trie.
//!
//! [`api::routing_trie::PrefixTrie`] is a generic trie keyed on symbol sequences with
//! shortest-prefix, longest-prefix and exact lookups. [`api::routing_table::CidrClassifier`]
//! keys it on address bits to map CIDR prefixes to their next hops.

pub mod api;
pub mod utils;

pub use api::error::{ClassifierError, ConfigError, TrieError};
pub use api::routing_table::{CidrClassifier, CidrResult};
pub use api::routing_trie::{MatchMode, PrefixTrie};

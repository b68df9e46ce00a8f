//! Topic validation and tokenization.
//!
//! The trie itself now lives in `crate::subs` (arena-based, with per-node
//! share groups and a client index) rather than here; this module keeps the
//! string-level concerns validation and tokenization depend on.

pub mod tokenize;
pub mod validation;

pub use tokenize::{tokenize_filter, tokenize_topic, Tokenized};
pub use validation::{
    topic_matches_filter, validate_topic_filter, validate_topic_filter_with_max_levels,
    validate_topic_name, validate_topic_name_with_max_levels, TopicLevel,
};

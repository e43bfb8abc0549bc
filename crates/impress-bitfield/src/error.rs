//! Error types for impress-bitfield

use thiserror::Error;

/// Result type alias for bitfield operations
pub type Result<T> = std::result::Result<T, BitfieldError>;

/// Main error type for flag sets, vocabularies, and predicates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitfieldError {
    /// A flag that is not one of the vocabulary's declared bits
    #[error("{bit} is not a valid flag for this field")]
    InvalidFlag { bit: u64 },

    /// A multi-flag predicate was requested with no flags
    #[error("Cannot build a flag predicate on `{field}` from an empty flag list")]
    EmptyPredicate { field: String },

    /// A predicate whose probes and conditions do not line up
    #[error("Malformed flag predicate on `{field}`: {reason}")]
    MalformedPredicate { field: String, reason: String },

    /// The vocabulary declaration itself is malformed
    #[error("Invalid vocabulary: {0}")]
    InvalidVocabulary(#[from] VocabularyError),

    /// A 1-based bit position outside `1..=64`
    #[error("Bit position {0} is out of range (expected 1..=64)")]
    InvalidPosition(u32),
}

/// Vocabulary declaration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    /// Declared mask has zero or more than one bit set
    #[error("flag `{label}` uses {bit:#x}, which is not a single bit")]
    NotSingleBit { bit: u64, label: String },

    /// Two choices share the same mask
    #[error("flag `{label}` reuses bit {bit:#x}")]
    DuplicateBit { bit: u64, label: String },
}

//! In-memory accessor for a packed flag value.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::vocabulary::{FlagChoice, FlagVocabulary};

/// A flag value bound to its vocabulary.
///
/// Bits outside the vocabulary are kept as-is; they just never show up in
/// [`describe`](Self::describe). Equality compares the integer value only.
#[derive(Clone)]
pub struct FlagSet {
    bits: u64,
    vocabulary: Arc<FlagVocabulary>,
}

impl FlagSet {
    pub fn new(vocabulary: Arc<FlagVocabulary>, bits: u64) -> Self {
        Self { bits, vocabulary }
    }

    /// A flag set with no bits set.
    pub fn empty(vocabulary: Arc<FlagVocabulary>) -> Self {
        Self::new(vocabulary, 0)
    }

    /// Current integer value.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn vocabulary(&self) -> &Arc<FlagVocabulary> {
        &self.vocabulary
    }

    /// Whether `bit` is set. Fails if `bit` is not a declared flag.
    pub fn has_flag(&self, bit: u64) -> Result<bool> {
        let bit = self.vocabulary.validate(bit)?;
        Ok(self.bits & bit != 0)
    }

    /// Set `bit`. Fails if `bit` is not a declared flag.
    pub fn add_flag(&mut self, bit: u64) -> Result<&mut Self> {
        let bit = self.vocabulary.validate(bit)?;
        self.bits |= bit;
        tracing::debug!(bit, bits = self.bits, "flag added");
        Ok(self)
    }

    /// Clear `bit`. Fails if `bit` is not a declared flag.
    pub fn remove_flag(&mut self, bit: u64) -> Result<&mut Self> {
        let bit = self.vocabulary.validate(bit)?;
        self.bits &= !bit;
        tracing::debug!(bit, bits = self.bits, "flag removed");
        Ok(self)
    }

    /// Declared choices that are currently set, in declaration order.
    pub fn flags(&self) -> impl Iterator<Item = &FlagChoice> {
        self.vocabulary.iter().filter(move |c| self.bits & c.bit != 0)
    }

    /// Set bits that no declared choice accounts for.
    pub fn unknown_bits(&self) -> u64 {
        self.bits & !self.vocabulary.mask()
    }

    /// Comma-joined labels of the set flags, e.g. `"One, Three"`.
    pub fn describe(&self) -> String {
        self.flags()
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagSet: {}", self.bits)
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl PartialEq for FlagSet {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl Eq for FlagSet {}

impl PartialEq<u64> for FlagSet {
    fn eq(&self, other: &u64) -> bool {
        self.bits == *other
    }
}

impl PartialEq<FlagSet> for u64 {
    fn eq(&self, other: &FlagSet) -> bool {
        *self == other.bits
    }
}

impl From<&FlagSet> for u64 {
    fn from(flags: &FlagSet) -> Self {
        flags.bits
    }
}

impl From<FlagSet> for u64 {
    fn from(flags: FlagSet) -> Self {
        flags.bits
    }
}

impl BitAnd<u64> for &FlagSet {
    type Output = u64;

    fn bitand(self, rhs: u64) -> u64 {
        self.bits & rhs
    }
}

impl BitOr<u64> for &FlagSet {
    type Output = u64;

    fn bitor(self, rhs: u64) -> u64 {
        self.bits | rhs
    }
}

impl BitAnd<&FlagSet> for &FlagSet {
    type Output = u64;

    fn bitand(self, rhs: &FlagSet) -> u64 {
        self.bits & rhs.bits
    }
}

impl BitOr<&FlagSet> for &FlagSet {
    type Output = u64;

    fn bitor(self, rhs: &FlagSet) -> u64 {
        self.bits | rhs.bits
    }
}

impl Serialize for FlagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits)
    }
}

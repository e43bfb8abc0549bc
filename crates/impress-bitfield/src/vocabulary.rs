//! Flag vocabularies: the declared `(bit, label)` choices of one flag field.

use serde::{Deserialize, Serialize};

use crate::error::{BitfieldError, Result, VocabularyError};

/// Bit value for a 1-based flag position (`1 -> 0b1`, `2 -> 0b10`, ...).
///
/// ```
/// use impress_bitfield::bit_for_position;
/// assert_eq!(bit_for_position(1), Ok(1));
/// assert_eq!(bit_for_position(3), Ok(4));
/// assert!(bit_for_position(0).is_err());
/// ```
pub fn bit_for_position(position: u32) -> Result<u64> {
    match position {
        1..=64 => Ok(1u64 << (position - 1)),
        _ => Err(BitfieldError::InvalidPosition(position)),
    }
}

/// A single declared flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagChoice {
    pub bit: u64,
    pub label: String,
}

impl FlagChoice {
    pub fn new(bit: u64, label: impl Into<String>) -> Self {
        Self {
            bit,
            label: label.into(),
        }
    }
}

/// Ordered, validated set of flag choices.
///
/// Every mask is a single bit and no two masks are equal. Declaration order
/// is the order labels appear in [`FlagSet::describe`](crate::FlagSet::describe).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FlagChoice>", into = "Vec<FlagChoice>")]
pub struct FlagVocabulary {
    choices: Vec<FlagChoice>,
    mask: u64,
}

impl FlagVocabulary {
    /// Build a vocabulary from `(bit, label)` pairs.
    pub fn new<I, L>(choices: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u64, L)>,
        L: Into<String>,
    {
        Self::from_choices(
            choices
                .into_iter()
                .map(|(bit, label)| FlagChoice::new(bit, label))
                .collect(),
        )
    }

    /// Build a vocabulary from already-constructed choices.
    pub fn from_choices(choices: Vec<FlagChoice>) -> Result<Self> {
        let mut mask = 0u64;
        for choice in &choices {
            if choice.bit.count_ones() != 1 {
                return Err(VocabularyError::NotSingleBit {
                    bit: choice.bit,
                    label: choice.label.clone(),
                }
                .into());
            }
            if mask & choice.bit != 0 {
                return Err(VocabularyError::DuplicateBit {
                    bit: choice.bit,
                    label: choice.label.clone(),
                }
                .into());
            }
            mask |= choice.bit;
        }

        tracing::debug!(flags = choices.len(), mask, "built flag vocabulary");
        Ok(Self { choices, mask })
    }

    /// True iff `bit` is verbatim one of the declared masks.
    pub fn contains(&self, bit: u64) -> bool {
        bit.count_ones() == 1 && self.mask & bit != 0
    }

    /// Return `bit` unchanged if it is declared, `InvalidFlag` otherwise.
    pub fn validate(&self, bit: u64) -> Result<u64> {
        if self.contains(bit) {
            Ok(bit)
        } else {
            Err(BitfieldError::InvalidFlag { bit })
        }
    }

    pub fn label(&self, bit: u64) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.bit == bit)
            .map(|c| c.label.as_str())
    }

    /// Bit for a label (exact match).
    pub fn bit(&self, label: &str) -> Option<u64> {
        self.choices.iter().find(|c| c.label == label).map(|c| c.bit)
    }

    /// OR of every declared bit.
    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagChoice> {
        self.choices.iter()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

impl TryFrom<Vec<FlagChoice>> for FlagVocabulary {
    type Error = BitfieldError;

    fn try_from(choices: Vec<FlagChoice>) -> Result<Self> {
        Self::from_choices(choices)
    }
}

impl From<FlagVocabulary> for Vec<FlagChoice> {
    fn from(vocabulary: FlagVocabulary) -> Self {
        vocabulary.choices
    }
}

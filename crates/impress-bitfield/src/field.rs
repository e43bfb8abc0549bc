//! Flag field declarations.
//!
//! A `FlagField` names the integer column a record stores its flags in and
//! carries that column's vocabulary. Records own one per flag column and use
//! it to wrap loaded values and to build predicates whose flags are checked
//! against the vocabulary first.

use std::sync::Arc;

use crate::error::Result;
use crate::flag_set::FlagSet;
use crate::predicate::{PredicateBuilder, PredicateSpec, UpdateExpr};
use crate::vocabulary::FlagVocabulary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagField {
    name: String,
    vocabulary: Arc<FlagVocabulary>,
}

impl FlagField {
    pub fn new(name: impl Into<String>, vocabulary: Arc<FlagVocabulary>) -> Self {
        Self {
            name: name.into(),
            vocabulary,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vocabulary(&self) -> &Arc<FlagVocabulary> {
        &self.vocabulary
    }

    /// Wrap a stored value.
    pub fn wrap(&self, bits: u64) -> FlagSet {
        FlagSet::new(Arc::clone(&self.vocabulary), bits)
    }

    /// Value for a new record: no flags set.
    pub fn default_value(&self) -> FlagSet {
        self.wrap(0)
    }

    /// Column value to persist (signed BIGINT representation).
    pub fn to_column(&self, flags: &FlagSet) -> i64 {
        flags.bits() as i64
    }

    /// Wrap a value read back from the column.
    pub fn from_column(&self, value: i64) -> FlagSet {
        self.wrap(value as u64)
    }

    pub fn has_any(&self, builder: &mut PredicateBuilder, flags: &[u64]) -> Result<PredicateSpec> {
        self.validate_all(flags)?;
        builder.has_any(&self.name, flags)
    }

    pub fn has_all(&self, builder: &mut PredicateBuilder, flags: &[u64]) -> Result<PredicateSpec> {
        self.validate_all(flags)?;
        builder.has_all(&self.name, flags)
    }

    pub fn has_none(
        &self,
        builder: &mut PredicateBuilder,
        flags: &[u64],
    ) -> Result<PredicateSpec> {
        self.validate_all(flags)?;
        builder.has_none(&self.name, flags)
    }

    pub fn set_bits(&self, builder: &PredicateBuilder, flag: u64) -> Result<UpdateExpr> {
        let flag = self.vocabulary.validate(flag)?;
        Ok(builder.set_bits(&self.name, flag))
    }

    pub fn clear_bits(&self, builder: &PredicateBuilder, flag: u64) -> Result<UpdateExpr> {
        let flag = self.vocabulary.validate(flag)?;
        Ok(builder.clear_bits(&self.name, flag))
    }

    fn validate_all(&self, flags: &[u64]) -> Result<()> {
        for &flag in flags {
            self.vocabulary.validate(flag)?;
        }
        Ok(())
    }
}

//! Bitwise filter and update expressions over a flag column.
//!
//! A multi-flag predicate is built from one *probe* per requested flag: a
//! named `field & flag` sub-expression that a query layer can annotate as a
//! computed column before filtering on it. The probes are then compared to
//! zero and joined, with the join fixed by the entry point:
//!
//! | entry point | comparison   | join |
//! |-------------|--------------|------|
//! | `has_any`   | `probe != 0` | OR   |
//! | `has_all`   | `probe != 0` | AND  |
//! | `has_none`  | `probe == 0` | AND  |
//!
//! `Set` is a `!= 0` test rather than `> 0`: stores keep the column as a
//! signed BIGINT, where probing bit 64 yields a negative value.

use serde::{Deserialize, Serialize};

use crate::error::{BitfieldError, Result};

/// Default prefix for generated probe names.
pub const DEFAULT_PROBE_PREFIX: &str = "bit_mask";

/// A named `field & mask` sub-expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Probe {
    pub name: String,
    pub field: String,
    pub mask: u64,
}

impl Probe {
    /// Value of the probe for a record holding `bits`.
    pub fn eval(&self, bits: u64) -> u64 {
        bits & self.mask
    }
}

/// How a probe is compared to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    /// `probe != 0`
    Set,
    /// `probe == 0`
    Clear,
}

impl Comparison {
    fn test(self, probe_value: u64) -> bool {
        match self {
            Comparison::Set => probe_value != 0,
            Comparison::Clear => probe_value == 0,
        }
    }
}

/// Boolean connective between conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Join {
    And,
    Or,
}

/// One comparison against a probe, by probe name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub probe: String,
    pub comparison: Comparison,
}

/// A built multi-flag predicate.
///
/// `probes` and `conditions` are parallel: condition `i` tests probe `i`.
/// There is at least one probe, every probe masks `field`, and probe names
/// are unique. Deserialising re-checks all of this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PredicateSpecParts")]
pub struct PredicateSpec {
    field: String,
    probes: Vec<Probe>,
    conditions: Vec<Condition>,
    join: Join,
}

#[derive(Deserialize)]
struct PredicateSpecParts {
    field: String,
    probes: Vec<Probe>,
    conditions: Vec<Condition>,
    join: Join,
}

impl TryFrom<PredicateSpecParts> for PredicateSpec {
    type Error = BitfieldError;

    fn try_from(parts: PredicateSpecParts) -> Result<Self> {
        let malformed = |reason: String| BitfieldError::MalformedPredicate {
            field: parts.field.clone(),
            reason,
        };

        if parts.probes.is_empty() {
            return Err(BitfieldError::EmptyPredicate {
                field: parts.field.clone(),
            });
        }
        if parts.probes.len() != parts.conditions.len() {
            return Err(malformed(format!(
                "{} probes but {} conditions",
                parts.probes.len(),
                parts.conditions.len()
            )));
        }
        for (i, (probe, cond)) in parts.probes.iter().zip(&parts.conditions).enumerate() {
            if probe.field != parts.field {
                return Err(malformed(format!(
                    "probe `{}` masks `{}`",
                    probe.name, probe.field
                )));
            }
            if cond.probe != probe.name {
                return Err(malformed(format!(
                    "condition `{}` does not test probe `{}`",
                    cond.probe, probe.name
                )));
            }
            if parts.probes[..i].iter().any(|p| p.name == probe.name) {
                return Err(malformed(format!("duplicate probe `{}`", probe.name)));
            }
        }

        Ok(PredicateSpec {
            field: parts.field,
            probes: parts.probes,
            conditions: parts.conditions,
            join: parts.join,
        })
    }
}

impl PredicateSpec {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn join(&self) -> Join {
        self.join
    }

    pub fn probe(&self, name: &str) -> Option<&Probe> {
        self.probes.iter().find(|p| p.name == name)
    }

    /// Evaluate the predicate against a record holding `bits`.
    pub fn matches(&self, bits: u64) -> bool {
        let mut results = self
            .probes
            .iter()
            .zip(&self.conditions)
            .map(|(probe, cond)| cond.comparison.test(probe.eval(bits)));
        match self.join {
            Join::And => results.all(|r| r),
            Join::Or => results.any(|r| r),
        }
    }
}

/// In-place update of a flag column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateExpr {
    /// `field = field | mask`
    SetBits { field: String, mask: u64 },
    /// `field = field & !mask`
    ClearBits { field: String, mask: u64 },
}

impl UpdateExpr {
    pub fn field(&self) -> &str {
        match self {
            UpdateExpr::SetBits { field, .. } | UpdateExpr::ClearBits { field, .. } => field,
        }
    }

    pub fn mask(&self) -> u64 {
        match self {
            UpdateExpr::SetBits { mask, .. } | UpdateExpr::ClearBits { mask, .. } => *mask,
        }
    }

    /// New column value after applying the update to `bits`.
    pub fn apply(&self, bits: u64) -> u64 {
        match self {
            UpdateExpr::SetBits { mask, .. } => bits | mask,
            UpdateExpr::ClearBits { mask, .. } => bits & !mask,
        }
    }
}

/// Builds flag predicates with probe names unique across every call made
/// on the same builder, so several predicates can share one query.
///
/// Predicate flags must each be a single bit; which bits a field declares
/// is not checked here. Use [`FlagField`](crate::FlagField) to check flags
/// against a vocabulary. Update masks are taken as given and may cover
/// several bits.
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    prefix: String,
    next_ordinal: usize,
}

impl Default for PredicateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PROBE_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_ordinal: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Matches records with at least one of `flags` set.
    pub fn has_any(&mut self, field: &str, flags: &[u64]) -> Result<PredicateSpec> {
        self.build(field, flags, Join::Or, Comparison::Set)
    }

    /// Matches records with every one of `flags` set.
    pub fn has_all(&mut self, field: &str, flags: &[u64]) -> Result<PredicateSpec> {
        self.build(field, flags, Join::And, Comparison::Set)
    }

    /// Matches records with none of `flags` set.
    pub fn has_none(&mut self, field: &str, flags: &[u64]) -> Result<PredicateSpec> {
        self.build(field, flags, Join::And, Comparison::Clear)
    }

    pub fn set_bits(&self, field: &str, flag: u64) -> UpdateExpr {
        UpdateExpr::SetBits {
            field: field.to_string(),
            mask: flag,
        }
    }

    pub fn clear_bits(&self, field: &str, flag: u64) -> UpdateExpr {
        UpdateExpr::ClearBits {
            field: field.to_string(),
            mask: flag,
        }
    }

    fn build(
        &mut self,
        field: &str,
        flags: &[u64],
        join: Join,
        comparison: Comparison,
    ) -> Result<PredicateSpec> {
        if flags.is_empty() {
            return Err(BitfieldError::EmptyPredicate {
                field: field.to_string(),
            });
        }

        if let Some(&bit) = flags.iter().find(|b| b.count_ones() != 1) {
            return Err(BitfieldError::InvalidFlag { bit });
        }

        let mut probes = Vec::with_capacity(flags.len());
        let mut conditions = Vec::with_capacity(flags.len());
        for &flag in flags {
            let name = format!("{}_{}", self.prefix, self.next_ordinal);
            self.next_ordinal += 1;
            conditions.push(Condition {
                probe: name.clone(),
                comparison,
            });
            probes.push(Probe {
                name,
                field: field.to_string(),
                mask: flag,
            });
        }

        tracing::debug!(field, flags = flags.len(), ?join, ?comparison, "built flag predicate");
        Ok(PredicateSpec {
            field: field.to_string(),
            probes,
            conditions,
            join,
        })
    }
}

/// [`PredicateBuilder::has_any`] on a fresh builder.
pub fn build_has_any(field: &str, flags: &[u64]) -> Result<PredicateSpec> {
    PredicateBuilder::new().has_any(field, flags)
}

/// [`PredicateBuilder::has_all`] on a fresh builder.
pub fn build_has_all(field: &str, flags: &[u64]) -> Result<PredicateSpec> {
    PredicateBuilder::new().has_all(field, flags)
}

/// [`PredicateBuilder::has_none`] on a fresh builder.
pub fn build_has_none(field: &str, flags: &[u64]) -> Result<PredicateSpec> {
    PredicateBuilder::new().has_none(field, flags)
}

pub fn build_set_bits(field: &str, flag: u64) -> UpdateExpr {
    PredicateBuilder::new().set_bits(field, flag)
}

pub fn build_clear_bits(field: &str, flag: u64) -> UpdateExpr {
    PredicateBuilder::new().clear_bits(field, flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: u64 = 1;
    const B: u64 = 2;
    const C: u64 = 4;

    #[test]
    fn one_probe_per_flag() {
        let spec = build_has_any("flag", &[A, B]).unwrap();
        assert_eq!(spec.field(), "flag");
        assert_eq!(spec.join(), Join::Or);
        assert_eq!(
            spec.probes(),
            &[
                Probe {
                    name: "bit_mask_0".into(),
                    field: "flag".into(),
                    mask: A
                },
                Probe {
                    name: "bit_mask_1".into(),
                    field: "flag".into(),
                    mask: B
                },
            ]
        );
        assert!(spec
            .conditions()
            .iter()
            .all(|c| c.comparison == Comparison::Set));
    }

    #[test]
    fn probe_names_continue_across_calls() {
        let mut builder = PredicateBuilder::new();
        let first = builder.has_all("flag", &[A, B]).unwrap();
        let second = builder.has_none("other", &[C]).unwrap();
        assert_eq!(first.probes()[1].name, "bit_mask_1");
        assert_eq!(second.probes()[0].name, "bit_mask_2");
        assert!(second.probe("bit_mask_2").is_some());
        assert!(second.probe("bit_mask_0").is_none());
    }

    #[test]
    fn custom_prefix() {
        let mut builder = PredicateBuilder::with_prefix("perm");
        let spec = builder.has_any("flag", &[A]).unwrap();
        assert_eq!(spec.probes()[0].name, "perm_0");
        assert_eq!(builder.prefix(), "perm");
    }

    #[test]
    fn empty_flag_list_is_an_error() {
        let mut builder = PredicateBuilder::new();
        for result in [
            builder.has_any("flag", &[]),
            builder.has_all("flag", &[]),
            builder.has_none("flag", &[]),
        ] {
            assert_eq!(
                result,
                Err(BitfieldError::EmptyPredicate {
                    field: "flag".into()
                })
            );
        }
        // failed calls do not consume ordinals
        let spec = builder.has_any("flag", &[A]).unwrap();
        assert_eq!(spec.probes()[0].name, "bit_mask_0");
    }

    #[test]
    fn has_none_semantics() {
        let spec = build_has_none("flag", &[A, B]).unwrap();
        assert_eq!(spec.join(), Join::And);
        assert!(spec.matches(0));
        assert!(spec.matches(C));
        assert!(!spec.matches(A));
        assert!(!spec.matches(B));
        assert!(!spec.matches(A | B));
    }

    #[test]
    fn update_expressions() {
        let set = build_set_bits("flag", B);
        let clear = build_clear_bits("flag", B);
        assert_eq!(set.field(), "flag");
        assert_eq!(set.mask(), B);
        assert_eq!(set.apply(A), A | B);
        assert_eq!(set.apply(A | B), A | B);
        assert_eq!(clear.apply(A | B), A);
        assert_eq!(clear.apply(A), A);
    }

    #[test]
    fn multi_bit_and_zero_flags_rejected() {
        let mut builder = PredicateBuilder::new();
        assert_eq!(
            builder.has_all("flag", &[A, A | B]),
            Err(BitfieldError::InvalidFlag { bit: A | B })
        );
        assert_eq!(
            builder.has_none("flag", &[0]),
            Err(BitfieldError::InvalidFlag { bit: 0 })
        );
        assert!(builder.has_any("flag", &[1 << 63]).is_ok());
    }

    #[test]
    fn high_bit_counts_as_set() {
        let spec = build_has_all("flag", &[1 << 63, A]).unwrap();
        assert!(spec.matches((1 << 63) | A));
        assert!(!spec.matches(1 << 63));
    }

    fn parse(json: &str) -> std::result::Result<PredicateSpec, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    #[test]
    fn deserialize_round_trip() {
        let spec = build_has_none("flag", &[A, C]).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(parse(&json), Ok(spec));
    }

    #[test]
    fn deserialize_rejects_empty_spec() {
        let err = parse(r#"{"field":"flag","probes":[],"conditions":[],"join":"And"}"#)
            .unwrap_err();
        assert!(err.contains("empty flag list"), "{err}");
    }

    #[test]
    fn deserialize_rejects_unpaired_conditions() {
        let err = parse(
            r#"{"field":"flag",
                "probes":[{"name":"bit_mask_0","field":"flag","mask":1}],
                "conditions":[{"probe":"nope","comparison":"Set"},{"probe":"x","comparison":"Set"}],
                "join":"Or"}"#,
        )
        .unwrap_err();
        assert!(err.contains("1 probes but 2 conditions"), "{err}");
    }

    #[test]
    fn deserialize_rejects_misnamed_condition() {
        let err = parse(
            r#"{"field":"flag",
                "probes":[{"name":"bit_mask_0","field":"flag","mask":1}],
                "conditions":[{"probe":"nope","comparison":"Set"}],
                "join":"Or"}"#,
        )
        .unwrap_err();
        assert!(err.contains("condition `nope`"), "{err}");
    }

    #[test]
    fn deserialize_rejects_duplicate_probe_names() {
        let err = parse(
            r#"{"field":"flag",
                "probes":[{"name":"p","field":"flag","mask":1},{"name":"p","field":"flag","mask":2}],
                "conditions":[{"probe":"p","comparison":"Set"},{"probe":"p","comparison":"Set"}],
                "join":"And"}"#,
        )
        .unwrap_err();
        assert!(err.contains("duplicate probe `p`"), "{err}");
    }

    #[test]
    fn deserialize_rejects_foreign_field() {
        let err = parse(
            r#"{"field":"flag",
                "probes":[{"name":"p","field":"other","mask":1}],
                "conditions":[{"probe":"p","comparison":"Clear"}],
                "join":"And"}"#,
        )
        .unwrap_err();
        assert!(err.contains("masks `other`"), "{err}");
    }
}

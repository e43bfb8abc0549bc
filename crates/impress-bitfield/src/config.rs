//! TOML loader for flag field declarations
//!
//! ```toml
//! probe_prefix = "bit_mask"
//!
//! [[fields]]
//! name = "flag"
//!
//! [[fields.choices]]
//! position = 1
//! label = "One"
//!
//! [[fields.choices]]
//! bit = 2
//! label = "Two"
//! ```
//!
//! Each choice gives either a 1-based `position` or a raw `bit`, not both.
//! TOML integers are signed 64-bit, so `bit` cannot spell the top bit
//! (`9223372036854775808`); declare that flag as `position = 64`.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::BitfieldError;
use crate::field::FlagField;
use crate::predicate::{PredicateBuilder, DEFAULT_PROBE_PREFIX};
use crate::vocabulary::{bit_for_position, FlagChoice, FlagVocabulary};

/// Errors that can occur when loading flag fields from TOML
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("Field `{field}`: choice `{label}` needs a `bit` or a `position`")]
    MissingBit { field: String, label: String },

    #[error("Field `{field}`: choice `{label}` sets both `bit` and `position`")]
    AmbiguousChoice { field: String, label: String },

    #[error("Field `{field}`: {source}")]
    Vocabulary {
        field: String,
        #[source]
        source: BitfieldError,
    },
}

#[derive(Debug, Deserialize)]
struct TomlChoice {
    label: String,
    bit: Option<u64>,
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlField {
    name: String,
    #[serde(default)]
    choices: Vec<TomlChoice>,
}

#[derive(Debug, Deserialize)]
struct TomlConfig {
    #[serde(default = "default_probe_prefix")]
    probe_prefix: String,
    #[serde(default)]
    fields: Vec<TomlField>,
}

fn default_probe_prefix() -> String {
    DEFAULT_PROBE_PREFIX.to_string()
}

/// Loaded flag field declarations.
#[derive(Debug, Clone)]
pub struct BitfieldConfig {
    probe_prefix: String,
    fields: Vec<FlagField>,
}

impl BitfieldConfig {
    pub fn probe_prefix(&self) -> &str {
        &self.probe_prefix
    }

    pub fn fields(&self) -> &[FlagField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FlagField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// A fresh predicate builder using the configured probe prefix.
    pub fn builder(&self) -> PredicateBuilder {
        PredicateBuilder::with_prefix(self.probe_prefix.clone())
    }
}

/// Parse flag field declarations from a TOML string
pub fn load_config_from_str(content: &str) -> Result<BitfieldConfig, ConfigError> {
    let toml: TomlConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let fields = toml
        .fields
        .into_iter()
        .map(parse_field)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BitfieldConfig {
        probe_prefix: toml.probe_prefix,
        fields,
    })
}

/// Load flag field declarations from a TOML file
pub fn load_config(path: &Path) -> Result<BitfieldConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    load_config_from_str(&content)
}

fn parse_field(toml: TomlField) -> Result<FlagField, ConfigError> {
    let mut choices = Vec::with_capacity(toml.choices.len());
    for choice in toml.choices {
        let bit = match (choice.bit, choice.position) {
            (Some(bit), None) => bit,
            (None, Some(position)) => {
                bit_for_position(position).map_err(|source| ConfigError::Vocabulary {
                    field: toml.name.clone(),
                    source,
                })?
            }
            (None, None) => {
                return Err(ConfigError::MissingBit {
                    field: toml.name,
                    label: choice.label,
                })
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::AmbiguousChoice {
                    field: toml.name,
                    label: choice.label,
                })
            }
        };
        choices.push(FlagChoice::new(bit, choice.label));
    }

    let vocabulary = FlagVocabulary::from_choices(choices).map_err(|source| {
        tracing::warn!(field = %toml.name, error = %source, "rejected flag vocabulary");
        ConfigError::Vocabulary {
            field: toml.name.clone(),
            source,
        }
    })?;

    Ok(FlagField::new(toml.name, Arc::new(vocabulary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[[fields]]
name = "flag"

[[fields.choices]]
position = 1
label = "One"

[[fields.choices]]
position = 2
label = "Two"

[[fields.choices]]
bit = 4
label = "Three"
"#;

    #[test]
    fn loads_positions_and_bits() {
        let config = load_config_from_str(SAMPLE).unwrap();
        assert_eq!(config.probe_prefix(), "bit_mask");
        let field = config.field("flag").unwrap();
        let labels: Vec<(u64, &str)> = field
            .vocabulary()
            .iter()
            .map(|c| (c.bit, c.label.as_str()))
            .collect();
        assert_eq!(labels, vec![(1, "One"), (2, "Two"), (4, "Three")]);
        assert!(config.field("missing").is_none());
    }

    #[test]
    fn custom_probe_prefix() {
        let config = load_config_from_str("probe_prefix = \"probe\"\n").unwrap();
        assert!(config.fields().is_empty());
        let mut builder = config.builder();
        let spec = builder.has_any("flag", &[1]).unwrap();
        assert_eq!(spec.probes()[0].name, "probe_0");
    }

    #[test]
    fn choice_needs_exactly_one_bit_source() {
        let missing = r#"
[[fields]]
name = "flag"
[[fields.choices]]
label = "One"
"#;
        assert!(matches!(
            load_config_from_str(missing),
            Err(ConfigError::MissingBit { .. })
        ));

        let both = r#"
[[fields]]
name = "flag"
[[fields.choices]]
label = "One"
bit = 1
position = 1
"#;
        assert!(matches!(
            load_config_from_str(both),
            Err(ConfigError::AmbiguousChoice { .. })
        ));
    }

    #[test]
    fn duplicate_bits_rejected() {
        let dup = r#"
[[fields]]
name = "flag"
[[fields.choices]]
label = "One"
position = 1
[[fields.choices]]
label = "Also one"
bit = 1
"#;
        let err = load_config_from_str(dup).unwrap_err();
        assert!(matches!(err, ConfigError::Vocabulary { ref field, .. } if field == "flag"));
    }

    #[test]
    fn position_out_of_range() {
        let bad = r#"
[[fields]]
name = "flag"
[[fields.choices]]
label = "Too far"
position = 65
"#;
        let err = load_config_from_str(bad).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Vocabulary {
                source: BitfieldError::InvalidPosition(65),
                ..
            }
        ));
    }

    #[test]
    fn parse_error() {
        assert!(matches!(
            load_config_from_str("fields = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.fields().len(), 1);
    }

    #[test]
    fn missing_file() {
        let err = load_config(Path::new("/nonexistent/bitfields.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn top_bit_only_by_position() {
        let by_bit = r#"
[[fields]]
name = "flag"
[[fields.choices]]
label = "Top"
bit = 9223372036854775808
"#;
        assert!(matches!(
            load_config_from_str(by_bit),
            Err(ConfigError::Parse(_))
        ));

        let by_position = r#"
[[fields]]
name = "flag"
[[fields.choices]]
label = "Top"
position = 64
"#;
        let config = load_config_from_str(by_position).unwrap();
        let field = config.field("flag").unwrap();
        assert_eq!(field.vocabulary().bit("Top"), Some(1 << 63));
    }
}

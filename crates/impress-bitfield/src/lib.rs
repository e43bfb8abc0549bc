//! impress-bitfield: bitmask flag fields for record stores.
//!
//! A flag field packs a set of named booleans into one 64-bit integer column.
//! Each field declares a [`FlagVocabulary`] of `(bit, label)` choices; loaded
//! values are wrapped in a [`FlagSet`] to test, set, clear and describe flags,
//! and a [`PredicateBuilder`] turns "has any / all / none of these flags" into
//! bitwise filter expressions so that filtering can happen in the store.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use impress_bitfield::{bit_for_position, FlagField, FlagVocabulary, PredicateBuilder};
//!
//! let one = bit_for_position(1).unwrap();
//! let two = bit_for_position(2).unwrap();
//! let vocabulary = FlagVocabulary::new([(one, "One"), (two, "Two")]).unwrap();
//! let field = FlagField::new("flag", Arc::new(vocabulary));
//!
//! let mut flags = field.default_value();
//! flags.add_flag(two).unwrap();
//! assert_eq!(flags.describe(), "Two");
//!
//! let mut builder = PredicateBuilder::new();
//! let any = field.has_any(&mut builder, &[one, two]).unwrap();
//! assert!(any.matches(flags.bits()));
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod flag_set;
pub mod predicate;
#[cfg(feature = "sql")]
pub mod sql;
pub mod vocabulary;

pub use config::*;
pub use error::*;
pub use field::*;
pub use flag_set::*;
pub use predicate::*;
#[cfg(feature = "sql")]
pub use sql::*;
pub use vocabulary::*;

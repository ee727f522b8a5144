//! Shared data model for Parley dialogue content.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, is_valid_flag_name, sort_triggers, validate_dialogue};

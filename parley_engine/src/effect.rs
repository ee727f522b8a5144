//! Choice effects -- flag mutations applied when a choice is selected.
//!
//! Authored [`EffectDef`] records carry a flag type, an operation and a loosely
//! typed value. They are "cooked" into [`Effect`] at load time so a value that
//! doesn't fit its flag type is caught before any dialogue runs.
//!
//! Every application logs an audit line:
//! ```text
//! └─ effect: AddInt("gold", 5)
//! ```

use std::fmt::{self, Display};

use anyhow::{Result, bail};
use log::{info, warn};
use parley_data::{EffectDef, EffectOp, EffectValue, FlagType};

use crate::flags::FlagStore;

/// A typed flag mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetBool(String),
    SetInt { key: String, value: i32 },
    AddInt { key: String, delta: i32 },
    SetFloat { key: String, value: f32 },
    AddFloat { key: String, delta: f32 },
    SetString { key: String, value: String },
}

impl Effect {
    /// Convert an authored effect record into a typed effect.
    ///
    /// Bool and String effects ignore `op`. Bool effects ignore their value.
    ///
    /// # Errors
    /// - if the value payload does not match the flag type
    pub fn from_def(def: &EffectDef) -> Result<Effect> {
        let key = def.key.trim().to_string();
        let effect = match (def.flag_type, def.op, &def.value) {
            (FlagType::Bool, _, _) => Effect::SetBool(key),
            (FlagType::Int, EffectOp::Set, EffectValue::Int(value)) => Effect::SetInt { key, value: *value },
            (FlagType::Int, EffectOp::Add, EffectValue::Int(delta)) => Effect::AddInt { key, delta: *delta },
            (FlagType::Float, EffectOp::Set, EffectValue::Float(value)) => Effect::SetFloat { key, value: *value },
            (FlagType::Float, EffectOp::Add, EffectValue::Float(delta)) => Effect::AddFloat { key, delta: *delta },
            (FlagType::String, _, EffectValue::Text(value)) => Effect::SetString {
                key,
                value: value.clone(),
            },
            (flag_type, _, value) => {
                bail!("{flag_type:?} effect on '{key}' cannot carry {value:?}")
            },
        };
        Ok(effect)
    }

    /// Apply this effect to the store. Returns false if the store rejected the flag name.
    pub fn apply(&self, flags: &mut FlagStore) -> bool {
        let applied = match self {
            Effect::SetBool(key) => flags.add_bool(key),
            Effect::SetInt { key, value } => flags.set_int(key, *value),
            Effect::AddInt { key, delta } => flags.add_to_int(key, *delta),
            Effect::SetFloat { key, value } => flags.set_float(key, *value),
            Effect::AddFloat { key, delta } => flags.add_to_float(key, *delta),
            Effect::SetString { key, value } => flags.set_string(key, value),
        };
        if applied {
            info!("└─ effect: {self}");
        } else {
            warn!("└─ effect rejected: {self}");
        }
        applied
    }
}

/// Apply effects in order. Later effects on the same key see earlier results.
pub fn apply_effects(effects: &[Effect], flags: &mut FlagStore) {
    for effect in effects {
        effect.apply(flags);
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetBool(key) => write!(f, "SetBool(\"{key}\")"),
            Effect::SetInt { key, value } => write!(f, "SetInt(\"{key}\", {value})"),
            Effect::AddInt { key, delta } => write!(f, "AddInt(\"{key}\", {delta})"),
            Effect::SetFloat { key, value } => write!(f, "SetFloat(\"{key}\", {value})"),
            Effect::AddFloat { key, delta } => write!(f, "AddFloat(\"{key}\", {delta})"),
            Effect::SetString { key, value } => write!(f, "SetString(\"{key}\", \"{value}\")"),
        }
    }
}

//! Flag expressions -- the small grammar used by condition leaves.
//!
//! An expression is either a bare flag name (a presence test against the
//! boolean namespace) or `key OP value` where `OP` is one of
//! `<=`, `>=`, `!=`, `=`, `<`, `>`. Two-character operators take precedence
//! over their one-character prefixes.

use std::fmt::{self, Display};

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::flags::FlagStore;

lazy_static! {
    static ref COMPARISON: Regex =
        Regex::new(r"^([^><=!]+)(<=|>=|!=|=|<|>)([^><=!]+)$").expect("comparison pattern is valid");
}

/// Comparison operator in a flag expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }

    /// Apply the operator to two ordered values.
    #[allow(clippy::float_cmp)]
    pub fn compare<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed flag expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagExpr {
    /// True iff the name is set in the boolean namespace.
    Presence(String),
    /// Typed comparison; the namespace is chosen by how `value` parses.
    Compare { key: String, op: CompareOp, value: String },
}

impl FlagExpr {
    /// Parse an expression. Returns `None` (with a warning) if it is malformed.
    pub fn parse(text: &str) -> Option<FlagExpr> {
        let text = text.trim();
        if parley_data::is_valid_flag_name(text) {
            return Some(FlagExpr::Presence(text.to_string()));
        }
        let Some(caps) = COMPARISON.captures(text) else {
            warn!("invalid flag expression: '{text}'");
            return None;
        };
        let op = CompareOp::from_symbol(&caps[2])?;
        Some(FlagExpr::Compare {
            key: caps[1].trim().to_string(),
            op,
            value: caps[3].trim().to_string(),
        })
    }

    /// Evaluate against a store. Unknown keys and type mismatches are false.
    pub fn evaluate(&self, store: &FlagStore) -> bool {
        match self {
            FlagExpr::Presence(name) => store.has_bool(name),
            FlagExpr::Compare { key, op, value } => compare_flag(store, key, *op, value),
        }
    }
}

impl Display for FlagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagExpr::Presence(name) => write!(f, "{name}"),
            FlagExpr::Compare { key, op, value } => write!(f, "{key}{op}{value}"),
        }
    }
}

/// Parse a numeric float literal. Words such as `inf` or `NaN` stay text.
pub(crate) fn parse_float_literal(raw: &str) -> Option<f32> {
    raw.parse::<f32>().ok().filter(|value| value.is_finite())
}

fn compare_flag(store: &FlagStore, key: &str, op: CompareOp, raw: &str) -> bool {
    let as_int = raw.parse::<i32>().ok();
    let as_float = parse_float_literal(raw);

    if let (Some(rhs), Some(lhs)) = (as_int, store.get_int(key)) {
        return op.compare(lhs, rhs);
    }
    if let (Some(rhs), Some(lhs)) = (as_float, store.get_float(key)) {
        return op.compare(lhs, rhs);
    }
    if as_int.is_none()
        && as_float.is_none()
        && let Some(lhs) = store.get_string(key)
    {
        return match op {
            CompareOp::Eq => lhs == raw,
            CompareOp::Ne => lhs != raw,
            _ => {
                warn!("operator '{op}' is not valid for string flag '{key}'");
                false
            },
        };
    }
    false
}

//! Condition evaluation -- boolean logic trees over flag expressions.
//!
//! A [`ConditionGroup`] is evaluated recursively against anything that
//! implements [`FlagLookup`]. Evaluation only reads flag state.

use log::warn;
use parley_data::ConditionGroup;
pub use parley_data::MAX_CONDITION_DEPTH;
use thiserror::Error;

use crate::flags::FlagLookup;

/// Condition trees that cannot be evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("'not' condition group has no child to negate")]
    EmptyNot,
    #[error("condition tree nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Evaluate an optional condition group. A missing group is `true`.
///
/// # Errors
/// - `ConditionError::EmptyNot` if a `Not` group has no children
/// - `ConditionError::TooDeep` if nesting exceeds [`MAX_CONDITION_DEPTH`]
pub fn try_evaluate<F>(group: Option<&ConditionGroup>, flags: &F) -> Result<bool, ConditionError>
where
    F: FlagLookup + ?Sized,
{
    match group {
        None => Ok(true),
        Some(group) => eval_group(group, flags, 1),
    }
}

/// Evaluate a condition group, logging malformed trees and treating them as `false`.
pub fn evaluate<F>(group: Option<&ConditionGroup>, flags: &F) -> bool
where
    F: FlagLookup + ?Sized,
{
    try_evaluate(group, flags).unwrap_or_else(|err| {
        warn!("condition evaluation failed: {err}");
        false
    })
}

fn eval_group<F>(group: &ConditionGroup, flags: &F, depth: usize) -> Result<bool, ConditionError>
where
    F: FlagLookup + ?Sized,
{
    if depth > MAX_CONDITION_DEPTH {
        return Err(ConditionError::TooDeep {
            limit: MAX_CONDITION_DEPTH,
        });
    }
    match group {
        ConditionGroup::Value(text) => {
            let text = text.trim();
            Ok(text.is_empty() || flags.has_flag(text))
        },
        ConditionGroup::Or(children) => {
            if children.is_empty() {
                return Ok(true);
            }
            for child in children {
                if eval_group(child, flags, depth + 1)? {
                    return Ok(true);
                }
            }
            Ok(false)
        },
        ConditionGroup::And(children) => {
            for child in children {
                if !eval_group(child, flags, depth + 1)? {
                    return Ok(false);
                }
            }
            Ok(true)
        },
        ConditionGroup::Not(children) => {
            let Some(first) = children.first() else {
                return Err(ConditionError::EmptyNot);
            };
            if children.len() > 1 {
                warn!(
                    "'not' condition group has {} children; only the first is evaluated",
                    children.len()
                );
            }
            Ok(!eval_group(first, flags, depth + 1)?)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagStore;
    use parley_data::ConditionGroup as G;

    fn store() -> FlagStore {
        let mut store = FlagStore::new();
        store.add_bool("metHero");
        store.set_int("gold", 12);
        store
    }

    #[test]
    fn missing_and_empty_conditions_are_true() {
        let store = FlagStore::new();
        assert!(evaluate(None, &store));
        assert!(evaluate(Some(&G::value("")), &store));
        assert!(evaluate(Some(&G::value("   ")), &store));
    }

    #[test]
    fn empty_and_or_are_vacuously_true() {
        let store = FlagStore::new();
        assert_eq!(try_evaluate(Some(&G::And(Vec::new())), &store), Ok(true));
        assert_eq!(try_evaluate(Some(&G::Or(Vec::new())), &store), Ok(true));
    }

    #[test]
    fn leaves_delegate_to_flag_lookup() {
        let store = store();
        assert!(evaluate(Some(&G::value("metHero")), &store));
        assert!(evaluate(Some(&G::value("gold>=10")), &store));
        assert!(!evaluate(Some(&G::value("sawDragon")), &store));
    }

    #[test]
    fn and_or_combine_children() {
        let store = store();
        let both = G::And(vec![G::value("metHero"), G::value("gold>20")]);
        let either = G::Or(vec![G::value("sawDragon"), G::value("gold>10")]);
        assert!(!evaluate(Some(&both), &store));
        assert!(evaluate(Some(&either), &store));
    }

    #[test]
    fn not_negates_its_child() {
        let store = store();
        for leaf in ["metHero", "sawDragon", "gold=12", "gold<0"] {
            let plain = evaluate(Some(&G::value(leaf)), &store);
            assert_eq!(evaluate(Some(&G::not(G::value(leaf))), &store), !plain);
        }
    }

    #[test]
    fn not_ignores_extra_children() {
        let store = store();
        let group = G::Not(vec![G::value("sawDragon"), G::value("metHero")]);
        assert_eq!(try_evaluate(Some(&group), &store), Ok(true));
    }

    #[test]
    fn empty_not_is_an_error() {
        let store = store();
        let group = G::And(vec![G::value("metHero"), G::Not(Vec::new())]);
        assert_eq!(try_evaluate(Some(&group), &store), Err(ConditionError::EmptyNot));
        assert!(!evaluate(Some(&group), &store));
    }

    #[test]
    fn short_circuit_skips_malformed_tail() {
        let store = store();
        let group = G::Or(vec![G::value("metHero"), G::Not(Vec::new())]);
        assert_eq!(try_evaluate(Some(&group), &store), Ok(true));
    }

    #[test]
    fn deep_trees_fail_safely() {
        let store = store();
        let mut group = G::value("metHero");
        for _ in 0..MAX_CONDITION_DEPTH {
            group = G::not(group);
        }
        assert_eq!(
            try_evaluate(Some(&group), &store),
            Err(ConditionError::TooDeep {
                limit: MAX_CONDITION_DEPTH
            })
        );
    }

    struct OnlyGold;

    impl FlagLookup for OnlyGold {
        fn has_flag(&self, expr: &str) -> bool {
            expr == "gold"
        }
    }

    #[test]
    fn works_with_any_flag_lookup() {
        let group = G::And(vec![G::value("gold"), G::not(G::value("silver"))]);
        assert!(evaluate(Some(&group), &OnlyGold));
    }
}

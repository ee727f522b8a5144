//! Flags -- typed world state consulted by dialogue conditions.
//!
//! A [`FlagStore`] keeps four independent namespaces: presence-only boolean
//! flags, integers, floats and strings. The same name may exist in several
//! namespaces at once; callers pick the namespace by the operation they use.
//!
//! All names are trimmed before use. Names containing any of `> < = !` are
//! rejected by the mutators because they would collide with the comparison
//! grammar understood by [`FlagStore::has_flag`].

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use parley_data::is_valid_flag_name;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::FlagExpr;

/// Read access to flag state, as needed by the condition evaluator.
pub trait FlagLookup {
    /// Evaluate a bare flag name or a comparison expression such as `gold>=10`.
    fn has_flag(&self, expr: &str) -> bool;
}

/// Mutable store of world-state flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagStore {
    bools: HashSet<String>,
    ints: HashMap<String, i32>,
    floats: HashMap<String, f32>,
    strings: HashMap<String, String>,
}

/// Flat, serializable form of a [`FlagStore`] used by save files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSnapshot {
    #[serde(default)]
    pub bools: Vec<String>,
    #[serde(default)]
    pub ints: Vec<(String, i32)>,
    #[serde(default)]
    pub floats: Vec<(String, f32)>,
    #[serde(default)]
    pub strings: Vec<(String, String)>,
}

/// Reasons a snapshot cannot be imported strictly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("duplicate {namespace} flag '{key}' in snapshot")]
    DuplicateKey { namespace: &'static str, key: String },
    #[error("invalid {namespace} flag name '{key}' in snapshot")]
    InvalidFlagName { namespace: &'static str, key: String },
}

/// Trim a flag name and check it against the operator rule.
fn checked_name(name: &str) -> Option<&str> {
    let name = name.trim();
    if is_valid_flag_name(name) {
        Some(name)
    } else {
        warn!("rejected flag name '{name}': names may not contain '>', '<', '=' or '!'");
        None
    }
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no flag is set in any namespace.
    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.ints.is_empty() && self.floats.is_empty() && self.strings.is_empty()
    }

    /// Remove every flag from every namespace.
    pub fn clear(&mut self) {
        self.bools.clear();
        self.ints.clear();
        self.floats.clear();
        self.strings.clear();
    }

    /// Set a presence flag. Returns false (and changes nothing) if the name is invalid.
    pub fn add_bool(&mut self, name: &str) -> bool {
        let Some(name) = checked_name(name) else {
            return false;
        };
        if self.bools.insert(name.to_string()) {
            debug!("bool flag '{name}' set");
        }
        true
    }

    /// Clear a presence flag; absent flags are ignored.
    pub fn remove_bool(&mut self, name: &str) {
        self.bools.remove(name.trim());
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        let Some(name) = checked_name(name) else {
            return false;
        };
        self.ints.insert(name.to_string(), value);
        true
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        let Some(name) = checked_name(name) else {
            return false;
        };
        self.floats.insert(name.to_string(), value);
        true
    }

    /// Set a string flag. Both the name and the value are trimmed.
    pub fn set_string(&mut self, name: &str, value: &str) -> bool {
        let Some(name) = checked_name(name) else {
            return false;
        };
        self.strings.insert(name.to_string(), value.trim().to_string());
        true
    }

    /// Add `delta` to an integer flag, treating a missing flag as zero.
    pub fn add_to_int(&mut self, name: &str, delta: i32) -> bool {
        let Some(name) = checked_name(name) else {
            return false;
        };
        let slot = self.ints.entry(name.to_string()).or_insert(0);
        *slot = slot.saturating_add(delta);
        true
    }

    /// Add `delta` to a float flag, treating a missing flag as zero.
    pub fn add_to_float(&mut self, name: &str, delta: f32) -> bool {
        let Some(name) = checked_name(name) else {
            return false;
        };
        *self.floats.entry(name.to_string()).or_insert(0.0) += delta;
        true
    }

    pub fn remove_int(&mut self, name: &str) {
        self.ints.remove(name.trim());
    }

    pub fn remove_float(&mut self, name: &str) {
        self.floats.remove(name.trim());
    }

    pub fn remove_string(&mut self, name: &str) {
        self.strings.remove(name.trim());
    }

    pub fn has_bool(&self, name: &str) -> bool {
        self.bools.contains(name.trim())
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.ints.get(name.trim()).copied()
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.floats.get(name.trim()).copied()
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.strings.get(name.trim()).map(String::as_str)
    }

    /// Evaluate a bare flag name (presence test) or a comparison expression.
    ///
    /// Malformed expressions and comparisons against unknown or mismatched
    /// flags are `false`, never errors.
    pub fn has_flag(&self, expr: &str) -> bool {
        FlagExpr::parse(expr).is_some_and(|parsed| parsed.evaluate(self))
    }

    /// Export all namespaces in a flat form, each sorted by key.
    pub fn export(&self) -> FlagSnapshot {
        let mut bools: Vec<_> = self.bools.iter().cloned().collect();
        bools.sort();
        let mut ints: Vec<_> = self.ints.iter().map(|(k, v)| (k.clone(), *v)).collect();
        ints.sort_by(|a, b| a.0.cmp(&b.0));
        let mut floats: Vec<_> = self.floats.iter().map(|(k, v)| (k.clone(), *v)).collect();
        floats.sort_by(|a, b| a.0.cmp(&b.0));
        let mut strings: Vec<_> = self.strings.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        strings.sort_by(|a, b| a.0.cmp(&b.0));
        FlagSnapshot {
            bools,
            ints,
            floats,
            strings,
        }
    }

    /// Replace the store's contents with a snapshot.
    ///
    /// Duplicate keys within a namespace overwrite earlier ones. Entries with
    /// invalid names are skipped with a warning.
    pub fn import(&mut self, snapshot: &FlagSnapshot) {
        self.clear();
        for name in &snapshot.bools {
            self.add_bool(name);
        }
        for (name, value) in &snapshot.ints {
            self.set_int(name, *value);
        }
        for (name, value) in &snapshot.floats {
            self.set_float(name, *value);
        }
        for (name, value) in &snapshot.strings {
            self.set_string(name, value);
        }
    }

    /// Build a store from a snapshot, rejecting duplicate keys and invalid names.
    ///
    /// # Errors
    /// - `SnapshotError::DuplicateKey` if a name appears twice in one namespace
    /// - `SnapshotError::InvalidFlagName` if a name contains a comparison operator
    pub fn try_import(snapshot: &FlagSnapshot) -> Result<FlagStore, SnapshotError> {
        let mut store = FlagStore::new();
        for name in &snapshot.bools {
            let key = strict_name("bool", name)?;
            if !store.bools.insert(key.to_string()) {
                return Err(duplicate("bool", key));
            }
        }
        for (name, value) in &snapshot.ints {
            let key = strict_name("int", name)?;
            if store.ints.insert(key.to_string(), *value).is_some() {
                return Err(duplicate("int", key));
            }
        }
        for (name, value) in &snapshot.floats {
            let key = strict_name("float", name)?;
            if store.floats.insert(key.to_string(), *value).is_some() {
                return Err(duplicate("float", key));
            }
        }
        for (name, value) in &snapshot.strings {
            let key = strict_name("string", name)?;
            if store
                .strings
                .insert(key.to_string(), value.trim().to_string())
                .is_some()
            {
                return Err(duplicate("string", key));
            }
        }
        Ok(store)
    }
}

fn strict_name<'a>(namespace: &'static str, name: &'a str) -> Result<&'a str, SnapshotError> {
    let key = name.trim();
    if is_valid_flag_name(key) {
        Ok(key)
    } else {
        Err(SnapshotError::InvalidFlagName {
            namespace,
            key: key.to_string(),
        })
    }
}

fn duplicate(namespace: &'static str, key: &str) -> SnapshotError {
    SnapshotError::DuplicateKey {
        namespace,
        key: key.to_string(),
    }
}

impl FlagLookup for FlagStore {
    fn has_flag(&self, expr: &str) -> bool {
        FlagStore::has_flag(self, expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        let mut store = FlagStore::new();
        assert!(store.add_bool("  metHero "));
        assert!(store.has_bool("metHero"));
        assert!(store.has_flag(" metHero"));
        store.remove_bool("metHero  ");
        assert!(!store.has_bool("metHero"));
    }

    #[test]
    fn invalid_names_are_rejected_without_mutation() {
        let mut store = FlagStore::new();
        assert!(!store.add_bool("a=b"));
        assert!(!store.set_int("x<y", 1));
        assert!(!store.set_float("!f", 1.0));
        assert!(!store.set_string("s>", "v"));
        assert!(!store.add_to_int("g=", 2));
        assert!(store.is_empty());
    }

    #[test]
    fn add_to_int_initializes_missing_flag() {
        let mut store = FlagStore::new();
        assert!(store.add_to_int("gold", 10));
        assert_eq!(store.get_int("gold"), Some(10));
        assert!(store.add_to_int("gold", 5));
        assert_eq!(store.get_int("gold"), Some(15));
    }

    #[test]
    fn add_to_float_initializes_missing_flag() {
        let mut store = FlagStore::new();
        store.add_to_float("trust", 0.5);
        store.add_to_float("trust", 0.25);
        assert_eq!(store.get_float("trust"), Some(0.75));
    }

    #[test]
    fn string_values_are_trimmed() {
        let mut store = FlagStore::new();
        store.set_string("mood", "  grumpy ");
        assert_eq!(store.get_string("mood"), Some("grumpy"));
    }

    #[test]
    fn namespaces_are_independent() {
        let mut store = FlagStore::new();
        store.add_bool("door");
        store.set_int("door", 2);
        store.set_string("door", "open");
        assert!(store.has_flag("door"));
        assert!(store.has_flag("door=2"));
        assert!(store.has_flag("door=open"));
        store.remove_int("door");
        assert!(!store.has_flag("door=2"));
        assert!(store.has_flag("door"));
    }

    #[test]
    fn export_import_round_trip() {
        let mut store = FlagStore::new();
        store.add_bool("metHero");
        store.add_bool("sawDragon");
        store.set_int("gold", 42);
        store.set_float("trust", 0.5);
        store.set_string("mood", "calm");

        let snapshot = store.export();
        assert_eq!(snapshot.bools, vec!["metHero".to_string(), "sawDragon".to_string()]);

        let mut restored = FlagStore::new();
        restored.set_int("stale", 1);
        restored.import(&snapshot);
        assert_eq!(restored, store);
        assert_eq!(restored.get_int("stale"), None);
    }

    #[test]
    fn import_duplicate_keys_last_wins() {
        let snapshot = FlagSnapshot {
            ints: vec![("gold".into(), 1), ("gold".into(), 7)],
            ..FlagSnapshot::default()
        };
        let mut store = FlagStore::new();
        store.import(&snapshot);
        assert_eq!(store.get_int("gold"), Some(7));
    }

    #[test]
    fn try_import_rejects_duplicates_and_bad_names() {
        let dupes = FlagSnapshot {
            strings: vec![("mood".into(), "a".into()), (" mood".into(), "b".into())],
            ..FlagSnapshot::default()
        };
        assert_eq!(
            FlagStore::try_import(&dupes),
            Err(SnapshotError::DuplicateKey {
                namespace: "string",
                key: "mood".into()
            })
        );

        let bad = FlagSnapshot {
            bools: vec!["a>b".into()],
            ..FlagSnapshot::default()
        };
        assert!(matches!(
            FlagStore::try_import(&bad),
            Err(SnapshotError::InvalidFlagName { namespace: "bool", .. })
        ));

        let good = FlagSnapshot {
            bools: vec!["ok".into()],
            floats: vec![("f".into(), 1.5)],
            ..FlagSnapshot::default()
        };
        let store = FlagStore::try_import(&good).expect("valid snapshot");
        assert!(store.has_bool("ok"));
        assert_eq!(store.get_float("f"), Some(1.5));
    }
}

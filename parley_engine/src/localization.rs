//! Localization -- translating display strings before they are presented.
//!
//! Authored text doubles as the lookup key: a node's line, a choice's prompt
//! or a speaker's name is resolved as an entry in its referenced table.
//! Resolution never stops a dialogue. Failures fall back to the untranslated
//! entry and log a diagnostic.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use thiserror::Error;

/// Why a string could not be translated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocalizationError {
    #[error("localization table '{0}' could not be found")]
    MissingTable(String),
    #[error("entry '{entry}' is missing from localization table '{table}'")]
    MissingEntry { table: String, entry: String },
}

/// Resolves an entry from a named localization table.
pub trait Localizer {
    /// Translate `entry` using `table`.
    ///
    /// # Errors
    /// - if the table or the entry does not exist
    fn resolve(&self, table: &str, entry: &str) -> Result<String, LocalizationError>;
}

/// Localizer that returns every entry unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Localizer for PassThrough {
    fn resolve(&self, _table: &str, entry: &str) -> Result<String, LocalizationError> {
        Ok(entry.to_string())
    }
}

/// Localizer backed by in-memory tables, usually loaded from TOML files.
#[derive(Debug, Clone, Default)]
pub struct TableLocalizer {
    tables: HashMap<String, HashMap<String, String>>,
}

impl TableLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&mut self, name: impl Into<String>, entries: HashMap<String, String>) {
        self.tables.insert(name.into(), entries);
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Load every `*.toml` file in `dir` as a table named after the file stem.
    ///
    /// # Errors
    /// - if the directory cannot be read or a table file fails to parse
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut localizer = Self::new();
        for entry in fs::read_dir(dir).with_context(|| format!("reading localization tables in {}", dir.display()))? {
            let path = entry
                .with_context(|| format!("enumerating {}", dir.display()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let entries: HashMap<String, String> =
                toml::from_str(&raw).with_context(|| format!("parsing localization table {}", path.display()))?;
            info!("localization table '{name}' loaded with {} entries", entries.len());
            localizer.insert_table(name, entries);
        }
        Ok(localizer)
    }
}

impl Localizer for TableLocalizer {
    fn resolve(&self, table: &str, entry: &str) -> Result<String, LocalizationError> {
        let entries = self
            .tables
            .get(table)
            .ok_or_else(|| LocalizationError::MissingTable(table.to_string()))?;
        entries
            .get(entry)
            .cloned()
            .ok_or_else(|| LocalizationError::MissingEntry {
                table: table.to_string(),
                entry: entry.to_string(),
            })
    }
}

/// Resolve display text, falling back to `entry` when no table is set or lookup fails.
pub fn localize(localizer: &dyn Localizer, table: Option<&str>, entry: &str) -> String {
    let Some(table) = table.map(str::trim).filter(|t| !t.is_empty()) else {
        return entry.to_string();
    };
    match localizer.resolve(table, entry) {
        Ok(text) => text,
        Err(err) => {
            warn!("{err}; showing untranslated text");
            entry.to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localizer() -> TableLocalizer {
        let mut loc = TableLocalizer::new();
        loc.insert_table(
            "greetings",
            HashMap::from([("Hello".to_string(), "Bonjour".to_string())]),
        );
        loc
    }

    #[test]
    fn resolves_known_entries() {
        assert_eq!(localize(&localizer(), Some("greetings"), "Hello"), "Bonjour");
    }

    #[test]
    fn falls_back_to_entry_key() {
        let loc = localizer();
        assert_eq!(localize(&loc, Some("farewells"), "Bye"), "Bye");
        assert_eq!(localize(&loc, Some("greetings"), "Howdy"), "Howdy");
        assert_eq!(localize(&loc, None, "Hello"), "Hello");
        assert_eq!(localize(&loc, Some("  "), "Hello"), "Hello");
    }

    #[test]
    fn reports_missing_table_and_entry() {
        let loc = localizer();
        assert_eq!(
            loc.resolve("nope", "Hello"),
            Err(LocalizationError::MissingTable("nope".into()))
        );
        assert!(matches!(
            loc.resolve("greetings", "Howdy"),
            Err(LocalizationError::MissingEntry { .. })
        ));
    }

    #[test]
    fn pass_through_returns_entry() {
        assert_eq!(localize(&PassThrough, Some("any"), "Hello"), "Hello");
    }

    #[test]
    fn loads_tables_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("npc.toml"), "\"Hello\" = \"Hola\"\nbye = \"adios\"\n").expect("write table");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write note");
        let loc = TableLocalizer::load_dir(dir.path()).expect("load tables");
        assert_eq!(loc.table_count(), 1);
        assert_eq!(loc.resolve("npc", "Hello").as_deref(), Ok("Hola"));
        assert_eq!(loc.resolve("npc", "bye").as_deref(), Ok("adios"));
    }
}

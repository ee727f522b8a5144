//! Flag save files.
//!
//! A save captures the flag store (plus the trigger of the dialogue that was
//! open, if any) as RON under `<slot>-parley-<version>.ron`. Dialogue position
//! is not saved; loading restores world state only.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use log::{info, warn};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::PARLEY_VERSION;
use crate::flags::{FlagSnapshot, FlagStore};
use crate::slug::sanitize_slug;

const SLOT_SEPARATOR: &str = "-parley-";

/// On-disk save document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: String,
    #[serde(default)]
    pub saved_at_trigger: Option<String>,
    pub flags: FlagSnapshot,
}

impl SaveFile {
    pub fn new(flags: &FlagStore, trigger: Option<&str>) -> Self {
        Self {
            version: PARLEY_VERSION.to_string(),
            saved_at_trigger: trigger.map(str::to_string),
            flags: flags.export(),
        }
    }

    pub fn status(&self) -> SaveFileStatus {
        if self.version == PARLEY_VERSION {
            SaveFileStatus::Ready
        } else {
            SaveFileStatus::VersionMismatch {
                save_version: self.version.clone(),
                current_version: PARLEY_VERSION.to_string(),
            }
        }
    }

    /// Rebuild a flag store from the saved snapshot.
    ///
    /// # Errors
    /// - if the snapshot holds duplicate keys or invalid flag names
    pub fn restore(&self) -> Result<FlagStore> {
        FlagStore::try_import(&self.flags).context("restoring flags from save file")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlot {
    pub slot: String,
    pub version: String,
    pub path: PathBuf,
    pub file_name: String,
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFileStatus {
    Ready,
    VersionMismatch { save_version: String, current_version: String },
    Corrupted { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFileEntry {
    pub slot: String,
    pub version: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub saved_at_trigger: Option<String>,
    pub flag_count: usize,
    pub status: SaveFileStatus,
}

/// File name used for `slot` by this version of the engine.
pub fn save_file_name(slot: &str) -> String {
    format!("{}{SLOT_SEPARATOR}{PARLEY_VERSION}.ron", sanitize_slug(slot))
}

/// Write the flag store to `dir` under `slot`, creating the directory if needed.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn write_save(dir: &Path, slot: &str, flags: &FlagStore, trigger: Option<&str>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating save directory {}", dir.display()))?;
    let save = SaveFile::new(flags, trigger);
    let text = ron::ser::to_string_pretty(&save, PrettyConfig::default()).context("serializing save file")?;
    let path = dir.join(save_file_name(slot));
    fs::write(&path, text).with_context(|| format!("writing save file {}", path.display()))?;
    info!("flags saved to '{}'", path.display());
    Ok(path)
}

/// Load a save file from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or deserialized.
pub fn load_save(path: &Path) -> Result<SaveFile> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading save file {}", path.display()))?;
    ron::from_str::<SaveFile>(&raw).with_context(|| format!("parsing save file {}", path.display()))
}

/// Discover save slot files stored in `dir`.
///
/// # Errors
/// Returns an error if the directory contents cannot be read or enumerated.
pub fn collect_save_slots(dir: &Path) -> Result<Vec<SaveSlot>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut slots = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry.with_context(|| format!("enumerating {}", dir.display()))?;
        if let Some(slot) = slot_from_entry(&entry) {
            slots.push(slot);
        }
    }
    slots.sort_by(|a, b| a.slot.cmp(&b.slot).then(a.version.cmp(&b.version)));
    Ok(slots)
}

/// Find the save for `slot`, preferring one written by this version.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn find_save_slot(dir: &Path, slot: &str) -> Result<Option<SaveSlot>> {
    let wanted = sanitize_slug(slot);
    let mut matching: Vec<_> = collect_save_slots(dir)?
        .into_iter()
        .filter(|s| s.slot == wanted)
        .collect();
    if let Some(pos) = matching.iter().position(|s| s.version == PARLEY_VERSION) {
        return Ok(Some(matching.swap_remove(pos)));
    }
    Ok(matching.pop())
}

/// Build descriptive entries for save files located in `dir`, newest first.
///
/// # Errors
/// Returns an error if reading the directory fails.
pub fn build_save_entries(dir: &Path) -> Result<Vec<SaveFileEntry>> {
    let slots = collect_save_slots(dir)?;
    let mut entries: Vec<_> = slots.into_iter().map(entry_for_slot).collect();
    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.slot.cmp(&b.slot)));
    Ok(entries)
}

/// Format a human-friendly modified time relative to now.
pub fn format_modified(modified: SystemTime) -> String {
    match SystemTime::now().duration_since(modified) {
        Ok(delta) => format_duration(delta),
        Err(_) => "in the future".to_string(),
    }
}

fn entry_for_slot(slot: SaveSlot) -> SaveFileEntry {
    let (version, saved_at_trigger, flag_count, status) = match load_save(&slot.path) {
        Ok(save) => {
            let flags = &save.flags;
            let count = flags.bools.len() + flags.ints.len() + flags.floats.len() + flags.strings.len();
            let status = save.status();
            (save.version, save.saved_at_trigger, count, status)
        },
        Err(err) => {
            warn!("failed to load save '{}' ({}): {err:#}", slot.slot, slot.path.display());
            let status = SaveFileStatus::Corrupted {
                message: trim_error(&format!("{err:#}")),
            };
            (slot.version.clone(), None, 0, status)
        },
    };

    SaveFileEntry {
        slot: slot.slot,
        version,
        path: slot.path,
        modified: slot.modified,
        saved_at_trigger,
        flag_count,
        status,
    }
}

fn slot_from_entry(entry: &fs::DirEntry) -> Option<SaveSlot> {
    let path = entry.path();
    if !path.is_file() {
        return None;
    }
    if path.extension().and_then(|ext| ext.to_str()) != Some("ron") {
        return None;
    }
    let file_name = path.file_name().and_then(|name| name.to_str())?.to_string();
    let stem = path.file_stem().and_then(|stem| stem.to_str())?;
    let (slot, version) = stem.rsplit_once(SLOT_SEPARATOR)?;
    if slot.is_empty() {
        return None;
    }
    let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
    Some(SaveSlot {
        slot: slot.to_string(),
        version: version.to_string(),
        path,
        file_name,
        modified,
    })
}

/// Convert a duration into a compact "time ago" string.
fn format_duration(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = MINUTE * 60;
    const DAY: u64 = HOUR * 24;
    const WEEK: u64 = DAY * 7;

    let secs = duration.as_secs();
    if secs < 30 {
        "just now".to_string()
    } else if secs < MINUTE {
        format!("{secs}s ago")
    } else if secs < HOUR {
        format!("{}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < WEEK {
        format!("{}d ago", secs / DAY)
    } else {
        format!("{}w ago", secs / WEEK)
    }
}

/// Clamp verbose error messages to a readable length.
fn trim_error(message: &str) -> String {
    if message.chars().count() <= 120 {
        return message.to_string();
    }
    let mut trimmed: String = message.chars().take(117).collect();
    trimmed.push_str("...");
    trimmed
}

#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const PARLEY_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Developer commands that write flags directly are only accepted in `dev-mode` builds.
pub const DEV_MODE: bool = cfg!(feature = "dev-mode");

// Core modules
pub mod condition;
pub mod effect;
pub mod expr;
pub mod flags;
pub mod graph;
pub mod localization;
pub mod session;

// Loading, persistence and the terminal driver
pub mod command;
pub mod config;
pub mod data_paths;
pub mod loader;
pub mod repl;
pub mod save_files;
pub mod slug;
pub mod style;
pub mod view;

// Re-exports for convenience
pub use condition::{ConditionError, MAX_CONDITION_DEPTH, evaluate, try_evaluate};
pub use effect::Effect;
pub use flags::{FlagLookup, FlagSnapshot, FlagStore};
pub use graph::{ChoiceId, DialogueChoice, DialogueGraph, DialogueNode, NodeId, Speaker, SpeakerId, TriggerMap};
pub use loader::{build_graph, load_graph};
pub use localization::{Localizer, PassThrough, TableLocalizer};
pub use repl::run_repl;
pub use session::{DialogueEvent, DialogueSession, PresentationSink, SessionError, SessionState};

#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Parley **
//! Play through branching dialogue from the terminal.

use std::env;

use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};

use parley_engine::config::{CONFIG_FILE, load_config};
use parley_engine::data_paths::data_path;
use parley_engine::localization::{Localizer, PassThrough, TableLocalizer};
use parley_engine::{PARLEY_VERSION, load_graph, run_repl};

fn main() -> Result<()> {
    env_logger::init();
    let opening = env::args().nth(1);

    info!("Start: loading parley v{PARLEY_VERSION}...");
    let config = load_config(&data_path(CONFIG_FILE));
    let dialogue_path = config.dialogue_path();
    let graph = load_graph(&dialogue_path)
        .with_context(|| format!("while loading dialogue from '{}'", dialogue_path.display()))?;

    let tables;
    let localizer: &dyn Localizer = if config.localization.enabled {
        let tables_path = config.tables_path();
        match TableLocalizer::load_dir(&tables_path) {
            Ok(loaded) => {
                info!("{} localization tables loaded", loaded.table_count());
                tables = loaded;
                &tables
            },
            Err(err) => {
                warn!("localization disabled: {err:#}");
                &PassThrough
            },
        }
    } else {
        &PassThrough
    };

    println!("{}", format!("PARLEY v{PARLEY_VERSION}").bright_yellow().underline());
    println!("Type 'triggers' to see who is ready to talk, or 'help' for commands.");

    run_repl(
        &graph,
        localizer,
        config.save_dir.clone(),
        config.history,
        opening.as_deref(),
    )
}

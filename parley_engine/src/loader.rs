//! Loader utilities for building a `DialogueGraph` from serialized data.
//!
//! Dialogue content is authored as a RON `DialogueDef`. It is validated as a
//! whole, then converted into the arena-based runtime graph with every string
//! reference resolved to a typed id.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};
use parley_data::{ChoiceDef, DialogueDef, NodeDef, SpeakerDef, ValidationError};

use crate::effect::Effect;
use crate::graph::{ChoiceId, DialogueChoice, DialogueGraph, DialogueNode, NodeId, Speaker, SpeakerId};

/// Authored string ids mapped onto the runtime ids assigned while building.
#[derive(Debug, Default)]
pub struct SymbolTable {
    speakers: HashMap<String, SpeakerId>,
    nodes: HashMap<String, NodeId>,
    choices: HashMap<String, ChoiceId>,
}

impl SymbolTable {
    pub fn speaker(&self, symbol: &str) -> Result<SpeakerId> {
        self.speakers
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("unknown speaker '{symbol}'"))
    }

    pub fn node(&self, symbol: &str) -> Result<NodeId> {
        self.nodes
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("unknown node '{symbol}'"))
    }

    pub fn choice(&self, symbol: &str) -> Result<ChoiceId> {
        self.choices
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("unknown choice '{symbol}'"))
    }
}

/// Load a `DialogueDef` from a RON file.
///
/// # Errors
/// - if the file cannot be read or is not valid RON for a `DialogueDef`
pub fn load_dialogue_def(path: &Path) -> Result<DialogueDef> {
    let text = fs::read_to_string(path).with_context(|| format!("reading dialogue from '{}'", path.display()))?;
    ron::from_str(&text).with_context(|| format!("parsing dialogue RON from '{}'", path.display()))
}

/// Load, validate and build a dialogue graph from a RON file.
///
/// # Errors
/// Errors bubble up from file IO, deserialization, validation, or reference resolution.
pub fn load_graph(path: &Path) -> Result<DialogueGraph> {
    let def = load_dialogue_def(path).context("while loading dialogue definition")?;
    let graph = build_graph(&def).context("while building dialogue graph")?;
    info!(
        "dialogue graph loaded from '{}': {} speakers, {} nodes, {} choices, {} triggers",
        path.display(),
        graph.speaker_count(),
        graph.node_count(),
        graph.choice_count(),
        graph.triggers().len()
    );
    Ok(graph)
}

/// Validate the definition and return a single aggregated error.
/// Non-fatal findings are logged and do not stop the load.
///
/// # Errors
/// - lists every fatal problem found, one per line
pub fn validate_def(def: &DialogueDef) -> Result<()> {
    let (errors, notes): (Vec<_>, Vec<_>) = parley_data::validate_dialogue(def)
        .into_iter()
        .partition(ValidationError::is_fatal);
    for note in &notes {
        warn!("dialogue validation: {note}");
    }
    if errors.is_empty() {
        return Ok(());
    }
    let details = errors
        .into_iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("dialogue validation failed:\n{details}");
}

/// Convert a `DialogueDef` into a runtime `DialogueGraph`.
///
/// # Errors
/// - if the definition fails validation
pub fn build_graph(def: &DialogueDef) -> Result<DialogueGraph> {
    validate_def(def)?;

    let mut graph = DialogueGraph::new();
    let mut symbols = SymbolTable::default();

    for speaker_def in &def.speakers {
        let id = graph.add_speaker(speaker_from_def(speaker_def));
        symbols.speakers.insert(speaker_def.id.clone(), id);
    }
    // nodes first, so choice targets (including back-edges) can resolve
    for node_def in &def.nodes {
        let id = graph.add_node(node_from_def(node_def, &symbols)?);
        symbols.nodes.insert(node_def.id.clone(), id);
    }
    for choice_def in &def.choices {
        let choice = choice_from_def(choice_def, &symbols)
            .with_context(|| format!("while building choice '{}'", choice_def.id))?;
        let id = graph.add_choice(choice);
        symbols.choices.insert(choice_def.id.clone(), id);
    }
    for node_def in &def.nodes {
        let node_id = symbols.node(&node_def.id)?;
        for choice_symbol in &node_def.choices {
            graph.attach_choice(node_id, symbols.choice(choice_symbol)?);
        }
    }
    for trigger in &def.triggers {
        let node = trigger.node.as_deref().map(|n| symbols.node(n)).transpose()?;
        graph.add_trigger(trigger.trigger.trim(), node);
    }
    graph.triggers().initialize();

    Ok(graph)
}

fn speaker_from_def(def: &SpeakerDef) -> Speaker {
    Speaker {
        symbol: def.id.clone(),
        name: def.name.clone(),
        portrait: def.portrait.clone(),
        table: def.table.clone(),
    }
}

fn node_from_def(def: &NodeDef, symbols: &SymbolTable) -> Result<DialogueNode> {
    Ok(DialogueNode {
        symbol: def.id.clone(),
        speaker: def.speaker.as_deref().map(|s| symbols.speaker(s)).transpose()?,
        text: def.text.clone(),
        table: def.table.clone(),
        choices: Vec::new(),
    })
}

fn choice_from_def(def: &ChoiceDef, symbols: &SymbolTable) -> Result<DialogueChoice> {
    Ok(DialogueChoice {
        symbol: def.id.clone(),
        prompt: def.prompt.clone(),
        table: def.table.clone(),
        target: def.target.as_deref().map(|t| symbols.node(t)).transpose()?,
        visible: def.visible.clone(),
        unlocked: def.unlocked.clone(),
        effects: def.effects.iter().map(Effect::from_def).collect::<Result<Vec<_>>>()?,
    })
}

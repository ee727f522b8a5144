//! Dialogue graph -- the static, author-time structure a session walks.
//!
//! Speakers, nodes and choices live in flat arenas and refer to each other by
//! index ([`SpeakerId`], [`NodeId`], [`ChoiceId`]). Cycles and back-edges are
//! plain id-to-id edges, so a graph may loop back on itself freely.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{self, Display};
use std::sync::OnceLock;

use log::{info, warn};
use parley_data::ConditionGroup;
use serde::{Deserialize, Serialize};

use crate::effect::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeakerId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChoiceId(pub usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "choice#{}", self.0)
    }
}

/// A character who speaks lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Speaker {
    pub symbol: String,
    pub name: String,
    pub portrait: String,
    pub table: Option<String>,
}

/// One line of dialogue and its outgoing choices.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueNode {
    pub symbol: String,
    pub speaker: Option<SpeakerId>,
    pub text: String,
    pub table: Option<String>,
    pub choices: Vec<ChoiceId>,
}

impl DialogueNode {
    pub fn new(symbol: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            speaker: None,
            text: text.into(),
            table: None,
            choices: Vec::new(),
        }
    }

    pub fn with_speaker(mut self, speaker: SpeakerId) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// A node with no outgoing choices ends the dialogue after its line.
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty()
    }
}

/// An edge from one node to another, gated by conditions and carrying effects.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueChoice {
    pub symbol: String,
    pub prompt: String,
    pub table: Option<String>,
    pub target: Option<NodeId>,
    pub visible: Option<ConditionGroup>,
    pub unlocked: Option<ConditionGroup>,
    pub effects: Vec<Effect>,
}

impl DialogueChoice {
    pub fn new(symbol: impl Into<String>, prompt: impl Into<String>, target: Option<NodeId>) -> Self {
        Self {
            symbol: symbol.into(),
            prompt: prompt.into(),
            table: None,
            target,
            visible: None,
            unlocked: None,
            effects: Vec::new(),
        }
    }

    pub fn with_visible(mut self, group: ConditionGroup) -> Self {
        self.visible = Some(group);
        self
    }

    pub fn with_unlocked(mut self, group: ConditionGroup) -> Self {
        self.unlocked = Some(group);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// Maps trigger names onto start nodes.
///
/// The authored entries are kept in order; the lookup table is built on first
/// use and cached until the entries change.
#[derive(Debug, Clone, Default)]
pub struct TriggerMap {
    entries: Vec<(String, Option<NodeId>)>,
    lookup: OnceLock<HashMap<String, NodeId>>,
}

impl TriggerMap {
    pub fn new(entries: Vec<(String, Option<NodeId>)>) -> Self {
        Self {
            entries,
            lookup: OnceLock::new(),
        }
    }

    /// Append an entry, discarding any cached lookup table.
    pub fn push(&mut self, trigger: impl Into<String>, node: Option<NodeId>) {
        self.entries.push((trigger.into(), node));
        self.lookup = OnceLock::new();
    }

    /// Build the lookup table if it hasn't been built yet.
    pub fn initialize(&self) {
        self.table();
    }

    /// Start node for `trigger`, if the trigger exists and points at a node.
    pub fn get_start(&self, trigger: &str) -> Option<NodeId> {
        self.table().get(trigger.trim()).copied()
    }

    /// Authored trigger names, in authored order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn table(&self) -> &HashMap<String, NodeId> {
        self.lookup.get_or_init(|| build_trigger_table(&self.entries))
    }
}

fn build_trigger_table(entries: &[(String, Option<NodeId>)]) -> HashMap<String, NodeId> {
    let mut table = HashMap::with_capacity(entries.len());
    for (raw, node) in entries {
        let name = raw.trim();
        if name.is_empty() {
            warn!("skipping trigger with an empty name");
            continue;
        }
        let Some(node) = node else {
            warn!("trigger '{name}' is not associated with a dialogue node");
            continue;
        };
        match table.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(*node);
            },
            Entry::Occupied(_) => warn!("duplicate trigger '{name}' ignored; keeping the first entry"),
        }
    }
    info!("trigger map initialized with {} entries", table.len());
    table
}

/// Complete, immutable-once-built dialogue content.
#[derive(Debug, Clone, Default)]
pub struct DialogueGraph {
    speakers: Vec<Speaker>,
    nodes: Vec<DialogueNode>,
    choices: Vec<DialogueChoice>,
    triggers: TriggerMap,
}

impl DialogueGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_speaker(&mut self, speaker: Speaker) -> SpeakerId {
        self.speakers.push(speaker);
        SpeakerId(self.speakers.len() - 1)
    }

    pub fn add_node(&mut self, node: DialogueNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_choice(&mut self, choice: DialogueChoice) -> ChoiceId {
        self.choices.push(choice);
        ChoiceId(self.choices.len() - 1)
    }

    /// Append `choice` to the outgoing choices of `node`. Returns false if `node` doesn't exist.
    pub fn attach_choice(&mut self, node: NodeId, choice: ChoiceId) -> bool {
        match self.nodes.get_mut(node.0) {
            Some(n) => {
                n.choices.push(choice);
                true
            },
            None => false,
        }
    }

    pub fn add_trigger(&mut self, trigger: impl Into<String>, node: Option<NodeId>) {
        self.triggers.push(trigger, node);
    }

    pub fn speaker(&self, id: SpeakerId) -> Option<&Speaker> {
        self.speakers.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&DialogueNode> {
        self.nodes.get(id.0)
    }

    pub fn choice(&self, id: ChoiceId) -> Option<&DialogueChoice> {
        self.choices.get(id.0)
    }

    pub fn triggers(&self) -> &TriggerMap {
        &self.triggers
    }

    /// Start node for a trigger name.
    pub fn start_for(&self, trigger: &str) -> Option<NodeId> {
        self.triggers.get_start(trigger)
    }

    /// Find a node by its authored symbol.
    pub fn find_node(&self, symbol: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.symbol == symbol).map(NodeId)
    }

    pub fn speaker_count(&self) -> usize {
        self.speakers.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_map_resolves_and_caches() {
        let mut map = TriggerMap::new(vec![("intro".into(), Some(NodeId(0))), ("outro".into(), Some(NodeId(3)))]);
        assert_eq!(map.get_start("intro"), Some(NodeId(0)));
        assert_eq!(map.get_start(" outro "), Some(NodeId(3)));
        assert_eq!(map.get_start("missing"), None);
        map.initialize();
        map.initialize();

        map.push("late", Some(NodeId(5)));
        assert_eq!(map.get_start("late"), Some(NodeId(5)));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn trigger_map_keeps_first_duplicate_and_skips_blank_entries() {
        let map = TriggerMap::new(vec![
            ("intro".into(), Some(NodeId(1))),
            ("intro".into(), Some(NodeId(2))),
            ("  ".into(), Some(NodeId(3))),
            ("orphan".into(), None),
        ]);
        assert_eq!(map.get_start("intro"), Some(NodeId(1)));
        assert_eq!(map.get_start("orphan"), None);
        assert_eq!(map.names().count(), 4);
    }

    #[test]
    fn graph_supports_cycles() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_node(DialogueNode::new("a", "A"));
        let b = graph.add_node(DialogueNode::new("b", "B"));
        let to_b = graph.add_choice(DialogueChoice::new("to_b", "", Some(b)));
        let to_a = graph.add_choice(DialogueChoice::new("to_a", "", Some(a)));
        assert!(graph.attach_choice(a, to_b));
        assert!(graph.attach_choice(b, to_a));

        assert_eq!(graph.choice(to_a).and_then(|c| c.target), Some(a));
        assert_eq!(graph.find_node("b"), Some(b));
        assert!(!graph.node(a).expect("node a").is_terminal());
        assert!(!graph.attach_choice(NodeId(99), to_a));
    }
}

use serde::{Deserialize, Serialize};

/// Stable identifier used across `DialogueDef` references.
pub type Id = String;

/// Top-level authored dialogue data loaded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DialogueDef {
    #[serde(default)]
    pub speakers: Vec<SpeakerDef>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub choices: Vec<ChoiceDef>,
    #[serde(default)]
    pub triggers: Vec<TriggerDef>,
}

/// A character who speaks dialogue lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerDef {
    pub id: Id,
    pub name: String,
    /// Opaque handle to a portrait asset, interpreted by the presentation layer.
    #[serde(default)]
    pub portrait: String,
    /// Localization table used to translate `name`.
    #[serde(default)]
    pub table: Option<String>,
}

/// One line of dialogue and the choices leading away from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: Id,
    #[serde(default)]
    pub speaker: Option<Id>,
    pub text: String,
    #[serde(default)]
    pub table: Option<String>,
    /// Outgoing choices, in the order they are offered.
    #[serde(default)]
    pub choices: Vec<Id>,
}

/// A player-selectable edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDef {
    pub id: Id,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub table: Option<String>,
    /// Node reached when this choice is taken. `None` ends the dialogue.
    #[serde(default)]
    pub target: Option<Id>,
    /// Gates whether the choice is offered at all.
    #[serde(default)]
    pub visible: Option<ConditionGroup>,
    /// Gates whether an offered choice can be selected.
    #[serde(default)]
    pub unlocked: Option<ConditionGroup>,
    #[serde(default)]
    pub effects: Vec<EffectDef>,
}

/// Named entry point into the dialogue graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDef {
    pub trigger: String,
    #[serde(default)]
    pub node: Option<Id>,
}

/// Deepest condition tree the engine will evaluate.
pub const MAX_CONDITION_DEPTH: usize = 64;

/// Boolean expression tree evaluated against the flag store.
///
/// `Value` leaves hold a flag expression such as `metHero` or `gold>=10`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionGroup {
    Value(String),
    And(Vec<ConditionGroup>),
    Or(Vec<ConditionGroup>),
    Not(Vec<ConditionGroup>),
}

impl ConditionGroup {
    pub fn value(expr: impl Into<String>) -> Self {
        Self::Value(expr.into())
    }

    pub fn not(inner: ConditionGroup) -> Self {
        Self::Not(vec![inner])
    }

    /// Nesting depth of the tree; a lone leaf has depth 1. Trees deeper than
    /// [`MAX_CONDITION_DEPTH`] are rejected by validation and by evaluation.
    pub fn depth(&self) -> usize {
        match self {
            Self::Value(_) => 1,
            Self::And(children) | Self::Or(children) | Self::Not(children) => {
                1 + children.iter().map(ConditionGroup::depth).max().unwrap_or(0)
            },
        }
    }
}

/// Namespace an effect writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagType {
    Bool,
    Int,
    Float,
    String,
}

/// Whether a numeric effect overwrites or accumulates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectOp {
    #[default]
    Set,
    Add,
}

/// Payload carried by an effect record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum EffectValue {
    #[default]
    None,
    Int(i32),
    Float(f32),
    Text(String),
}

/// Authored flag mutation applied when a choice is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDef {
    pub flag_type: FlagType,
    #[serde(default)]
    pub op: EffectOp,
    pub key: String,
    #[serde(default)]
    pub value: EffectValue,
}

impl EffectDef {
    /// Returns true if the value payload fits the declared flag type.
    /// Bool effects ignore their value entirely.
    pub fn value_matches_type(&self) -> bool {
        matches!(
            (self.flag_type, &self.value),
            (FlagType::Bool, _)
                | (FlagType::Int, EffectValue::Int(_))
                | (FlagType::Float, EffectValue::Float(_))
                | (FlagType::String, EffectValue::Text(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_nested_groups() {
        let group = ConditionGroup::And(vec![
            ConditionGroup::value("a"),
            ConditionGroup::Or(vec![ConditionGroup::not(ConditionGroup::value("b"))]),
        ]);
        assert_eq!(group.depth(), 4);
        assert_eq!(ConditionGroup::And(Vec::new()).depth(), 1);
    }

    #[test]
    fn effect_value_type_matching() {
        let int_ok = EffectDef {
            flag_type: FlagType::Int,
            op: EffectOp::Add,
            key: "gold".into(),
            value: EffectValue::Int(3),
        };
        assert!(int_ok.value_matches_type());

        let int_bad = EffectDef {
            value: EffectValue::Text("3".into()),
            ..int_ok.clone()
        };
        assert!(!int_bad.value_matches_type());

        let bool_any = EffectDef {
            flag_type: FlagType::Bool,
            op: EffectOp::Set,
            key: "metHero".into(),
            value: EffectValue::None,
        };
        assert!(bool_any.value_matches_type());
    }

    #[test]
    fn dialogue_def_parses_from_ron() {
        let src = r#"(
            speakers: [(id: "hero", name: "Hero")],
            nodes: [(id: "n0", speaker: Some("hero"), text: "Hello", choices: ["c0"])],
            choices: [(
                id: "c0",
                prompt: "Wave",
                target: None,
                visible: Some(and([value("metHero"), not([value("gold<5")])])),
                effects: [(flag_type: Int, op: Add, key: "gold", value: Int(2))],
            )],
            triggers: [(trigger: "intro", node: Some("n0"))],
        )"#;
        let def: DialogueDef = ron::from_str(src).expect("parse dialogue def");
        assert_eq!(def.nodes[0].choices, vec!["c0".to_string()]);
        assert_eq!(def.choices[0].effects[0].op, EffectOp::Add);
        assert!(matches!(def.choices[0].visible, Some(ConditionGroup::And(ref c)) if c.len() == 2));
    }
}

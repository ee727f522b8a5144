use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Characters that render invisibly or identically to ordinary text and make
/// trigger names hard to tell apart.
const DECEPTIVE_CHARS: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{00A0}', '\u{202F}', '\u{2060}', '\u{180E}', '\u{00AD}',
];

/// Characters reserved by the flag comparison grammar.
const OPERATOR_CHARS: &[char] = &['>', '<', '=', '!'];

/// Validation error for malformed or missing references in a `DialogueDef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingReference { kind: &'static str, id: String, context: String },
    InvalidValue { context: String },
    EmptyTrigger { index: usize },
    DuplicateTrigger { trigger: String },
    DeceptiveTrigger { trigger: String },
    ConditionTooDeep { context: String, depth: usize },
    /// A `not` group with extra children. Only the first child is evaluated,
    /// so the dialogue still loads.
    IgnoredNotChildren { context: String, count: usize },
}

impl ValidationError {
    /// Returns false for findings that are reported but do not block loading.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ValidationError::IgnoredNotChildren { .. })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
            ValidationError::EmptyTrigger { index } => {
                write!(f, "trigger #{index} has an empty name")
            },
            ValidationError::DuplicateTrigger { trigger } => {
                write!(f, "trigger '{trigger}' is defined more than once")
            },
            ValidationError::DeceptiveTrigger { trigger } => {
                write!(f, "trigger {trigger:?} contains invisible or control characters")
            },
            ValidationError::ConditionTooDeep { context, depth } => {
                write!(f, "{context}: condition nested {depth} levels deep (limit {MAX_CONDITION_DEPTH})")
            },
            ValidationError::IgnoredNotChildren { context, count } => {
                write!(f, "{context}: 'not' group has {count} children, only the first is evaluated")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Returns true if `name` can be stored as a flag. Names containing any of
/// `> < = !` would be ambiguous with comparison expressions.
pub fn is_valid_flag_name(name: &str) -> bool {
    !name.contains(OPERATOR_CHARS)
}

/// Returns true if `trigger` contains zero-width, non-breaking or control characters.
fn has_deceptive_chars(trigger: &str) -> bool {
    trigger
        .chars()
        .any(|ch| DECEPTIVE_CHARS.contains(&ch) || ch <= '\u{1F}' || ch == '\u{7F}')
}

/// Validate cross-references and basic invariants in a `DialogueDef`.
///
/// Every finding is returned. Callers decide which to enforce with
/// [`ValidationError::is_fatal`].
///
/// ```
/// use parley_data::{ChoiceDef, DialogueDef, NodeDef, TriggerDef, validate_dialogue};
///
/// let dialogue = DialogueDef {
///     nodes: vec![NodeDef {
///         id: "greet".into(),
///         speaker: None,
///         text: "Well met.".into(),
///         table: None,
///         choices: vec!["bye".into()],
///     }],
///     choices: vec![ChoiceDef {
///         id: "bye".into(),
///         prompt: "Farewell".into(),
///         table: None,
///         target: None,
///         visible: None,
///         unlocked: None,
///         effects: Vec::new(),
///     }],
///     triggers: vec![TriggerDef {
///         trigger: "intro".into(),
///         node: Some("greet".into()),
///     }],
///     ..DialogueDef::default()
/// };
/// assert!(validate_dialogue(&dialogue).is_empty());
/// ```
pub fn validate_dialogue(dialogue: &DialogueDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut speakers = HashSet::new();
    let mut nodes = HashSet::new();
    let mut choices = HashSet::new();

    track_ids(
        "speaker",
        dialogue.speakers.iter().map(|s| s.id.as_str()),
        &mut speakers,
        &mut errors,
    );
    track_ids(
        "node",
        dialogue.nodes.iter().map(|n| n.id.as_str()),
        &mut nodes,
        &mut errors,
    );
    track_ids(
        "choice",
        dialogue.choices.iter().map(|c| c.id.as_str()),
        &mut choices,
        &mut errors,
    );

    for node in &dialogue.nodes {
        if let Some(speaker) = &node.speaker {
            check_ref("speaker", speaker, &speakers, format!("node '{}'", node.id), &mut errors);
        }
        for choice in &node.choices {
            check_ref("choice", choice, &choices, format!("node '{}'", node.id), &mut errors);
        }
    }

    for choice in &dialogue.choices {
        let context = format!("choice '{}'", choice.id);
        if let Some(target) = &choice.target {
            check_ref("node", target, &nodes, context.clone(), &mut errors);
        }
        if let Some(group) = &choice.visible {
            validate_condition_tree(group, &format!("{context} visible"), &mut errors);
        }
        if let Some(group) = &choice.unlocked {
            validate_condition_tree(group, &format!("{context} unlocked"), &mut errors);
        }
        for effect in &choice.effects {
            validate_effect(effect, &context, &mut errors);
        }
    }

    validate_triggers(&dialogue.triggers, &nodes, &mut errors);

    errors
}

/// Trim trigger names and sort them ordinally. Equal names keep their relative order.
pub fn sort_triggers(triggers: &mut [TriggerDef]) {
    for trigger in triggers.iter_mut() {
        let trimmed = trigger.trigger.trim();
        if trimmed.len() != trigger.trigger.len() {
            trigger.trigger = trimmed.to_string();
        }
    }
    triggers.sort_by(|a, b| a.trigger.cmp(&b.trigger));
}

fn validate_triggers(triggers: &[TriggerDef], nodes: &HashSet<&str>, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for (index, entry) in triggers.iter().enumerate() {
        let trigger = entry.trigger.trim();
        if trigger.is_empty() {
            errors.push(ValidationError::EmptyTrigger { index });
            continue;
        }
        if !seen.insert(trigger) && !repeated.contains(&trigger) {
            repeated.push(trigger);
        }
        if has_deceptive_chars(trigger) {
            errors.push(ValidationError::DeceptiveTrigger {
                trigger: trigger.to_string(),
            });
        }
        match &entry.node {
            Some(node) => check_ref("node", node, nodes, format!("trigger '{trigger}'"), errors),
            None => errors.push(ValidationError::InvalidValue {
                context: format!("trigger '{trigger}' has no start node"),
            }),
        }
    }
    for trigger in repeated {
        errors.push(ValidationError::DuplicateTrigger {
            trigger: trigger.to_string(),
        });
    }
}

fn validate_condition_tree(group: &ConditionGroup, context: &str, errors: &mut Vec<ValidationError>) {
    let depth = group.depth();
    if depth > MAX_CONDITION_DEPTH {
        errors.push(ValidationError::ConditionTooDeep {
            context: context.to_string(),
            depth,
        });
    }
    validate_condition(group, context, errors);
}

fn validate_condition(group: &ConditionGroup, context: &str, errors: &mut Vec<ValidationError>) {
    match group {
        ConditionGroup::Value(_) => {},
        ConditionGroup::Not(children) if children.is_empty() => {
            errors.push(ValidationError::InvalidValue {
                context: format!("{context}: 'not' group has no child condition"),
            });
        },
        ConditionGroup::Not(children) => {
            if children.len() > 1 {
                errors.push(ValidationError::IgnoredNotChildren {
                    context: context.to_string(),
                    count: children.len(),
                });
            }
            validate_condition(&children[0], context, errors);
        },
        ConditionGroup::And(children) | ConditionGroup::Or(children) => {
            for child in children {
                validate_condition(child, context, errors);
            }
        },
    }
}

fn validate_effect(effect: &EffectDef, context: &str, errors: &mut Vec<ValidationError>) {
    let key = effect.key.trim();
    if key.is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: format!("{context}: effect has an empty flag key"),
        });
    } else if !is_valid_flag_name(key) {
        errors.push(ValidationError::InvalidValue {
            context: format!("{context}: flag key '{key}' contains a comparison operator"),
        });
    }
    if !effect.value_matches_type() {
        errors.push(ValidationError::InvalidValue {
            context: format!(
                "{context}: {:?} effect on '{key}' carries {:?}",
                effect.flag_type, effect.value
            ),
        });
    }
}

fn track_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    set: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    for id in ids {
        if !set.insert(id) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

fn check_ref(kind: &'static str, id: &str, set: &HashSet<&str>, context: String, errors: &mut Vec<ValidationError>) {
    if !set.contains(id) {
        errors.push(ValidationError::MissingReference {
            kind,
            id: id.to_string(),
            context,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, choices: &[&str]) -> NodeDef {
        NodeDef {
            id: id.into(),
            speaker: None,
            text: format!("line {id}"),
            table: None,
            choices: choices.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    fn choice(id: &str, target: Option<&str>) -> ChoiceDef {
        ChoiceDef {
            id: id.into(),
            prompt: format!("prompt {id}"),
            table: None,
            target: target.map(str::to_string),
            visible: None,
            unlocked: None,
            effects: Vec::new(),
        }
    }

    fn trigger(name: &str, node: &str) -> TriggerDef {
        TriggerDef {
            trigger: name.into(),
            node: Some(node.into()),
        }
    }

    fn base_dialogue() -> DialogueDef {
        DialogueDef {
            speakers: vec![SpeakerDef {
                id: "sage".into(),
                name: "Sage".into(),
                portrait: "sage.png".into(),
                table: None,
            }],
            nodes: vec![node("n0", &["c0"]), node("n1", &[])],
            choices: vec![choice("c0", Some("n1"))],
            triggers: vec![trigger("intro", "n0")],
        }
    }

    #[test]
    fn valid_dialogue_has_no_errors() {
        assert!(validate_dialogue(&base_dialogue()).is_empty());
    }

    #[test]
    fn detects_missing_references() {
        let mut dialogue = base_dialogue();
        dialogue.nodes[0].speaker = Some("ghost".into());
        dialogue.choices[0].target = Some("n9".into());
        let errors = validate_dialogue(&dialogue);
        assert!(errors.contains(&ValidationError::MissingReference {
            kind: "speaker",
            id: "ghost".into(),
            context: "node 'n0'".into(),
        }));
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::MissingReference { kind: "node", id, .. } if id == "n9")
        ));
    }

    #[test]
    fn detects_duplicate_ids() {
        let mut dialogue = base_dialogue();
        dialogue.choices.push(choice("c0", None));
        let errors = validate_dialogue(&dialogue);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateId {
                kind: "choice",
                id: "c0".into()
            }]
        );
    }

    #[test]
    fn detects_empty_and_duplicate_triggers() {
        let mut dialogue = base_dialogue();
        dialogue.triggers.push(trigger("   ", "n0"));
        dialogue.triggers.push(trigger(" intro ", "n1"));
        dialogue.triggers.push(trigger("intro", "n1"));
        let errors = validate_dialogue(&dialogue);
        assert!(errors.contains(&ValidationError::EmptyTrigger { index: 1 }));
        let dupes: Vec<_> = errors
            .iter()
            .filter(|e| matches!(e, ValidationError::DuplicateTrigger { .. }))
            .collect();
        assert_eq!(dupes.len(), 1);
    }

    #[test]
    fn detects_deceptive_trigger_names() {
        let mut dialogue = base_dialogue();
        dialogue.triggers.push(trigger("in\u{200B}tro", "n0"));
        dialogue.triggers.push(trigger("tab\tbed", "n0"));
        let errors = validate_dialogue(&dialogue);
        let deceptive = errors
            .iter()
            .filter(|e| matches!(e, ValidationError::DeceptiveTrigger { .. }))
            .count();
        assert_eq!(deceptive, 2);
    }

    #[test]
    fn detects_trigger_without_node() {
        let mut dialogue = base_dialogue();
        dialogue.triggers.push(TriggerDef {
            trigger: "dangling".into(),
            node: None,
        });
        let errors = validate_dialogue(&dialogue);
        assert!(matches!(&errors[..], [ValidationError::InvalidValue { context }] if context.contains("dangling")));
    }

    #[test]
    fn detects_empty_not_group_and_bad_effects() {
        let mut dialogue = base_dialogue();
        dialogue.choices[0].visible = Some(ConditionGroup::Or(vec![ConditionGroup::Not(Vec::new())]));
        dialogue.choices[0].effects = vec![
            EffectDef {
                flag_type: FlagType::Int,
                op: EffectOp::Set,
                key: "gold>3".into(),
                value: EffectValue::Int(1),
            },
            EffectDef {
                flag_type: FlagType::String,
                op: EffectOp::Set,
                key: "mood".into(),
                value: EffectValue::Float(1.0),
            },
        ];
        let errors = validate_dialogue(&dialogue);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn extra_not_children_are_not_fatal() {
        let mut dialogue = base_dialogue();
        dialogue.choices[0].unlocked = Some(ConditionGroup::Not(vec![
            ConditionGroup::value("x"),
            ConditionGroup::value("y"),
        ]));
        let errors = validate_dialogue(&dialogue);
        assert_eq!(
            errors,
            vec![ValidationError::IgnoredNotChildren {
                context: "choice 'c0' unlocked".into(),
                count: 2,
            }]
        );
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn detects_conditions_deeper_than_the_limit() {
        let mut deep = ConditionGroup::value("x");
        for _ in 0..MAX_CONDITION_DEPTH {
            deep = ConditionGroup::not(deep);
        }
        let mut dialogue = base_dialogue();
        dialogue.choices[0].visible = Some(deep.clone());
        let errors = validate_dialogue(&dialogue);
        assert_eq!(
            errors,
            vec![ValidationError::ConditionTooDeep {
                context: "choice 'c0' visible".into(),
                depth: MAX_CONDITION_DEPTH + 1,
            }]
        );
        assert!(errors[0].is_fatal());

        // exactly at the limit is fine
        let ConditionGroup::Not(children) = deep else {
            panic!("expected a not group");
        };
        dialogue.choices[0].visible = children.into_iter().next();
        assert!(validate_dialogue(&dialogue).is_empty());
    }

    #[test]
    fn flag_name_rules() {
        assert!(is_valid_flag_name("metHero"));
        assert!(is_valid_flag_name("has spaces"));
        assert!(!is_valid_flag_name("a=b"));
        assert!(!is_valid_flag_name("!x"));
    }

    #[test]
    fn sort_triggers_trims_and_orders() {
        let mut triggers = vec![trigger(" beta", "n1"), trigger("Alpha ", "n0"), trigger("alpha", "n2")];
        sort_triggers(&mut triggers);
        let names: Vec<_> = triggers.iter().map(|t| t.trigger.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "alpha", "beta"]);
        assert_eq!(triggers[0].node.as_deref(), Some("n0"));
    }
}

//! Command module
//!
//! Describes the commands understood by the `parley` REPL.
use variantly::Variantly;

use crate::DEV_MODE;
use crate::expr::parse_float_literal;
use crate::flags::FlagStore;

/// Commands that can be entered at the prompt.
#[derive(Debug, Clone, PartialEq, Variantly)]
pub enum Command {
    Advance,
    Close,
    Flags,
    Help,
    Load(String),
    ListSaves,
    Quit,
    Save(String),
    /// 1-based position in the offered choice list.
    Select(usize),
    Set(FlagAssignment),
    Talk(String),
    Triggers,
    Unknown,
    Unset(String),
}

impl Command {
    /// Commands that bypass choice effects to write flags directly.
    pub fn is_dev_only(&self) -> bool {
        matches!(self, Command::Set(_) | Command::Unset(_))
    }
}

/// A flag write typed at the prompt: `name`, `name=12`, `name=0.5` or `name=text`.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagAssignment {
    Bool(String),
    Int(String, i32),
    Float(String, f32),
    Text(String, String),
}

impl FlagAssignment {
    /// Parse an assignment. Returns `None` for an empty name or more than one `=`.
    pub fn parse(input: &str) -> Option<FlagAssignment> {
        let input = input.trim();
        let Some((name, value)) = input.split_once('=') else {
            return (!input.is_empty()).then(|| FlagAssignment::Bool(input.to_string()));
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.contains('=') {
            return None;
        }
        let name = name.to_string();
        if let Ok(int) = value.parse::<i32>() {
            Some(FlagAssignment::Int(name, int))
        } else if let Some(float) = parse_float_literal(value) {
            Some(FlagAssignment::Float(name, float))
        } else {
            Some(FlagAssignment::Text(name, value.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FlagAssignment::Bool(name)
            | FlagAssignment::Int(name, _)
            | FlagAssignment::Float(name, _)
            | FlagAssignment::Text(name, _) => name,
        }
    }

    /// Write the assignment into the store. Returns false if the name was rejected.
    pub fn apply(&self, flags: &mut FlagStore) -> bool {
        match self {
            FlagAssignment::Bool(name) => flags.add_bool(name),
            FlagAssignment::Int(name, value) => flags.set_int(name, *value),
            FlagAssignment::Float(name, value) => flags.set_float(name, *value),
            FlagAssignment::Text(name, value) => flags.set_string(name, value),
        }
    }
}

/// Parses an input line and returns the corresponding `Command`.
pub fn parse_command(input: &str) -> Command {
    let words: Vec<&str> = input.split_whitespace().collect();
    match words.as_slice() {
        [] | ["next" | "n" | "continue"] => Command::Advance,
        [number] if number.parse::<usize>().is_ok() => number.parse().map_or(Command::Unknown, Command::Select),
        ["talk" | "start", trigger @ ..] if !trigger.is_empty() => Command::Talk(trigger.join(" ")),
        ["triggers"] => Command::Triggers,
        ["flags"] => Command::Flags,
        ["set", expr @ ..] => FlagAssignment::parse(&expr.join(" ")).map_or(Command::Unknown, Command::Set),
        ["unset", name] => Command::Unset((*name).to_string()),
        ["save", slot @ ..] if !slot.is_empty() => Command::Save(slot.join(" ")),
        ["load", slot @ ..] if !slot.is_empty() => Command::Load(slot.join(" ")),
        ["saves"] => Command::ListSaves,
        ["close" | "bye"] => Command::Close,
        ["help" | "?"] => Command::Help,
        ["quit" | "exit"] => Command::Quit,
        _ => Command::Unknown,
    }
}

/// Command words offered by tab completion.
pub const COMMAND_WORDS: &[&str] = &[
    "close", "continue", "exit", "flags", "help", "load", "next", "quit", "save", "saves", "start", "talk", "triggers",
];

/// Developer command words, completed only in `dev-mode` builds.
pub const DEV_COMMAND_WORDS: &[&str] = &["set", "unset"];

/// Every command word available in this build.
pub fn command_words() -> impl Iterator<Item = &'static str> {
    let dev: &[&str] = if DEV_MODE { DEV_COMMAND_WORDS } else { &[] };
    COMMAND_WORDS.iter().chain(dev).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_advances() {
        assert_eq!(parse_command(""), Command::Advance);
        assert_eq!(parse_command("   "), Command::Advance);
        assert_eq!(parse_command("next"), Command::Advance);
    }

    #[test]
    fn numbers_select_choices() {
        assert_eq!(parse_command(" 2 "), Command::Select(2));
        assert!(parse_command("-1").is_unknown());
    }

    #[test]
    fn multi_word_arguments_are_joined() {
        assert_eq!(parse_command("talk old   gate"), Command::Talk("old gate".into()));
        assert_eq!(parse_command("save before boss"), Command::Save("before boss".into()));
        assert!(parse_command("talk").is_unknown());
    }

    #[test]
    fn set_parses_typed_assignments() {
        assert_eq!(
            parse_command("set metHero"),
            Command::Set(FlagAssignment::Bool("metHero".into()))
        );
        assert_eq!(
            parse_command("set gold = 12"),
            Command::Set(FlagAssignment::Int("gold".into(), 12))
        );
        assert_eq!(
            parse_command("set trust=0.5"),
            Command::Set(FlagAssignment::Float("trust".into(), 0.5))
        );
        assert_eq!(
            parse_command("set mood=very calm"),
            Command::Set(FlagAssignment::Text("mood".into(), "very calm".into()))
        );
        assert_eq!(
            parse_command("set range=inf"),
            Command::Set(FlagAssignment::Text("range".into(), "inf".into()))
        );
        assert!(parse_command("set =3").is_unknown());
        assert!(parse_command("set a=b=c").is_unknown());
    }

    #[test]
    fn assignments_write_the_matching_namespace() {
        let mut flags = FlagStore::new();
        assert!(FlagAssignment::Int("gold".into(), 3).apply(&mut flags));
        assert!(FlagAssignment::Text("mood".into(), "calm".into()).apply(&mut flags));
        assert!(flags.has_flag("gold=3"));
        assert!(flags.has_flag("mood=calm"));
        assert!(!FlagAssignment::Bool("a<b".into()).apply(&mut flags));
    }

    #[test]
    fn flag_writes_are_dev_only() {
        assert!(parse_command("set gold=1").is_dev_only());
        assert!(parse_command("unset gold").is_dev_only());
        assert!(!parse_command("load slot").is_dev_only());
        assert_eq!(command_words().any(|w| w == "set"), DEV_MODE);
    }
}

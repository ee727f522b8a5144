//! View module.
//!
//! The terminal view is the REPL's presentation sink: dialogue events and
//! driver messages are queued while a command runs and printed together
//! when the command finishes.

use colored::Colorize;
use textwrap::fill;

use crate::DEV_MODE;
use crate::flags::FlagSnapshot;
use crate::save_files::{SaveFileEntry, SaveFileStatus, format_modified};
use crate::session::{ChoiceView, DialogueEvent, PresentationSink};
use crate::style::{DialogueStyle, indented_block, normal_block};

const ICON_LOCKED: &str = "\u{1F512}";
const ICON_ERROR: &str = "⚠︎";
const ICON_ENGINE: &str = "⚙";

/// One queued piece of output.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewItem {
    Dialogue(DialogueEvent),
    Notice(String),
    Error(String),
    Triggers(Vec<String>),
    Flags(FlagSnapshot),
    Saves(Vec<SaveFileEntry>),
    Help,
}

/// Aggregates output for one pass through the REPL.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub items: Vec<ViewItem>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ViewItem) {
        self.items.push(item);
    }

    /// Print and discard everything queued so far.
    pub fn flush(&mut self) {
        for item in self.items.drain(..) {
            render(&item);
        }
    }
}

impl PresentationSink for View {
    fn present(&mut self, event: DialogueEvent) {
        self.items.push(ViewItem::Dialogue(event));
    }
}

fn render(item: &ViewItem) {
    match item {
        ViewItem::Dialogue(event) => render_event(event),
        ViewItem::Notice(msg) => println!("{} {}", ICON_ENGINE, msg.notice_style()),
        ViewItem::Error(msg) => println!("{} {}", ICON_ERROR.red(), msg.error_style()),
        ViewItem::Triggers(names) => {
            println!("{}", "Triggers".subheading_style());
            if names.is_empty() {
                println!("    (none)");
            }
            for name in names {
                println!("    {}", name.choice_style());
            }
        },
        ViewItem::Flags(snapshot) => render_flags(snapshot),
        ViewItem::Saves(entries) => render_saves(entries),
        ViewItem::Help => render_help(),
    }
}

fn render_event(event: &DialogueEvent) {
    match event {
        DialogueEvent::LinePresented {
            speaker, portrait, text, ..
        } => {
            println!();
            match (speaker.is_empty(), portrait) {
                (false, Some(portrait)) => println!("{} {}", speaker.speaker_style(), portrait.portrait_style()),
                (false, None) => println!("{}", speaker.speaker_style()),
                (true, _) => {},
            }
            println!("{}", fill(text, normal_block()).line_style());
        },
        DialogueEvent::ChoicesPresented(choices) => {
            for (index, choice) in choices.iter().enumerate() {
                println!("{}", render_choice(index + 1, choice));
            }
        },
        DialogueEvent::DialogueEnded => println!("\n{}", "(the conversation ends)".ended_style()),
    }
}

fn render_choice(number: usize, choice: &ChoiceView) -> String {
    let label = fill(&format!("{number}. {}", choice.prompt), indented_block());
    if choice.unlocked {
        label.choice_style().to_string()
    } else {
        format!("{} {ICON_LOCKED}", label.locked_style())
    }
}

fn render_flags(snapshot: &FlagSnapshot) {
    println!("{}", "Flags".subheading_style());
    let empty =
        snapshot.bools.is_empty() && snapshot.ints.is_empty() && snapshot.floats.is_empty() && snapshot.strings.is_empty();
    if empty {
        println!("    (none set)");
        return;
    }
    for name in &snapshot.bools {
        println!("    {}", name.flag_style());
    }
    for (name, value) in &snapshot.ints {
        println!("    {} = {value}", name.flag_style());
    }
    for (name, value) in &snapshot.floats {
        println!("    {} = {value}", name.flag_style());
    }
    for (name, value) in &snapshot.strings {
        println!("    {} = \"{value}\"", name.flag_style());
    }
}

fn render_saves(entries: &[SaveFileEntry]) {
    println!("{}", "Saved flag files".subheading_style());
    if entries.is_empty() {
        println!("    (no saves found)");
        return;
    }
    for entry in entries {
        let when = entry.modified.map(format_modified).unwrap_or_default();
        let status = match &entry.status {
            SaveFileStatus::Ready => String::new(),
            SaveFileStatus::VersionMismatch { save_version, .. } => format!(" (from v{save_version})"),
            SaveFileStatus::Corrupted { message } => format!(" (unreadable: {message})"),
        };
        let trigger = entry
            .saved_at_trigger
            .as_deref()
            .map(|t| format!(", in '{t}'"))
            .unwrap_or_default();
        println!(
            "    {} {} flags{trigger}, {when}{}",
            entry.slot.choice_style(),
            entry.flag_count,
            status.error_style()
        );
    }
}

fn render_help() {
    const HELP: &[(&str, &str)] = &[
        ("talk <trigger>", "start the dialogue registered for a trigger"),
        ("<enter> | next", "advance past the current line"),
        ("<n>", "pick the n-th offered choice"),
        ("close", "end the open dialogue"),
        ("triggers", "list trigger names"),
        ("flags", "show every flag"),
        ("save <slot> | load <slot>", "write or restore flags"),
        ("saves", "list saved flag files"),
        ("quit", "leave"),
    ];
    const DEV_HELP: &[(&str, &str)] = &[
        ("set <name>[=value]", "set a bool, int, float or text flag"),
        ("unset <name>", "remove a flag from every namespace"),
    ];
    println!("{}", "Commands".subheading_style());
    for (command, description) in HELP {
        println!("    {:<28}{}", command.choice_style(), description);
    }
    if DEV_MODE {
        println!("{}", "Developer commands (outside conversations)".subheading_style());
        for (command, description) in DEV_HELP {
            println!("    {:<28}{}", command.choice_style(), description);
        }
    }
}

//! REPL and command handling.
//!
//! The `parley` binary drives a [`DialogueSession`] from a read-eval-print
//! loop. [`Repl`] owns the session, the flag store and the view, so commands
//! can also be executed without a terminal.

pub mod input;

use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};

use crate::DEV_MODE;
use crate::command::{Command, FlagAssignment, parse_command};
use crate::flags::FlagStore;
use crate::graph::DialogueGraph;
use crate::localization::Localizer;
use crate::save_files::{SaveFileStatus, build_save_entries, find_save_slot, load_save, write_save};
use crate::session::{DialogueSession, SessionError, SessionState};
use crate::style::DialogueStyle;
use crate::view::{View, ViewItem};

use input::{InputEvent, InputManager, ParleyHelper};

/// Control flow signal used by handlers to exit the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplControl {
    Continue,
    Quit,
}

/// Driver state for one run of the REPL.
pub struct Repl<'a> {
    session: DialogueSession<'a>,
    flags: FlagStore,
    view: View,
    save_dir: PathBuf,
    active_trigger: Option<String>,
    dev_mode: bool,
}

impl<'a> Repl<'a> {
    pub fn new(graph: &'a DialogueGraph, localizer: &'a dyn Localizer, save_dir: PathBuf) -> Self {
        Self {
            session: DialogueSession::with_localizer(graph, localizer),
            flags: FlagStore::new(),
            view: View::new(),
            save_dir,
            active_trigger: None,
            dev_mode: DEV_MODE,
        }
    }

    #[cfg(test)]
    fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    pub fn session(&self) -> &DialogueSession<'a> {
        &self.session
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// Remove and return everything queued for display.
    pub fn take_output(&mut self) -> Vec<ViewItem> {
        std::mem::take(&mut self.view.items)
    }

    /// Prompt reflecting what input the session is waiting for.
    pub fn prompt(&self) -> String {
        match self.session.state() {
            SessionState::Choosing => format!("[1-{}]> ", self.session.visible_choices().len()),
            SessionState::Presenting => "[enter]> ".to_string(),
            SessionState::Idle | SessionState::Terminal => "parley> ".to_string(),
        }
    }

    /// Run a single command, queueing its output on the view.
    pub fn execute(&mut self, command: &Command) -> ReplControl {
        if command.is_dev_only() && !self.dev_mode {
            warn!("developer command {command:?} refused: built without dev-mode");
            self.view
                .push(ViewItem::Error("Developer commands are disabled in this build.".into()));
            return ReplControl::Continue;
        }
        match command {
            Command::Talk(trigger) => self.talk(trigger),
            Command::Advance => self.advance(),
            Command::Select(number) => self.select(*number),
            Command::Close => self.close(),
            Command::Triggers => self.list_triggers(),
            Command::Flags => self.view.push(ViewItem::Flags(self.flags.export())),
            Command::Set(assignment) => self.set_flag(assignment),
            Command::Unset(name) => self.unset_flag(name),
            Command::Save(slot) => self.save(slot),
            Command::Load(slot) => self.load(slot),
            Command::ListSaves => self.list_saves(),
            Command::Help => self.view.push(ViewItem::Help),
            Command::Quit => return ReplControl::Quit,
            Command::Unknown => self
                .view
                .push(ViewItem::Error("Didn't quite catch that. Type 'help' for commands.".into())),
        }
        if !self.session.is_active() {
            self.active_trigger = None;
        }
        ReplControl::Continue
    }

    fn talk(&mut self, trigger: &str) {
        info!("└─ command: talk '{trigger}'");
        match self.session.start(trigger, &mut self.view) {
            Ok(_) => self.active_trigger = Some(trigger.trim().to_string()),
            Err(SessionError::AlreadyActive) => self.view.push(ViewItem::Error(
                "A conversation is already under way. Finish it or 'close' it first.".into(),
            )),
            Err(err) => self.view.push(ViewItem::Error(format!("{err}."))),
        }
    }

    fn advance(&mut self) {
        if !self.session.is_active() {
            self.view
                .push(ViewItem::Notice("No conversation is open. Try 'talk <trigger>'.".into()));
            return;
        }
        if self.session.state().is_choosing() {
            self.view
                .push(ViewItem::Notice("Pick one of the choices by number.".into()));
            return;
        }
        if let Err(err) = self.session.advance(&self.flags, &mut self.view) {
            self.view.push(ViewItem::Error(format!("{err}.")));
        }
    }

    fn select(&mut self, number: usize) {
        let Some(index) = number.checked_sub(1) else {
            self.view.push(ViewItem::Error("Choices are numbered from 1.".into()));
            return;
        };
        match self.session.select(index, &mut self.flags, &mut self.view) {
            Ok(_) => {},
            Err(SessionError::InvalidSelection { issue, .. }) => {
                self.view.push(ViewItem::Error(format!("Choice {number}: {issue}.")));
            },
            Err(err) => self.view.push(ViewItem::Error(format!("{err}."))),
        }
    }

    fn close(&mut self) {
        if !self.session.close(&mut self.view) {
            self.view.push(ViewItem::Notice("No conversation is open.".into()));
        }
    }

    fn list_triggers(&mut self) {
        let names = self.session.graph().triggers().names().map(str::to_string).collect();
        self.view.push(ViewItem::Triggers(names));
    }

    /// Flags change only through choice effects while a conversation is open.
    fn flags_locked(&mut self, action: &str) -> bool {
        if self.session.is_active() {
            self.view.push(ViewItem::Error(format!(
                "Close the conversation before you {action} flags."
            )));
            return true;
        }
        false
    }

    fn set_flag(&mut self, assignment: &FlagAssignment) {
        if self.flags_locked("set") {
            return;
        }
        if assignment.apply(&mut self.flags) {
            warn!("└─ dev command: set {assignment:?}");
            self.view
                .push(ViewItem::Notice(format!("Flag '{}' set.", assignment.name().trim())));
        } else {
            self.view.push(ViewItem::Error(format!(
                "'{}' is not a valid flag name: names may not contain '>', '<', '=' or '!'.",
                assignment.name()
            )));
        }
    }

    fn unset_flag(&mut self, name: &str) {
        if self.flags_locked("clear") {
            return;
        }
        self.flags.remove_bool(name);
        self.flags.remove_int(name);
        self.flags.remove_float(name);
        self.flags.remove_string(name);
        warn!("└─ dev command: unset '{name}'");
        self.view.push(ViewItem::Notice(format!("Flag '{name}' cleared.")));
    }

    fn save(&mut self, slot: &str) {
        match write_save(&self.save_dir, slot, &self.flags, self.active_trigger.as_deref()) {
            Ok(path) => self
                .view
                .push(ViewItem::Notice(format!("Flags saved to {}.", path.display()))),
            Err(err) => {
                warn!("save to slot '{slot}' failed: {err:#}");
                self.view.push(ViewItem::Error(format!("Could not save: {err:#}")));
            },
        }
    }

    fn load(&mut self, slot: &str) {
        if self.flags_locked("load") {
            return;
        }
        if let Err(err) = self.try_load(slot) {
            warn!("load of slot '{slot}' failed: {err:#}");
            self.view.push(ViewItem::Error(format!("Could not load '{slot}': {err:#}")));
        }
    }

    fn try_load(&mut self, slot: &str) -> Result<()> {
        let Some(found) = find_save_slot(&self.save_dir, slot)? else {
            self.view
                .push(ViewItem::Error(format!("No save named '{slot}'. Try 'saves'.")));
            return Ok(());
        };
        let save = load_save(&found.path)?;
        if let SaveFileStatus::VersionMismatch { save_version, current_version } = save.status() {
            self.view.push(ViewItem::Notice(format!(
                "Save was written by v{save_version}; this is v{current_version}."
            )));
        }
        self.flags = save.restore()?;
        info!("└─ command: load '{}'", found.path.display());
        self.view.push(ViewItem::Notice(format!("Flags restored from '{}'.", found.slot)));
        Ok(())
    }

    fn list_saves(&mut self) {
        match build_save_entries(&self.save_dir) {
            Ok(entries) => self.view.push(ViewItem::Saves(entries)),
            Err(err) => self
                .view
                .push(ViewItem::Error(format!("Could not list saves: {err:#}"))),
        }
    }
}

/// Run the read-eval-print loop until the user quits.
///
/// If `opening` names a trigger, that dialogue is started before the first prompt.
///
/// # Errors
/// - currently never; reserved for handlers that can fail fatally
pub fn run_repl(
    graph: &DialogueGraph,
    localizer: &dyn Localizer,
    save_dir: PathBuf,
    keep_history: bool,
    opening: Option<&str>,
) -> Result<()> {
    let triggers = graph.triggers().names().map(str::to_string).collect();
    let mut input_manager = InputManager::new(ParleyHelper::new(triggers, save_dir.clone()), keep_history);
    let mut repl = Repl::new(graph, localizer, save_dir);

    if let Some(trigger) = opening {
        repl.execute(&Command::Talk(trigger.to_string()));
    }
    repl.view_mut().flush();

    loop {
        let prompt = format!("\n{}", repl.prompt()).prompt_style().to_string();
        let input_event = if let Ok(event) = input_manager.read_line(&prompt) {
            event
        } else {
            repl.view_mut()
                .push(ViewItem::Error("Failed to read input. Try again.".into()));
            repl.view_mut().flush();
            continue;
        };

        let command = match input_event {
            InputEvent::Line(line) => parse_command(&line),
            InputEvent::Eof => Command::Quit,
            InputEvent::Interrupted => {
                repl.view_mut().push(ViewItem::Notice("Command canceled.".into()));
                repl.view_mut().flush();
                continue;
            },
        };

        let control = repl.execute(&command);
        repl.view_mut().flush();
        if control == ReplControl::Quit {
            info!("quit requested");
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DialogueChoice, DialogueNode};
    use crate::localization::PassThrough;
    use crate::session::DialogueEvent;

    fn graph() -> DialogueGraph {
        let mut graph = DialogueGraph::new();
        let n0 = graph.add_node(DialogueNode::new("n0", "Hello."));
        let n1 = graph.add_node(DialogueNode::new("n1", "Bye."));
        let a = graph.add_choice(DialogueChoice::new("a", "Wave", Some(n1)));
        let b = graph.add_choice(DialogueChoice::new("b", "Leave", None));
        graph.attach_choice(n0, a);
        graph.attach_choice(n0, b);
        graph.add_trigger("hi", Some(n0));
        graph
    }

    #[test]
    fn commands_drive_the_session() {
        let graph = graph();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repl = Repl::new(&graph, &PassThrough, dir.path().to_path_buf());

        repl.execute(&parse_command("talk hi"));
        assert_eq!(repl.prompt(), "[enter]> ");
        repl.execute(&parse_command(""));
        assert_eq!(repl.prompt(), "[1-2]> ");
        repl.execute(&parse_command("0"));
        repl.execute(&parse_command("2"));
        assert!(repl.session().state().is_terminal());

        let output = repl.take_output();
        assert!(output.contains(&ViewItem::Error("Choices are numbered from 1.".into())));
        assert_eq!(output.last(), Some(&ViewItem::Dialogue(DialogueEvent::DialogueEnded)));
    }

    #[test]
    fn talking_twice_is_refused() {
        let graph = graph();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repl = Repl::new(&graph, &PassThrough, dir.path().to_path_buf());
        repl.execute(&parse_command("talk hi"));
        repl.take_output();
        repl.execute(&parse_command("talk hi"));
        assert!(matches!(repl.take_output().as_slice(), [ViewItem::Error(_)]));
        assert!(repl.session().state().is_presenting());
    }

    #[test]
    fn set_save_and_load_round_trip() {
        let graph = graph();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repl = Repl::new(&graph, &PassThrough, dir.path().to_path_buf()).with_dev_mode(true);
        repl.execute(&parse_command("set gold=7"));
        repl.execute(&parse_command("save slot one"));
        repl.execute(&parse_command("unset gold"));
        assert_eq!(repl.flags().get_int("gold"), None);

        repl.execute(&parse_command("load slot one"));
        assert_eq!(repl.flags().get_int("gold"), Some(7));
        assert!(
            !repl
                .take_output()
                .iter()
                .any(|item| matches!(item, ViewItem::Error(_)))
        );
    }

    #[test]
    fn flag_writes_need_dev_mode() {
        let graph = graph();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repl = Repl::new(&graph, &PassThrough, dir.path().to_path_buf()).with_dev_mode(false);
        repl.execute(&parse_command("set gold=7"));
        repl.execute(&parse_command("unset gold"));
        assert_eq!(repl.flags().get_int("gold"), None);
        let disabled = ViewItem::Error("Developer commands are disabled in this build.".into());
        assert_eq!(repl.take_output(), vec![disabled.clone(), disabled]);
    }

    #[test]
    fn flags_are_frozen_during_a_conversation() {
        let graph = graph();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repl = Repl::new(&graph, &PassThrough, dir.path().to_path_buf()).with_dev_mode(true);
        repl.execute(&parse_command("set gold=7"));
        repl.execute(&parse_command("save before"));
        repl.execute(&parse_command("set gold=1"));

        repl.execute(&parse_command("talk hi"));
        repl.execute(&parse_command(""));
        assert!(repl.session().state().is_choosing());
        repl.take_output();

        repl.execute(&parse_command("set gold=99"));
        repl.execute(&parse_command("unset gold"));
        repl.execute(&parse_command("load before"));
        assert_eq!(repl.flags().get_int("gold"), Some(1));
        let output = repl.take_output();
        assert_eq!(output.len(), 3);
        assert!(
            output
                .iter()
                .all(|item| matches!(item, ViewItem::Error(msg) if msg.starts_with("Close the conversation")))
        );

        // once closed, writes go through again
        repl.execute(&parse_command("close"));
        repl.execute(&parse_command("load before"));
        assert_eq!(repl.flags().get_int("gold"), Some(7));
    }

    #[test]
    fn quit_stops_the_loop() {
        let graph = graph();
        let mut repl = Repl::new(&graph, &PassThrough, PathBuf::from("unused"));
        assert_eq!(repl.execute(&Command::Quit), ReplControl::Quit);
        assert_eq!(repl.execute(&Command::Flags), ReplControl::Continue);
    }
}

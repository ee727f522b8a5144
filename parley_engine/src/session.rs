//! Dialogue session -- the traversal state machine.
//!
//! A [`DialogueSession`] walks a [`DialogueGraph`] from a trigger's start node.
//! It never draws anything: every visible outcome is pushed to a
//! [`PresentationSink`] as a [`DialogueEvent`], and the host drives the session
//! with [`DialogueSession::advance`] and [`DialogueSession::select`].
//!
//! Flow for a single node:
//! 1. `start`/`select` presents the node's line (`LinePresented`).
//! 2. `advance` filters the node's choices by their visibility conditions:
//!    - none visible: the dialogue ends (`DialogueEnded`)
//!    - one visible: it is followed automatically, without effects
//!    - several visible: they are offered (`ChoicesPresented`), locked ones included
//! 3. `select` applies the chosen choice's effects and moves to its target.
//!
//! Conditions are evaluated afresh on every visit; nodes are never marked visited.

use std::fmt;

use log::{debug, error, info, warn};
use thiserror::Error;
use variantly::Variantly;

use crate::condition::{ConditionError, try_evaluate};
use crate::effect::apply_effects;
use crate::flags::FlagStore;
use crate::graph::{ChoiceId, DialogueGraph, NodeId};
use crate::localization::{Localizer, PassThrough, localize};

/// Where a session is in its traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Variantly)]
pub enum SessionState {
    /// No dialogue has been started (or it was closed).
    #[default]
    Idle,
    /// A line has been presented and is waiting for an advance.
    Presenting,
    /// Several choices are on offer and waiting for a selection.
    Choosing,
    /// Traversal reached the end of the graph.
    Terminal,
}

/// A choice as offered to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub choice: ChoiceId,
    pub prompt: String,
    pub unlocked: bool,
}

/// Everything the presentation layer is told about.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum DialogueEvent {
    LinePresented {
        node: NodeId,
        speaker: String,
        portrait: Option<String>,
        text: String,
    },
    ChoicesPresented(Vec<ChoiceView>),
    DialogueEnded,
}

/// Receiver for session events.
pub trait PresentationSink {
    fn present(&mut self, event: DialogueEvent);
}

impl PresentationSink for Vec<DialogueEvent> {
    fn present(&mut self, event: DialogueEvent) {
        self.push(event);
    }
}

/// Why a selection was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SelectionIssue {
    #[error("no choices are waiting for a selection")]
    NoChoicesPending,
    #[error("only {available} choices are on offer")]
    OutOfRange { available: usize },
    #[error("that choice is locked")]
    Locked,
}

/// Failures reported by session operations. None of them change session state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("dialogue trigger '{0}' was not found or has no start node")]
    UnknownTrigger(String),
    #[error("a dialogue is already open")]
    AlreadyActive,
    #[error("no dialogue is open")]
    NotActive,
    #[error("choice {index} cannot be selected: {issue}")]
    InvalidSelection { index: usize, issue: SelectionIssue },
    #[error("conditions on {choice} could not be evaluated")]
    Condition {
        choice: ChoiceId,
        #[source]
        source: ConditionError,
    },
    #[error("{0} is referenced but does not exist")]
    MissingNode(NodeId),
    #[error("{0} is referenced but does not exist")]
    MissingChoice(ChoiceId),
}

/// A choice remembered between `advance` and `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChoice {
    pub choice: ChoiceId,
    pub unlocked: bool,
}

/// One traversal of a dialogue graph.
pub struct DialogueSession<'a> {
    graph: &'a DialogueGraph,
    localizer: &'a dyn Localizer,
    state: SessionState,
    current: Option<NodeId>,
    pending: Vec<PendingChoice>,
}

impl fmt::Debug for DialogueSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueSession")
            .field("state", &self.state)
            .field("current", &self.current)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<'a> DialogueSession<'a> {
    /// Create an idle session that presents authored text untranslated.
    pub fn new(graph: &'a DialogueGraph) -> Self {
        Self::with_localizer(graph, &PassThrough)
    }

    /// Create an idle session that resolves display text through `localizer`.
    pub fn with_localizer(graph: &'a DialogueGraph, localizer: &'a dyn Localizer) -> Self {
        Self {
            graph,
            localizer,
            state: SessionState::Idle,
            current: None,
            pending: Vec::new(),
        }
    }

    pub fn graph(&self) -> &'a DialogueGraph {
        self.graph
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current
    }

    /// True while a node is current (presenting or choosing).
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Choices offered by the last `advance`, in authored order.
    pub fn visible_choices(&self) -> &[PendingChoice] {
        &self.pending
    }

    /// Begin the dialogue registered for `trigger` and present its first line.
    ///
    /// # Errors
    /// - `SessionError::AlreadyActive` if a dialogue is already open
    /// - `SessionError::UnknownTrigger` if the trigger has no start node
    pub fn start(&mut self, trigger: &str, sink: &mut dyn PresentationSink) -> Result<NodeId, SessionError> {
        if self.current.is_some() {
            warn!("dialogue is already open; ignoring trigger '{trigger}'");
            return Err(SessionError::AlreadyActive);
        }
        let Some(start) = self.graph.start_for(trigger) else {
            error!("dialogue trigger '{trigger}' was not found or is not associated with a dialogue node");
            return Err(SessionError::UnknownTrigger(trigger.to_string()));
        };
        self.present_line(start, sink)?;
        info!("dialogue started from trigger '{trigger}' at {start}");
        Ok(start)
    }

    /// Move past the current line.
    ///
    /// Returns the resulting state. Advancing while choosing does nothing.
    ///
    /// # Errors
    /// - `SessionError::NotActive` if no dialogue is open
    /// - `SessionError::Condition` if a visibility or unlock condition is malformed
    pub fn advance(&mut self, flags: &FlagStore, sink: &mut dyn PresentationSink) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::Choosing => {
                debug!("advance ignored while waiting for a choice");
                return Ok(self.state);
            },
            SessionState::Idle | SessionState::Terminal => return Err(SessionError::NotActive),
            SessionState::Presenting => {},
        }
        let Some(current) = self.current else {
            return Err(SessionError::NotActive);
        };
        let node = self.graph.node(current).ok_or(SessionError::MissingNode(current))?;
        if node.is_terminal() {
            debug!("node {current} has no choices");
            self.finish(sink);
            return Ok(self.state);
        }

        let mut visible = Vec::new();
        for &choice_id in &node.choices {
            let choice = self.graph.choice(choice_id).ok_or(SessionError::MissingChoice(choice_id))?;
            let shown = try_evaluate(choice.visible.as_ref(), flags).map_err(|source| SessionError::Condition {
                choice: choice_id,
                source,
            })?;
            if shown {
                visible.push(choice_id);
            }
        }

        match visible.as_slice() {
            [] => {
                self.finish(sink);
                Ok(self.state)
            },
            [only] => {
                let target = self.graph.choice(*only).and_then(|c| c.target);
                match target {
                    Some(next) => {
                        debug!("auto-following {only} to {next}");
                        self.present_line(next, sink)?;
                    },
                    None => self.finish(sink),
                }
                Ok(self.state)
            },
            many => {
                let mut pending = Vec::with_capacity(many.len());
                let mut views = Vec::with_capacity(many.len());
                for &choice_id in many {
                    let choice = self.graph.choice(choice_id).ok_or(SessionError::MissingChoice(choice_id))?;
                    let unlocked =
                        try_evaluate(choice.unlocked.as_ref(), flags).map_err(|source| SessionError::Condition {
                            choice: choice_id,
                            source,
                        })?;
                    pending.push(PendingChoice {
                        choice: choice_id,
                        unlocked,
                    });
                    views.push(ChoiceView {
                        choice: choice_id,
                        prompt: localize(self.localizer, choice.table.as_deref(), &choice.prompt),
                        unlocked,
                    });
                }
                self.pending = pending;
                self.state = SessionState::Choosing;
                sink.present(DialogueEvent::ChoicesPresented(views));
                Ok(self.state)
            },
        }
    }

    /// Take the choice at `index` among those offered by the last `advance`.
    ///
    /// Applies the choice's effects in order, then presents its target's line
    /// or ends the dialogue if it has no target.
    ///
    /// # Errors
    /// - `SessionError::InvalidSelection` if nothing is on offer, `index` is out
    ///   of range, or the choice is locked
    pub fn select(
        &mut self,
        index: usize,
        flags: &mut FlagStore,
        sink: &mut dyn PresentationSink,
    ) -> Result<SessionState, SessionError> {
        if !self.state.is_choosing() {
            return Err(SessionError::InvalidSelection {
                index,
                issue: SelectionIssue::NoChoicesPending,
            });
        }
        let Some(picked) = self.pending.get(index).copied() else {
            return Err(SessionError::InvalidSelection {
                index,
                issue: SelectionIssue::OutOfRange {
                    available: self.pending.len(),
                },
            });
        };
        if !picked.unlocked {
            return Err(SessionError::InvalidSelection {
                index,
                issue: SelectionIssue::Locked,
            });
        }
        let choice = self
            .graph
            .choice(picked.choice)
            .ok_or(SessionError::MissingChoice(picked.choice))?;
        if let Some(next) = choice.target
            && self.graph.node(next).is_none()
        {
            return Err(SessionError::MissingNode(next));
        }

        info!("choice selected: '{}' ({})", choice.symbol, picked.choice);
        apply_effects(&choice.effects, flags);
        self.pending.clear();

        match choice.target {
            Some(next) => self.present_line(next, sink)?,
            None => self.finish(sink),
        }
        Ok(self.state)
    }

    /// Close an open dialogue immediately. Returns false if none was open.
    pub fn close(&mut self, sink: &mut dyn PresentationSink) -> bool {
        if self.current.is_none() {
            return false;
        }
        self.current = None;
        self.pending.clear();
        self.state = SessionState::Idle;
        sink.present(DialogueEvent::DialogueEnded);
        info!("dialogue closed by host");
        true
    }

    fn present_line(&mut self, node_id: NodeId, sink: &mut dyn PresentationSink) -> Result<(), SessionError> {
        let node = self.graph.node(node_id).ok_or(SessionError::MissingNode(node_id))?;
        let speaker = node.speaker.and_then(|id| self.graph.speaker(id));
        let speaker_name = speaker
            .map(|s| localize(self.localizer, s.table.as_deref(), &s.name))
            .unwrap_or_default();
        let portrait = speaker.map(|s| s.portrait.clone()).filter(|p| !p.is_empty());
        let text = localize(self.localizer, node.table.as_deref(), &node.text);

        self.current = Some(node_id);
        self.state = SessionState::Presenting;
        sink.present(DialogueEvent::LinePresented {
            node: node_id,
            speaker: speaker_name,
            portrait,
            text,
        });
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn PresentationSink) {
        self.current = None;
        self.pending.clear();
        self.state = SessionState::Terminal;
        sink.present(DialogueEvent::DialogueEnded);
        info!("dialogue reached its end");
    }
}

//! Undo/Redo command stack.
//!
//! Every edit is wrapped in a `Command` holding the journal of primitive
//! changes it made. Undo replays the inverse of each change newest-first,
//! redo replays the journal forward. Consecutive edits with equal merge keys
//! fold into one command (a drag is one undo step), and macros group several
//! commands into one atomic step.

use crate::sync::{Edit, EditOutcome, SyncEngine};
use mc_core::journal::{self, Change};
use mc_core::{Result, Uid, invariant};

pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// Something journal changes can be replayed against.
pub trait ChangeTarget {
    fn replay(&mut self, change: &Change);
}

/// Replays nothing, only records. Useful to inspect what undo would do.
impl ChangeTarget for Vec<Change> {
    fn replay(&mut self, change: &Change) {
        self.push(change.clone());
    }
}

/// The kinds of edits that merge with their predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    MoveVisual,
    ResizeVisual,
    Rename,
}

/// Two commands merge when their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub class: CommandClass,
    pub target: Uid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Applied,
    Undone,
}

#[derive(Debug, Clone)]
enum Body {
    Changes(Vec<Change>),
    Macro(Vec<Command>),
}

#[derive(Debug, Clone)]
pub struct Command {
    label: String,
    body: Body,
    merge_key: Option<MergeKey>,
    state: CommandState,
    /// Set once a do-not-merge boundary follows this command.
    sealed: bool,
}

impl Command {
    /// A command for changes that have already been applied.
    pub fn new(label: impl Into<String>, changes: Vec<Change>, merge_key: Option<MergeKey>) -> Self {
        Self {
            label: label.into(),
            body: Body::Changes(changes),
            merge_key,
            state: CommandState::Applied,
            sealed: false,
        }
    }

    fn group(label: String, commands: Vec<Command>) -> Self {
        Self {
            label,
            body: Body::Macro(commands),
            merge_key: None,
            state: CommandState::Applied,
            sealed: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn merge_key(&self) -> Option<MergeKey> {
        self.merge_key
    }

    pub fn is_macro(&self) -> bool {
        matches!(self.body, Body::Macro(_))
    }

    pub fn undo(&mut self, target: &mut dyn ChangeTarget) {
        invariant!(
            self.state == CommandState::Applied,
            "undo of `{}` while {:?}",
            self.label,
            self.state
        );
        match &mut self.body {
            Body::Changes(changes) => {
                for change in changes.iter().rev() {
                    target.replay(&change.inverse());
                }
            }
            Body::Macro(commands) => {
                for command in commands.iter_mut().rev() {
                    command.undo(target);
                }
            }
        }
        self.state = CommandState::Undone;
    }

    pub fn redo(&mut self, target: &mut dyn ChangeTarget) {
        invariant!(
            self.state == CommandState::Undone,
            "redo of `{}` while {:?}",
            self.label,
            self.state
        );
        match &mut self.body {
            Body::Changes(changes) => {
                for change in changes.iter() {
                    target.replay(change);
                }
            }
            Body::Macro(commands) => {
                for command in commands.iter_mut() {
                    command.redo(target);
                }
            }
        }
        self.state = CommandState::Applied;
    }

    /// Fold `next` into `self` if their keys match. Hands `next` back
    /// otherwise.
    fn merge(&mut self, next: Command) -> std::result::Result<(), Command> {
        let mergeable = !self.sealed
            && self.state == CommandState::Applied
            && self.merge_key.is_some()
            && self.merge_key == next.merge_key;
        match (&mut self.body, next.body) {
            (Body::Changes(changes), Body::Changes(later)) if mergeable => {
                journal::fold(changes, later);
                Ok(())
            }
            (_, body) => Err(Command { body, ..next }),
        }
    }
}

/// Manages undo/redo stacks with macro grouping.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Macro nesting depth (0 = no macro open).
    macro_depth: usize,
    macro_label: String,
    macro_commands: Vec<Command>,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
            macro_depth: 0,
            macro_label: String::new(),
            macro_commands: Vec::new(),
        }
    }

    /// Apply an edit through the engine and record it. An edit that changes
    /// nothing records nothing.
    pub fn execute(
        &mut self,
        engine: &mut SyncEngine,
        edit: Edit,
        description: &str,
    ) -> Result<EditOutcome> {
        let outcome = engine.apply_edit(&edit)?;
        if !outcome.changes.is_empty() {
            self.push(Command::new(
                description,
                outcome.changes.clone(),
                edit.merge_key(),
            ));
        }
        Ok(outcome)
    }

    /// Record an already applied command.
    pub fn push(&mut self, command: Command) {
        if self.macro_depth > 0 {
            match self.macro_commands.last_mut() {
                Some(last) => {
                    if let Err(command) = last.merge(command) {
                        self.macro_commands.push(command);
                    }
                }
                None => self.macro_commands.push(command),
            }
            return;
        }

        self.redo_stack.clear();
        let command = match self.undo_stack.last_mut() {
            Some(top) => match top.merge(command) {
                Ok(()) => {
                    log::trace!("merged into `{}`", top.label);
                    return;
                }
                Err(command) => command,
            },
            None => command,
        };
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
    }

    /// The next pushed command never merges into the current top.
    pub fn break_merge_chain(&mut self) {
        let top = if self.macro_depth > 0 {
            self.macro_commands.last_mut()
        } else {
            self.undo_stack.last_mut()
        };
        if let Some(top) = top {
            top.sealed = true;
        }
    }

    /// Start a macro. All commands until the matching `end_macro()` become
    /// one undo step. Nested brackets only count once.
    pub fn begin_macro(&mut self, label: &str) {
        if self.macro_depth == 0 {
            self.macro_label = label.to_string();
            self.macro_commands.clear();
        }
        self.macro_depth += 1;
    }

    pub fn end_macro(&mut self) {
        if self.macro_depth == 0 {
            log::warn!("end_macro without begin_macro");
            return;
        }
        self.macro_depth -= 1;
        if self.macro_depth > 0 {
            return;
        }
        let commands = std::mem::take(&mut self.macro_commands);
        if commands.is_empty() {
            return;
        }
        let label = std::mem::take(&mut self.macro_label);
        log::debug!("macro `{label}` closed with {} command(s)", commands.len());
        self.push(Command::group(label, commands));
    }

    pub fn in_macro(&self) -> bool {
        self.macro_depth > 0
    }

    /// Undo the last command. Refused while a macro is open.
    pub fn undo(&mut self, target: &mut dyn ChangeTarget) -> Option<String> {
        if self.in_macro() {
            log::warn!("undo refused while macro `{}` is open", self.macro_label);
            return None;
        }
        let mut command = self.undo_stack.pop()?;
        log::debug!("undo `{}`", command.label);
        command.undo(target);
        let label = command.label.clone();
        self.redo_stack.push(command);
        if let Some(top) = self.undo_stack.last_mut() {
            top.sealed = true;
        }
        Some(label)
    }

    /// Redo the last undone command. Refused while a macro is open.
    pub fn redo(&mut self, target: &mut dyn ChangeTarget) -> Option<String> {
        if self.in_macro() {
            log::warn!("redo refused while macro `{}` is open", self.macro_label);
            return None;
        }
        let mut command = self.redo_stack.pop()?;
        log::debug!("redo `{}`", command.label);
        command.redo(target);
        command.sealed = true;
        let label = command.label.clone();
        self.undo_stack.push(command);
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable commands.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(Command::label)
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(Command::label)
    }
}

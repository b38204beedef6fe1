//! Change journal.
//!
//! While an edit runs, every primitive change to the model or to a diagram is
//! recorded in a [`Journal`]. Each [`Change`] knows its own inverse, so a
//! journal replayed backward undoes the edit and replayed forward redoes it,
//! restoring Uids, rows and geometry exactly.
//!
//! Ordering rule: a change that depends on another element is recorded so
//! that reverse replay restores the element before the dependent. Inserts are
//! recorded before the observers react to them; removals after.

use crate::diagram::{DiagramElement, Geometry};
use crate::model::{Element, ElementData, Position};
use crate::uid::Uid;

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A bare model element was inserted.
    Insert { element: Element, at: Position },
    /// A bare model element was removed.
    Remove { element: Element, at: Position },
    Move {
        uid: Uid,
        from: Position,
        to: Position,
    },
    Update {
        uid: Uid,
        before: ElementData,
        after: ElementData,
    },
    AddVisual {
        diagram: Uid,
        element: DiagramElement,
        row: usize,
    },
    RemoveVisual {
        diagram: Uid,
        element: DiagramElement,
        row: usize,
    },
    Reshape {
        diagram: Uid,
        visual: Uid,
        before: Geometry,
        after: Geometry,
    },
}

impl Change {
    /// The change that reverts this one.
    pub fn inverse(&self) -> Change {
        match self {
            Change::Insert { element, at } => Change::Remove {
                element: element.clone(),
                at: *at,
            },
            Change::Remove { element, at } => Change::Insert {
                element: element.clone(),
                at: *at,
            },
            Change::Move { uid, from, to } => Change::Move {
                uid: *uid,
                from: *to,
                to: *from,
            },
            Change::Update { uid, before, after } => Change::Update {
                uid: *uid,
                before: after.clone(),
                after: before.clone(),
            },
            Change::AddVisual {
                diagram,
                element,
                row,
            } => Change::RemoveVisual {
                diagram: *diagram,
                element: element.clone(),
                row: *row,
            },
            Change::RemoveVisual {
                diagram,
                element,
                row,
            } => Change::AddVisual {
                diagram: *diagram,
                element: element.clone(),
                row: *row,
            },
            Change::Reshape {
                diagram,
                visual,
                before,
                after,
            } => Change::Reshape {
                diagram: *diagram,
                visual: *visual,
                before: *after,
                after: *before,
            },
        }
    }

    /// Try to absorb `next` into `self` (same target, same kind of in-place
    /// change). Returns `false` if the two must stay separate.
    fn absorb(&mut self, next: &Change) -> bool {
        match (self, next) {
            (
                Change::Update { uid, after, .. },
                Change::Update {
                    uid: next_uid,
                    after: next_after,
                    ..
                },
            ) if *uid == *next_uid => {
                *after = next_after.clone();
                true
            }
            (
                Change::Reshape {
                    diagram,
                    visual,
                    after,
                    ..
                },
                Change::Reshape {
                    diagram: next_diagram,
                    visual: next_visual,
                    after: next_after,
                    ..
                },
            ) if *diagram == *next_diagram && *visual == *next_visual => {
                *after = *next_after;
                true
            }
            _ => false,
        }
    }
}

/// Append `later` to `changes`, collapsing consecutive in-place updates of
/// the same target into one.
pub fn fold(changes: &mut Vec<Change>, later: Vec<Change>) {
    for change in later {
        if let Some(last) = changes.last_mut()
            && last.absorb(&change)
        {
            continue;
        }
        changes.push(change);
    }
}

/// Collects changes while an edit runs. A disabled journal drops everything
/// (used while replaying).
#[derive(Debug, Default)]
pub struct Journal {
    changes: Vec<Change>,
    recording: bool,
}

impl Journal {
    pub fn recording() -> Self {
        Self {
            changes: Vec::new(),
            recording: true,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn record(&mut self, change: Change) {
        if self.recording {
            log::trace!("journal: {change:?}");
            self.changes.push(change);
        }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

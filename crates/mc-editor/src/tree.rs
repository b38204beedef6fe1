//! Incremental tree projection of the model.
//!
//! The tree mirrors the model's ownership structure for the navigation view.
//! Under each object the rows are: diagrams, then the other child objects,
//! then the owned relations, each group in model order. Rows are addressed
//! by [`RowId`], which stays stable across moves and renames, so per-row
//! view state (the expanded flag) survives incremental edits.
//!
//! The projection is a [`ModelObserver`]: every begin/end pair edits exactly
//! one row. A begin while busy, or an end that does not match the pending
//! begin, is a broken invariant and panics.

use mc_core::naming;
use mc_core::{Element, ModelEvent, ModelGraph, ModelObserver, Uid, invariant};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u32);

#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub uid: Uid,
    pub label: String,
    pub parent: Option<RowId>,
    pub children: Vec<RowId>,
    pub expanded: bool,
}

/// What the projection is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Inserting(Uid),
    Removing(Uid),
    Moving(Uid),
    Updating(Uid),
}

#[derive(Debug, Clone)]
pub struct TreeProjection {
    rows: HashMap<RowId, TreeRow>,
    by_uid: HashMap<Uid, RowId>,
    root: Option<RowId>,
    next_row: u32,
    state: SyncState,
}

/// Children of `owner` in display order.
pub fn display_children(model: &ModelGraph, owner: Uid) -> Vec<Uid> {
    let children = model.children(owner);
    let is_diagram = |uid: &&Uid| model.find(**uid).is_some_and(Element::is_diagram);
    children
        .iter()
        .filter(is_diagram)
        .chain(children.iter().filter(|uid| !is_diagram(uid)))
        .chain(model.relations(owner))
        .copied()
        .collect()
}

impl TreeProjection {
    /// Build the full tree for `model`.
    pub fn new(model: &ModelGraph) -> Self {
        let mut tree = Self {
            rows: HashMap::new(),
            by_uid: HashMap::new(),
            root: None,
            next_row: 0,
            state: SyncState::Idle,
        };
        tree.rebuild(model);
        tree
    }

    /// Throw every row away and rebuild from scratch. Expanded flags are lost.
    pub fn rebuild(&mut self, model: &ModelGraph) {
        invariant!(
            self.state == SyncState::Idle,
            "tree rebuild while {:?}",
            self.state
        );
        self.rows.clear();
        self.by_uid.clear();
        let root = model.root();
        let root_row = self.alloc(model, root, None);
        self.root = Some(root_row);
        let mut stack = vec![(root, root_row)];
        while let Some((owner, owner_row)) = stack.pop() {
            for child in display_children(model, owner) {
                let row = self.alloc(model, child, Some(owner_row));
                if let Some(parent) = self.rows.get_mut(&owner_row) {
                    parent.children.push(row);
                }
                stack.push((child, row));
            }
        }
        log::debug!("tree rebuilt with {} row(s)", self.rows.len());
    }

    fn alloc(&mut self, model: &ModelGraph, uid: Uid, parent: Option<RowId>) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        let label = model.find(uid).map(naming::element_label).unwrap_or_default();
        self.rows.insert(
            id,
            TreeRow {
                uid,
                label,
                parent,
                children: Vec::new(),
                expanded: false,
            },
        );
        self.by_uid.insert(uid, id);
        id
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn root_row(&self) -> Option<RowId> {
        self.root
    }

    pub fn row(&self, id: RowId) -> Option<&TreeRow> {
        self.rows.get(&id)
    }

    pub fn row_of(&self, uid: Uid) -> Option<RowId> {
        self.by_uid.get(&uid).copied()
    }

    pub fn uid_of(&self, id: RowId) -> Option<Uid> {
        self.rows.get(&id).map(|row| row.uid)
    }

    pub fn children(&self, id: RowId) -> &[RowId] {
        self.rows
            .get(&id)
            .map(|row| row.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_expanded(&mut self, id: RowId, expanded: bool) {
        if let Some(row) = self.rows.get_mut(&id) {
            row.expanded = expanded;
        }
    }

    pub fn is_expanded(&self, id: RowId) -> bool {
        self.rows.get(&id).is_some_and(|row| row.expanded)
    }

    /// Preorder listing of `(depth, uid, label)`.
    pub fn outline(&self) -> Vec<(usize, Uid, String)> {
        let mut out = Vec::with_capacity(self.rows.len());
        let mut stack: Vec<(usize, RowId)> = self.root.map(|r| (0, r)).into_iter().collect();
        while let Some((depth, id)) = stack.pop() {
            let Some(row) = self.rows.get(&id) else {
                continue;
            };
            out.push((depth, row.uid, row.label.clone()));
            stack.extend(row.children.iter().rev().map(|child| (depth + 1, *child)));
        }
        out
    }

    // ─── Incremental edits ───────────────────────────────────────────────

    fn begin(&mut self, next: SyncState) {
        invariant!(
            self.state == SyncState::Idle,
            "tree got {next:?} while still {:?}",
            self.state
        );
        self.state = next;
    }

    fn end(&mut self, expected: SyncState) {
        invariant!(
            self.state == expected,
            "tree got end of {expected:?} while {:?}",
            self.state
        );
        self.state = SyncState::Idle;
    }

    /// Row index of `uid` among its owner's display children in `model`.
    fn display_index(model: &ModelGraph, owner: Uid, uid: Uid) -> usize {
        let siblings = display_children(model, owner);
        let index = siblings.iter().position(|s| *s == uid);
        invariant!(index.is_some(), "{uid:?} missing under {owner:?}");
        index.unwrap_or(siblings.len())
    }

    fn parent_row(&self, owner: Uid) -> RowId {
        let parent = self.row_of(owner);
        invariant!(parent.is_some(), "no row for owner {owner:?}");
        parent.unwrap_or(RowId(u32::MAX))
    }

    fn attach(&mut self, id: RowId, parent: RowId, index: usize) {
        if let Some(parent_row) = self.rows.get_mut(&parent) {
            let index = index.min(parent_row.children.len());
            parent_row.children.insert(index, id);
        }
        if let Some(row) = self.rows.get_mut(&id) {
            row.parent = Some(parent);
        }
    }

    fn detach(&mut self, id: RowId) {
        let parent = self.rows.get(&id).and_then(|row| row.parent);
        if let Some(parent_row) = parent.and_then(|p| self.rows.get_mut(&p)) {
            parent_row.children.retain(|child| *child != id);
        }
    }

    fn insert_row(&mut self, model: &ModelGraph, uid: Uid, owner: Uid) {
        invariant!(!self.by_uid.contains_key(&uid), "row for {uid:?} exists");
        let parent = self.parent_row(owner);
        let id = self.alloc(model, uid, Some(parent));
        let index = Self::display_index(model, owner, uid);
        self.attach(id, parent, index);
        log::trace!("tree: inserted row {id:?} for {uid:?}");
    }

    fn remove_row(&mut self, uid: Uid) {
        let Some(id) = self.row_of(uid) else {
            invariant!(false, "no row to remove for {uid:?}");
            return;
        };
        self.detach(id);
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(row) = self.rows.remove(&id) {
                self.by_uid.remove(&row.uid);
                stack.extend(row.children);
            }
        }
        log::trace!("tree: removed row {id:?} for {uid:?}");
    }

    fn move_row(&mut self, model: &ModelGraph, uid: Uid, new_owner: Uid) {
        let Some(id) = self.row_of(uid) else {
            invariant!(false, "no row to move for {uid:?}");
            return;
        };
        self.detach(id);
        let parent = self.parent_row(new_owner);
        let index = Self::display_index(model, new_owner, uid);
        self.attach(id, parent, index);
        log::trace!("tree: moved row {id:?} under {parent:?} at {index}");
    }

    fn relabel(&mut self, model: &ModelGraph, uid: Uid) {
        let row = self.row_of(uid).and_then(|id| self.rows.get_mut(&id));
        let Some(row) = row else {
            invariant!(false, "no row to relabel for {uid:?}");
            return;
        };
        row.label = model.find(uid).map(naming::element_label).unwrap_or_default();
    }
}

impl ModelObserver for TreeProjection {
    fn model_changed(&mut self, model: &ModelGraph, event: &ModelEvent) {
        match event {
            ModelEvent::BeginInsert { uid, .. } => self.begin(SyncState::Inserting(*uid)),
            ModelEvent::EndInsert { uid, at, .. } => {
                self.end(SyncState::Inserting(*uid));
                self.insert_row(model, *uid, at.owner);
            }
            ModelEvent::BeginRemove { uid, .. } => self.begin(SyncState::Removing(*uid)),
            ModelEvent::EndRemove { element, .. } => {
                self.end(SyncState::Removing(element.uid()));
                self.remove_row(element.uid());
            }
            ModelEvent::BeginMove { uid, .. } => self.begin(SyncState::Moving(*uid)),
            ModelEvent::EndMove { uid, to, .. } => {
                self.end(SyncState::Moving(*uid));
                self.move_row(model, *uid, to.owner);
            }
            ModelEvent::BeginUpdate { uid, .. } => self.begin(SyncState::Updating(*uid)),
            ModelEvent::EndUpdate { uid, .. } => {
                self.end(SyncState::Updating(*uid));
                self.relabel(model, *uid);
            }
        }
    }
}

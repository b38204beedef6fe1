//! Ordered sets of (element, owner) pairs, the currency of delete, copy and
//! drag operations.

use crate::model::ModelGraph;
use crate::uid::Uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionIndex {
    pub element: Uid,
    pub owner: Uid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<SelectionIndex>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection of `uids` with owners resolved from `model`. Unknown Uids
    /// and the root are left out.
    pub fn of(model: &ModelGraph, uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut selection = Self::new();
        for uid in uids {
            if let Some(owner) = model.owner_key(uid) {
                selection.append(uid, owner);
            }
        }
        selection
    }

    /// Append a pair; an element already selected is ignored.
    pub fn append(&mut self, element: Uid, owner: Uid) {
        if !self.contains(element) {
            self.indices.push(SelectionIndex { element, owner });
        }
    }

    pub fn contains(&self, element: Uid) -> bool {
        self.indices.iter().any(|i| i.element == element)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionIndex> {
        self.indices.iter()
    }

    pub fn elements(&self) -> Vec<Uid> {
        self.indices.iter().map(|i| i.element).collect()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a SelectionIndex;
    type IntoIter = std::slice::Iter<'a, SelectionIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}

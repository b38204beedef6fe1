//! Containers: the flat, ordered form of the graphs handed to persistence,
//! the clipboard and snapshot comparison.
//!
//! A [`ModelContainer`] lists bare elements with their owner Uid, objects in
//! preorder (root first) followed by relations grouped per owner in the same
//! preorder, so rebuilding by appending each entry restores every row. A
//! [`DiagramContainer`] lists the visuals of one diagram in z-order.

use crate::diagram::{DiagramElement, DiagramGraph};
use crate::error::{ContainerError, ModelError, Result};
use crate::model::{Element, ModelGraph, ObjectKind};
use crate::uid::Uid;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerEntry {
    /// `Uid::INVALID` for the root entry.
    pub owner: Uid,
    pub element: Element,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelContainer {
    pub entries: Vec<ContainerEntry>,
}

impl ModelContainer {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy the subtrees rooted at `roots` (objects with everything they own,
    /// relations on their own). Roots nested inside another root are folded
    /// into it; unknown Uids and the model root are skipped.
    pub fn capture(model: &ModelGraph, roots: &[Uid]) -> Self {
        let model_root = model.root();
        let candidates: Vec<Uid> = roots
            .iter()
            .copied()
            .filter(|uid| *uid != model_root && model.contains(*uid))
            .collect();
        let selected: Vec<Uid> = candidates
            .iter()
            .copied()
            .filter(|uid| !candidates.iter().any(|other| model.is_ancestor_of(*other, *uid)))
            .collect();

        let mut objects = Vec::new();
        let mut relations = Vec::new();
        let mut seen = HashSet::new();
        for uid in selected {
            if model.relation(uid).is_some() {
                if seen.insert(uid) {
                    relations.push(uid);
                }
                continue;
            }
            let mut stack = vec![uid];
            while let Some(current) = stack.pop() {
                if !seen.insert(current) {
                    continue;
                }
                objects.push(current);
                stack.extend(model.children(current).iter().rev().copied());
            }
        }
        for object in &objects {
            for relation in model.relations(*object) {
                if seen.insert(*relation) {
                    relations.push(*relation);
                }
            }
        }

        let entries = objects
            .into_iter()
            .chain(relations)
            .filter_map(|uid| {
                Some(ContainerEntry {
                    owner: model.owner_key(uid)?,
                    element: model.find(uid)?.bare(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, ContainerError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ContainerError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl ModelGraph {
    /// Flatten the whole model.
    pub fn export(&self) -> ModelContainer {
        let preorder = self.objects_preorder();
        let mut entries = Vec::with_capacity(self.element_count());
        for uid in &preorder {
            if let Some(element) = self.find(*uid) {
                entries.push(ContainerEntry {
                    owner: self.owner_key(*uid).unwrap_or(Uid::INVALID),
                    element: element.bare(),
                });
            }
        }
        for owner in &preorder {
            for relation in self.relations(*owner) {
                if let Some(element) = self.find(*relation) {
                    entries.push(ContainerEntry {
                        owner: *owner,
                        element: element.bare(),
                    });
                }
            }
        }
        entries.into()
    }

    /// Rebuild a model from an exported container. No notifications are sent.
    pub fn from_container(container: &ModelContainer) -> Result<Self> {
        let mut entries = container.entries.iter();
        let Some(ContainerEntry {
            owner,
            element: Element::Object(root),
        }) = entries.next()
        else {
            return Err(ModelError::InvalidContainer(
                "first entry must be the root object".into(),
            ));
        };
        if owner.is_valid() {
            return Err(ModelError::InvalidContainer(format!(
                "root entry {} names an owner",
                root.uid
            )));
        }
        let mut model = ModelGraph::with_root(root.clone());
        for entry in entries {
            model.insert_element(entry.element.clone(), entry.owner, usize::MAX, &mut ())?;
        }
        log::debug!("loaded model with {} element(s)", model.element_count());
        Ok(model)
    }
}

impl From<Vec<ContainerEntry>> for ModelContainer {
    fn from(entries: Vec<ContainerEntry>) -> Self {
        Self { entries }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramContainer {
    pub diagram: Uid,
    pub elements: Vec<DiagramElement>,
}

impl DiagramGraph {
    pub fn export(&self) -> DiagramContainer {
        DiagramContainer {
            diagram: self.uid(),
            elements: self.elements().cloned().collect(),
        }
    }

    /// Rebuild a diagram against `model`. Derived labels are recomputed from
    /// the model; every reference must resolve.
    pub fn from_container(
        container: &DiagramContainer,
        model: &ModelGraph,
        auto_wire: bool,
    ) -> Result<Self> {
        let diagram = container.diagram;
        if !matches!(model.object(diagram), Some(o) if o.kind == ObjectKind::Diagram) {
            return Err(ModelError::UnknownDiagram(diagram));
        }
        let mut graph = DiagramGraph::new(diagram, auto_wire);
        for element in &container.elements {
            graph.check_visual(model, element)?;
            graph.insert_visual(model, element.clone(), graph.len());
        }
        Ok(graph)
    }
}

/// A whole project: the model and every diagram, diagrams in model preorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectContainer {
    pub model: ModelContainer,
    pub diagrams: Vec<DiagramContainer>,
}

impl ProjectContainer {
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, ContainerError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ContainerError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{AdmitAll, Point};
    use crate::journal::Journal;
    use crate::model::RelationKind;
    use pretty_assertions::assert_eq;

    fn sample() -> (ModelGraph, Uid, Uid, Uid, Uid) {
        let mut model = ModelGraph::new("Model");
        let root = model.root();
        let p = model
            .create_object(ObjectKind::Package, root, "P", &mut ())
            .unwrap();
        let a = model
            .create_object(ObjectKind::Class, p, "A", &mut ())
            .unwrap();
        let b = model
            .create_object(ObjectKind::Class, root, "B", &mut ())
            .unwrap();
        let dep = model
            .create_relation(RelationKind::Dependency, p, a, b, "uses", &mut ())
            .unwrap();
        (model, p, a, b, dep)
    }

    #[test]
    fn export_lists_objects_then_relations() {
        let (model, p, a, b, dep) = sample();
        let container = model.export();
        let order: Vec<Uid> = container.entries.iter().map(|e| e.element.uid()).collect();
        assert_eq!(order, vec![model.root(), p, a, b, dep]);
        assert_eq!(container.entries[0].owner, Uid::INVALID);
    }

    #[test]
    fn model_round_trip_preserves_uids_and_rows() {
        let (model, ..) = sample();
        let exported = model.export();
        let rebuilt = ModelGraph::from_container(&exported).unwrap();
        assert_eq!(rebuilt.export(), exported);
        assert_eq!(rebuilt.objects_preorder(), model.objects_preorder());

        let bytes = exported.to_bytes().unwrap();
        assert_eq!(ModelContainer::from_bytes(&bytes).unwrap(), exported);
    }

    #[test]
    fn rejects_containers_without_a_root() {
        let err = ModelGraph::from_container(&ModelContainer::default()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidContainer(_)));
    }

    #[test]
    fn capture_takes_whole_subtrees_once() {
        let (model, p, a, _, dep) = sample();
        let captured = ModelContainer::capture(&model, &[a, p, model.root()]);
        let order: Vec<Uid> = captured.entries.iter().map(|e| e.element.uid()).collect();
        assert_eq!(order, vec![p, a, dep]);
        assert_eq!(captured.entries[0].owner, model.root());
    }

    #[test]
    fn diagram_round_trip() {
        let (mut model, _, a, b, dep) = sample();
        let root = model.root();
        let g = model
            .create_object(ObjectKind::Diagram, root, "G", &mut ())
            .unwrap();
        let mut diagram = DiagramGraph::new(g, true);
        let mut journal = Journal::disabled();
        diagram
            .add_existing(&model, a, Point::new(10.0, 10.0), &AdmitAll, &mut journal)
            .unwrap();
        diagram
            .add_existing(&model, b, Point::new(200.0, 10.0), &AdmitAll, &mut journal)
            .unwrap();
        diagram.add_annotation(&model, "note", Point::default(), &mut journal);
        assert!(diagram.shows(dep));

        let exported = diagram.export();
        let rebuilt = DiagramGraph::from_container(&exported, &model, true).unwrap();
        assert_eq!(rebuilt.export(), exported);

        let mut broken = exported.clone();
        broken.elements.remove(0);
        assert!(DiagramGraph::from_container(&broken, &model, true).is_err());
    }

    #[test]
    fn capture_ignores_root_and_unknown_uids_in_selection() {
        let (model, p, a, b, dep) = sample();
        let root = model.root();
        let uids = |c: ModelContainer| -> Vec<Uid> {
            c.entries.iter().map(|e| e.element.uid()).collect()
        };
        assert_eq!(uids(ModelContainer::capture(&model, &[root, p])), vec![p, a, dep]);
        assert_eq!(uids(ModelContainer::capture(&model, &[Uid::new(), b])), vec![b]);
        assert!(ModelContainer::capture(&model, &[root]).is_empty());
    }

    fn shown_pair() -> (ModelGraph, DiagramContainer, Uid) {
        let (mut model, _, a, b, _) = sample();
        let root = model.root();
        let g = model
            .create_object(ObjectKind::Diagram, root, "G", &mut ())
            .unwrap();
        let mut diagram = DiagramGraph::new(g, true);
        let mut journal = Journal::disabled();
        for (uid, x) in [(a, 0.0), (b, 200.0)] {
            diagram
                .add_existing(&model, uid, Point::new(x, 0.0), &AdmitAll, &mut journal)
                .unwrap();
        }
        (model, diagram.export(), g)
    }

    fn load(model: &ModelGraph, container: &DiagramContainer) -> Result<DiagramGraph> {
        DiagramGraph::from_container(container, model, true)
    }

    #[test]
    fn visuals_must_match_the_family_of_their_element() {
        let (model, exported, g) = shown_pair();
        assert_eq!(exported.elements.len(), 3);
        let dep = exported.elements[2].model().unwrap();

        let mut object_for_relation = exported.clone();
        if let DiagramElement::Object(object) = &mut object_for_relation.elements[0] {
            object.model = Some(dep);
        }
        assert!(matches!(
            load(&model, &object_for_relation),
            Err(ModelError::InvalidContainer(_))
        ));

        let mut relation_for_object = exported.clone();
        if let DiagramElement::Relation(relation) = &mut relation_for_object.elements[2] {
            relation.model = Some(g);
        }
        assert!(matches!(
            load(&model, &relation_for_object),
            Err(ModelError::InvalidContainer(_))
        ));
    }

    #[test]
    fn relation_visual_must_join_the_visuals_of_its_ends() {
        let (model, exported, _) = shown_pair();
        let mut swapped = exported.clone();
        if let DiagramElement::Relation(relation) = &mut swapped.elements[2] {
            std::mem::swap(&mut relation.end_a, &mut relation.end_b);
        }
        assert!(matches!(
            load(&model, &swapped),
            Err(ModelError::InvalidContainer(_))
        ));

        let loaded = load(&model, &exported).unwrap();
        assert!(loaded.shows(exported.elements[2].model().unwrap()));
    }
}

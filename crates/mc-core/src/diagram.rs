//! Diagram graphs: the visual side of the model.
//!
//! A [`DiagramGraph`] belongs to one diagram object of the model and owns its
//! visual elements outright. Visuals point back at semantic elements by Uid
//! only. A diagram reacts to model notifications for the Uids it shows:
//! removed elements lose their visuals before the delete returns, renamed or
//! moved elements get their derived label/context/icon refreshed, and new
//! relations between two shown objects are wired automatically.

use crate::error::{ModelError, Result};
use crate::invariant;
use crate::journal::{Change, Journal};
use crate::model::{Element, Family, ModelEvent, ModelGraph, ModelObject, ModelRelation, ObjectKind};
use crate::naming;
use crate::uid::Uid;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box of a visual object, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Default box for a freshly shown object, centered on `center`.
    pub fn for_kind(kind: Option<ObjectKind>, center: Point) -> Self {
        let (width, height) = match kind {
            Some(ObjectKind::Package) => (160.0, 100.0),
            Some(ObjectKind::Class) => (120.0, 80.0),
            Some(ObjectKind::Component) => (140.0, 70.0),
            Some(ObjectKind::Item) => (80.0, 80.0),
            Some(ObjectKind::Diagram) => (60.0, 60.0),
            None => (160.0, 60.0),
        };
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

// ─── Visual elements ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramObject {
    pub uid: Uid,
    /// The semantic object shown; `None` for free annotations.
    pub model: Option<Uid>,
    pub geometry: Geometry,
    pub label: String,
    /// Name of the semantic owner, shown as "(from …)".
    pub context: Option<String>,
    /// Icon key, derived from the first stereotype.
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramRelation {
    pub uid: Uid,
    /// The semantic relation shown, if any.
    pub model: Option<Uid>,
    /// Visual object at the first end.
    pub end_a: Uid,
    /// Visual object at the second end.
    pub end_b: Uid,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagramElement {
    Object(DiagramObject),
    Relation(DiagramRelation),
}

impl DiagramElement {
    pub fn uid(&self) -> Uid {
        match self {
            DiagramElement::Object(o) => o.uid,
            DiagramElement::Relation(r) => r.uid,
        }
    }

    pub fn model(&self) -> Option<Uid> {
        match self {
            DiagramElement::Object(o) => o.model,
            DiagramElement::Relation(r) => r.model,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DiagramElement::Object(o) => &o.label,
            DiagramElement::Relation(r) => &r.label,
        }
    }

    pub fn as_object(&self) -> Option<&DiagramObject> {
        match self {
            DiagramElement::Object(o) => Some(o),
            DiagramElement::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&DiagramRelation> {
        match self {
            DiagramElement::Relation(r) => Some(r),
            DiagramElement::Object(_) => None,
        }
    }
}

// ─── Admission ───────────────────────────────────────────────────────────

/// Decides whether a semantic element may be shown in a diagram.
/// The policy itself lives outside this crate.
pub trait AdmissionCheck {
    fn admits(&self, diagram: &ModelObject, element: &Element) -> bool;
}

/// Admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl AdmissionCheck for AdmitAll {
    fn admits(&self, _diagram: &ModelObject, _element: &Element) -> bool {
        true
    }
}

impl<F> AdmissionCheck for F
where
    F: Fn(&ModelObject, &Element) -> bool,
{
    fn admits(&self, diagram: &ModelObject, element: &Element) -> bool {
        self(diagram, element)
    }
}

// ─── Diagram graph ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DiagramGraph {
    /// Uid of the diagram object in the model.
    uid: Uid,
    /// Visuals in z-order.
    elements: IndexMap<Uid, DiagramElement>,
    /// Semantic Uid → visual Uid. A semantic element is shown at most once.
    by_model: HashMap<Uid, Uid>,
    auto_wire: bool,
}

impl DiagramGraph {
    pub fn new(uid: Uid, auto_wire: bool) -> Self {
        Self {
            uid,
            elements: IndexMap::new(),
            by_model: HashMap::new(),
            auto_wire,
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn auto_wire(&self) -> bool {
        self.auto_wire
    }

    pub fn set_auto_wire(&mut self, enabled: bool) {
        self.auto_wire = enabled;
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &DiagramElement> {
        self.elements.values()
    }

    pub fn element(&self, visual: Uid) -> Option<&DiagramElement> {
        self.elements.get(&visual)
    }

    /// Visual showing the semantic element `model_uid`, if any.
    pub fn visual_of(&self, model_uid: Uid) -> Option<Uid> {
        self.by_model.get(&model_uid).copied()
    }

    pub fn shows(&self, model_uid: Uid) -> bool {
        self.by_model.contains_key(&model_uid)
    }

    pub fn row_of(&self, visual: Uid) -> Option<usize> {
        self.elements.get_index_of(&visual)
    }

    /// Visual relations attached to the visual object `visual`.
    fn attached_relations(&self, visual: Uid) -> Vec<Uid> {
        self.elements
            .values()
            .filter_map(DiagramElement::as_relation)
            .filter(|r| r.end_a == visual || r.end_b == visual)
            .map(|r| r.uid)
            .collect()
    }

    // ─── Adding ──────────────────────────────────────────────────────────

    /// Show an existing semantic element in this diagram.
    ///
    /// Objects are placed centered on `position`. A relation can only be
    /// shown once both of its ends are. With auto-wiring on, showing an
    /// object also shows the relations linking it to objects already here.
    pub fn add_existing(
        &mut self,
        model: &ModelGraph,
        model_uid: Uid,
        position: Point,
        admission: &dyn AdmissionCheck,
        journal: &mut Journal,
    ) -> Result<Uid> {
        let element = model
            .find(model_uid)
            .ok_or(ModelError::DanglingReference(model_uid))?;
        if self.shows(model_uid) {
            return Err(ModelError::AlreadyPresent {
                element: model_uid,
                diagram: self.uid,
            });
        }
        let diagram = model
            .object(self.uid)
            .ok_or(ModelError::UnknownDiagram(self.uid))?;
        let not_addable = ModelError::NotAddable {
            element: model_uid,
            diagram: self.uid,
        };
        if !admission.admits(diagram, element) {
            return Err(not_addable);
        }

        match element {
            Element::Object(object) => {
                let visual = DiagramObject {
                    uid: Uid::new(),
                    model: Some(model_uid),
                    geometry: Geometry::for_kind(Some(object.kind), position),
                    label: String::new(),
                    context: None,
                    icon: None,
                };
                let id = self.push(model, DiagramElement::Object(visual), journal);
                if self.auto_wire {
                    for relation in model.relations_touching(model_uid) {
                        self.wire(model, relation, journal);
                    }
                }
                Ok(id)
            }
            Element::Relation(relation) => {
                let (Some(a), Some(b)) =
                    (self.visual_of(relation.end_a), self.visual_of(relation.end_b))
                else {
                    return Err(not_addable);
                };
                let visual = Self::relation_visual(relation, a, b);
                Ok(self.push(model, DiagramElement::Relation(visual), journal))
            }
        }
    }

    /// Place a free text annotation (no semantic counterpart).
    pub fn add_annotation(
        &mut self,
        model: &ModelGraph,
        text: &str,
        position: Point,
        journal: &mut Journal,
    ) -> Uid {
        let visual = DiagramObject {
            uid: Uid::new(),
            model: None,
            geometry: Geometry::for_kind(None, position),
            label: text.to_string(),
            context: None,
            icon: None,
        };
        self.push(model, DiagramElement::Object(visual), journal)
    }

    /// Show the semantic relation if both ends are shown and it is not yet.
    fn wire(&mut self, model: &ModelGraph, relation: Uid, journal: &mut Journal) {
        if self.shows(relation) {
            return;
        }
        let Some(rel) = model.relation(relation) else {
            return;
        };
        if let (Some(a), Some(b)) = (self.visual_of(rel.end_a), self.visual_of(rel.end_b)) {
            let visual = Self::relation_visual(rel, a, b);
            log::debug!("auto-wiring {relation:?} in diagram {:?}", self.uid);
            self.push(model, DiagramElement::Relation(visual), journal);
        }
    }

    fn relation_visual(relation: &ModelRelation, end_a: Uid, end_b: Uid) -> DiagramRelation {
        DiagramRelation {
            uid: Uid::new(),
            model: Some(relation.uid),
            end_a,
            end_b,
            label: String::new(),
        }
    }

    fn push(&mut self, model: &ModelGraph, element: DiagramElement, journal: &mut Journal) -> Uid {
        let row = self.elements.len();
        let id = element.uid();
        self.insert_visual(model, element, row);
        if let Some(element) = self.elements.get(&id) {
            journal.record(Change::AddVisual {
                diagram: self.uid,
                element: element.clone(),
                row,
            });
        }
        id
    }

    /// Add a prebuilt visual on top, recorded. Used when visuals are copied
    /// from another diagram.
    pub fn restore(
        &mut self,
        model: &ModelGraph,
        element: DiagramElement,
        journal: &mut Journal,
    ) -> Result<Uid> {
        self.check_visual(model, &element)?;
        Ok(self.push(model, element, journal))
    }

    /// Whether `element` can join this diagram as is: a new visual Uid, a
    /// semantic reference of the matching family that is not shown yet, and
    /// for relations, ends on the visuals of the semantic ends.
    pub(crate) fn check_visual(&self, model: &ModelGraph, element: &DiagramElement) -> Result<()> {
        let uid = element.uid();
        if self.elements.contains_key(&uid) {
            return Err(ModelError::DuplicateUid(uid));
        }
        if let Some(model_uid) = element.model() {
            let semantic = model
                .find(model_uid)
                .ok_or(ModelError::DanglingReference(model_uid))?;
            if self.shows(model_uid) {
                return Err(ModelError::AlreadyPresent {
                    element: model_uid,
                    diagram: self.uid,
                });
            }
            let same_family = match element {
                DiagramElement::Object(_) => semantic.as_object().is_some(),
                DiagramElement::Relation(_) => semantic.as_relation().is_some(),
            };
            if !same_family {
                return Err(ModelError::InvalidContainer(format!(
                    "visual {uid} and element {model_uid} are of different families"
                )));
            }
        }
        if let DiagramElement::Relation(relation) = element {
            for end in [relation.end_a, relation.end_b] {
                if self.element(end).and_then(DiagramElement::as_object).is_none() {
                    return Err(ModelError::InvalidContainer(format!(
                        "visual relation {uid} attaches to unknown visual {end}"
                    )));
                }
            }
            if let Some(semantic) = relation.model.and_then(|m| model.relation(m))
                && (self.visual_of(semantic.end_a) != Some(relation.end_a)
                    || self.visual_of(semantic.end_b) != Some(relation.end_b))
            {
                return Err(ModelError::InvalidContainer(format!(
                    "visual relation {uid} does not join the visuals of its ends"
                )));
            }
        }
        Ok(())
    }

    /// Insert a visual at `row` (clamped). Derived state is refreshed from
    /// the model. Used directly when replaying journals.
    pub fn insert_visual(&mut self, model: &ModelGraph, element: DiagramElement, row: usize) {
        let id = element.uid();
        invariant!(
            !self.elements.contains_key(&id),
            "visual {id:?} already in diagram {:?}",
            self.uid
        );
        if let Some(model_uid) = element.model() {
            self.by_model.insert(model_uid, id);
        }
        let row = row.min(self.elements.len());
        self.elements.shift_insert(row, id, element);
        self.refresh(model, id);
    }

    // ─── Removing ────────────────────────────────────────────────────────

    /// Remove a visual. Removing an object also removes the visual relations
    /// attached to it. The semantic model is not touched.
    pub fn remove(&mut self, visual: Uid, journal: &mut Journal) -> Result<()> {
        if !self.elements.contains_key(&visual) {
            return Err(ModelError::UnknownElement(visual));
        }
        self.detach(visual, journal);
        Ok(())
    }

    /// Remove every visual, relations first.
    pub fn clear(&mut self, journal: &mut Journal) {
        let ids: Vec<Uid> = self.elements.keys().rev().copied().collect();
        for id in ids {
            if self.elements.contains_key(&id) {
                self.detach(id, journal);
            }
        }
    }

    /// Remove a present visual with its attached relations.
    fn detach(&mut self, visual: Uid, journal: &mut Journal) {
        if matches!(self.elements.get(&visual), Some(DiagramElement::Object(_))) {
            for relation in self.attached_relations(visual).into_iter().rev() {
                self.remove_recorded(relation, journal);
            }
        }
        self.remove_recorded(visual, journal);
    }

    fn remove_recorded(&mut self, visual: Uid, journal: &mut Journal) {
        let row = self.row_of(visual);
        if let (Some(row), Some(element)) = (row, self.remove_visual(visual)) {
            journal.record(Change::RemoveVisual {
                diagram: self.uid,
                element,
                row,
            });
        }
    }

    /// Remove exactly one visual, nothing attached. Used when replaying.
    pub fn remove_visual(&mut self, visual: Uid) -> Option<DiagramElement> {
        let element = self.elements.shift_remove(&visual)?;
        if let Some(model_uid) = element.model() {
            self.by_model.remove(&model_uid);
        }
        log::trace!("diagram {:?}: removed visual {visual:?}", self.uid);
        Some(element)
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Replace the box of a visual object. Unchanged geometry records nothing.
    pub fn set_geometry(
        &mut self,
        visual: Uid,
        geometry: Geometry,
        journal: &mut Journal,
    ) -> Result<()> {
        let before = self
            .geometry(visual)
            .ok_or(ModelError::UnknownElement(visual))?;
        if before == geometry {
            return Ok(());
        }
        self.apply_geometry(visual, geometry);
        journal.record(Change::Reshape {
            diagram: self.uid,
            visual,
            before,
            after: geometry,
        });
        Ok(())
    }

    pub fn move_by(&mut self, visual: Uid, dx: f32, dy: f32, journal: &mut Journal) -> Result<()> {
        let current = self
            .geometry(visual)
            .ok_or(ModelError::UnknownElement(visual))?;
        self.set_geometry(visual, current.translated(dx, dy), journal)
    }

    pub fn resize(
        &mut self,
        visual: Uid,
        width: f32,
        height: f32,
        journal: &mut Journal,
    ) -> Result<()> {
        let current = self
            .geometry(visual)
            .ok_or(ModelError::UnknownElement(visual))?;
        let resized = Geometry {
            width: width.max(1.0),
            height: height.max(1.0),
            ..current
        };
        self.set_geometry(visual, resized, journal)
    }

    pub fn geometry(&self, visual: Uid) -> Option<Geometry> {
        self.elements
            .get(&visual)
            .and_then(DiagramElement::as_object)
            .map(|o| o.geometry)
    }

    /// Set geometry without recording. Used when replaying.
    pub fn apply_geometry(&mut self, visual: Uid, geometry: Geometry) {
        if let Some(DiagramElement::Object(object)) = self.elements.get_mut(&visual) {
            object.geometry = geometry;
        }
    }

    // ─── Model reactions ─────────────────────────────────────────────────

    /// React to a model notification. `wiring` is off while journals are
    /// replayed, because the journal already holds the wired visuals.
    pub fn model_changed(
        &mut self,
        model: &ModelGraph,
        event: &ModelEvent,
        wiring: bool,
        journal: &mut Journal,
    ) {
        match event {
            ModelEvent::EndRemove { element, .. } => {
                if let Some(visual) = self.visual_of(element.uid()) {
                    log::debug!(
                        "diagram {:?}: dropping visual of deleted {:?}",
                        self.uid,
                        element.uid()
                    );
                    self.detach(visual, journal);
                }
            }
            ModelEvent::EndInsert {
                uid,
                family: Family::Relation,
                ..
            } if wiring && self.auto_wire => self.wire(model, *uid, journal),
            ModelEvent::EndMove { uid, .. } => self.refresh_model(model, *uid),
            ModelEvent::EndUpdate { uid, family, .. } => {
                self.refresh_model(model, *uid);
                if *family == Family::Object {
                    for child in model.children(*uid) {
                        self.refresh_model(model, *child);
                    }
                }
            }
            _ => {}
        }
    }

    fn refresh_model(&mut self, model: &ModelGraph, model_uid: Uid) {
        if let Some(visual) = self.visual_of(model_uid) {
            self.refresh(model, visual);
        }
    }

    /// Recompute label, context and icon from the model. Geometry is kept.
    fn refresh(&mut self, model: &ModelGraph, visual: Uid) {
        let Some(element) = self.elements.get_mut(&visual) else {
            return;
        };
        let Some(model_uid) = element.model() else {
            return;
        };
        let Some(semantic) = model.find(model_uid) else {
            return;
        };
        match element {
            DiagramElement::Object(object) => {
                object.label = naming::element_label(semantic);
                object.context = model
                    .owner_key(model_uid)
                    .and_then(|owner| model.find(owner))
                    .map(|owner| owner.name().to_string());
                object.icon = semantic.data().stereotypes.first().cloned();
            }
            DiagramElement::Relation(relation) => {
                relation.label = semantic.name().to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationKind;

    struct Fixture {
        model: ModelGraph,
        diagram: DiagramGraph,
        a: Uid,
        b: Uid,
        dep: Uid,
    }

    fn fixture(auto_wire: bool) -> Fixture {
        let mut model = ModelGraph::new("Model");
        let root = model.root();
        let g = model
            .create_object(ObjectKind::Diagram, root, "G", &mut ())
            .unwrap();
        let a = model
            .create_object(ObjectKind::Class, root, "A", &mut ())
            .unwrap();
        let b = model
            .create_object(ObjectKind::Class, root, "B", &mut ())
            .unwrap();
        let dep = model
            .create_relation(RelationKind::Dependency, root, a, b, "uses", &mut ())
            .unwrap();
        Fixture {
            model,
            diagram: DiagramGraph::new(g, auto_wire),
            a,
            b,
            dep,
        }
    }

    #[test]
    fn add_existing_derives_label_and_context() {
        let mut f = fixture(false);
        let mut journal = Journal::recording();
        let id = f
            .diagram
            .add_existing(&f.model, f.a, Point::new(100.0, 100.0), &AdmitAll, &mut journal)
            .unwrap();
        let object = f.diagram.element(id).unwrap().as_object().unwrap();
        assert_eq!(object.label, "A");
        assert_eq!(object.context.as_deref(), Some("Model"));
        assert_eq!(object.geometry.center(), Point::new(100.0, 100.0));
        assert_eq!(journal.changes().len(), 1);
    }

    #[test]
    fn add_existing_rejects_duplicates_and_unknowns() {
        let mut f = fixture(false);
        let mut journal = Journal::disabled();
        f.diagram
            .add_existing(&f.model, f.a, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        let err = f
            .diagram
            .add_existing(&f.model, f.a, Point::default(), &AdmitAll, &mut journal)
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::AlreadyPresent {
                element: f.a,
                diagram: f.diagram.uid()
            }
        );

        let ghost = Uid::new();
        let err = f
            .diagram
            .add_existing(&f.model, ghost, Point::default(), &AdmitAll, &mut journal)
            .unwrap_err();
        assert_eq!(err, ModelError::DanglingReference(ghost));
    }

    #[test]
    fn admission_check_is_enforced() {
        let mut f = fixture(false);
        let no_classes = |_: &ModelObject, e: &Element| {
            !matches!(e, Element::Object(o) if o.kind == ObjectKind::Class)
        };
        let err = f
            .diagram
            .add_existing(&f.model, f.a, Point::default(), &no_classes, &mut Journal::disabled())
            .unwrap_err();
        assert!(matches!(err, ModelError::NotAddable { .. }));
        assert!(f.diagram.is_empty());
    }

    #[test]
    fn relation_needs_both_ends_shown() {
        let mut f = fixture(false);
        let mut journal = Journal::disabled();
        f.diagram
            .add_existing(&f.model, f.a, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        let err = f
            .diagram
            .add_existing(&f.model, f.dep, Point::default(), &AdmitAll, &mut journal)
            .unwrap_err();
        assert!(matches!(err, ModelError::NotAddable { .. }));

        f.diagram
            .add_existing(&f.model, f.b, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        let rel = f
            .diagram
            .add_existing(&f.model, f.dep, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        assert_eq!(f.diagram.element(rel).unwrap().label(), "uses");
    }

    #[test]
    fn auto_wire_on_add() {
        let mut f = fixture(true);
        let mut journal = Journal::recording();
        f.diagram
            .add_existing(&f.model, f.a, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        assert!(!f.diagram.shows(f.dep));
        f.diagram
            .add_existing(&f.model, f.b, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        assert!(f.diagram.shows(f.dep));
        assert_eq!(f.diagram.len(), 3);
        assert_eq!(journal.changes().len(), 3);
    }

    #[test]
    fn removing_an_object_removes_attached_relations() {
        let mut f = fixture(true);
        let mut journal = Journal::recording();
        let va = f
            .diagram
            .add_existing(&f.model, f.a, Point::default(), &AdmitAll, &mut journal)
            .unwrap();
        f.diagram
            .add_existing(&f.model, f.b, Point::default(), &AdmitAll, &mut journal)
            .unwrap();

        let mut journal = Journal::recording();
        f.diagram.remove(va, &mut journal).unwrap();
        assert!(!f.diagram.shows(f.a));
        assert!(!f.diagram.shows(f.dep));
        assert!(f.diagram.shows(f.b));
        // Relation visual goes first so reverse replay restores its ends first.
        let removed: Vec<Option<Uid>> = journal
            .changes()
            .iter()
            .map(|c| match c {
                Change::RemoveVisual { element, .. } => element.model(),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![Some(f.dep), Some(f.a)]);
        // The semantic model is untouched.
        assert!(f.model.contains(f.a));
    }

    #[test]
    fn geometry_edits_are_recorded_once_changed() {
        let mut f = fixture(false);
        let mut journal = Journal::recording();
        let va = f
            .diagram
            .add_existing(&f.model, f.a, Point::new(60.0, 40.0), &AdmitAll, &mut journal)
            .unwrap();
        let before = f.diagram.geometry(va).unwrap();

        let mut journal = Journal::recording();
        f.diagram.move_by(va, 10.0, 5.0, &mut journal).unwrap();
        f.diagram.move_by(va, 0.0, 0.0, &mut journal).unwrap();
        assert_eq!(journal.changes().len(), 1);
        assert_eq!(f.diagram.geometry(va).unwrap(), before.translated(10.0, 5.0));

        f.diagram.resize(va, 300.0, 200.0, &mut journal).unwrap();
        let after = f.diagram.geometry(va).unwrap();
        assert_eq!((after.width, after.height), (300.0, 200.0));
    }

    #[test]
    fn annotations_have_no_model_reference() {
        let mut f = fixture(true);
        let note = f
            .diagram
            .add_annotation(&f.model, "draft", Point::default(), &mut Journal::disabled());
        let object = f.diagram.element(note).unwrap().as_object().unwrap();
        assert_eq!(object.model, None);
        assert_eq!(object.label, "draft");
    }
}

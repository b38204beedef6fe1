//! Semantic model graph.
//!
//! The model is an ownership tree of packages, classes, components, items and
//! diagrams, plus relations owned by objects and pointing at two objects.
//! Elements live in a `StableDiGraph` arena; `Owns` edges go owner → owned
//! and `Endpoint` edges go relation → object. A `Uid → NodeIndex` index is
//! kept in lockstep with the arena, so every lookup is O(1).
//!
//! Every structural change is announced to a [`ModelObserver`] as a
//! begin/end pair, synchronously and in the order it happens: owners before
//! owned elements on insert, owned elements (and relations touching an
//! object) before their owner on delete.

use crate::error::{ModelError, Result};
use crate::invariant;
use crate::uid::Uid;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

// ─── Element kinds ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Package,
    Class,
    Component,
    /// Generic item with a free-form variety (e.g. "database", "actor").
    Item,
    /// A diagram lives in the package tree like any other object.
    Diagram,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Package => "package",
            ObjectKind::Class => "class",
            ObjectKind::Component => "component",
            ObjectKind::Item => "item",
            ObjectKind::Diagram => "diagram",
        }
    }

    /// Name given to freshly created objects of this kind.
    pub fn default_name(self) -> &'static str {
        match self {
            ObjectKind::Package => "New Package",
            ObjectKind::Class => "New Class",
            ObjectKind::Component => "New Component",
            ObjectKind::Item => "New Item",
            ObjectKind::Diagram => "New Diagram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Dependency,
    Inheritance,
    Association,
    Connection,
}

impl RelationKind {
    pub fn name(self) -> &'static str {
        match self {
            RelationKind::Dependency => "dependency",
            RelationKind::Inheritance => "inheritance",
            RelationKind::Association => "association",
            RelationKind::Connection => "connection",
        }
    }

    /// Directed relations read `end_a → end_b`.
    pub fn is_directed(self) -> bool {
        matches!(self, RelationKind::Dependency | RelationKind::Inheritance)
    }
}

/// The editable, non-structural part of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementData {
    pub name: String,
    pub stereotypes: SmallVec<[String; 2]>,
    pub description: String,
}

impl ElementData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelObject {
    pub uid: Uid,
    pub kind: ObjectKind,
    pub data: ElementData,
    /// Owned child objects in row order. Maintained by [`ModelGraph`].
    #[serde(skip)]
    children: Vec<Uid>,
    /// Owned relations in row order. Maintained by [`ModelGraph`].
    #[serde(skip)]
    relations: Vec<Uid>,
}

impl ModelObject {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::with_uid(Uid::new(), kind, name)
    }

    pub fn with_uid(uid: Uid, kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            uid,
            kind,
            data: ElementData::named(name),
            children: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn children(&self) -> &[Uid] {
        &self.children
    }

    pub fn relations(&self) -> &[Uid] {
        &self.relations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRelation {
    pub uid: Uid,
    pub kind: RelationKind,
    pub data: ElementData,
    pub end_a: Uid,
    pub end_b: Uid,
}

impl ModelRelation {
    pub fn new(kind: RelationKind, end_a: Uid, end_b: Uid, name: impl Into<String>) -> Self {
        Self {
            uid: Uid::new(),
            kind,
            data: ElementData::named(name),
            end_a,
            end_b,
        }
    }

    pub fn touches(&self, uid: Uid) -> bool {
        self.end_a == uid || self.end_b == uid
    }
}

/// A semantic element: closed over the two families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Object(ModelObject),
    Relation(ModelRelation),
}

/// Which owned list an element sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Object,
    Relation,
}

impl Element {
    pub fn uid(&self) -> Uid {
        match self {
            Element::Object(o) => o.uid,
            Element::Relation(r) => r.uid,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Element::Object(_) => Family::Object,
            Element::Relation(_) => Family::Relation,
        }
    }

    pub fn data(&self) -> &ElementData {
        match self {
            Element::Object(o) => &o.data,
            Element::Relation(r) => &r.data,
        }
    }

    fn data_mut(&mut self) -> &mut ElementData {
        match self {
            Element::Object(o) => &mut o.data,
            Element::Relation(r) => &mut r.data,
        }
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn as_object(&self) -> Option<&ModelObject> {
        match self {
            Element::Object(o) => Some(o),
            Element::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&ModelRelation> {
        match self {
            Element::Relation(r) => Some(r),
            Element::Object(_) => None,
        }
    }

    pub fn is_diagram(&self) -> bool {
        matches!(self, Element::Object(o) if o.kind == ObjectKind::Diagram)
    }

    /// A copy without owned children: the form stored in journals and
    /// containers. Ownership is rebuilt by re-inserting.
    pub fn bare(&self) -> Element {
        match self {
            Element::Object(o) => Element::Object(ModelObject {
                children: Vec::new(),
                relations: Vec::new(),
                ..o.clone()
            }),
            Element::Relation(r) => Element::Relation(r.clone()),
        }
    }

    fn into_bare(self) -> Element {
        match self {
            Element::Object(mut o) => {
                o.children.clear();
                o.relations.clear();
                Element::Object(o)
            }
            relation => relation,
        }
    }
}

impl From<ModelObject> for Element {
    fn from(object: ModelObject) -> Self {
        Element::Object(object)
    }
}

impl From<ModelRelation> for Element {
    fn from(relation: ModelRelation) -> Self {
        Element::Relation(relation)
    }
}

// ─── Notifications ───────────────────────────────────────────────────────

/// Where an element sits: its owner and its row within the owner's list of
/// the same family. The root reports `Uid::INVALID` as owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub owner: Uid,
    pub row: usize,
}

/// A structural notification. Every `Begin*` is followed by the matching
/// `End*` for the same element before any other event is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    BeginInsert {
        uid: Uid,
        family: Family,
        at: Position,
    },
    EndInsert {
        uid: Uid,
        family: Family,
        at: Position,
    },
    BeginRemove {
        uid: Uid,
        family: Family,
        at: Position,
    },
    /// Carries the removed element (without owned children).
    EndRemove { element: Element, at: Position },
    BeginMove {
        uid: Uid,
        family: Family,
        from: Position,
        to: Position,
    },
    EndMove {
        uid: Uid,
        family: Family,
        from: Position,
        to: Position,
    },
    BeginUpdate {
        uid: Uid,
        family: Family,
        at: Position,
    },
    /// Carries the data as it was before the update.
    EndUpdate {
        uid: Uid,
        family: Family,
        at: Position,
        before: ElementData,
    },
}

impl ModelEvent {
    pub fn uid(&self) -> Uid {
        match self {
            ModelEvent::BeginInsert { uid, .. }
            | ModelEvent::EndInsert { uid, .. }
            | ModelEvent::BeginRemove { uid, .. }
            | ModelEvent::BeginMove { uid, .. }
            | ModelEvent::EndMove { uid, .. }
            | ModelEvent::BeginUpdate { uid, .. }
            | ModelEvent::EndUpdate { uid, .. } => *uid,
            ModelEvent::EndRemove { element, .. } => element.uid(),
        }
    }
}

/// Receives model notifications while a mutation is in progress.
///
/// The model is handed back read-only so observers can resolve Uids; at a
/// `Begin*` it still shows the old state, at an `End*` the new one.
pub trait ModelObserver {
    fn model_changed(&mut self, model: &ModelGraph, event: &ModelEvent);
}

/// No observer.
impl ModelObserver for () {
    fn model_changed(&mut self, _model: &ModelGraph, _event: &ModelEvent) {}
}

/// Records every event, in order.
impl ModelObserver for Vec<ModelEvent> {
    fn model_changed(&mut self, _model: &ModelGraph, event: &ModelEvent) {
        self.push(event.clone());
    }
}

// ─── Model graph ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Owns,
    Endpoint,
}

#[derive(Debug, Clone)]
pub struct ModelGraph {
    graph: StableDiGraph<Element, Link>,
    root: NodeIndex,
    id_index: HashMap<Uid, NodeIndex>,
}

impl ModelGraph {
    /// Create a model holding only a root package.
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        Self::with_root(ModelObject::new(ObjectKind::Package, root_name))
    }

    /// Create a model around an existing root object (used when loading).
    pub fn with_root(root: ModelObject) -> Self {
        let uid = root.uid;
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Element::Object(root).into_bare());
        let mut id_index = HashMap::new();
        id_index.insert(uid, root);
        Self {
            graph,
            root,
            id_index,
        }
    }

    pub fn root(&self) -> Uid {
        self.graph[self.root].uid()
    }

    /// Number of elements, root included.
    pub fn element_count(&self) -> usize {
        self.id_index.len()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.id_index.contains_key(&uid)
    }

    pub fn find(&self, uid: Uid) -> Option<&Element> {
        self.id_index.get(&uid).map(|idx| &self.graph[*idx])
    }

    pub fn object(&self, uid: Uid) -> Option<&ModelObject> {
        self.find(uid).and_then(Element::as_object)
    }

    pub fn relation(&self, uid: Uid) -> Option<&ModelRelation> {
        self.find(uid).and_then(Element::as_relation)
    }

    /// Uid of the owning object; `None` for the root and for unknown Uids.
    pub fn owner_key(&self, uid: Uid) -> Option<Uid> {
        let idx = self.id_index.get(&uid)?;
        self.owner_index_of(*idx).map(|owner| self.graph[owner].uid())
    }

    /// Owner and row of an element. The root sits at `(INVALID, 0)`.
    pub fn position_of(&self, uid: Uid) -> Option<Position> {
        let element = self.find(uid)?;
        let Some(owner) = self.owner_key(uid) else {
            return Some(Position {
                owner: Uid::INVALID,
                row: 0,
            });
        };
        let row = self
            .owned(owner, element.family())
            .iter()
            .position(|u| *u == uid)?;
        Some(Position { owner, row })
    }

    /// Child objects of `uid` in row order (empty for relations and unknown Uids).
    pub fn children(&self, uid: Uid) -> &[Uid] {
        self.owned(uid, Family::Object)
    }

    /// Relations owned by `uid` in row order.
    pub fn relations(&self, uid: Uid) -> &[Uid] {
        self.owned(uid, Family::Relation)
    }

    fn owned(&self, owner: Uid, family: Family) -> &[Uid] {
        match (self.object(owner), family) {
            (Some(o), Family::Object) => &o.children,
            (Some(o), Family::Relation) => &o.relations,
            (None, _) => &[],
        }
    }

    /// Relations (wherever owned) with `uid` as an endpoint.
    pub fn relations_touching(&self, uid: Uid) -> Vec<Uid> {
        let Some(idx) = self.id_index.get(&uid) else {
            return Vec::new();
        };
        let mut found: Vec<Uid> = Vec::new();
        for edge in self.graph.edges_directed(*idx, Direction::Incoming) {
            if *edge.weight() == Link::Endpoint {
                let relation = self.graph[edge.source()].uid();
                if !found.contains(&relation) {
                    found.push(relation);
                }
            }
        }
        // Adjacency lists are newest-first; report in insertion order.
        found.reverse();
        found
    }

    /// Check if `ancestor` owns `descendant` directly or transitively.
    pub fn is_ancestor_of(&self, ancestor: Uid, descendant: Uid) -> bool {
        if ancestor == descendant {
            return false;
        }
        let Some(mut current) = self.id_index.get(&descendant).copied() else {
            return false;
        };
        while let Some(owner) = self.owner_index_of(current) {
            if self.graph[owner].uid() == ancestor {
                return true;
            }
            current = owner;
        }
        false
    }

    /// All objects, owners before their children, children in row order.
    pub fn objects_preorder(&self) -> Vec<Uid> {
        let mut out = Vec::with_capacity(self.id_index.len());
        let mut stack = vec![self.root()];
        while let Some(uid) = stack.pop() {
            out.push(uid);
            stack.extend(self.children(uid).iter().rev().copied());
        }
        out
    }

    fn owner_index_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|edge| *edge.weight() == Link::Owns)
            .map(|edge| edge.source())
    }

    fn index(&self, uid: Uid) -> Result<NodeIndex> {
        self.id_index
            .get(&uid)
            .copied()
            .ok_or(ModelError::UnknownElement(uid))
    }

    /// Resolve an owner Uid: it must exist and be an object.
    fn owner_index(&self, owner: Uid) -> Result<NodeIndex> {
        let idx = self
            .id_index
            .get(&owner)
            .copied()
            .ok_or(ModelError::DanglingReference(owner))?;
        match &self.graph[idx] {
            Element::Object(_) => Ok(idx),
            Element::Relation(_) => Err(ModelError::InvalidOwner(owner)),
        }
    }

    fn owned_mut(&mut self, owner: NodeIndex, family: Family) -> &mut Vec<Uid> {
        match &mut self.graph[owner] {
            Element::Object(o) => match family {
                Family::Object => &mut o.children,
                Family::Relation => &mut o.relations,
            },
            Element::Relation(r) => {
                let uid = r.uid;
                invariant!(false, "relation {uid:?} used as an owner");
                unreachable!()
            }
        }
    }

    // ─── Insert ──────────────────────────────────────────────────────────

    pub fn create_object(
        &mut self,
        kind: ObjectKind,
        owner: Uid,
        name: &str,
        observer: &mut dyn ModelObserver,
    ) -> Result<Uid> {
        let row = self.children(owner).len();
        self.insert_element(ModelObject::new(kind, name).into(), owner, row, observer)
    }

    pub fn create_relation(
        &mut self,
        kind: RelationKind,
        owner: Uid,
        end_a: Uid,
        end_b: Uid,
        name: &str,
        observer: &mut dyn ModelObserver,
    ) -> Result<Uid> {
        let row = self.relations(owner).len();
        let relation = ModelRelation::new(kind, end_a, end_b, name);
        self.insert_element(relation.into(), owner, row, observer)
    }

    /// Insert a prebuilt element under `owner` at `row` (clamped to the end).
    ///
    /// Any owned children the element carries are dropped; ownership is
    /// rebuilt by inserting the children themselves.
    pub fn insert_element(
        &mut self,
        element: Element,
        owner: Uid,
        row: usize,
        observer: &mut dyn ModelObserver,
    ) -> Result<Uid> {
        let uid = element.uid();
        if !uid.is_valid() {
            return Err(ModelError::MalformedId(uid.to_string()));
        }
        if self.id_index.contains_key(&uid) {
            return Err(ModelError::DuplicateUid(uid));
        }
        let owner_idx = self.owner_index(owner)?;
        let mut endpoints = SmallVec::<[NodeIndex; 2]>::new();
        if let Element::Relation(relation) = &element {
            for end in [relation.end_a, relation.end_b] {
                match self.id_index.get(&end) {
                    Some(idx) if self.graph[*idx].as_object().is_some() => {
                        if !endpoints.contains(idx) {
                            endpoints.push(*idx);
                        }
                    }
                    _ => return Err(ModelError::DanglingReference(end)),
                }
            }
        }

        let family = element.family();
        let row = row.min(self.owned(owner, family).len());
        let at = Position { owner, row };

        observer.model_changed(self, &ModelEvent::BeginInsert { uid, family, at });
        let idx = self.graph.add_node(element.into_bare());
        self.graph.add_edge(owner_idx, idx, Link::Owns);
        for end in endpoints {
            self.graph.add_edge(idx, end, Link::Endpoint);
        }
        self.id_index.insert(uid, idx);
        self.owned_mut(owner_idx, family).insert(row, uid);
        log::trace!("inserted {uid:?} under {owner:?} at row {row}");
        observer.model_changed(self, &ModelEvent::EndInsert { uid, family, at });
        Ok(uid)
    }

    // ─── Remove ──────────────────────────────────────────────────────────

    /// Delete an element and everything that depends on it.
    ///
    /// Returns the removed Uids in removal order.
    pub fn delete(&mut self, uid: Uid, observer: &mut dyn ModelObserver) -> Result<Vec<Uid>> {
        self.delete_all(&[uid], observer)
    }

    /// Delete several elements as one cascade. Either every Uid is valid and
    /// the whole cascade runs, or nothing changes.
    pub fn delete_all(
        &mut self,
        uids: &[Uid],
        observer: &mut dyn ModelObserver,
    ) -> Result<Vec<Uid>> {
        for uid in uids {
            if *uid == self.root() {
                return Err(ModelError::RootElement);
            }
            self.index(*uid)?;
        }
        let plan = self.removal_plan(uids);
        log::debug!("deleting {} element(s) in cascade of {uids:?}", plan.len());
        for uid in &plan {
            let result = self.remove_leaf(*uid, observer);
            invariant!(
                result.is_ok(),
                "cascade step for {uid:?} failed: {result:?}"
            );
        }
        Ok(plan)
    }

    /// Innermost-first removal order: owned objects, owned relations and
    /// relations touching an object all come before the object itself.
    pub fn removal_plan(&self, uids: &[Uid]) -> Vec<Uid> {
        let mut plan = Vec::new();
        let mut planned = HashSet::new();
        for uid in uids {
            self.plan_removal(*uid, &mut plan, &mut planned);
        }
        plan
    }

    fn plan_removal(&self, uid: Uid, plan: &mut Vec<Uid>, planned: &mut HashSet<Uid>) {
        if planned.contains(&uid) {
            return;
        }
        match self.find(uid) {
            Some(Element::Object(object)) => {
                for child in object.children.iter().rev() {
                    self.plan_removal(*child, plan, planned);
                }
                for relation in object.relations.iter().rev() {
                    self.plan_removal(*relation, plan, planned);
                }
                for relation in self.relations_touching(uid) {
                    self.plan_removal(relation, plan, planned);
                }
            }
            Some(Element::Relation(_)) => {}
            None => return,
        }
        planned.insert(uid);
        plan.push(uid);
    }

    /// Remove one element that nothing else depends on.
    pub fn remove_leaf(&mut self, uid: Uid, observer: &mut dyn ModelObserver) -> Result<()> {
        if uid == self.root() {
            return Err(ModelError::RootElement);
        }
        let idx = self.index(uid)?;
        let has_dependents = match &self.graph[idx] {
            Element::Object(o) => {
                !o.children.is_empty()
                    || !o.relations.is_empty()
                    || !self.relations_touching(uid).is_empty()
            }
            Element::Relation(_) => false,
        };
        if has_dependents {
            return Err(ModelError::HasDependents(uid));
        }
        let family = self.graph[idx].family();
        let at = self
            .position_of(uid)
            .ok_or(ModelError::UnknownElement(uid))?;
        let owner_idx = self.owner_index(at.owner)?;

        observer.model_changed(self, &ModelEvent::BeginRemove { uid, family, at });
        self.owned_mut(owner_idx, family).remove(at.row);
        self.id_index.remove(&uid);
        let Some(element) = self.graph.remove_node(idx) else {
            invariant!(false, "index pointed at a vacant slot for {uid:?}");
            unreachable!()
        };
        log::trace!("removed {uid:?} from {:?} row {}", at.owner, at.row);
        observer.model_changed(self, &ModelEvent::EndRemove { element, at });
        Ok(())
    }

    // ─── Move ────────────────────────────────────────────────────────────

    /// Re-parent an element, appending it to the new owner's list.
    /// Moving to the current owner is a no-op.
    pub fn move_element(
        &mut self,
        uid: Uid,
        new_owner: Uid,
        observer: &mut dyn ModelObserver,
    ) -> Result<()> {
        if self.owner_key(uid) == Some(new_owner) {
            return Ok(());
        }
        let family = self.find(uid).map(Element::family).unwrap_or(Family::Object);
        let row = self.owned(new_owner, family).len();
        self.move_to(uid, new_owner, row, observer)
    }

    /// Re-parent an element to `row` under `new_owner` (row clamped).
    pub fn move_to(
        &mut self,
        uid: Uid,
        new_owner: Uid,
        row: usize,
        observer: &mut dyn ModelObserver,
    ) -> Result<()> {
        if uid == self.root() {
            return Err(ModelError::RootElement);
        }
        let idx = self.index(uid)?;
        let new_owner_idx = self.owner_index(new_owner)?;
        let family = self.graph[idx].family();
        if family == Family::Object && (new_owner == uid || self.is_ancestor_of(uid, new_owner)) {
            return Err(ModelError::CycleDetected {
                element: uid,
                owner: new_owner,
            });
        }
        let from = self
            .position_of(uid)
            .ok_or(ModelError::UnknownElement(uid))?;
        let old_owner_idx = self.owner_index(from.owner)?;
        let mut target_len = self.owned(new_owner, family).len();
        if from.owner == new_owner {
            target_len -= 1;
        }
        let to = Position {
            owner: new_owner,
            row: row.min(target_len),
        };
        if from == to {
            return Ok(());
        }

        observer.model_changed(
            self,
            &ModelEvent::BeginMove {
                uid,
                family,
                from,
                to,
            },
        );
        self.owned_mut(old_owner_idx, family).remove(from.row);
        if let Some(edge) = self.graph.find_edge(old_owner_idx, idx) {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(new_owner_idx, idx, Link::Owns);
        self.owned_mut(new_owner_idx, family).insert(to.row, uid);
        log::debug!("moved {uid:?} from {from:?} to {to:?}");
        observer.model_changed(
            self,
            &ModelEvent::EndMove {
                uid,
                family,
                from,
                to,
            },
        );
        Ok(())
    }

    // ─── Update ──────────────────────────────────────────────────────────

    /// Change an element's data in place. A mutator that changes nothing
    /// emits nothing.
    pub fn update(
        &mut self,
        uid: Uid,
        mutator: impl FnOnce(&mut ElementData),
        observer: &mut dyn ModelObserver,
    ) -> Result<()> {
        let idx = self.index(uid)?;
        let before = self.graph[idx].data().clone();
        let mut after = before.clone();
        mutator(&mut after);
        if after == before {
            return Ok(());
        }
        let family = self.graph[idx].family();
        let at = self
            .position_of(uid)
            .ok_or(ModelError::UnknownElement(uid))?;

        observer.model_changed(self, &ModelEvent::BeginUpdate { uid, family, at });
        *self.graph[idx].data_mut() = after;
        observer.model_changed(
            self,
            &ModelEvent::EndUpdate {
                uid,
                family,
                at,
                before,
            },
        );
        Ok(())
    }

    pub fn set_data(
        &mut self,
        uid: Uid,
        data: ElementData,
        observer: &mut dyn ModelObserver,
    ) -> Result<()> {
        self.update(uid, |d| *d = data, observer)
    }
}

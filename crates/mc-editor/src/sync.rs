//! Sync engine: model ↔ diagrams ↔ tree.
//!
//! The engine owns the semantic model, one [`DiagramGraph`] per diagram
//! object and the tree projection. User-level [`Edit`]s go through
//! [`SyncEngine::apply_edit`], which runs the model mutation with a fan-out
//! observer: every notification reaches the diagrams (in creation order) and
//! then the tree, and every primitive change lands in a journal that becomes
//! the undo command.
//!
//! Journal order matters for exact undo: an insert is recorded before the
//! diagrams react to it (auto-wired visuals come after), a removal after
//! they react (dropped visuals come before). Replaying the journal backward
//! therefore always restores an element before anything that points at it.

use crate::clipboard::{self, ClipboardContent};
use crate::commands::{ChangeTarget, CommandClass, MergeKey};
use crate::tree::TreeProjection;
use indexmap::IndexMap;
use mc_core::journal::{Change, Journal};
use mc_core::naming;
use mc_core::{
    AdmissionCheck, AdmitAll, ContainerError, DiagramGraph, ElementData, ModelError, ModelEvent,
    ModelGraph, ModelObserver, ObjectKind, Point, ProjectContainer, RelationKind, Result,
    Selection, Uid, invariant,
};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Show a new relation in every diagram that shows both of its ends.
    pub auto_wire_relations: bool,
    /// Name of the root package of a new model.
    pub root_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_wire_relations: true,
            root_name: "Model".to_string(),
        }
    }
}

/// A user-level edit. Each one becomes one undo command.
#[derive(Debug, Clone)]
pub enum Edit {
    /// Create an object; without a name it gets a unique default name.
    CreateObject {
        kind: ObjectKind,
        owner: Uid,
        name: Option<String>,
    },
    CreateRelation {
        kind: RelationKind,
        owner: Uid,
        end_a: Uid,
        end_b: Uid,
        name: String,
    },
    /// Delete the selection with everything depending on it.
    Delete { selection: Selection },
    Move { uid: Uid, new_owner: Uid },
    Rename { uid: Uid, name: String },
    Update { uid: Uid, data: ElementData },
    /// Show an existing model element in a diagram.
    AddVisual {
        diagram: Uid,
        element: Uid,
        position: Point,
    },
    AddAnnotation {
        diagram: Uid,
        text: String,
        position: Point,
    },
    RemoveVisuals { diagram: Uid, visuals: Vec<Uid> },
    MoveVisual {
        diagram: Uid,
        visual: Uid,
        dx: f32,
        dy: f32,
    },
    ResizeVisual {
        diagram: Uid,
        visual: Uid,
        width: f32,
        height: f32,
    },
    /// Paste copied content under `target` (or the original owners).
    Paste {
        content: ClipboardContent,
        target: Option<Uid>,
    },
    /// Drop a drag payload of Uid strings onto a diagram.
    Drop {
        diagram: Uid,
        payload: Vec<String>,
        position: Point,
    },
}

impl Edit {
    /// Consecutive edits with equal keys form one undo step.
    pub fn merge_key(&self) -> Option<MergeKey> {
        let (class, target) = match self {
            Edit::MoveVisual { visual, .. } => (CommandClass::MoveVisual, *visual),
            Edit::ResizeVisual { visual, .. } => (CommandClass::ResizeVisual, *visual),
            Edit::Rename { uid, .. } => (CommandClass::Rename, *uid),
            _ => return None,
        };
        Some(MergeKey { class, target })
    }
}

/// What an edit did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    /// Journal of primitive changes, oldest first.
    pub changes: Vec<Change>,
    /// Elements or visuals the edit created.
    pub created: Vec<Uid>,
    /// Model elements the edit deleted, in removal order.
    pub removed: Vec<Uid>,
    /// Inputs left out (paste entries, dropped Uids).
    pub skipped: Vec<Uid>,
}

/// Observer handed to the model: forwards every notification to the
/// diagrams and the tree, and journals the primitive changes.
struct Fanout<'a> {
    diagrams: &'a mut IndexMap<Uid, DiagramGraph>,
    tree: &'a mut TreeProjection,
    journal: &'a mut Journal,
    auto_wire: bool,
    /// Off while replaying: the journal already holds auto-wired visuals.
    wiring: bool,
}

impl ModelObserver for Fanout<'_> {
    fn model_changed(&mut self, model: &ModelGraph, event: &ModelEvent) {
        log::trace!("fan-out: {event:?}");
        match event {
            ModelEvent::BeginRemove { uid, .. } => {
                if let Some(diagram) = self.diagrams.get_mut(uid) {
                    diagram.clear(self.journal);
                }
            }
            ModelEvent::EndInsert { uid, at, .. } => {
                if let Some(element) = model.find(*uid) {
                    self.journal.record(Change::Insert {
                        element: element.bare(),
                        at: *at,
                    });
                    if element.is_diagram() {
                        self.diagrams
                            .insert(*uid, DiagramGraph::new(*uid, self.auto_wire));
                    }
                }
            }
            _ => {}
        }

        for diagram in self.diagrams.values_mut() {
            diagram.model_changed(model, event, self.wiring, self.journal);
        }

        match event {
            ModelEvent::EndRemove { element, at } => {
                self.journal.record(Change::Remove {
                    element: element.clone(),
                    at: *at,
                });
                if element.is_diagram() {
                    self.diagrams.shift_remove(&element.uid());
                }
            }
            ModelEvent::EndMove { uid, from, to, .. } => self.journal.record(Change::Move {
                uid: *uid,
                from: *from,
                to: *to,
            }),
            ModelEvent::EndUpdate { uid, before, .. } => {
                if let Some(element) = model.find(*uid) {
                    self.journal.record(Change::Update {
                        uid: *uid,
                        before: before.clone(),
                        after: element.data().clone(),
                    });
                }
            }
            _ => {}
        }

        self.tree.model_changed(model, event);
    }
}

/// The sync engine holds the model, its diagrams and the tree, and keeps
/// them consistent.
pub struct SyncEngine {
    model: ModelGraph,
    /// Diagram graphs keyed by diagram object, in creation order.
    diagrams: IndexMap<Uid, DiagramGraph>,
    tree: TreeProjection,
    config: EngineConfig,
    admission: Box<dyn AdmissionCheck>,
}

impl SyncEngine {
    /// Create an engine around an empty model.
    pub fn new(config: EngineConfig) -> Self {
        let model = ModelGraph::new(&config.root_name);
        let tree = TreeProjection::new(&model);
        Self {
            model,
            diagrams: IndexMap::new(),
            tree,
            config,
            admission: Box::new(AdmitAll),
        }
    }

    /// Rebuild an engine from a saved project. Every diagram object gets a
    /// diagram graph, empty when the project has none for it.
    pub fn from_container(project: &ProjectContainer, config: EngineConfig) -> Result<Self> {
        let model = ModelGraph::from_container(&project.model)?;
        let mut diagrams = IndexMap::new();
        for container in &project.diagrams {
            let diagram =
                DiagramGraph::from_container(container, &model, config.auto_wire_relations)?;
            diagrams.insert(container.diagram, diagram);
        }
        for uid in model.objects_preorder() {
            if model.object(uid).is_some_and(|o| o.kind == ObjectKind::Diagram) {
                diagrams
                    .entry(uid)
                    .or_insert_with(|| DiagramGraph::new(uid, config.auto_wire_relations));
            }
        }
        let tree = TreeProjection::new(&model);
        log::debug!(
            "engine loaded: {} element(s), {} diagram(s)",
            model.element_count(),
            diagrams.len()
        );
        Ok(Self {
            model,
            diagrams,
            tree,
            config,
            admission: Box::new(AdmitAll),
        })
    }

    /// Replace the admission check used when showing elements in diagrams.
    pub fn set_admission(&mut self, admission: impl AdmissionCheck + 'static) {
        self.admission = Box::new(admission);
    }

    pub fn model(&self) -> &ModelGraph {
        &self.model
    }

    pub fn tree(&self) -> &TreeProjection {
        &self.tree
    }

    /// Tree access for view state (expanded flags). Structure follows the
    /// model only.
    pub fn tree_mut(&mut self) -> &mut TreeProjection {
        &mut self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diagram(&self, uid: Uid) -> Option<&DiagramGraph> {
        self.diagrams.get(&uid)
    }

    pub fn diagrams(&self) -> impl Iterator<Item = &DiagramGraph> {
        self.diagrams.values()
    }

    /// Flatten everything; diagrams follow the model preorder of their
    /// diagram objects.
    pub fn export(&self) -> ProjectContainer {
        let diagrams = self
            .model
            .objects_preorder()
            .into_iter()
            .filter_map(|uid| self.diagrams.get(&uid))
            .map(DiagramGraph::export)
            .collect();
        ProjectContainer {
            model: self.model.export(),
            diagrams,
        }
    }

    /// Encoded project, used to compare states byte for byte.
    pub fn snapshot(&self) -> std::result::Result<Vec<u8>, ContainerError> {
        self.export().to_bytes()
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Apply an edit, journaling every primitive change. On error the graphs
    /// are left exactly as they were.
    pub fn apply_edit(&mut self, edit: &Edit) -> Result<EditOutcome> {
        let mut journal = Journal::recording();
        let mut outcome = EditOutcome::default();
        match self.run(edit, &mut journal, &mut outcome) {
            Ok(()) => {
                outcome.changes = journal.into_changes();
                log::debug!("applied {edit:?}: {} change(s)", outcome.changes.len());
                Ok(outcome)
            }
            Err(err) => {
                let partial = journal.into_changes();
                if !partial.is_empty() {
                    log::warn!("rolling back {} change(s) after {err}", partial.len());
                }
                for change in partial.iter().rev() {
                    self.replay(&change.inverse());
                }
                Err(err)
            }
        }
    }

    fn run(&mut self, edit: &Edit, journal: &mut Journal, outcome: &mut EditOutcome) -> Result<()> {
        let Self {
            model,
            diagrams,
            tree,
            config,
            admission,
        } = self;
        let admission: &dyn AdmissionCheck = &**admission;
        let mut fanout = Fanout {
            diagrams,
            tree,
            journal,
            auto_wire: config.auto_wire_relations,
            wiring: true,
        };

        match edit {
            Edit::CreateObject { kind, owner, name } => {
                let name = match name {
                    Some(name) => name.clone(),
                    None => naming::unique_name(
                        kind.default_name(),
                        model
                            .children(*owner)
                            .iter()
                            .filter_map(|uid| model.find(*uid))
                            .map(|element| element.name()),
                    ),
                };
                let uid = model.create_object(*kind, *owner, &name, &mut fanout)?;
                outcome.created.push(uid);
            }
            Edit::CreateRelation {
                kind,
                owner,
                end_a,
                end_b,
                name,
            } => {
                let uid =
                    model.create_relation(*kind, *owner, *end_a, *end_b, name, &mut fanout)?;
                outcome.created.push(uid);
            }
            Edit::Delete { selection } => {
                outcome.removed = model.delete_all(&selection.elements(), &mut fanout)?;
            }
            Edit::Move { uid, new_owner } => model.move_element(*uid, *new_owner, &mut fanout)?,
            Edit::Rename { uid, name } => {
                model.update(*uid, |data| data.name = name.clone(), &mut fanout)?;
            }
            Edit::Update { uid, data } => model.set_data(*uid, data.clone(), &mut fanout)?,
            Edit::AddVisual {
                diagram,
                element,
                position,
            } => {
                let graph = fanout
                    .diagrams
                    .get_mut(diagram)
                    .ok_or(ModelError::UnknownDiagram(*diagram))?;
                let visual =
                    graph.add_existing(model, *element, *position, admission, fanout.journal)?;
                outcome.created.push(visual);
            }
            Edit::AddAnnotation {
                diagram,
                text,
                position,
            } => {
                let graph = fanout
                    .diagrams
                    .get_mut(diagram)
                    .ok_or(ModelError::UnknownDiagram(*diagram))?;
                outcome
                    .created
                    .push(graph.add_annotation(model, text, *position, fanout.journal));
            }
            Edit::RemoveVisuals { diagram, visuals } => {
                let graph = fanout
                    .diagrams
                    .get_mut(diagram)
                    .ok_or(ModelError::UnknownDiagram(*diagram))?;
                if let Some(missing) = visuals.iter().find(|v| graph.element(**v).is_none()) {
                    return Err(ModelError::UnknownElement(*missing));
                }
                for visual in visuals {
                    // Attached relations may already be gone with their end.
                    if graph.element(*visual).is_some() {
                        graph.remove(*visual, fanout.journal)?;
                    }
                }
            }
            Edit::MoveVisual {
                diagram,
                visual,
                dx,
                dy,
            } => {
                let graph = fanout
                    .diagrams
                    .get_mut(diagram)
                    .ok_or(ModelError::UnknownDiagram(*diagram))?;
                graph.move_by(*visual, *dx, *dy, fanout.journal)?;
            }
            Edit::ResizeVisual {
                diagram,
                visual,
                width,
                height,
            } => {
                let graph = fanout
                    .diagrams
                    .get_mut(diagram)
                    .ok_or(ModelError::UnknownDiagram(*diagram))?;
                graph.resize(*visual, *width, *height, fanout.journal)?;
            }
            Edit::Paste { content, target } => {
                if let Some(target) = target
                    && model.object(*target).is_none()
                {
                    return Err(ModelError::DanglingReference(*target));
                }
                let plan = clipboard::plan_paste(model, &content.model, *target);
                for entry in plan.entries {
                    let uid =
                        model.insert_element(entry.element, entry.owner, usize::MAX, &mut fanout)?;
                    outcome.created.push(uid);
                }
                for copied in &content.diagrams {
                    let Some(pasted) = plan.remap.get(&copied.diagram) else {
                        continue;
                    };
                    let graph = fanout
                        .diagrams
                        .get_mut(pasted)
                        .ok_or(ModelError::UnknownDiagram(*pasted))?;
                    for visual in clipboard::remap_visuals(model, copied, &plan.remap) {
                        graph.restore(model, visual, fanout.journal)?;
                    }
                }
                log::debug!(
                    "pasted {} element(s), skipped {}",
                    outcome.created.len(),
                    plan.skipped.len()
                );
                outcome.skipped = plan.skipped;
            }
            Edit::Drop {
                diagram,
                payload,
                position,
            } => {
                let graph = fanout
                    .diagrams
                    .get_mut(diagram)
                    .ok_or(ModelError::UnknownDiagram(*diagram))?;
                let mut offset = 0.0;
                for uid in clipboard::resolve_payload(model, payload.as_slice()) {
                    let at = Point::new(position.x + offset, position.y + offset);
                    match graph.add_existing(model, uid, at, admission, fanout.journal) {
                        Ok(visual) => {
                            outcome.created.push(visual);
                            offset += 20.0;
                        }
                        Err(err) => {
                            log::debug!("drop: {err}");
                            outcome.skipped.push(uid);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl ChangeTarget for SyncEngine {
    fn replay(&mut self, change: &Change) {
        let Self {
            model,
            diagrams,
            tree,
            config,
            ..
        } = self;
        let mut silent = Journal::disabled();
        let mut fanout = Fanout {
            diagrams,
            tree,
            journal: &mut silent,
            auto_wire: config.auto_wire_relations,
            wiring: false,
        };

        let result = match change {
            Change::Insert { element, at } => model
                .insert_element(element.clone(), at.owner, at.row, &mut fanout)
                .map(|_| ()),
            Change::Remove { element, .. } => model.remove_leaf(element.uid(), &mut fanout),
            Change::Move { uid, to, .. } => model.move_to(*uid, to.owner, to.row, &mut fanout),
            Change::Update { uid, after, .. } => model.set_data(*uid, after.clone(), &mut fanout),
            Change::AddVisual {
                diagram,
                element,
                row,
            } => match fanout.diagrams.get_mut(diagram) {
                Some(graph) => {
                    graph.insert_visual(model, element.clone(), *row);
                    Ok(())
                }
                None => Err(ModelError::UnknownDiagram(*diagram)),
            },
            Change::RemoveVisual {
                diagram, element, ..
            } => match fanout.diagrams.get_mut(diagram) {
                Some(graph) => graph
                    .remove_visual(element.uid())
                    .map(|_| ())
                    .ok_or(ModelError::UnknownElement(element.uid())),
                None => Err(ModelError::UnknownDiagram(*diagram)),
            },
            Change::Reshape {
                diagram,
                visual,
                after,
                ..
            } => match fanout.diagrams.get_mut(diagram) {
                Some(graph) => {
                    graph.apply_geometry(*visual, *after);
                    Ok(())
                }
                None => Err(ModelError::UnknownDiagram(*diagram)),
            },
        };
        invariant!(result.is_ok(), "replay of {change:?} failed: {result:?}");
    }
}

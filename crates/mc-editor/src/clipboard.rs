//! Clipboard and drag-and-drop payloads.
//!
//! Copy captures the selected subtrees as a [`ModelContainer`], plus the
//! visuals of every copied diagram object. Paste re-resolves that content
//! against the current model: entries whose owner is gone are skipped,
//! relations whose ends cannot be resolved are skipped, and Uids already
//! taken get fresh ones (relation ends and visuals follow).

use crate::commands::CommandStack;
use crate::sync::{Edit, SyncEngine};
use mc_core::{
    ContainerEntry, DiagramContainer, DiagramElement, DiagramGraph, DiagramObject,
    DiagramRelation, Element, ModelContainer, ModelGraph, Result, Selection, Uid,
};
use std::collections::{HashMap, HashSet};

/// What copy hands to paste.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardContent {
    pub model: ModelContainer,
    /// Visuals of the copied diagram objects.
    pub diagrams: Vec<DiagramContainer>,
}

impl ClipboardContent {
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    /// Number of model entries.
    pub fn len(&self) -> usize {
        self.model.len()
    }
}

impl From<ModelContainer> for ClipboardContent {
    fn from(model: ModelContainer) -> Self {
        Self {
            model,
            diagrams: Vec::new(),
        }
    }
}

/// Copy the selected elements with everything they own.
pub fn copy(engine: &SyncEngine, selection: &Selection) -> ClipboardContent {
    let model = ModelContainer::capture(engine.model(), &selection.elements());
    let diagrams = model
        .entries
        .iter()
        .filter_map(|entry| engine.diagram(entry.element.uid()))
        .map(DiagramGraph::export)
        .collect();
    ClipboardContent { model, diagrams }
}

/// Copy, then delete the selection as one undo step.
pub fn cut(
    stack: &mut CommandStack,
    engine: &mut SyncEngine,
    selection: &Selection,
) -> Result<ClipboardContent> {
    let content = copy(engine, selection);
    if !content.is_empty() {
        stack.execute(
            engine,
            Edit::Delete {
                selection: selection.clone(),
            },
            "Cut",
        )?;
    }
    Ok(content)
}

/// Entries ready to insert, plus the Uids (as copied) that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PastePlan {
    pub entries: Vec<ContainerEntry>,
    pub skipped: Vec<Uid>,
    /// Copied Uid to pasted Uid, for every placed entry.
    pub remap: HashMap<Uid, Uid>,
}

/// Resolve `container` against `model`. Top-level entries go under `target`
/// when given, otherwise back under their original owner.
pub fn plan_paste(model: &ModelGraph, container: &ModelContainer, target: Option<Uid>) -> PastePlan {
    let copied: HashSet<Uid> = container.entries.iter().map(|e| e.element.uid()).collect();
    let mut taken: HashSet<Uid> = HashSet::new();
    let mut plan = PastePlan::default();

    for entry in &container.entries {
        let old = entry.element.uid();
        let owner = if copied.contains(&entry.owner) {
            plan.remap.get(&entry.owner).copied()
        } else {
            let owner = target.unwrap_or(entry.owner);
            model.object(owner).map(|_| owner)
        };
        let Some(owner) = owner else {
            log::warn!("paste: owner of {old:?} no longer exists, skipped");
            plan.skipped.push(old);
            continue;
        };

        let mut element = entry.element.clone();
        if let Element::Relation(relation) = &mut element {
            let resolve = |end: Uid| {
                plan.remap
                    .get(&end)
                    .copied()
                    .or_else(|| model.object(end).map(|o| o.uid))
            };
            let (Some(end_a), Some(end_b)) = (resolve(relation.end_a), resolve(relation.end_b))
            else {
                log::warn!("paste: ends of relation {old:?} unresolved, skipped");
                plan.skipped.push(old);
                continue;
            };
            relation.end_a = end_a;
            relation.end_b = end_b;
        }

        let uid = if model.contains(old) || taken.contains(&old) {
            Uid::new()
        } else {
            old
        };
        match &mut element {
            Element::Object(object) => object.uid = uid,
            Element::Relation(relation) => relation.uid = uid,
        }
        plan.remap.insert(old, uid);
        taken.insert(uid);
        plan.entries.push(ContainerEntry { owner, element });
    }
    plan
}

/// Visuals of a copied diagram, pointed at the pasted elements.
///
/// Every visual gets a fresh Uid. A visual whose element was neither pasted
/// nor is still in `model` is left out, and so is a visual relation that no
/// longer joins the visuals of its semantic ends.
pub fn remap_visuals(
    model: &ModelGraph,
    container: &DiagramContainer,
    remap: &HashMap<Uid, Uid>,
) -> Vec<DiagramElement> {
    // Old visual Uid to (new visual Uid, element shown).
    let mut placed: HashMap<Uid, (Uid, Option<Uid>)> = HashMap::new();
    let mut visuals = Vec::new();
    for element in &container.elements {
        let shown = match element.model() {
            Some(old) => {
                let resolved = remap
                    .get(&old)
                    .copied()
                    .or_else(|| model.contains(old).then_some(old));
                if resolved.is_none() {
                    log::debug!("paste: visual {} shows a missing element", element.uid());
                    continue;
                }
                resolved
            }
            None => None,
        };
        let uid = Uid::new();
        let visual = match element {
            DiagramElement::Object(object) => DiagramElement::Object(DiagramObject {
                uid,
                model: shown,
                ..object.clone()
            }),
            DiagramElement::Relation(relation) => {
                let (Some(&(end_a, shows_a)), Some(&(end_b, shows_b))) =
                    (placed.get(&relation.end_a), placed.get(&relation.end_b))
                else {
                    continue;
                };
                let joins_ends = shown.and_then(|r| model.relation(r)).is_none_or(|r| {
                    shows_a == Some(r.end_a) && shows_b == Some(r.end_b)
                });
                if !joins_ends {
                    log::debug!("paste: visual relation {} left out", relation.uid);
                    continue;
                }
                DiagramElement::Relation(DiagramRelation {
                    uid,
                    model: shown,
                    end_a,
                    end_b,
                    ..relation.clone()
                })
            }
        };
        placed.insert(element.uid(), (uid, shown));
        visuals.push(visual);
    }
    visuals
}

/// Parse a drag payload. Unparsable strings and Uids unknown to `model`
/// are dropped; objects come before relations.
pub fn resolve_payload<S: AsRef<str>>(model: &ModelGraph, payload: &[S]) -> Vec<Uid> {
    let mut resolved: Vec<Uid> = payload
        .iter()
        .filter_map(|s| Uid::parse(s.as_ref().trim()).ok())
        .filter(|uid| model.contains(*uid))
        .collect();
    let mut seen = HashSet::new();
    resolved.retain(|uid| seen.insert(*uid));
    resolved.sort_by_key(|uid| model.relation(*uid).is_some());
    resolved
}

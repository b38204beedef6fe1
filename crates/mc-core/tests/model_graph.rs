//! Integration tests: journaled model mutations can be reverted exactly.
//!
//! A recording observer turns notifications into [`Change`]s; replaying the
//! inverses newest-first must restore the exported model entry for entry.

use mc_core::journal::Change;
use mc_core::{
    ModelEvent, ModelGraph, ModelObserver, ObjectKind, ProjectContainer, RelationKind, Uid,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Default)]
struct Recorder {
    changes: Vec<Change>,
    open: Option<Uid>,
}

impl ModelObserver for Recorder {
    fn model_changed(&mut self, model: &ModelGraph, event: &ModelEvent) {
        match event {
            ModelEvent::BeginInsert { uid, .. }
            | ModelEvent::BeginRemove { uid, .. }
            | ModelEvent::BeginMove { uid, .. }
            | ModelEvent::BeginUpdate { uid, .. } => {
                assert_eq!(self.open, None, "nested bracket at {event:?}");
                self.open = Some(*uid);
                return;
            }
            _ => {}
        }
        assert_eq!(self.open.take(), Some(event.uid()), "unbalanced {event:?}");
        let change = match event {
            ModelEvent::EndInsert { uid, at, .. } => Change::Insert {
                element: model.find(*uid).unwrap().bare(),
                at: *at,
            },
            ModelEvent::EndRemove { element, at } => Change::Remove {
                element: element.clone(),
                at: *at,
            },
            ModelEvent::EndMove { uid, from, to, .. } => Change::Move {
                uid: *uid,
                from: *from,
                to: *to,
            },
            ModelEvent::EndUpdate { uid, before, .. } => Change::Update {
                uid: *uid,
                before: before.clone(),
                after: model.find(*uid).unwrap().data().clone(),
            },
            _ => unreachable!(),
        };
        self.changes.push(change);
    }
}

fn apply(model: &mut ModelGraph, change: &Change) {
    match change {
        Change::Insert { element, at } => {
            model
                .insert_element(element.clone(), at.owner, at.row, &mut ())
                .unwrap();
        }
        Change::Remove { element, .. } => model.remove_leaf(element.uid(), &mut ()).unwrap(),
        Change::Move { uid, to, .. } => model.move_to(*uid, to.owner, to.row, &mut ()).unwrap(),
        Change::Update { uid, after, .. } => model.set_data(*uid, after.clone(), &mut ()).unwrap(),
        other => panic!("not a model change: {other:?}"),
    }
}

fn revert(model: &mut ModelGraph, changes: &[Change]) {
    for change in changes.iter().rev() {
        apply(model, &change.inverse());
    }
}

/// Root ─ P ─ A, Q ─ B, C; relations A→B (owned by P), B→C and C→A (owned by Q).
fn sample() -> (ModelGraph, Vec<Uid>) {
    let mut model = ModelGraph::new("Model");
    let root = model.root();
    let p = model.create_object(ObjectKind::Package, root, "P", &mut ()).unwrap();
    let q = model.create_object(ObjectKind::Package, root, "Q", &mut ()).unwrap();
    let a = model.create_object(ObjectKind::Class, p, "A", &mut ()).unwrap();
    let b = model.create_object(ObjectKind::Class, q, "B", &mut ()).unwrap();
    let c = model.create_object(ObjectKind::Component, q, "C", &mut ()).unwrap();
    let ab = model
        .create_relation(RelationKind::Dependency, p, a, b, "ab", &mut ())
        .unwrap();
    let bc = model
        .create_relation(RelationKind::Association, q, b, c, "", &mut ())
        .unwrap();
    let ca = model
        .create_relation(RelationKind::Inheritance, q, c, a, "ca", &mut ())
        .unwrap();
    (model, vec![p, q, a, b, c, ab, bc, ca])
}

#[test]
fn cascade_reverts_entry_for_entry() {
    let (mut model, uids) = sample();
    let before = model.export();
    let q = uids[1];

    let mut recorder = Recorder::default();
    let removed = model.delete(q, &mut recorder).unwrap();
    // B, C and every relation touching them go; A and P stay.
    assert_eq!(removed.len(), 6);
    assert_eq!(removed.last(), Some(&q));
    assert!(model.find(uids[5]).is_none(), "A→B touched B");
    assert!(model.find(uids[2]).is_some());

    revert(&mut model, &recorder.changes);
    assert_eq!(model.export(), before);
}

#[test]
fn project_bytes_round_trip() {
    let (model, _) = sample();
    let project = ProjectContainer {
        model: model.export(),
        diagrams: Vec::new(),
    };
    let bytes = project.to_bytes().unwrap();
    let decoded = ProjectContainer::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, project);
    let rebuilt = ModelGraph::from_container(&decoded.model).unwrap();
    assert_eq!(rebuilt.export(), model.export());
}

#[test]
fn truncated_bytes_are_an_error() {
    let (model, _) = sample();
    let bytes = model.export().to_bytes().unwrap();
    assert!(mc_core::ModelContainer::from_bytes(&bytes[..bytes.len() / 2]).is_err());
}

#[derive(Debug, Clone)]
enum Op {
    Delete(usize),
    Move(usize, usize),
    Rename(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<usize>().prop_map(Op::Delete),
        (any::<usize>(), any::<usize>()).prop_map(|(e, o)| Op::Move(e, o)),
        any::<usize>().prop_map(Op::Rename),
    ]
}

proptest! {
    #[test]
    fn any_edit_sequence_reverts(ops in prop::collection::vec(op_strategy(), 1..12)) {
        let (mut model, uids) = sample();
        let before = model.export();
        let mut recorder = Recorder::default();

        for (step, op) in ops.iter().enumerate() {
            let live: Vec<Uid> = uids.iter().copied().filter(|u| model.contains(*u)).collect();
            let owners = model.objects_preorder();
            if live.is_empty() {
                break;
            }
            // Rejected edits (cycles) must not emit anything.
            let emitted = recorder.changes.len();
            let result = match op {
                Op::Delete(e) => model.delete(live[e % live.len()], &mut recorder).map(|_| ()),
                Op::Move(e, o) => model.move_element(
                    live[e % live.len()],
                    owners[o % owners.len()],
                    &mut recorder,
                ),
                Op::Rename(e) => model.update(
                    live[e % live.len()],
                    |data| data.name = format!("n{step}"),
                    &mut recorder,
                ),
            };
            if result.is_err() {
                prop_assert_eq!(recorder.changes.len(), emitted);
            }
        }

        revert(&mut model, &recorder.changes);
        prop_assert_eq!(model.export(), before);
    }
}

//! Integration tests: copy, cut, paste and drag-and-drop through the engine.

use mc_core::{ModelContainer, ObjectKind, Point, RelationKind, Selection, Uid};
use mc_editor::clipboard;
use mc_editor::commands::CommandStack;
use mc_editor::sync::{Edit, EngineConfig, SyncEngine};

struct Scene {
    engine: SyncEngine,
    stack: CommandStack,
    root: Uid,
    p: Uid,
    a: Uid,
    b: Uid,
    dep: Uid,
    g: Uid,
}

fn scene() -> Scene {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = SyncEngine::new(EngineConfig::default());
    let mut stack = CommandStack::default();
    let root = engine.model().root();
    let create = |engine: &mut SyncEngine, stack: &mut CommandStack, edit: Edit| {
        stack.execute(engine, edit, "setup").unwrap().created[0]
    };
    let object = |kind, owner, name: &str| Edit::CreateObject {
        kind,
        owner,
        name: Some(name.to_string()),
    };
    let p = create(&mut engine, &mut stack, object(ObjectKind::Package, root, "P"));
    let a = create(&mut engine, &mut stack, object(ObjectKind::Class, p, "A"));
    let b = create(&mut engine, &mut stack, object(ObjectKind::Class, root, "B"));
    let g = create(&mut engine, &mut stack, object(ObjectKind::Diagram, root, "G"));
    let dep = create(
        &mut engine,
        &mut stack,
        Edit::CreateRelation {
            kind: RelationKind::Dependency,
            owner: p,
            end_a: a,
            end_b: b,
            name: String::new(),
        },
    );
    Scene {
        engine,
        stack,
        root,
        p,
        a,
        b,
        dep,
        g,
    }
}

#[test]
fn copy_then_paste_duplicates_with_fresh_uids() {
    let mut s = scene();
    let copied = clipboard::copy(&s.engine, &Selection::of(s.engine.model(), [s.p]));
    assert_eq!(copied.len(), 3);

    let before = s.engine.model().element_count();
    let outcome = s
        .stack
        .execute(
            &mut s.engine,
            Edit::Paste {
                content: copied,
                target: Some(s.root),
            },
            "Paste",
        )
        .unwrap();
    assert_eq!(outcome.created.len(), 3);
    assert!(outcome.skipped.is_empty());
    assert_eq!(s.engine.model().element_count(), before + 3);

    let model = s.engine.model();
    let new_p = outcome.created[0];
    assert_ne!(new_p, s.p);
    assert_eq!(model.owner_key(new_p), Some(s.root));
    let new_relation = model.relation(outcome.created[2]).unwrap();
    assert_eq!(new_relation.end_a, outcome.created[1]);
    assert_eq!(new_relation.end_b, s.b);

    s.stack.undo(&mut s.engine);
    assert_eq!(s.engine.model().element_count(), before);
}

fn show(s: &mut Scene, element: Uid, x: f32) -> Uid {
    s.stack
        .execute(
            &mut s.engine,
            Edit::AddVisual {
                diagram: s.g,
                element,
                position: Point::new(x, 50.0),
            },
            "Show",
        )
        .unwrap()
        .created[0]
}

fn paste(s: &mut Scene, content: clipboard::ClipboardContent) -> Vec<Uid> {
    s.stack
        .execute(
            &mut s.engine,
            Edit::Paste {
                content,
                target: Some(s.root),
            },
            "Paste",
        )
        .unwrap()
        .created
}

#[test]
fn pasted_diagram_keeps_its_visuals() {
    let mut s = scene();
    let a = s.a;
    let va = show(&mut s, a, 0.0);
    let copied = clipboard::copy(&s.engine, &Selection::of(s.engine.model(), [s.g]));
    assert_eq!(copied.diagrams.len(), 1);

    let created = paste(&mut s, copied);
    let new_g = created[0];
    assert_ne!(new_g, s.g);
    let pasted = s.engine.diagram(new_g).unwrap();
    assert_eq!(pasted.len(), 1);
    assert!(pasted.shows(s.a));
    assert_ne!(pasted.visual_of(s.a), Some(va), "visuals get fresh Uids");
    assert_eq!(
        pasted.geometry(pasted.visual_of(s.a).unwrap()),
        s.engine.diagram(s.g).unwrap().geometry(va),
    );

    s.stack.undo(&mut s.engine);
    assert!(s.engine.diagram(new_g).is_none());
    s.stack.redo(&mut s.engine);
    assert!(s.engine.diagram(new_g).unwrap().shows(s.a));
}

#[test]
fn pasted_visuals_follow_the_pasted_elements() {
    let mut s = scene();
    let (a, b) = (s.a, s.b);
    show(&mut s, a, 0.0);
    show(&mut s, b, 300.0);
    assert!(s.engine.diagram(s.g).unwrap().shows(s.dep));

    let copied = clipboard::copy(&s.engine, &Selection::of(s.engine.model(), [s.p, s.g]));
    let created = paste(&mut s, copied);
    let new_g = *created
        .iter()
        .find(|uid| s.engine.diagram(**uid).is_some())
        .unwrap();
    let model = s.engine.model();
    let new_dep = *created
        .iter()
        .find(|uid| model.relation(**uid).is_some())
        .unwrap();
    let new_a = model.relation(new_dep).unwrap().end_a;

    // A and its relation are copies; B was not copied and is shown as is.
    let pasted = s.engine.diagram(new_g).unwrap();
    assert_eq!(pasted.len(), 3);
    assert!(pasted.shows(new_a));
    assert!(pasted.shows(s.b));
    assert!(pasted.shows(new_dep));
    assert!(!pasted.shows(s.a));
    assert!(!pasted.shows(s.dep));
}

#[test]
fn cut_is_undoable_and_paste_restores_uids() {
    let mut s = scene();
    let selection = Selection::of(s.engine.model(), [s.a]);
    let content = clipboard::cut(&mut s.stack, &mut s.engine, &selection).unwrap();
    assert!(s.engine.model().find(s.a).is_none());
    assert!(s.engine.model().find(s.dep).is_none());

    // The cut class comes back under its old owner with its own Uid.
    let outcome = s
        .stack
        .execute(
            &mut s.engine,
            Edit::Paste {
                content,
                target: None,
            },
            "Paste",
        )
        .unwrap();
    assert_eq!(outcome.created, vec![s.a]);
    assert_eq!(s.engine.model().owner_key(s.a), Some(s.p));

    s.stack.undo(&mut s.engine);
    s.stack.undo(&mut s.engine);
    assert!(s.engine.model().find(s.a).is_some());
    assert!(s.engine.model().find(s.dep).is_some());
}

#[test]
fn paste_skips_entries_whose_owner_is_gone() {
    let mut s = scene();
    let container = ModelContainer::capture(s.engine.model(), &[s.a, s.b]);
    let selection = Selection::of(s.engine.model(), [s.p]);
    s.stack
        .execute(&mut s.engine, Edit::Delete { selection }, "Delete P")
        .unwrap();

    let outcome = s
        .stack
        .execute(
            &mut s.engine,
            Edit::Paste {
                content: container.into(),
                target: None,
            },
            "Paste",
        )
        .unwrap();
    assert_eq!(outcome.skipped, vec![s.a]);
    assert_eq!(outcome.created.len(), 1);
    assert_ne!(outcome.created[0], s.b, "B still exists, so the copy is new");
}

#[test]
fn paste_into_a_relation_is_rejected() {
    let mut s = scene();
    let container = ModelContainer::capture(s.engine.model(), &[s.b]);
    let err = s
        .engine
        .apply_edit(&Edit::Paste {
            content: container.into(),
            target: Some(s.dep),
        })
        .unwrap_err();
    assert_eq!(err, mc_core::ModelError::DanglingReference(s.dep));
}

#[test]
fn drop_ignores_junk_and_wires_relations() {
    let mut s = scene();
    let payload = vec![
        "definitely not a uid".to_string(),
        Uid::new().to_string(),
        s.dep.to_string(),
        s.b.to_string(),
        s.a.to_string(),
    ];
    let outcome = s
        .stack
        .execute(
            &mut s.engine,
            Edit::Drop {
                diagram: s.g,
                payload,
                position: Point::new(100.0, 100.0),
            },
            "Drop",
        )
        .unwrap();

    let diagram = s.engine.diagram(s.g).unwrap();
    assert!(diagram.shows(s.a));
    assert!(diagram.shows(s.b));
    // Auto-wired when the second end arrived, so the explicit drop is a no-op.
    assert!(diagram.shows(s.dep));
    assert_eq!(outcome.skipped, vec![s.dep]);
    assert_eq!(diagram.len(), 3);

    s.stack.undo(&mut s.engine);
    assert!(s.engine.diagram(s.g).unwrap().is_empty());
}

#[test]
fn drop_of_nothing_resolvable_is_a_no_op() {
    let mut s = scene();
    let depth = s.stack.len();
    s.stack
        .execute(
            &mut s.engine,
            Edit::Drop {
                diagram: s.g,
                payload: vec!["x".into(), String::new()],
                position: Point::default(),
            },
            "Drop",
        )
        .unwrap();
    assert_eq!(s.stack.len(), depth);
}

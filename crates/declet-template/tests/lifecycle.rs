//! Lifecycle ordering of a dynamic template inside a tree.

use std::cell::RefCell;
use std::rc::Rc;

use declet_core::schedule::{Scheduler, TickQueue};
use declet_template::{DynamicTemplate, FnTemplate, TemplateRef};
use declet_tree::{Declarative, DeclarativeRef, Element, Lifecycle};
use serde_json::json;

fn rows() -> TemplateRef {
    TemplateRef::new(FnTemplate::new("Rows", ["count"], |args, _| {
        let count = args[0].as_u64().unwrap_or(0);
        Ok((0..count)
            .map(|i| Element::new(format!("row{i}")) as DeclarativeRef)
            .collect())
    }))
}

fn names(parent: &DeclarativeRef) -> Vec<String> {
    parent
        .object()
        .children()
        .iter()
        .map(|c| c.object().name().to_string())
        .collect()
}

struct Fixture {
    queue: Rc<TickQueue>,
    root: DeclarativeRef,
    node: Rc<DynamicTemplate>,
}

/// `root` holds `header`, the dynamic template, then `footer`.
fn fixture(count: u64) -> Fixture {
    let queue = Rc::new(TickQueue::new());
    let root: DeclarativeRef = Element::new("root");
    let header: DeclarativeRef = Element::new("header");
    let footer: DeclarativeRef = Element::new("footer");
    let node = DynamicTemplate::builder()
        .name("dyn")
        .base(rows())
        .args([json!(count)])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    header.object().set_parent(Some(&root));
    let as_ref: DeclarativeRef = node.clone();
    as_ref.object().set_parent(Some(&root));
    footer.object().set_parent(Some(&root));
    Fixture { queue, root, node }
}

#[test]
fn items_land_between_siblings() {
    let fx = fixture(2);
    fx.root.initialize().unwrap();
    assert_eq!(names(&fx.root), vec!["header", "row0", "row1", "dyn", "footer"]);
    for item in fx.node.items() {
        assert_eq!(item.object().lifecycle(), Lifecycle::Initialized);
        assert!(item.object().parent().is_some_and(|p| p.same_node(&*fx.root)));
    }
}

#[test]
fn refresh_replaces_items_in_place() {
    let fx = fixture(2);
    fx.root.initialize().unwrap();
    let old = fx.node.items();

    fx.node.set_args([json!(3)]);
    assert!(fx.queue.drain().is_clean());

    assert!(old.iter().all(|i| i.object().is_destroyed()));
    assert_eq!(
        names(&fx.root),
        vec!["header", "row0", "row1", "row2", "dyn", "footer"]
    );
}

#[test]
fn no_base_produces_nothing() {
    let fx = fixture(2);
    fx.root.initialize().unwrap();
    fx.node.set_base(None);
    fx.queue.drain();
    assert!(fx.node.items().is_empty());
    assert_eq!(names(&fx.root), vec!["header", "dyn", "footer"]);
}

#[test]
fn orphan_initialize_fails() {
    let queue: Rc<dyn Scheduler> = Rc::new(TickQueue::new());
    let node = DynamicTemplate::builder().name("lonely").build(queue);
    let err = node.initialize().unwrap_err();
    assert_eq!(err.node, "lonely");
    assert_eq!(
        std::error::Error::source(&err).map(ToString::to_string),
        Some("dynamic template `lonely` has no parent to insert items into".to_string())
    );
    assert_eq!(node.object().lifecycle(), Lifecycle::Constructed);
}

#[test]
fn destroying_the_parent_cancels_pending_work() {
    let fx = fixture(1);
    fx.root.initialize().unwrap();
    fx.node.set_args([json!(5)]);
    assert!(fx.node.has_pending_refresh());

    fx.root.destroy();
    assert!(fx.node.object().is_destroyed());
    assert!(!fx.node.has_pending_refresh());
    let report = fx.queue.drain();
    assert_eq!(report.ran, 0);
    assert_eq!(fx.node.refresh_count(), 1);
}

#[test]
fn destroy_is_idempotent() {
    let fx = fixture(1);
    fx.root.initialize().unwrap();
    fx.node.destroy();
    fx.node.destroy();
    assert!(fx.node.items().is_empty());
    assert_eq!(names(&fx.root), vec!["header", "row0", "footer"]);
}

#[test]
fn items_destroyed_elsewhere_are_skipped() {
    let fx = fixture(2);
    fx.root.initialize().unwrap();
    let old = fx.node.items();

    let transitions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&transitions);
    let _sub = old[0]
        .object()
        .watch_lifecycle(move |phase| sink.borrow_mut().push(phase));
    old[0].destroy();

    fx.node.set_args([json!(1)]);
    assert!(fx.queue.drain().is_clean());
    assert_eq!(*transitions.borrow(), vec![Lifecycle::Destroyed]);
    assert!(old[1].object().is_destroyed());
    assert_eq!(names(&fx.root), vec!["header", "row0", "dyn", "footer"]);
}

#[test]
fn dropped_node_turns_its_task_into_a_noop() {
    let queue = Rc::new(TickQueue::new());
    {
        let node = DynamicTemplate::builder()
            .base(rows())
            .args([json!(1)])
            .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
        node.set_args([json!(2)]);
        assert_eq!(queue.pending_count(), 1);
    }
    let report = queue.drain();
    assert!(report.is_clean());
    assert_eq!(report.ran, 1);
}

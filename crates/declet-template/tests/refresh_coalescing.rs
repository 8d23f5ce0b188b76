//! Refresh scheduling: coalescing, re-entrancy, and derived tag values.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use declet_core::reactive::Computed;
use declet_core::schedule::{Scheduler, TickQueue};
use declet_template::{
    Data, DynamicTemplate, DynamicTemplateError, FnTemplate, Tagged, TemplateRef, UnpackError,
    Value,
};
use declet_tree::{Declarative, DeclarativeRef, Element};
use serde_json::json;

/// Counts invocations and records the arguments each one saw.
fn counting(calls: Rc<RefCell<Vec<(Vec<Value>, Data)>>>) -> TemplateRef {
    TemplateRef::new(FnTemplate::new("Counted", ["count"], move |args, data| {
        calls.borrow_mut().push((args.to_vec(), data.clone()));
        let count = args[0].as_u64().unwrap_or(0);
        Ok((0..count)
            .map(|i| Element::new(format!("c{i}")) as DeclarativeRef)
            .collect())
    }))
}

fn mount(node: &Rc<DynamicTemplate>) -> DeclarativeRef {
    let root: DeclarativeRef = Element::new("root");
    let as_ref: DeclarativeRef = node.clone();
    as_ref.object().set_parent(Some(&root));
    root
}

#[test]
fn many_changes_one_instantiation_with_latest_values() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let queue = Rc::new(TickQueue::new());
    let node = DynamicTemplate::builder()
        .base(counting(Rc::clone(&calls)))
        .args([json!(1)])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    let root = mount(&node);
    root.initialize().unwrap();

    for n in 2..=6 {
        node.set_args([json!(n)]);
    }
    let mut data = Data::new();
    data.insert("theme".into(), json!("dark"));
    node.set_data(data.clone());

    assert_eq!(queue.pending_count(), 1);
    assert!(queue.drain().is_clean());

    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], (vec![json!(6)], data));
    assert_eq!(node.items().len(), 6);
}

#[test]
fn refresh_requested_while_refreshing_runs_next_tick() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let queue = Rc::new(TickQueue::new());
    let node = DynamicTemplate::builder()
        .base(counting(Rc::clone(&calls)))
        .args([json!(1)])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    let root = mount(&node);
    root.initialize().unwrap();

    // Destroying the old item bumps the args from inside the refresh.
    let weak = Rc::downgrade(&node);
    let _sub = node.items()[0].object().watch_lifecycle(move |_| {
        if let Some(node) = weak.upgrade() {
            node.set_args([json!(3)]);
        }
    });

    node.set_args([json!(2)]);
    let first = queue.tick();
    assert_eq!(first.ran, 1);
    assert!(node.has_pending_refresh());
    assert_eq!(node.items().len(), 2);

    let rest = queue.drain();
    assert_eq!(rest.ran, 1);
    assert_eq!(node.items().len(), 3);
    assert_eq!(calls.borrow().len(), 3);
}

#[test]
fn tag_changes_never_reinstantiate() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let queue = Rc::new(TickQueue::new());
    let node = DynamicTemplate::builder()
        .base(counting(Rc::clone(&calls)))
        .args([json!(2)])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    let root = mount(&node);
    root.initialize().unwrap();

    node.set_tags(["left", "right"]).unwrap();
    node.set_startag("extra").unwrap();
    assert!(queue.is_idle());
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(node.tagged()["extra"], Tagged::Rest(Vec::new()));
}

#[test]
fn unpack_failure_after_refresh_keeps_new_items() {
    let queue = Rc::new(TickQueue::new());
    let calls = Rc::new(RefCell::new(Vec::new()));
    let node = DynamicTemplate::builder()
        .base(counting(calls))
        .args([json!(2)])
        .tags(["a", "b"])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    let root = mount(&node);
    root.initialize().unwrap();
    let old_tagged = node.tagged();

    node.set_args([json!(3)]);
    let report = queue.drain();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].error.to_string(),
        "too many values to unpack"
    );

    assert_eq!(node.items().len(), 3);
    assert_eq!(node.tagged(), old_tagged);
    assert!(
        old_tagged
            .values()
            .filter_map(Tagged::as_item)
            .all(|item| item.object().is_destroyed())
    );
}

#[test]
fn missing_parent_fails_before_template_runs() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let queue = Rc::new(TickQueue::new());
    let node = DynamicTemplate::builder()
        .name("detached")
        .base(counting(Rc::clone(&calls)))
        .args([json!(1)])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);

    node.set_args([json!(2)]);
    let report = queue.drain();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].error.to_string(),
        "dynamic template `detached` has no parent to insert items into"
    );
    assert!(calls.borrow().is_empty());
    assert!(node.items().is_empty());
}

#[test]
fn direct_refresh_reports_unpack_error() {
    let queue: Rc<dyn Scheduler> = Rc::new(TickQueue::new());
    let calls = Rc::new(RefCell::new(Vec::new()));
    let node = DynamicTemplate::builder()
        .base(counting(calls))
        .args([json!(1)])
        .tags(["a", "b"])
        .build(queue);
    let _root = mount(&node);
    assert_eq!(
        node.refresh().unwrap_err(),
        DynamicTemplateError::Unpack(UnpackError::NotEnough {
            required: 2,
            available: 1
        })
    );
}

#[test]
fn derived_values_follow_tagged() {
    let queue = Rc::new(TickQueue::new());
    let calls = Rc::new(RefCell::new(Vec::new()));
    let node = DynamicTemplate::builder()
        .base(counting(calls))
        .args([json!(1)])
        .startag("all")
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    let root = mount(&node);

    let rest_len = Computed::from_observable(&node.tagged_observable(), |tagged| {
        tagged
            .get("all")
            .and_then(Tagged::as_rest)
            .map_or(0, <[_]>::len)
    });
    let notified = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&notified);
    let _sub = node.subscribe_tagged(move |_| counter.set(counter.get() + 1));

    root.initialize().unwrap();
    assert_eq!(rest_len.get(), 1);

    node.set_args([json!(4)]);
    queue.drain();
    assert_eq!(rest_len.get(), 4);
    assert_eq!(notified.get(), 2);
}

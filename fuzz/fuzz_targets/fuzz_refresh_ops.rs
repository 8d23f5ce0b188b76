#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use declet_core::schedule::{Scheduler, TickQueue};
use declet_template::{DynamicTemplate, FnTemplate, TemplateRef};
use declet_tree::{Declarative, DeclarativeRef, Element};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

#[derive(Arbitrary, Debug)]
enum Op {
    SetCount(u8),
    SetTags(u8),
    SetStartag(bool),
    EditData(u8),
    Refresh,
    Tick,
    Drain,
    Destroy,
}

fuzz_target!(|ops: Vec<Op>| {
    let queue = Rc::new(TickQueue::new());
    let root: DeclarativeRef = Element::new("root");
    let rows = TemplateRef::new(FnTemplate::new("Rows", ["count"], |args, _| {
        let count = args[0].as_u64().unwrap_or(0);
        Ok((0..count)
            .map(|i| Element::new(format!("row{i}")) as DeclarativeRef)
            .collect())
    }));
    let node = DynamicTemplate::builder()
        .base(rows)
        .args([json!(0)])
        .build(Rc::clone(&queue) as Rc<dyn Scheduler>);
    let anchor: DeclarativeRef = node.clone();
    anchor.object().set_parent(Some(&root));
    let _ = root.initialize();

    for op in ops.iter().take(64) {
        match op {
            Op::SetCount(n) => node.set_args([json!(n % 8)]),
            Op::SetTags(k) => {
                let _ = node.set_tags((0..k % 4).map(|i| format!("t{i}")));
            }
            Op::SetStartag(on) => {
                let _ = node.set_startag(if *on { "rest" } else { "" });
            }
            Op::EditData(v) => node.edit_data(|data| {
                data.insert("v".into(), json!(v));
            }),
            Op::Refresh => {
                let _ = node.refresh();
            }
            Op::Tick => {
                queue.tick();
            }
            Op::Drain => {
                queue.drain();
            }
            Op::Destroy => node.destroy(),
        }

        assert!(queue.pending_count() <= 1);
        if node.object().is_destroyed() {
            assert!(!node.has_pending_refresh());
            assert!(node.items().is_empty());
            continue;
        }
        let children = root.object().children();
        let at = root.object().index_of(&*anchor);
        let items = node.items();
        if let Some(at) = at {
            assert!(at >= items.len());
            for (offset, item) in items.iter().enumerate() {
                assert!(children[at - items.len() + offset].same_node(&**item));
            }
        }
    }
});

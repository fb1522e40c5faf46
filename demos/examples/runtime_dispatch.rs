// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime dispatch.
//!
//! Build trees from a dimension count and variant name read from the command
//! line, then rebuild a single box with an explicit ID.
//!
//! Run:
//! - `cargo run -p mdbox_demos --example runtime_dispatch -- 4 Full`

use std::sync::Arc;

use mdbox_geom::Extents;
use mdbox_tree::{
    AnyEvent, BoxController, BoxId, BoxKind, EventVariant, FullEvent, LeanEvent, SplitPolicy,
    create_box, create_tree,
};

fn main() {
    let mut args = std::env::args().skip(1);
    let nd: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(3);
    let variant = args.next().unwrap_or_else(|| "Lean".to_string());

    let controller = Arc::new(BoxController::new(SplitPolicy::uniform(16, 4, 2)));
    let extents = match Extents::cube(nd, -1.0, 1.0) {
        Ok(e) => e,
        Err(err) => {
            eprintln!("bad dimension count: {err}");
            return;
        }
    };
    let mut tree = match create_tree(nd, &variant, controller.clone(), extents) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("cannot create tree: {err}");
            return;
        }
    };
    println!(
        "created a {:?} tree with {} dimensions",
        tree.variant(),
        tree.nd()
    );

    // A diagonal line of events
    for i in 0..200 {
        let t = -1.0 + 2.0 * (i as f32 + 0.5) / 200.0;
        let coords = vec![t; nd];
        let lean = LeanEvent::from_slice(&coords, 1.0, 0.5).unwrap();
        let event = match tree.variant() {
            EventVariant::Lean => AnyEvent::Lean(lean),
            EventVariant::Full => AnyEvent::Full(FullEvent::new(*lean.center(), 1.0, 0.5, 0, 0, i)),
        };
        tree.insert(event).unwrap();
    }
    let splits = tree.split_all().unwrap();
    let stats = tree.stats();
    println!(
        "{splits} splits, leaves per depth {:?}",
        stats.leaves_per_depth
    );
    println!("largest leaf holds {} events", stats.max_leaf_events);

    // Rebuild one box as a loader would, with a stored ID
    let stored = BoxId::new(controller.next_unallocated_id() + 100);
    let kind = BoxKind::LeanGridBox;
    let node = create_box(nd, kind, &controller, Some(extents), 1, 0, stored).unwrap();
    println!(
        "rebuilt {:?} {} at depth {}, next fresh id is {}",
        node.kind(),
        node.id(),
        node.depth(),
        controller.next_unallocated_id()
    );
}

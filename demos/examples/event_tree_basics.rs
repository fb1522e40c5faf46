// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event tree basics.
//!
//! Fill a 2-D tree, split it once, and sum a sub-region.
//!
//! Run:
//! - `cargo run -p mdbox_demos --example event_tree_basics`

use std::sync::Arc;

use mdbox_geom::Extents;
use mdbox_tree::{BoxController, EventTree, LeanEvent, SplitPolicy, TraversalFilter};

fn main() {
    let controller = Arc::new(BoxController::new(SplitPolicy::uniform(3, 2, 2)));
    let extents = Extents::cube(2, 0.0, 4.0).unwrap();
    let mut tree = EventTree::<LeanEvent>::new(controller, extents).unwrap();

    // Four events in the lower corner, one far away
    for (x, y) in [(0.5, 0.5), (0.6, 0.5), (0.5, 0.6), (0.6, 0.6), (3.5, 3.5)] {
        tree.insert(LeanEvent::from_slice(&[x, y], 1.0, 1.0).unwrap())
            .unwrap();
    }

    let splits = tree.split_all().unwrap();
    println!("split {splits} boxes");

    for node in tree.boxes(TraversalFilter::leaves()) {
        if node.n_points() > 0 {
            println!(
                "leaf {} depth {} holds {} events in {:?}",
                node.id(),
                node.depth(),
                node.n_points(),
                node.extents().intervals()
            );
        }
    }

    let corner = Extents::cube(2, 0.0, 1.0).unwrap();
    let sum = tree.integrate(&corner).unwrap();
    println!("corner signal: {} ({} events)", sum.signal, sum.n_points);
    assert_eq!(
        sum.n_points, 4,
        "corner should hold the four clustered events"
    );
    assert_eq!(tree.signal(), 5.0);
}

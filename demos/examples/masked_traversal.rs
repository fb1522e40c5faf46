// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Masked traversal.
//!
//! Split a 3-D tree, mask one octant, and compare traversals with and without
//! the mask and with a depth cutoff.
//!
//! Run:
//! - `cargo run -p mdbox_demos --example masked_traversal`

use std::sync::Arc;

use mdbox_geom::Extents;
use mdbox_tree::{BoxController, EventTree, LeanEvent, Node, SplitPolicy, TraversalFilter};

fn main() {
    let controller = Arc::new(BoxController::new(SplitPolicy::uniform(8, 3, 2)));
    let mut tree =
        EventTree::<LeanEvent>::new(controller, Extents::cube(3, 0.0, 1.0).unwrap()).unwrap();

    // A regular lattice of events
    let steps = 12;
    let events = (0..steps * steps * steps).map(|i| {
        let coord = |k: usize| (k as f32 + 0.5) / steps as f32;
        let p = [coord(i % steps), coord(i / steps % steps), coord(i / (steps * steps))];
        LeanEvent::from_slice(&p, 1.0, 1.0).unwrap()
    });
    let inserted = tree.insert_many(events).unwrap();
    tree.split_all().unwrap();
    println!("inserted {inserted} events");

    let first_octant = tree.root().children()[0].id();
    tree.set_masked(first_octant, true);

    let all_leaves = tree.boxes(TraversalFilter::leaves()).count();
    let visible: u64 = tree
        .boxes(TraversalFilter::leaves().unmasked())
        .map(Node::n_points)
        .sum();
    let shallow = tree
        .boxes(TraversalFilter::leaves().with_max_depth(1))
        .count();
    println!("{all_leaves} leaves in total");
    println!("{visible} events outside the masked octant");
    println!("{shallow} boxes at the depth-1 cutoff");
    let masked = tree.find_box(first_octant).unwrap().n_points();
    assert_eq!(visible, tree.n_points() - masked);

    if let Some(c) = tree.centroid() {
        println!("centroid {:?}", c.as_slice());
    }
}

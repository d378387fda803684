//! Integration tests for strata-index.
//!
//! A brute-force model checks the tree after every step of randomized
//! insert/remove/update sequences.

use proptest::prelude::*;
use std::collections::BTreeMap;
use strata_core::Rect;
use strata_index::{IndexConfig, SpatialEntry, SpatialError, SpatialIndex};

fn validating(max_fanout: usize, min_fanout: usize) -> SpatialIndex<u16> {
    SpatialIndex::with_config(IndexConfig {
        max_fanout,
        min_fanout,
        validate_on_mutation: true,
    })
}

fn sorted_keys(entries: &[SpatialEntry<u16>]) -> Vec<u16> {
    let mut keys: Vec<u16> = entries.iter().map(|e| e.key).collect();
    keys.sort_unstable();
    keys
}

// =============================================================================
// Scenario tests
// =============================================================================

#[test]
fn test_grid_of_widgets() {
    let mut index = validating(4, 2);
    for row in 0..10 {
        for col in 0..10 {
            let key = (row * 10 + col) as u16;
            index
                .insert(key, Rect::new(col * 8, row * 2, 8, 2), 0)
                .unwrap();
        }
    }
    assert!(index.height() >= 3);

    // A 16x4 window over the grid hits a 2x2 block of widgets.
    let hits = index.query(&Rect::new(8, 2, 16, 4));
    assert_eq!(sorted_keys(&hits), vec![11, 12, 21, 22]);

    // Remove a column and make sure nothing in it is ever returned again.
    for row in 0..10 {
        index.remove(&((row * 10 + 1) as u16)).unwrap();
    }
    let hits = index.query(&Rect::new(8, 0, 8, 20));
    assert!(hits.is_empty());
    assert_eq!(index.len(), 90);
}

#[test]
fn test_modal_over_dashboard() {
    let mut index = SpatialIndex::new();
    index.insert("sidebar", Rect::new(0, 0, 20, 24), 0).unwrap();
    index.insert("content", Rect::new(20, 0, 60, 24), 0).unwrap();
    index.insert("button", Rect::new(30, 10, 10, 3), 1).unwrap();
    index.insert("modal", Rect::new(25, 8, 30, 8), 10).unwrap();

    let viewport = Rect::new(0, 0, 80, 24);
    let visible: Vec<_> = index.query_visible(&viewport).iter().map(|e| e.key).collect();
    assert_eq!(visible, vec!["sidebar", "content", "modal"]);
    assert!(index.is_completely_occluded(&"button").unwrap());

    // Moving the modal away uncovers the button.
    index.update("modal", Rect::new(50, 8, 30, 8), 10).unwrap();
    assert!(!index.is_completely_occluded(&"button").unwrap());
    assert_eq!(index.visible_area(&"button").unwrap(), 30);

    assert_eq!(index.query_point(35, 11)[0].key, "button");
}

#[test]
fn test_unknown_keys_are_errors() {
    let mut index: SpatialIndex<u16> = SpatialIndex::new();
    assert!(matches!(index.remove(&1), Err(SpatialError::UnknownKey(_))));
    assert!(matches!(
        index.update(1, Rect::new(0, 0, 1, 1), 0),
        Err(SpatialError::UnknownKey(_))
    ));
    assert!(index.visible_region(&1).is_err());
    assert!(index.bring_to_front(&1).is_err());
}

// =============================================================================
// Property tests
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, Rect, i32),
    Remove(u16),
    Update(u16, Rect, i32),
    Restack(u16, i32),
}

fn arb_rect() -> impl Strategy<Value = Rect> {
    (-10i32..60, -10i32..30, 0i32..12, 0i32..6).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u16..40, arb_rect(), -3i32..4).prop_map(|(k, r, z)| Op::Insert(k, r, z)),
        1 => (0u16..40).prop_map(Op::Remove),
        2 => (0u16..40, arb_rect(), -3i32..4).prop_map(|(k, r, z)| Op::Update(k, r, z)),
        1 => (0u16..40, -3i32..4).prop_map(|(k, z)| Op::Restack(k, z)),
    ]
}

/// Apply `op` to both the index and the model, checking that they agree on
/// the outcome.
fn step(index: &mut SpatialIndex<u16>, model: &mut BTreeMap<u16, (Rect, i32)>, op: &Op) {
    match *op {
        Op::Insert(key, bounds, z) => {
            let result = index.insert(key, bounds, z);
            assert_eq!(result.is_ok(), !model.contains_key(&key));
            model.entry(key).or_insert((bounds, z));
        }
        Op::Remove(key) => {
            let result = index.remove(&key);
            assert_eq!(result.is_ok(), model.remove(&key).is_some());
        }
        Op::Update(key, bounds, z) => {
            let result = index.update(key, bounds, z);
            assert_eq!(result.is_ok(), model.contains_key(&key));
            if let Some(slot) = model.get_mut(&key) {
                *slot = (bounds, z);
            }
        }
        Op::Restack(key, z) => {
            let result = index.update_z_index(&key, z);
            assert_eq!(result.is_ok(), model.contains_key(&key));
            if let Some(slot) = model.get_mut(&key) {
                slot.1 = z;
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_query_matches_brute_force(
        ops in prop::collection::vec(arb_op(), 1..120),
        probe in arb_rect(),
        fanout in prop::sample::select(vec![(4usize, 2usize), (8, 2), (8, 4)]),
    ) {
        let mut index = validating(fanout.0, fanout.1);
        let mut model = BTreeMap::new();

        for op in &ops {
            step(&mut index, &mut model, op);

            let expected: Vec<u16> = model
                .iter()
                .filter(|(_, (bounds, _))| bounds.intersects(&probe))
                .map(|(key, _)| *key)
                .collect();
            prop_assert_eq!(sorted_keys(&index.query(&probe)), expected);
            prop_assert_eq!(index.len(), model.len());
        }

        for (key, (bounds, z)) in &model {
            let entry = index.get(key).copied();
            prop_assert_eq!(entry.map(|e| (e.bounds, e.z)), Some((*bounds, *z)));
        }
        prop_assert!(index.validate().is_ok());
    }

    #[test]
    fn prop_removed_keys_never_return(
        rects in prop::collection::vec(arb_rect(), 1..60),
    ) {
        let mut index = validating(4, 2);
        for (i, r) in rects.iter().enumerate() {
            index.insert(i as u16, *r, i as i32 % 3).unwrap();
        }
        let everywhere = Rect::new(-100, -100, 300, 300);
        for i in (0..rects.len()).step_by(2) {
            index.remove(&(i as u16)).unwrap();
        }
        for entry in index.query(&everywhere) {
            prop_assert!(entry.key % 2 == 1);
        }
    }

    #[test]
    fn prop_query_is_paint_ordered(
        rects in prop::collection::vec((arb_rect(), -5i32..5), 1..40),
    ) {
        let mut index = validating(8, 2);
        for (i, (r, z)) in rects.iter().enumerate() {
            index.insert(i as u16, *r, *z).unwrap();
        }
        let hits = index.query(&Rect::new(-100, -100, 300, 300));
        for pair in hits.windows(2) {
            prop_assert!(pair[1].is_above(&pair[0]));
        }
    }

    #[test]
    fn prop_contained_under_higher_is_hidden(
        outer in (-10i32..60, -10i32..30, 5i32..20, 5i32..10)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h)),
        dx in 0i32..4, dy in 0i32..4,
    ) {
        let inner = Rect::new(outer.x + dx, outer.y + dy, outer.width - dx, outer.height - dy);
        let mut index = SpatialIndex::new();
        index.insert(1u16, inner, 0).unwrap();
        index.insert(2u16, outer, 1).unwrap();

        prop_assert!(index.is_completely_occluded(&1).unwrap());
        let viewport = outer.union(&Rect::new(-20, -20, 1, 1));
        prop_assert!(index.query_visible(&viewport).iter().all(|e| e.key != 1));
    }
}

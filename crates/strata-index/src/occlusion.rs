//! Occlusion queries.
//!
//! An entry is occluded by every intersecting entry that paints above it
//! (higher z, or equal z and a higher sequence number). Visible regions are computed
//! by rectangle subtraction and reported as an exact set of disjoint
//! pieces.

use crate::error::SpatialError;
use crate::rtree::{EntryKey, SpatialEntry, SpatialIndex};
use strata_core::Rect;

/// Subtract every occluder from `region`.
///
/// Returns `None` when nothing remains, otherwise the disjoint visible
/// pieces.
#[must_use]
pub fn visible_pieces(region: Rect, occluders: impl IntoIterator<Item = Rect>) -> Option<Vec<Rect>> {
    if region.is_empty() {
        return None;
    }
    let mut pieces = vec![region];
    for occluder in occluders {
        if !occluder.intersects(&region) {
            continue;
        }
        pieces = pieces.iter().flat_map(|p| p.subtract(&occluder)).collect();
        if pieces.is_empty() {
            return None;
        }
    }
    Some(pieces)
}

impl<K: EntryKey> SpatialIndex<K> {
    /// Entries in `viewport` with at least one visible cell inside it, in
    /// paint order.
    #[must_use]
    pub fn query_visible(&self, viewport: &Rect) -> Vec<SpatialEntry<K>> {
        let candidates = self.query(viewport);
        candidates
            .iter()
            .enumerate()
            .filter(|&(i, entry)| {
                let above = candidates[i + 1..].iter().map(|o| o.bounds);
                visible_pieces(entry.bounds.intersect(viewport), above).is_some()
            })
            .map(|(_, entry)| *entry)
            .collect()
    }

    /// Entries below `key` that intersect it, in paint order.
    pub fn find_occluded_by(&self, key: &K) -> Result<Vec<SpatialEntry<K>>, SpatialError> {
        let entry = self.entry(key)?;
        Ok(self
            .query(&entry.bounds)
            .into_iter()
            .filter(|other| entry.is_above(other))
            .collect())
    }

    /// Entries above `key` that intersect it, in paint order.
    pub fn find_occluding(&self, key: &K) -> Result<Vec<SpatialEntry<K>>, SpatialError> {
        let entry = self.entry(key)?;
        Ok(self
            .query(&entry.bounds)
            .into_iter()
            .filter(|other| other.is_above(&entry))
            .collect())
    }

    /// True if a single entry above `key` covers all of its bounds.
    pub fn is_completely_occluded(&self, key: &K) -> Result<bool, SpatialError> {
        let entry = self.entry(key)?;
        Ok(self
            .find_occluding(key)?
            .iter()
            .any(|other| other.bounds.contains(&entry.bounds)))
    }

    /// Visible part of `key` as disjoint pieces, or `None` if nothing of it
    /// shows (including entries with empty bounds).
    pub fn visible_region(&self, key: &K) -> Result<Option<Vec<Rect>>, SpatialError> {
        let entry = self.entry(key)?;
        let occluders = self.find_occluding(key)?;
        Ok(visible_pieces(
            entry.bounds,
            occluders.iter().map(|other| other.bounds),
        ))
    }

    /// The largest single visible piece of `key`.
    pub fn largest_visible_piece(&self, key: &K) -> Result<Option<Rect>, SpatialError> {
        Ok(self
            .visible_region(key)?
            .and_then(|pieces| pieces.into_iter().max_by_key(Rect::area)))
    }

    /// Number of visible cells of `key`.
    pub fn visible_area(&self, key: &K) -> Result<i64, SpatialError> {
        Ok(self
            .visible_region(key)?
            .map_or(0, |pieces| pieces.iter().map(Rect::area).sum()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacked() -> SpatialIndex<&'static str> {
        let mut index = SpatialIndex::new();
        index.insert("base", Rect::new(0, 0, 20, 10), 0).unwrap();
        index.insert("card", Rect::new(2, 2, 6, 4), 1).unwrap();
        index.insert("modal", Rect::new(0, 0, 10, 8), 5).unwrap();
        index.insert("far", Rect::new(40, 40, 2, 2), 9).unwrap();
        index
    }

    #[test]
    fn test_visible_pieces_basic() {
        assert_eq!(
            visible_pieces(Rect::new(0, 0, 4, 4), Vec::new()),
            Some(vec![Rect::new(0, 0, 4, 4)])
        );
        assert_eq!(
            visible_pieces(Rect::new(0, 0, 4, 4), [Rect::new(0, 0, 5, 5)]),
            None
        );
        assert_eq!(visible_pieces(Rect::new(0, 0, 0, 4), Vec::new()), None);
    }

    #[test]
    fn test_visible_pieces_union_of_occluders() {
        // Two halves cover the region together, neither alone.
        let region = Rect::new(0, 0, 10, 2);
        let halves = [Rect::new(0, 0, 5, 2), Rect::new(5, 0, 5, 2)];
        assert_eq!(visible_pieces(region, halves), None);
    }

    #[test]
    fn test_find_occluding_and_occluded() {
        let index = stacked();
        let over_card: Vec<_> = index
            .find_occluding(&"card")
            .unwrap()
            .iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(over_card, vec!["modal"]);

        let under_modal: Vec<_> = index
            .find_occluded_by(&"modal")
            .unwrap()
            .iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(under_modal, vec!["base", "card"]);
    }

    #[test]
    fn test_completely_occluded() {
        let index = stacked();
        assert!(index.is_completely_occluded(&"card").unwrap());
        assert!(!index.is_completely_occluded(&"base").unwrap());
        assert!(!index.is_completely_occluded(&"modal").unwrap());
        assert!(index.is_completely_occluded(&"ghost").is_err());
    }

    #[test]
    fn test_query_visible_excludes_hidden() {
        let index = stacked();
        let visible: Vec<_> = index
            .query_visible(&Rect::new(0, 0, 80, 60))
            .iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(visible, vec!["base", "modal", "far"]);
    }

    #[test]
    fn test_query_visible_clips_to_viewport() {
        let index = stacked();
        // Inside the viewport only the modal-covered part of base shows.
        let visible: Vec<_> = index
            .query_visible(&Rect::new(0, 0, 10, 8))
            .iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(visible, vec!["modal"]);
    }

    #[test]
    fn test_visible_region_exact() {
        let index = stacked();
        assert_eq!(index.visible_region(&"card").unwrap(), None);
        assert_eq!(index.visible_area(&"base").unwrap(), 200 - 80);
        let pieces = index.visible_region(&"base").unwrap().unwrap();
        for piece in &pieces {
            assert!(!piece.intersects(&Rect::new(0, 0, 10, 8)));
        }
        let largest = index.largest_visible_piece(&"base").unwrap().unwrap();
        assert_eq!(largest.area(), 40);
        assert!(pieces.contains(&largest));
    }

    #[test]
    fn test_equal_z_later_insert_occludes() {
        let mut index = SpatialIndex::new();
        index.insert(1u8, Rect::new(0, 0, 4, 4), 0).unwrap();
        index.insert(2u8, Rect::new(0, 0, 4, 4), 0).unwrap();
        assert!(index.is_completely_occluded(&1).unwrap());
        assert!(!index.is_completely_occluded(&2).unwrap());
    }

    #[test]
    fn test_restack_reveals() {
        let mut index = stacked();
        index.bring_to_front(&"card").unwrap();
        assert!(!index.is_completely_occluded(&"card").unwrap());
        assert_eq!(index.visible_area(&"card").unwrap(), 24);
    }
}

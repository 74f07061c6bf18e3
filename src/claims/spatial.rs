//! Per-world R-trees over claim footprints on the X/Z plane.
//!
//! Subclaims and top-level claims live in separate trees so point lookups can
//! consult subclaims strictly first.

use std::collections::HashMap;

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::claims::claim::Claim;
use crate::claims::types::ClaimKey;

type Footprint = GeomWithData<Rectangle<[i32; 2]>, ClaimKey>;

fn footprint(claim: &Claim, key: ClaimKey) -> Footprint {
    GeomWithData::new(
        Rectangle::from_corners([claim.lower.x, claim.lower.z], [claim.upper.x, claim.upper.z]),
        key,
    )
}

#[derive(Default)]
struct WorldLayers {
    top_level: RTree<Footprint>,
    subclaims: RTree<Footprint>,
}

impl WorldLayers {
    fn layer_mut(&mut self, subclaim: bool) -> &mut RTree<Footprint> {
        if subclaim {
            &mut self.subclaims
        } else {
            &mut self.top_level
        }
    }

    fn is_empty(&self) -> bool {
        self.top_level.size() == 0 && self.subclaims.size() == 0
    }
}

#[derive(Default)]
pub struct SpatialIndex {
    worlds: HashMap<String, WorldLayers>,
}

impl SpatialIndex {
    pub fn insert(&mut self, claim: &Claim) {
        let Some(key) = claim.key else {
            return;
        };
        self.worlds
            .entry(claim.world.clone())
            .or_default()
            .layer_mut(claim.is_subclaim())
            .insert(footprint(claim, key));
    }

    /// Remove the footprint recorded for `claim`. The claim must carry the
    /// same bounds it was inserted with.
    pub fn remove(&mut self, claim: &Claim) -> bool {
        let Some(key) = claim.key else {
            return false;
        };
        let Some(layers) = self.worlds.get_mut(&claim.world) else {
            return false;
        };
        let removed = layers
            .layer_mut(claim.is_subclaim())
            .remove(&footprint(claim, key))
            .is_some();
        if layers.is_empty() {
            self.worlds.remove(&claim.world);
        }
        removed
    }

    pub fn subclaims_at(&self, world: &str, x: i32, z: i32) -> Vec<ClaimKey> {
        self.worlds
            .get(world)
            .map(|layers| collect_at(&layers.subclaims, x, z))
            .unwrap_or_default()
    }

    pub fn top_level_at(&self, world: &str, x: i32, z: i32) -> Vec<ClaimKey> {
        self.worlds
            .get(world)
            .map(|layers| collect_at(&layers.top_level, x, z))
            .unwrap_or_default()
    }

    /// Top-level claims whose footprint touches the X/Z box of `claim`.
    pub fn top_level_intersecting(&self, claim: &Claim) -> Vec<ClaimKey> {
        let Some(layers) = self.worlds.get(&claim.world) else {
            return Vec::new();
        };
        let envelope = AABB::from_corners(
            [claim.lower.x, claim.lower.z],
            [claim.upper.x, claim.upper.z],
        );
        let mut keys: Vec<ClaimKey> = layers
            .top_level
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.data)
            .collect();
        keys.sort();
        keys
    }
}

fn collect_at(tree: &RTree<Footprint>, x: i32, z: i32) -> Vec<ClaimKey> {
    let mut keys: Vec<ClaimKey> = tree
        .locate_all_at_point(&[x, z])
        .map(|item| item.data)
        .collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::types::BlockPos;
    use uuid::Uuid;

    fn keyed(key: u64, x1: i32, z1: i32, x2: i32, z2: i32, parent: Option<u64>) -> Claim {
        let mut claim = Claim::from_corners(
            "world",
            BlockPos::new(x1, 0, z1),
            BlockPos::new(x2, 0, z2),
            Uuid::new_v4(),
            256,
        );
        claim.key = Some(ClaimKey(key));
        claim.parent = parent.map(ClaimKey);
        claim
    }

    #[test]
    fn layers_are_queried_separately() {
        let mut index = SpatialIndex::default();
        let parent = keyed(1, 0, 0, 20, 20, None);
        let child = keyed(2, 5, 5, 8, 8, Some(1));
        index.insert(&parent);
        index.insert(&child);

        assert_eq!(index.subclaims_at("world", 6, 6), vec![ClaimKey(2)]);
        assert_eq!(index.top_level_at("world", 6, 6), vec![ClaimKey(1)]);
        assert!(index.subclaims_at("world", 1, 1).is_empty());
        assert!(index.top_level_at("nether", 6, 6).is_empty());
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut index = SpatialIndex::default();
        index.insert(&keyed(1, 0, 0, 10, 10, None));
        assert_eq!(index.top_level_at("world", 10, 10), vec![ClaimKey(1)]);
        assert!(index.top_level_at("world", 11, 10).is_empty());
    }

    #[test]
    fn remove_uses_recorded_bounds() {
        let mut index = SpatialIndex::default();
        let claim = keyed(1, 0, 0, 10, 10, None);
        index.insert(&claim);
        let mut moved = claim.clone();
        moved.upper.x = 12;
        assert!(!index.remove(&moved));
        assert!(index.remove(&claim));
        assert!(index.top_level_at("world", 5, 5).is_empty());
    }

    #[test]
    fn intersecting_query_finds_touching_neighbours() {
        let mut index = SpatialIndex::default();
        index.insert(&keyed(1, 0, 0, 10, 10, None));
        index.insert(&keyed(2, 30, 30, 40, 40, None));
        let candidate = keyed(9, 10, 10, 15, 15, None);
        assert_eq!(index.top_level_intersecting(&candidate), vec![ClaimKey(1)]);
    }
}

//! LRU cache of computed line-of-sight windows.
//!
//! Computing a full visibility window is too expensive to redo every
//! frame for every observer, so computed masks are kept keyed by
//! (place, x, y) and invalidated when terrain in their footprint
//! changes.

use glam::{ivec2, IVec2};
use los::Los;
use util::IndexMap;

use crate::{
    Place, MASK_CACHE_HIGH_WATER, MASK_CACHE_LOW_WATER, MASK_RADIUS, MASK_W,
};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct MaskKey {
    place: String,
    x: i32,
    y: i32,
}

/// Cache of visibility masks over `MASK_W` × `MASK_W` windows.
///
/// `get` returns a row-major visibility bitmap (0 = hidden, 1 = visible)
/// centered on the viewer. Returned slices are owned by the cache and
/// valid until the next mutating call.
pub struct VisibilityCache {
    los: Los,
    /// Mask store in recency order: front is LRU, back is MRU.
    masks: IndexMap<MaskKey, Vec<u8>>,
    high_water: usize,
    low_water: usize,
}

impl Default for VisibilityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityCache {
    pub fn new() -> VisibilityCache {
        VisibilityCache::with_water_marks(
            MASK_CACHE_HIGH_WATER,
            MASK_CACHE_LOW_WATER,
        )
    }

    pub fn with_water_marks(
        high_water: usize,
        low_water: usize,
    ) -> VisibilityCache {
        assert!(low_water < high_water);
        VisibilityCache {
            los: Los::new(MASK_W),
            masks: IndexMap::default(),
            high_water,
            low_water,
        }
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Visibility mask for a viewer standing at `loc`.
    ///
    /// A cached mask is refreshed to most-recently-used; a miss computes
    /// the mask, evicting down to the low-water mark first when the cache
    /// is full.
    pub fn get(&mut self, place: &Place, loc: IVec2) -> &[u8] {
        let loc = place.wrap(loc);
        let key = MaskKey {
            place: place.name().to_owned(),
            x: loc.x,
            y: loc.y,
        };

        if let Some(i) = self.masks.get_index_of(&key) {
            let mru = self.masks.len() - 1;
            self.masks.move_index(i, mru);
            return &self.masks[mru];
        }

        if self.masks.len() >= self.high_water {
            log::debug!(
                "visibility cache at {}, purging to {}",
                self.masks.len(),
                self.low_water
            );
            while self.masks.len() > self.low_water {
                self.masks.shift_remove_index(0);
            }
        }

        // Sample the opacity window and compute. The LOS engine's output
        // buffer is scratch space, so copy it out.
        let mut alpha = vec![0; MASK_W * MASK_W];
        for wy in 0..MASK_W as i32 {
            for wx in 0..MASK_W as i32 {
                let abs =
                    loc + ivec2(wx - MASK_RADIUS, wy - MASK_RADIUS);
                alpha[(wy * MASK_W as i32 + wx) as usize] =
                    place.visibility_at(abs);
            }
        }
        let mask = self.los.compute(&alpha).to_vec();

        let (i, _) = self.masks.insert_full(key, mask);
        debug_assert_eq!(i, self.masks.len() - 1);
        &self.masks[i]
    }

    /// Drop every mask whose window could have sampled the given changed
    /// rectangle.
    ///
    /// Call this whenever terrain or sight-blocking mechanisms on the
    /// place change. The overlap test is conservative: the rectangle is
    /// expanded by the window half-width on every side.
    pub fn invalidate(
        &mut self,
        place: &Place,
        loc: IVec2,
        width: i32,
        height: i32,
    ) {
        let loc = place.wrap(loc);
        let wrap = place.wraps();
        let (pw, ph) = (place.width(), place.height());

        self.masks.retain(|key, _| {
            key.place != place.name()
                || !(axis_overlaps(key.x, loc.x, width, wrap.then_some(pw))
                    && axis_overlaps(
                        key.y,
                        loc.y,
                        height,
                        wrap.then_some(ph),
                    ))
        });
    }

    pub fn invalidate_all(&mut self) {
        self.masks.clear();
    }
}

/// Whether a mask centered at `c` could sample inside `[lo, lo + extent)`
/// along one axis, expanded by the mask radius, optionally in modular
/// space.
fn axis_overlaps(c: i32, lo: i32, extent: i32, wrap_len: Option<i32>) -> bool {
    let span = extent + 2 * MASK_RADIUS;
    match wrap_len {
        Some(len) if span >= len => true,
        Some(len) => (c - (lo - MASK_RADIUS)).rem_euclid(len) < span,
        None => {
            c >= lo - MASK_RADIUS && c < lo + extent + MASK_RADIUS
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Layer, Mechanism, Obj, PassabilityTable, Terrain};

    fn grass() -> Arc<Terrain> {
        Arc::new(Terrain::new("grass", ',', 1))
    }

    fn wall() -> Arc<Terrain> {
        Arc::new(Terrain::new("wall", '#', 3).opaque())
    }

    fn open_place(name: &str) -> Place {
        let mut p = Place::new(name, 64, 64)
            .with_pass_table(Arc::new(PassabilityTable::default()));
        p.fill_terrain(&grass());
        p
    }

    fn center_idx() -> usize {
        MASK_RADIUS as usize * MASK_W + MASK_RADIUS as usize
    }

    #[test]
    fn masks_are_cached() {
        let p = open_place("field");
        let mut cache = VisibilityCache::new();

        let first = cache.get(&p, ivec2(30, 30)).to_vec();
        assert_eq!(cache.len(), 1);
        assert_eq!(first[center_idx()], 1);

        // Second query hits the cache: equal contents, no growth.
        let second = cache.get(&p, ivec2(30, 30)).to_vec();
        assert_eq!(cache.len(), 1);
        assert_eq!(first, second);

        // Same coordinates on a different place is a different entry.
        let q = open_place("other");
        cache.get(&q, ivec2(30, 30));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn walls_hide_tiles() {
        let mut p = open_place("field");
        // Wall immediately east of the viewer at (30, 30).
        p.set_terrain(ivec2(31, 30), Some(wall()));

        let mut cache = VisibilityCache::new();
        let mask = cache.get(&p, ivec2(30, 30));

        let at = |dx: i32, dy: i32| {
            mask[((MASK_RADIUS + dy) * MASK_W as i32 + MASK_RADIUS + dx)
                as usize]
        };
        assert_eq!(at(0, 0), 1);
        // The wall is seen, the tile straight behind it is not.
        assert_eq!(at(1, 0), 1);
        assert_eq!(at(2, 0), 0);
    }

    #[test]
    fn lru_purges_to_low_water() {
        let p = open_place("field");
        let mut cache = VisibilityCache::with_water_marks(10, 5);

        for x in 0..10 {
            cache.get(&p, ivec2(x, 0));
        }
        assert_eq!(cache.len(), 10);

        // Next miss triggers the purge, then inserts.
        cache.get(&p, ivec2(10, 0));
        assert_eq!(cache.len(), 6);

        // The most recent entries survived in LRU order.
        for x in 6..=10 {
            let before = cache.len();
            cache.get(&p, ivec2(x, 0));
            assert_eq!(cache.len(), before, "entry for x={x} was evicted");
        }
    }

    #[test]
    fn recently_used_entries_survive_purge() {
        let p = open_place("field");
        let mut cache = VisibilityCache::with_water_marks(10, 3);

        for x in 0..9 {
            cache.get(&p, ivec2(x, 0));
        }
        // Refresh an old entry to MRU, then push the cache over the mark.
        cache.get(&p, ivec2(0, 0));
        cache.get(&p, ivec2(9, 0));
        cache.get(&p, ivec2(10, 0));
        assert_eq!(cache.len(), 4);

        let before = cache.len();
        cache.get(&p, ivec2(0, 0));
        assert_eq!(cache.len(), before, "refreshed entry was evicted");
    }

    #[test]
    fn invalidation_covers_window_footprint() {
        let mut p = open_place("field");
        let mut cache = VisibilityCache::new();

        cache.get(&p, ivec2(30, 30));
        // A viewer whose window cannot see (31, 30).
        cache.get(&p, ivec2(10, 30));
        assert_eq!(cache.len(), 2);

        // Build a wall at (31, 30) and invalidate its footprint.
        p.set_terrain(ivec2(31, 30), Some(wall()));
        cache.invalidate(&p, ivec2(31, 30), 1, 1);
        assert_eq!(cache.len(), 1);

        // Recomputed mask reflects the new wall.
        let mask = cache.get(&p, ivec2(30, 30));
        let behind = (MASK_RADIUS * MASK_W as i32 + MASK_RADIUS + 2) as usize;
        assert_eq!(mask[behind], 0);
    }

    #[test]
    fn invalidation_is_per_place() {
        let p = open_place("field");
        let q = open_place("other");
        let mut cache = VisibilityCache::new();

        cache.get(&p, ivec2(30, 30));
        cache.get(&q, ivec2(30, 30));
        cache.invalidate(&p, ivec2(30, 30), 1, 1);
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn door_toggle_changes_mask() {
        let mut p = open_place("keep");
        p.add_object(
            Obj::mechanism(
                "door",
                Mechanism {
                    open: false,
                    bumpable: true,
                    opaque: true,
                    on_bump: None,
                },
            ),
            ivec2(31, 30),
        )
        .unwrap();

        let mut cache = VisibilityCache::new();
        let behind = (MASK_RADIUS * MASK_W as i32 + MASK_RADIUS + 2) as usize;

        let mask = cache.get(&p, ivec2(30, 30));
        assert_eq!(mask[behind], 0);

        let door = p.object_at(ivec2(31, 30), Layer::Mechanism).unwrap();
        p.get_mut(door).unwrap().as_mechanism_mut().unwrap().open = true;
        cache.invalidate(&p, ivec2(31, 30), 1, 1);

        let mask = cache.get(&p, ivec2(30, 30));
        assert_eq!(mask[behind], 1);
    }

    #[test]
    fn wrapping_invalidation() {
        let mut p = Place::new("torus", 64, 64)
            .wrapping()
            .with_pass_table(Arc::new(PassabilityTable::default()));
        p.fill_terrain(&grass());

        let mut cache = VisibilityCache::new();
        // Window at the west edge wraps around to sample the east edge.
        cache.get(&p, ivec2(0, 30));
        cache.invalidate(&p, ivec2(63, 30), 1, 1);
        assert!(cache.is_empty());
    }
}

//! Spatial simulation core: map grid, visibility and combat resolution.

/// Visibility window half-width around a viewer, in tiles.
pub const MASK_RADIUS: i32 = 19;

/// Visibility window width. Odd so the viewer has a center cell.
pub const MASK_W: usize = MASK_RADIUS as usize * 2 + 1;

/// Cached visibility mask count that triggers a purge.
pub const MASK_CACHE_HIGH_WATER: usize = 100;

/// Mask count a cache purge trims down to.
pub const MASK_CACHE_LOW_WATER: usize = 50;

mod arms;
pub use arms::{ArmsType, SlotFlags};

mod character;
pub use character::{Character, ReadyResult, Species};

mod combat;

mod hook;
pub use hook::{Hook, Invocable};

mod obj;
pub use obj::{Feature, Layer, Mechanism, Obj, ObjId, ObjKind};

mod passability;
pub use passability::{MovementMode, PassabilityTable, IMPASSABLE};

mod place;
pub use place::Place;

pub mod prelude;

mod registry;
pub use registry::ContentRegistry;

mod terrain;
pub use terrain::{Hazard, Terrain};

mod vismask;
pub use vismask::VisibilityCache;

pub use crate::{
    ArmsType, Character, Hazard, Hook, Layer, MovementMode, Obj, ObjId,
    ObjKind, PassabilityTable, Place, ReadyResult, Species, Terrain,
    VisibilityCache, IMPASSABLE, MASK_RADIUS, MASK_W,
};
pub use glam::{ivec2, IVec2};
pub use std::sync::Arc;
pub use util::{Dice, GameRng, HashMap, HashSet, IndexMap};

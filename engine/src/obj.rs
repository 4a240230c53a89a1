use std::sync::Arc;

use glam::IVec2;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::{ArmsType, Character, Hazard, Hook};

/// Object layers on a map tile.
///
/// At most one object occupies a given (x, y, layer) slot. Declaration
/// order is the search and render order, lowest first.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    TerrainFeature,
    Mechanism,
    Portal,
    Vehicle,
    Bed,
    Container,
    Item,
    Field,
    Being,
    Missile,
    Cursor,
}

/// Handle to an object resident in a `Place`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjId(pub(crate) u32);

/// Terrain feature such as a bridge, overriding base terrain passability.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Feature {
    /// Passability class the feature presents instead of the base
    /// terrain's. Class 0 means the feature ignores passability and the
    /// base terrain decides.
    pub pass_class: u8,
}

/// Door-like interactable machinery.
#[derive(Clone, Default)]
pub struct Mechanism {
    pub open: bool,
    /// Whether walking into the closed mechanism attempts to open it.
    pub bumpable: bool,
    /// Whether the closed mechanism blocks sight.
    pub opaque: bool,
    /// Scripted open handler, consulted when the mechanism is bumped. A
    /// missing handler means bumping always opens.
    pub on_bump: Option<Hook>,
}

impl Mechanism {
    pub fn blocks(&self) -> bool {
        !self.open
    }

    pub fn blocks_sight(&self) -> bool {
        self.opaque && !self.open
    }
}

/// Object payload, determines the layer the object occupies.
#[derive(Clone, Default)]
pub enum ObjKind {
    Feature(Feature),
    Mechanism(Mechanism),
    Being(Character),
    Item(Arc<ArmsType>),
    Field(Hazard),
    /// Inert object on one of the remaining layers.
    #[default]
    Scenery,
}

/// An object resident on a map tile.
#[derive(Clone)]
pub struct Obj {
    pub name: String,
    pub pos: IVec2,
    pub kind: ObjKind,
    layer: Layer,
}

impl Obj {
    /// Layers are assigned explicitly from the object kind, there is no
    /// name-based guessing.
    fn with_kind(name: impl Into<String>, kind: ObjKind, layer: Layer) -> Obj {
        Obj {
            name: name.into(),
            pos: IVec2::ZERO,
            kind,
            layer,
        }
    }

    pub fn feature(name: impl Into<String>, pass_class: u8) -> Obj {
        Obj::with_kind(
            name,
            ObjKind::Feature(Feature { pass_class }),
            Layer::TerrainFeature,
        )
    }

    pub fn mechanism(name: impl Into<String>, mechanism: Mechanism) -> Obj {
        Obj::with_kind(name, ObjKind::Mechanism(mechanism), Layer::Mechanism)
    }

    pub fn being(character: Character) -> Obj {
        let name = character.name.clone();
        Obj::with_kind(name, ObjKind::Being(character), Layer::Being)
    }

    pub fn item(arms: Arc<ArmsType>) -> Obj {
        let name = arms.name.clone();
        Obj::with_kind(name, ObjKind::Item(arms), Layer::Item)
    }

    pub fn field(name: impl Into<String>, hazard: Hazard) -> Obj {
        Obj::with_kind(name, ObjKind::Field(hazard), Layer::Field)
    }

    /// Inert object on an explicitly given layer (portals, vehicles, beds,
    /// containers, cursors).
    pub fn scenery(name: impl Into<String>, layer: Layer) -> Obj {
        debug_assert!(
            !matches!(
                layer,
                Layer::TerrainFeature
                    | Layer::Mechanism
                    | Layer::Being
                    | Layer::Item
                    | Layer::Field
            ),
            "structured layers have dedicated constructors"
        );
        Obj::with_kind(name, ObjKind::Scenery, layer)
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn as_being(&self) -> Option<&Character> {
        match &self.kind {
            ObjKind::Being(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_being_mut(&mut self) -> Option<&mut Character> {
        match &mut self.kind {
            ObjKind::Being(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_mechanism(&self) -> Option<&Mechanism> {
        match &self.kind {
            ObjKind::Mechanism(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mechanism_mut(&mut self) -> Option<&mut Mechanism> {
        match &mut self.kind {
            ObjKind::Mechanism(m) => Some(m),
            _ => None,
        }
    }

    /// Movement mode used when this object moves on the map.
    pub fn movement_mode(&self) -> crate::MovementMode {
        match &self.kind {
            ObjKind::Being(c) => c.movement_mode(),
            _ => Default::default(),
        }
    }
}

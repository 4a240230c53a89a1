use serde::{Deserialize, Serialize};

/// Hazard categories for harmful terrain and fields.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Hazard {
    Fire,
    Poison,
    Electric,
}

/// Terrain type record, shared by reference across all tiles of the type.
///
/// Immutable after creation. Tiles referring to a `Terrain` can change,
/// the record itself never does.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Terrain {
    pub name: String,
    /// Display handle.
    pub glyph: char,
    /// Passability class resolved against a mover's movement mode.
    /// Class 0 means the terrain does not care about passability.
    pub pass_class: u8,
    pub transparent: bool,
    pub hazard: Option<Hazard>,
    /// Light emitted by the tile itself.
    pub light: i32,
}

impl Terrain {
    pub fn new(
        name: impl Into<String>,
        glyph: char,
        pass_class: u8,
    ) -> Terrain {
        Terrain {
            name: name.into(),
            glyph,
            pass_class,
            transparent: true,
            hazard: None,
            light: 0,
        }
    }

    pub fn opaque(mut self) -> Terrain {
        self.transparent = false;
        self
    }

    pub fn hazardous(mut self, hazard: Hazard) -> Terrain {
        self.hazard = Some(hazard);
        self
    }

    pub fn light(mut self, light: i32) -> Terrain {
        self.light = light;
        self
    }

    /// Opacity of the tile in line-of-sight units.
    pub fn alpha(&self) -> u8 {
        if self.transparent {
            los::TRANSPARENT
        } else {
            los::OPAQUE
        }
    }
}

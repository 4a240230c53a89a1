use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Movement cost sentinel for impassable tiles.
pub const IMPASSABLE: u8 = 255;

/// Mover-side traversal category selecting a row of the passability table.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct MovementMode(pub u8);

/// Dense [movement mode × passability class] movement cost matrix.
///
/// Built once at load time, immutable thereafter. A cost of 1 is normal
/// ground, `IMPASSABLE` blocks the mode outright.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PassabilityTable {
    classes: usize,
    costs: Vec<u8>,
}

impl PassabilityTable {
    /// Build a table from per-mode cost rows.
    ///
    /// Every row must list a cost for the same number of passability
    /// classes.
    pub fn from_rows(rows: &[Vec<u8>]) -> anyhow::Result<PassabilityTable> {
        let Some(classes) = rows.first().map(Vec::len) else {
            bail!("empty passability table");
        };
        if rows.iter().any(|r| r.len() != classes) {
            bail!("ragged passability table");
        }

        Ok(PassabilityTable {
            classes,
            costs: rows.concat(),
        })
    }

    /// Movement cost for a mode over a passability class.
    ///
    /// Lookups outside the table are impassable. The default empty table
    /// is the permissive fallback for environments that supplied none, it
    /// answers cost 1 to everything.
    pub fn cost(&self, mode: MovementMode, class: u8) -> u8 {
        if self.costs.is_empty() {
            return 1;
        }

        let (mode, class) = (mode.0 as usize, class as usize);
        if class >= self.classes || mode >= self.costs.len() / self.classes {
            return IMPASSABLE;
        }
        self.costs[mode * self.classes + class]
    }

    pub fn is_passable(&self, mode: MovementMode, class: u8) -> bool {
        self.cost(mode, class) != IMPASSABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALK: MovementMode = MovementMode(0);
    const FLY: MovementMode = MovementMode(1);

    fn table() -> PassabilityTable {
        // Classes: 0 none, 1 ground, 2 water, 3 wall.
        PassabilityTable::from_rows(&[
            vec![1, 1, IMPASSABLE, IMPASSABLE],
            vec![1, 1, 1, IMPASSABLE],
        ])
        .unwrap()
    }

    #[test]
    fn lookups() {
        let t = table();
        assert_eq!(t.cost(WALK, 1), 1);
        assert_eq!(t.cost(WALK, 2), IMPASSABLE);
        assert_eq!(t.cost(FLY, 2), 1);
        assert!(!t.is_passable(FLY, 3));

        // Out of range lookups block.
        assert_eq!(t.cost(WALK, 9), IMPASSABLE);
        assert_eq!(t.cost(MovementMode(7), 1), IMPASSABLE);
    }

    #[test]
    fn default_table_is_permissive() {
        let t = PassabilityTable::default();
        assert_eq!(t.cost(MovementMode(3), 200), 1);
    }

    #[test]
    fn ragged_rows_rejected() {
        assert!(PassabilityTable::from_rows(&[vec![1, 1], vec![1]]).is_err());
        assert!(PassabilityTable::from_rows(&[]).is_err());
    }
}

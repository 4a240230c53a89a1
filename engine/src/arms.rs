use std::sync::Arc;

use bitflags::bitflags;
use util::Dice;

use crate::Hook;

bitflags! {
    /// Equipment slot categories an arms type may occupy.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct SlotFlags: u32 {
        const HAND   = 1 << 0;
        const ARMOR  = 1 << 1;
        const HELM   = 1 << 2;
        const RING   = 1 << 3;
        const AMULET = 1 << 4;
        const BOOT   = 1 << 5;
    }
}

/// Weapon or armor type, shared by reference by every readied instance.
#[derive(Clone, Default)]
pub struct ArmsType {
    pub name: String,
    pub to_hit: Dice,
    pub damage: Dice,
    pub armor: Dice,
    pub defend: Dice,
    /// Slot categories this type can be readied into.
    pub slot_mask: SlotFlags,
    /// 1 or 2. A two-handed type occupies two adjacent compatible slots.
    pub hands: u8,
    pub weight: i32,
    pub range: i32,
    pub required_ap: i32,
    /// Thrown weapons consume themselves from inventory as ammo.
    pub thrown: bool,
    /// Ubiquitous ammo never runs out (slings scrounging stones).
    pub ubiquitous_ammo: bool,
    /// Ammo type a missile weapon consumes from inventory.
    pub missile: Option<Arc<ArmsType>>,
    /// Scripted fire procedure for ranged attack animation and hit
    /// determination. Melee weapons trivially "fire" successfully.
    pub fire_hook: Option<Hook>,
}

impl ArmsType {
    pub fn new(
        name: impl Into<String>,
        slot_mask: SlotFlags,
        weight: i32,
    ) -> ArmsType {
        ArmsType {
            name: name.into(),
            slot_mask,
            hands: 1,
            weight,
            range: 1,
            required_ap: 1,
            ..Default::default()
        }
    }

    pub fn two_handed(mut self) -> ArmsType {
        self.hands = 2;
        self
    }

    pub fn with_to_hit(mut self, dice: Dice) -> ArmsType {
        self.to_hit = dice;
        self
    }

    pub fn with_damage(mut self, dice: Dice) -> ArmsType {
        self.damage = dice;
        self
    }

    pub fn with_armor(mut self, dice: Dice) -> ArmsType {
        self.armor = dice;
        self
    }

    pub fn with_defend(mut self, dice: Dice) -> ArmsType {
        self.defend = dice;
        self
    }

    pub fn with_range(mut self, range: i32) -> ArmsType {
        self.range = range;
        self
    }

    pub fn with_required_ap(mut self, ap: i32) -> ArmsType {
        self.required_ap = ap;
        self
    }

    pub fn with_missile(mut self, ammo: Arc<ArmsType>) -> ArmsType {
        self.missile = Some(ammo);
        self
    }

    pub fn thrown(mut self) -> ArmsType {
        self.thrown = true;
        self
    }

    pub fn with_ubiquitous_ammo(mut self) -> ArmsType {
        self.ubiquitous_ammo = true;
        self
    }

    pub fn with_fire_hook(mut self, hook: Hook) -> ArmsType {
        self.fire_hook = Some(hook);
        self
    }

    pub fn is_two_handed(&self) -> bool {
        self.hands >= 2
    }

    pub fn is_missile_weapon(&self) -> bool {
        self.missile.is_some()
    }

    /// Whether this counts as a weapon for attack enumeration.
    pub fn deals_damage(&self) -> bool {
        self.damage.average() > 0.0
    }
}

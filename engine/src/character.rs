use std::sync::Arc;

use util::IndexMap;

use crate::{ArmsType, Hook, MovementMode, SlotFlags};

/// Character species: slot layout, stat formulas and the innate weapon.
#[derive(Clone)]
pub struct Species {
    pub name: String,
    /// Equipment slot layout; one flag set per slot position.
    pub slots: Vec<SlotFlags>,
    /// Weapon used when nothing damaging is readied (fists, claws).
    pub natural_weapon: Arc<ArmsType>,
    pub movement_mode: MovementMode,
    /// Max hp is `hp_mod + hp_mult * level`.
    pub hp_mod: i32,
    pub hp_mult: i32,
    /// Max mana follows the same formula with the mp coefficients.
    pub mp_mod: i32,
    pub mp_mult: i32,
}

impl Species {
    pub fn max_hp(&self, level: u32) -> i32 {
        self.hp_mod + self.hp_mult * level as i32
    }

    pub fn max_mp(&self, level: u32) -> i32 {
        self.mp_mod + self.mp_mult * level as i32
    }
}

/// Outcome of a `Character::ready` attempt.
///
/// `NoAvailableSlot` and `WrongType` are distinct so the UI can tell
/// "your hands are full" from "you can't wear that at all".
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReadyResult {
    Readied,
    NoAvailableSlot,
    WrongType,
    TooHeavy,
}

#[derive(Clone)]
struct InventoryEntry {
    arms: Arc<ArmsType>,
    count: u32,
}

/// An active creature: stats, equipment slots and inventory.
#[derive(Clone)]
pub struct Character {
    pub name: String,
    species: Arc<Species>,
    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    hp: i32,
    mp: i32,
    max_hp: i32,
    max_mp: i32,
    xp: i32,
    level: u32,
    pub action_points: i32,
    /// Base damage reduction before armor dice.
    pub armor_class: i32,
    /// Experience awarded to whoever fells this character.
    pub xp_value: i32,
    /// Scripted on-death procedure.
    pub on_death: Option<Hook>,
    /// One entry per species slot; a two-handed item appears in both of
    /// its slots.
    slots: Vec<Option<Arc<ArmsType>>>,
    /// Total readied weight, capped by strength.
    burden: i32,
    inventory: IndexMap<String, InventoryEntry>,
}

impl Character {
    pub fn new(
        name: impl Into<String>,
        species: &Arc<Species>,
        strength: i32,
        level: u32,
    ) -> Character {
        let max_hp = species.max_hp(level);
        let max_mp = species.max_mp(level);
        Character {
            name: name.into(),
            species: species.clone(),
            strength,
            dexterity: 0,
            intelligence: 0,
            hp: max_hp,
            mp: max_mp,
            max_hp,
            max_mp,
            xp: 0,
            level,
            action_points: 0,
            armor_class: 0,
            xp_value: 1,
            on_death: None,
            slots: vec![None; species.slots.len()],
            burden: 0,
            inventory: IndexMap::default(),
        }
    }

    pub fn species(&self) -> &Arc<Species> {
        &self.species
    }

    pub fn movement_mode(&self) -> MovementMode {
        self.species.movement_mode
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn mp(&self) -> i32 {
        self.mp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn xp(&self) -> i32 {
        self.xp
    }

    pub fn burden(&self) -> i32 {
        self.burden
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    pub fn damage(&mut self, amount: i32) {
        self.hp -= amount.max(0);
    }

    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    /// Refill action points at the start of the character's turn.
    pub fn begin_turn(&mut self, action_points: i32) {
        self.action_points = action_points;
    }

    // Equipment

    /// Equip an arms instance into the first free compatible slot.
    ///
    /// A two-handed item needs two adjacent compatible free slots and is
    /// written into both.
    pub fn ready(&mut self, arms: &Arc<ArmsType>) -> ReadyResult {
        if self.slots.is_empty()
            || !self
                .species
                .slots
                .iter()
                .any(|s| s.intersects(arms.slot_mask))
        {
            return ReadyResult::WrongType;
        }

        if self.burden + arms.weight > self.strength {
            return ReadyResult::TooHeavy;
        }

        for i in 0..self.slots.len() {
            if self.slots[i].is_some()
                || !self.species.slots[i].intersects(arms.slot_mask)
            {
                continue;
            }

            if arms.is_two_handed() {
                // The pair slot must also be free and compatible, else
                // keep scanning from the next position.
                let Some(pair) = self.slots.get(i + 1) else {
                    continue;
                };
                if pair.is_some()
                    || !self.species.slots[i + 1].intersects(arms.slot_mask)
                {
                    continue;
                }
                self.slots[i] = Some(arms.clone());
                self.slots[i + 1] = Some(arms.clone());
            } else {
                self.slots[i] = Some(arms.clone());
            }

            self.burden += arms.weight;
            debug_assert!(self.burden <= self.strength);
            return ReadyResult::Readied;
        }

        ReadyResult::NoAvailableSlot
    }

    /// Remove a readied arms instance, found by identity.
    ///
    /// Returns whether anything was removed.
    pub fn unready(&mut self, arms: &Arc<ArmsType>) -> bool {
        let Some(i) = self
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|a| Arc::ptr_eq(a, arms)))
        else {
            return false;
        };

        self.slots[i] = None;
        if arms.is_two_handed() {
            // Clear the pair slot holding the duplicate reference.
            if let Some(pair) = self.slots.get_mut(i + 1) {
                if pair.as_ref().is_some_and(|a| Arc::ptr_eq(a, arms)) {
                    *pair = None;
                }
            }
        }

        self.burden -= arms.weight;
        debug_assert!(self.burden >= 0);
        true
    }

    pub fn slot(&self, i: usize) -> Option<&Arc<ArmsType>> {
        self.slots.get(i).and_then(Option::as_ref)
    }

    /// Iterate readied arms in slot order.
    ///
    /// A two-handed item occupying two slots is yielded once; the
    /// duplicate reference in the pair slot is skipped.
    pub fn arms(&self) -> impl Iterator<Item = &Arc<ArmsType>> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            let a = s.as_ref()?;
            if a.is_two_handed() && i > 0 {
                if let Some(prev) = self.slots[i - 1].as_ref() {
                    if Arc::ptr_eq(prev, a) {
                        return None;
                    }
                }
            }
            Some(a)
        })
    }

    /// Iterate readied arms that can deal damage, falling back to the
    /// species' natural weapon when nothing readied qualifies.
    pub fn weapons(&self) -> impl Iterator<Item = &Arc<ArmsType>> {
        let mut equipped = self.arms().filter(|a| a.deals_damage()).peekable();
        let unarmed = equipped.peek().is_none();
        equipped.chain(unarmed.then_some(&self.species.natural_weapon))
    }

    // Inventory

    pub fn add_to_inventory(&mut self, arms: &Arc<ArmsType>, count: u32) {
        let entry = self
            .inventory
            .entry(arms.name.clone())
            .or_insert_with(|| InventoryEntry {
                arms: arms.clone(),
                count: 0,
            });
        entry.count += count;
    }

    pub fn inventory_count(&self, arms: &ArmsType) -> u32 {
        self.inventory.get(&arms.name).map_or(0, |e| e.count)
    }

    /// Take `count` instances of an arms type out of inventory.
    ///
    /// Returns false and changes nothing if there aren't enough.
    pub fn remove_from_inventory(
        &mut self,
        arms: &ArmsType,
        count: u32,
    ) -> bool {
        let Some(entry) = self.inventory.get_mut(&arms.name) else {
            return false;
        };
        if entry.count < count {
            return false;
        }
        entry.count -= count;
        if entry.count == 0 {
            self.inventory.shift_remove(&arms.name);
        }
        true
    }

    pub fn inventory(&self) -> impl Iterator<Item = (&Arc<ArmsType>, u32)> {
        self.inventory.values().map(|e| (&e.arms, e.count))
    }

    // Experience

    /// Experience needed to reach the next level from `level`.
    fn xp_threshold(level: u32) -> i64 {
        1i64 << (level + 7)
    }

    /// Award experience, cascading through any number of level gains.
    ///
    /// Each level gained recomputes max hp and mana from the species
    /// formulas and heals to full.
    pub fn add_experience(&mut self, amount: i32) {
        self.xp += amount;
        while self.xp as i64 >= Self::xp_threshold(self.level) {
            self.level += 1;
            self.max_hp = self.species.max_hp(self.level);
            self.max_mp = self.species.max_mp(self.level);
            self.hp = self.max_hp;
            self.mp = self.max_mp;
            log::info!("{} reached level {}", self.name, self.level);
        }
    }
}

//! Attack resolution and ammo accounting.

use std::sync::Arc;

use rand::Rng;
use util::Dice;

use crate::{ArmsType, Character, Obj, ObjId, ObjKind, Place};

/// To-hit comparison. Matching the defend value exactly is a hit.
pub(crate) fn resolve_hit(to_hit: i32, defend: i32) -> bool {
    to_hit >= defend
}

/// Damage after armor, never negative.
pub(crate) fn resolve_damage(damage: i32, armor: i32) -> i32 {
    (damage - armor).max(0)
}

impl Character {
    /// To-hit threshold: defend dice summed over readied equipment.
    ///
    /// There is no base component, an unequipped character defends with 0.
    pub fn get_defend<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        self.arms().map(|a| a.defend.roll(rng)).sum()
    }

    /// Damage reduction: armor dice over readied equipment plus the base
    /// armor class.
    pub fn get_armor<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        self.armor_class + self.arms().map(|a| a.armor.roll(rng)).sum::<i32>()
    }

    /// Whether a weapon has a shot left.
    ///
    /// Ubiquitous-ammo weapons always do. Missile weapons need their ammo
    /// type in inventory, thrown weapons need an instance of themselves.
    /// Melee weapons need nothing.
    pub fn has_ammo(&self, weapon: &ArmsType) -> bool {
        if weapon.ubiquitous_ammo {
            return true;
        }
        if let Some(ammo) = &weapon.missile {
            return self.inventory_count(ammo) > 0;
        }
        if weapon.thrown {
            return self.inventory_count(weapon) > 0;
        }
        true
    }

    /// Consume one shot. Same cases as `has_ammo`.
    ///
    /// A thrown weapon that runs out is automatically unreadied.
    pub fn use_ammo(&mut self, weapon: &Arc<ArmsType>) -> bool {
        if weapon.ubiquitous_ammo {
            return true;
        }
        if let Some(ammo) = weapon.missile.clone() {
            return self.remove_from_inventory(&ammo, 1);
        }
        if weapon.thrown {
            if !self.remove_from_inventory(weapon, 1) {
                return false;
            }
            if self.inventory_count(weapon) == 0 {
                log::debug!("{}: out of {}", self.name, weapon.name);
                self.unready(weapon);
            }
            return true;
        }
        true
    }

    /// Resolve one attack against a target.
    ///
    /// Action points and ammo are spent whether or not the attack lands.
    /// Returns whether damage resolution was reached (the weapon fired and
    /// the to-hit roll met the target's defend value).
    pub fn attack<R: Rng + ?Sized>(
        &mut self,
        weapon: &Arc<ArmsType>,
        target: &mut Character,
        rng: &mut R,
    ) -> bool {
        if target.is_dead() {
            log::warn!("{}: attacking a dead target", self.name);
            return false;
        }

        // Ranged and thrown weapons fire through their scripted procedure,
        // which decides whether the projectile connects at all. Melee
        // weapons trivially fire.
        let fired = weapon.fire_hook.as_ref().map_or(true, |h| h.invoke());

        // Costs are paid regardless of outcome.
        self.action_points -= weapon.required_ap;
        self.use_ammo(weapon);

        if !fired {
            return false;
        }

        let to_hit = Dice::new(1, 20, 0).roll(rng) + weapon.to_hit.roll(rng);
        let defend = target.get_defend(rng);
        if !resolve_hit(to_hit, defend) {
            log::debug!(
                "{} barely scratches {}",
                self.name,
                target.name
            );
            return false;
        }

        let damage =
            resolve_damage(weapon.damage.roll(rng), target.get_armor(rng));
        target.damage(damage);
        log::debug!(
            "{} hits {} for {damage} damage",
            self.name,
            target.name
        );

        if target.is_dead() {
            self.add_experience(target.xp_value);
        }

        true
    }
}

impl Place {
    /// Resolve an attack between two beings resident on this map.
    ///
    /// A target that dies is removed from the map, its on-death hook is
    /// invoked and its experience value awarded to the attacker.
    pub fn resolve_attack<R: Rng + ?Sized>(
        &mut self,
        attacker: ObjId,
        weapon: &Arc<ArmsType>,
        target: ObjId,
        rng: &mut R,
    ) -> bool {
        if attacker == target {
            return false;
        }

        // Detach the target so both combatants can be borrowed at once.
        let Some(mut target_obj) = self.detach(target) else {
            log::warn!("resolve_attack: no such target");
            return false;
        };

        let hit = match (
            self.get_mut(attacker).and_then(Obj::as_being_mut),
            target_obj.as_being_mut(),
        ) {
            (Some(att), Some(tgt)) => att.attack(weapon, tgt, rng),
            _ => {
                log::warn!("resolve_attack: combatant is not a being");
                self.reattach(target, target_obj);
                return false;
            }
        };

        if target_obj.as_being().is_some_and(Character::is_dead) {
            if let ObjKind::Being(c) = &target_obj.kind {
                if let Some(hook) = &c.on_death {
                    hook.invoke();
                }
            }
            log::debug!("{} dies", target_obj.name);
            // The corpse does not go back on the map.
            self.release_detached(target, &target_obj);
        } else {
            self.reattach(target, target_obj);
        }

        hit
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use util::GameRng;

    use super::*;
    use crate::{MovementMode, ReadyResult, SlotFlags, Species};

    fn rng() -> GameRng {
        GameRng::seed_from_u64(0x5eed)
    }

    fn fists() -> Arc<ArmsType> {
        Arc::new(
            ArmsType::new("fists", SlotFlags::HAND, 0)
                .with_damage(Dice::new(1, 2, 0)),
        )
    }

    fn humanoid() -> Arc<Species> {
        Arc::new(Species {
            name: "human".into(),
            slots: vec![SlotFlags::ARMOR, SlotFlags::HAND, SlotFlags::HAND],
            natural_weapon: fists(),
            movement_mode: MovementMode(0),
            hp_mod: 20,
            hp_mult: 0,
            mp_mod: 0,
            mp_mult: 0,
        })
    }

    // To-hit bonus large enough that 1d20 can never miss.
    fn sure_hit() -> Dice {
        Dice::flat(1000)
    }

    #[test]
    fn hit_and_damage_resolution() {
        // Matching the defend value exactly is a hit.
        assert!(resolve_hit(7, 7));
        assert!(resolve_hit(8, 7));
        assert!(!resolve_hit(6, 7));

        // Armor floors damage at zero, never negative.
        assert_eq!(resolve_damage(5, 3), 2);
        assert_eq!(resolve_damage(2, 9), 0);
    }

    #[test]
    fn attack_applies_armor_and_costs() {
        let species = humanoid();
        let mut att = Character::new("att", &species, 10, 1);
        let mut tgt = Character::new("tgt", &species, 10, 1);
        tgt.armor_class = 3;

        let club = Arc::new(
            ArmsType::new("club", SlotFlags::HAND, 2)
                .with_to_hit(sure_hit())
                .with_damage(Dice::flat(10))
                .with_required_ap(4),
        );
        att.begin_turn(10);

        assert!(att.attack(&club, &mut tgt, &mut rng()));
        assert_eq!(tgt.hp(), 13);
        assert_eq!(att.action_points, 6);
    }

    #[test]
    fn defend_dice_turn_hits_into_scratches() {
        let species = humanoid();
        let mut att = Character::new("att", &species, 10, 1);
        let mut tgt = Character::new("tgt", &species, 10, 1);

        // Defend so high the d20 + 0 can never reach it.
        let aegis = Arc::new(
            ArmsType::new("aegis", SlotFlags::HAND, 1)
                .with_defend(Dice::flat(1000)),
        );
        assert_eq!(tgt.ready(&aegis), ReadyResult::Readied);

        let club = Arc::new(
            ArmsType::new("club", SlotFlags::HAND, 2)
                .with_damage(Dice::flat(10)),
        );
        assert!(!att.attack(&club, &mut tgt, &mut rng()));
        assert_eq!(tgt.hp(), 20);
    }

    #[test]
    fn failed_fire_still_pays_costs() {
        let species = humanoid();
        let mut att = Character::new("att", &species, 10, 1);
        let mut tgt = Character::new("tgt", &species, 10, 1);

        let arrow = Arc::new(ArmsType::new("arrow", SlotFlags::HAND, 0));
        let bow = Arc::new(
            ArmsType::new("bow", SlotFlags::HAND, 2)
                .with_to_hit(sure_hit())
                .with_damage(Dice::flat(10))
                .with_required_ap(2)
                .with_missile(arrow.clone())
                .with_fire_hook(Arc::new(|| false)),
        );
        att.add_to_inventory(&arrow, 3);
        att.begin_turn(5);

        assert!(!att.attack(&bow, &mut tgt, &mut rng()));
        assert_eq!(tgt.hp(), 20);
        assert_eq!(att.action_points, 3);
        assert_eq!(att.inventory_count(&arrow), 2);
    }

    #[test]
    fn ammo_semantics() {
        let species = humanoid();
        let mut c = Character::new("c", &species, 10, 1);

        // Melee weapons never need ammo.
        let club = Arc::new(ArmsType::new("club", SlotFlags::HAND, 2));
        assert!(c.has_ammo(&club));
        assert!(c.use_ammo(&club));

        // Ubiquitous ammo never runs out.
        let sling = Arc::new(
            ArmsType::new("sling", SlotFlags::HAND, 1)
                .with_ubiquitous_ammo(),
        );
        assert!(c.has_ammo(&sling));
        assert!(c.use_ammo(&sling));

        // Missile weapons draw from their ammo type.
        let arrow = Arc::new(ArmsType::new("arrow", SlotFlags::HAND, 0));
        let bow = Arc::new(
            ArmsType::new("bow", SlotFlags::HAND, 2)
                .with_missile(arrow.clone()),
        );
        assert!(!c.has_ammo(&bow));
        c.add_to_inventory(&arrow, 2);
        assert!(c.has_ammo(&bow));
        assert!(c.use_ammo(&bow));
        assert!(c.use_ammo(&bow));
        assert!(!c.has_ammo(&bow));
        assert!(!c.use_ammo(&bow));
    }

    #[test]
    fn thrown_weapon_unreadies_when_spent() {
        let species = humanoid();
        let mut c = Character::new("c", &species, 10, 1);

        let axe = Arc::new(
            ArmsType::new("throwing axe", SlotFlags::HAND, 2)
                .thrown()
                .with_damage(Dice::new(1, 6, 0)),
        );
        c.add_to_inventory(&axe, 2);
        assert_eq!(c.ready(&axe), ReadyResult::Readied);

        assert!(c.use_ammo(&axe));
        assert!(c.arms().any(|a| Arc::ptr_eq(a, &axe)));

        // The last throw auto-unreadies the weapon.
        assert!(c.use_ammo(&axe));
        assert!(!c.arms().any(|a| Arc::ptr_eq(a, &axe)));
        assert_eq!(c.burden(), 0);
        assert!(!c.use_ammo(&axe));
    }

    #[test]
    fn kill_awards_experience() {
        let species = humanoid();
        let mut att = Character::new("att", &species, 10, 1);
        let mut tgt = Character::new("tgt", &species, 10, 1);
        tgt.xp_value = 300;

        let sword = Arc::new(
            ArmsType::new("sword", SlotFlags::HAND, 3)
                .with_to_hit(sure_hit())
                .with_damage(Dice::flat(50)),
        );
        assert!(att.attack(&sword, &mut tgt, &mut rng()));
        assert!(tgt.is_dead());
        // 300 xp crosses the level 1 -> 2 threshold of 256.
        assert_eq!(att.level(), 2);

        // Attacks on the dead do nothing.
        assert!(!att.attack(&sword, &mut tgt, &mut rng()));
    }

    #[test]
    fn place_attack_removes_the_dead() {
        use std::{cell::Cell, rc::Rc};

        use glam::ivec2;

        let species = humanoid();
        let att = Character::new("att", &species, 10, 1);
        let mut tgt = Character::new("tgt", &species, 10, 1);

        let died = Rc::new(Cell::new(false));
        let flag = died.clone();
        tgt.on_death = Some(Arc::new(move || {
            flag.set(true);
            true
        }));

        let mut p = Place::new("arena", 8, 8);
        p.fill_terrain(&Arc::new(crate::Terrain::new("floor", '.', 0)));
        let att_id = p.add_object(Obj::being(att), ivec2(1, 1)).unwrap();
        let tgt_id = p.add_object(Obj::being(tgt), ivec2(2, 1)).unwrap();

        let sword = Arc::new(
            ArmsType::new("sword", SlotFlags::HAND, 3)
                .with_to_hit(sure_hit())
                .with_damage(Dice::flat(50)),
        );

        assert!(!p.resolve_attack(att_id, &sword, att_id, &mut rng()));

        assert!(p.resolve_attack(att_id, &sword, tgt_id, &mut rng()));
        assert!(died.get());
        assert!(p.being_at(ivec2(2, 1)).is_none());
        assert!(p.get(tgt_id).is_none());
        assert_eq!(p.being(att_id).unwrap().level(), 1);
        p.check_consistency();
    }
}

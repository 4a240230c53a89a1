use std::sync::Arc;

use anyhow::bail;
use glam::{ivec2, IVec2};
use strum::IntoEnumIterator;
use util::HashMap;

use crate::{
    Character, Hazard, Layer, MovementMode, Obj, ObjId, ObjKind,
    PassabilityTable, Terrain, IMPASSABLE,
};

/// A game map: terrain grid plus the authoritative multi-layer object
/// index.
///
/// Every resident object appears in exactly one (x, y, layer) slot
/// matching its own position record, and at most one object occupies a
/// given slot. All mutation goes through `add_object`, `move_object` and
/// `remove_object`, which keep the index and the positions consistent.
pub struct Place {
    name: String,
    width: i32,
    height: i32,
    wraps: bool,
    underground: bool,
    wilderness: bool,
    combat_allowed: bool,
    /// Time-per-turn multiplier for large-scale maps.
    scale: u32,
    pass_table: Arc<PassabilityTable>,
    /// Row-major terrain grid, `None` cells are void.
    terrain: Vec<Option<Arc<Terrain>>>,
    /// Object arena; freed slots are reused.
    objects: Vec<Option<Obj>>,
    free: Vec<u32>,
    /// The (x, y, layer) object index.
    index: HashMap<(i32, i32, Layer), ObjId>,
    /// Arrival points for the eight compass directions plus "here",
    /// indexed (dy + 1) * 3 + (dx + 1).
    edge_entrances: [Option<IVec2>; 9],
    /// Nested places by coordinate, towns inside wilderness.
    subplaces: HashMap<(i32, i32), String>,
    above: Option<String>,
    below: Option<String>,
}

impl Place {
    pub fn new(name: impl Into<String>, width: i32, height: i32) -> Place {
        assert!(width > 0 && height > 0, "degenerate place");
        Place {
            name: name.into(),
            width,
            height,
            wraps: false,
            underground: false,
            wilderness: false,
            combat_allowed: true,
            scale: 1,
            pass_table: Arc::new(PassabilityTable::default()),
            terrain: vec![None; (width * height) as usize],
            objects: Vec::new(),
            free: Vec::new(),
            index: HashMap::default(),
            edge_entrances: [None; 9],
            subplaces: HashMap::default(),
            above: None,
            below: None,
        }
    }

    pub fn wrapping(mut self) -> Place {
        self.wraps = true;
        self
    }

    pub fn underground(mut self) -> Place {
        self.underground = true;
        self
    }

    pub fn wilderness(mut self) -> Place {
        self.wilderness = true;
        self
    }

    pub fn no_combat(mut self) -> Place {
        self.combat_allowed = false;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Place {
        self.scale = scale;
        self
    }

    pub fn with_pass_table(mut self, table: Arc<PassabilityTable>) -> Place {
        self.pass_table = table;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn wraps(&self) -> bool {
        self.wraps
    }

    pub fn is_underground(&self) -> bool {
        self.underground
    }

    pub fn is_wilderness(&self) -> bool {
        self.wilderness
    }

    pub fn combat_allowed(&self) -> bool {
        self.combat_allowed
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    // Coordinates

    pub fn wrap_x(&self, x: i32) -> i32 {
        if self.wraps {
            x.rem_euclid(self.width)
        } else {
            x
        }
    }

    pub fn wrap_y(&self, y: i32) -> i32 {
        if self.wraps {
            y.rem_euclid(self.height)
        } else {
            y
        }
    }

    pub fn wrap(&self, loc: IVec2) -> IVec2 {
        ivec2(self.wrap_x(loc.x), self.wrap_y(loc.y))
    }

    /// Nothing is off-map on a wrapping place.
    pub fn is_off_map(&self, loc: IVec2) -> bool {
        if self.wraps {
            return false;
        }
        loc.x < 0 || loc.y < 0 || loc.x >= self.width || loc.y >= self.height
    }

    fn cell(&self, loc: IVec2) -> Option<usize> {
        let loc = self.wrap(loc);
        if self.is_off_map(loc) {
            None
        } else {
            Some((loc.y * self.width + loc.x) as usize)
        }
    }

    // Terrain

    pub fn terrain_at(&self, loc: IVec2) -> Option<&Arc<Terrain>> {
        self.cell(loc).and_then(|i| self.terrain[i].as_ref())
    }

    /// Edit a tile. Visibility caches over this place must be invalidated
    /// for the tile's footprint afterwards.
    pub fn set_terrain(
        &mut self,
        loc: IVec2,
        terrain: Option<Arc<Terrain>>,
    ) -> bool {
        let Some(i) = self.cell(loc) else {
            return false;
        };
        self.terrain[i] = terrain;
        true
    }

    pub fn fill_terrain(&mut self, terrain: &Arc<Terrain>) {
        self.terrain.fill(Some(terrain.clone()));
    }

    // Object index

    /// Put an object on the map at a position.
    ///
    /// Fails if the position is off-map or the (x, y, layer) slot is
    /// already taken.
    pub fn add_object(
        &mut self,
        mut obj: Obj,
        loc: IVec2,
    ) -> anyhow::Result<ObjId> {
        let loc = self.wrap(loc);
        if self.is_off_map(loc) {
            bail!("{}: position {loc} off map", obj.name);
        }
        let layer = obj.layer();
        if self.index.contains_key(&(loc.x, loc.y, layer)) {
            bail!("{}: slot {loc}/{layer:?} occupied", obj.name);
        }

        obj.pos = loc;
        let id = if let Some(i) = self.free.pop() {
            self.objects[i as usize] = Some(obj);
            ObjId(i)
        } else {
            self.objects.push(Some(obj));
            ObjId(self.objects.len() as u32 - 1)
        };
        self.index.insert((loc.x, loc.y, layer), id);
        Ok(id)
    }

    /// Take an object off the map.
    pub fn remove_object(&mut self, id: ObjId) -> Option<Obj> {
        let obj = self.objects.get_mut(id.0 as usize)?.take()?;
        self.index.remove(&(obj.pos.x, obj.pos.y, obj.layer()));
        self.free.push(id.0);
        Some(obj)
    }

    /// Relocate an object, keeping the index and its position record in
    /// sync. Fails if the destination slot is occupied or off-map.
    pub fn move_object(&mut self, id: ObjId, to: IVec2) -> bool {
        let to = self.wrap(to);
        if self.is_off_map(to) {
            return false;
        }

        let Some(obj) = self.get(id) else {
            return false;
        };
        let (from, layer) = (obj.pos, obj.layer());
        if from == to {
            return true;
        }
        if self.index.contains_key(&(to.x, to.y, layer)) {
            return false;
        }

        self.index.remove(&(from.x, from.y, layer));
        self.index.insert((to.x, to.y, layer), id);
        if let Some(obj) = self.get_mut(id) {
            obj.pos = to;
        }
        true
    }

    pub fn get(&self, id: ObjId) -> Option<&Obj> {
        self.objects.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut Obj> {
        self.objects.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn object_at(&self, loc: IVec2, layer: Layer) -> Option<ObjId> {
        let loc = self.wrap(loc);
        self.index.get(&(loc.x, loc.y, layer)).copied()
    }

    /// Objects on a tile in layer order, lowest first.
    pub fn objects_at(
        &self,
        loc: IVec2,
    ) -> impl Iterator<Item = (ObjId, &Obj)> {
        let loc = self.wrap(loc);
        Layer::iter().filter_map(move |layer| {
            let id = self.object_at(loc, layer)?;
            Some((id, self.get(id)?))
        })
    }

    /// Flat iteration over every resident object.
    pub fn objects(&self) -> impl Iterator<Item = (ObjId, &Obj)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (ObjId(i as u32), o)))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len() - self.free.len()
    }

    pub fn being_at(&self, loc: IVec2) -> Option<ObjId> {
        self.object_at(loc, Layer::Being)
    }

    pub fn being(&self, id: ObjId) -> Option<&Character> {
        self.get(id).and_then(Obj::as_being)
    }

    pub fn being_mut(&mut self, id: ObjId) -> Option<&mut Character> {
        self.get_mut(id).and_then(Obj::as_being_mut)
    }

    // Combat support: temporarily pull an object out of the arena so it
    // can be borrowed alongside another resident object.

    pub(crate) fn detach(&mut self, id: ObjId) -> Option<Obj> {
        self.objects.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub(crate) fn reattach(&mut self, id: ObjId, obj: Obj) {
        debug_assert!(self.objects[id.0 as usize].is_none());
        self.objects[id.0 as usize] = Some(obj);
    }

    /// Release the arena slot and index entry of a detached object.
    pub(crate) fn release_detached(&mut self, id: ObjId, obj: &Obj) {
        debug_assert!(self.objects[id.0 as usize].is_none());
        self.index.remove(&(obj.pos.x, obj.pos.y, obj.layer()));
        self.free.push(id.0);
    }

    // Passability

    fn feature_class_at(&self, loc: IVec2) -> Option<u8> {
        let id = self.object_at(loc, Layer::TerrainFeature)?;
        match &self.get(id)?.kind {
            // Class 0 features ignore passability.
            ObjKind::Feature(f) if f.pass_class != 0 => Some(f.pass_class),
            _ => None,
        }
    }

    /// Terrain-level passability for a movement mode.
    ///
    /// A terrain feature with a nonzero passability class overrides the
    /// base terrain outright; the terrain is not consulted at all.
    pub fn is_passable(&self, loc: IVec2, mode: MovementMode) -> bool {
        let loc = self.wrap(loc);
        if self.is_off_map(loc) {
            return false;
        }
        if let Some(class) = self.feature_class_at(loc) {
            return self.pass_table.is_passable(mode, class);
        }
        match self.terrain_at(loc) {
            Some(t) => self.pass_table.is_passable(mode, t.pass_class),
            // Void.
            None => false,
        }
    }

    /// Movement cost for stepping onto a tile, `IMPASSABLE` when out of
    /// bounds or blocked. Feature override precedence matches
    /// `is_passable`.
    pub fn movement_cost(&self, loc: IVec2, mode: MovementMode) -> u8 {
        let loc = self.wrap(loc);
        if self.is_off_map(loc) {
            return IMPASSABLE;
        }
        if let Some(class) = self.feature_class_at(loc) {
            return self.pass_table.cost(mode, class);
        }
        match self.terrain_at(loc) {
            Some(t) => self.pass_table.cost(mode, t.pass_class),
            None => IMPASSABLE,
        }
    }

    fn blocking_mechanism_at(&self, loc: IVec2) -> Option<ObjId> {
        let id = self.object_at(loc, Layer::Mechanism)?;
        self.get(id)?
            .as_mechanism()
            .is_some_and(|m| m.blocks())
            .then_some(id)
    }

    /// Pure movement predicate: terrain, features, beings and closed
    /// mechanisms. Never has side effects; doors are only opened by
    /// `try_move`.
    pub fn can_enter(&self, loc: IVec2, mode: MovementMode) -> bool {
        self.is_passable(loc, mode)
            && self.being_at(loc).is_none()
            && self.blocking_mechanism_at(loc).is_none()
    }

    /// `can_enter` with the diagonal corner rule: a diagonal step also
    /// needs at least one of the two orthogonal corner tiles to be
    /// independently passable.
    pub fn can_move_to(
        &self,
        from: IVec2,
        to: IVec2,
        mode: MovementMode,
    ) -> bool {
        let dir = to - from;
        if dir.x != 0 && dir.y != 0 {
            let c1 = ivec2(from.x + dir.x, from.y);
            let c2 = ivec2(from.x, from.y + dir.y);
            if !self.is_passable(c1, mode) && !self.is_passable(c2, mode) {
                return false;
            }
        }
        self.can_enter(to, mode)
    }

    /// Human-readable reason a tile can't be entered, or `None` when it
    /// can.
    pub fn blockage_reason(
        &self,
        loc: IVec2,
        mode: MovementMode,
    ) -> Option<&'static str> {
        let loc = self.wrap(loc);
        if self.is_off_map(loc) {
            return Some("the edge of the world");
        }
        if let Some(class) = self.feature_class_at(loc) {
            if !self.pass_table.is_passable(mode, class) {
                return Some("blocked terrain feature");
            }
        } else {
            match self.terrain_at(loc) {
                None => return Some("an impassable void"),
                Some(t) if !self.pass_table.is_passable(mode, t.pass_class) => {
                    return Some("impassable terrain")
                }
                _ => {}
            }
        }
        if self.being_at(loc).is_some() {
            return Some("somebody in the way");
        }
        if self.blocking_mechanism_at(loc).is_some() {
            return Some("something in the way");
        }
        None
    }

    /// Move an object one step.
    ///
    /// This is the command side of movement: walking into a closed
    /// bumpable mechanism attempts to open it (an explicit, documented
    /// effect) and the step goes through if it opens.
    pub fn try_move(&mut self, id: ObjId, dir: IVec2) -> bool {
        let Some(obj) = self.get(id) else {
            return false;
        };
        let mode = obj.movement_mode();
        let from = obj.pos;
        let is_being = obj.layer() == Layer::Being;

        let to = self.wrap(from + dir);
        if self.is_off_map(to) {
            return false;
        }
        if dir.x != 0 && dir.y != 0 {
            let c1 = ivec2(from.x + dir.x, from.y);
            let c2 = ivec2(from.x, from.y + dir.y);
            if !self.is_passable(c1, mode) && !self.is_passable(c2, mode) {
                return false;
            }
        }
        if !self.is_passable(to, mode) {
            return false;
        }
        if is_being && self.being_at(to).is_some() {
            return false;
        }

        if let Some(mech_id) = self.blocking_mechanism_at(to) {
            let Some(mech) = self.get(mech_id).and_then(Obj::as_mechanism)
            else {
                return false;
            };
            if !mech.bumpable {
                return false;
            }
            // The handler decides whether the mechanism actually opens.
            let opened =
                mech.on_bump.clone().map_or(true, |hook| hook.invoke());
            if !opened {
                return false;
            }
            if let Some(mech) =
                self.get_mut(mech_id).and_then(Obj::as_mechanism_mut)
            {
                mech.open = true;
            }
        }

        self.move_object(id, to)
    }

    // Hazards

    /// Hazard on a tile, from base terrain or a field object.
    pub fn hazard_at(&self, loc: IVec2) -> Option<Hazard> {
        if let Some(id) = self.object_at(loc, Layer::Field) {
            if let Some(ObjKind::Field(h)) = self.get(id).map(|o| &o.kind) {
                return Some(*h);
            }
        }
        self.terrain_at(loc).and_then(|t| t.hazard)
    }

    // Visibility

    /// Per-tile opacity in line-of-sight units.
    ///
    /// Void and off-map tiles are opaque, as is a closed opaque mechanism
    /// sitting on the tile.
    pub fn visibility_at(&self, loc: IVec2) -> u8 {
        let loc = self.wrap(loc);
        if self.is_off_map(loc) {
            return los::OPAQUE;
        }
        if let Some(id) = self.object_at(loc, Layer::Mechanism) {
            if let Some(mech) = self.get(id).and_then(Obj::as_mechanism) {
                if mech.blocks_sight() {
                    return los::OPAQUE;
                }
            }
        }
        match self.terrain_at(loc) {
            Some(t) => t.alpha(),
            None => los::OPAQUE,
        }
    }

    // Place linking

    fn entrance_slot(dir: IVec2) -> usize {
        ((dir.y.signum() + 1) * 3 + dir.x.signum() + 1) as usize
    }

    pub fn set_edge_entrance(&mut self, dir: IVec2, loc: IVec2) {
        self.edge_entrances[Self::entrance_slot(dir)] = Some(loc);
    }

    /// Arrival point for a party entering from a compass direction.
    ///
    /// The default convention puts the party at the matching edge or
    /// corner of this map; per-direction overrides take precedence.
    pub fn edge_entrance(&self, dir: IVec2) -> IVec2 {
        if let Some(loc) = self.edge_entrances[Self::entrance_slot(dir)] {
            return loc;
        }
        let x = match dir.x.signum() {
            -1 => 0,
            1 => self.width - 1,
            _ => self.width / 2,
        };
        let y = match dir.y.signum() {
            -1 => 0,
            1 => self.height - 1,
            _ => self.height / 2,
        };
        ivec2(x, y)
    }

    pub fn set_subplace(&mut self, loc: IVec2, name: impl Into<String>) {
        let loc = self.wrap(loc);
        self.subplaces.insert((loc.x, loc.y), name.into());
    }

    pub fn subplace_at(&self, loc: IVec2) -> Option<&str> {
        let loc = self.wrap(loc);
        self.subplaces.get(&(loc.x, loc.y)).map(String::as_str)
    }

    pub fn set_above(&mut self, name: impl Into<String>) {
        self.above = Some(name.into());
    }

    pub fn set_below(&mut self, name: impl Into<String>) {
        self.below = Some(name.into());
    }

    pub fn above(&self) -> Option<&str> {
        self.above.as_deref()
    }

    pub fn below(&self) -> Option<&str> {
        self.below.as_deref()
    }

    /// Verify the object index invariant: every resident object appears
    /// in exactly the one slot matching its position.
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) {
        let mut count = 0;
        for (id, obj) in self.objects() {
            count += 1;
            assert_eq!(
                self.index.get(&(obj.pos.x, obj.pos.y, obj.layer())),
                Some(&id),
                "{}: index out of sync",
                obj.name
            );
        }
        assert_eq!(count, self.index.len());
    }
}

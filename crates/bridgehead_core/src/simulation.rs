//! Core simulation loop.
//!
//! [`Simulation`] owns the authoritative world: the terrain grid, every
//! unit, and every structure. The caller drives time by calling
//! [`Simulation::tick`]; between ticks it reads state through the query
//! methods and applies mutations synchronously.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness (terrain and random spawns take a seeded RNG)
//! - Units and structures are processed in ascending id order
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use bridgehead_core::config::SimConfig;
//! use bridgehead_core::math::Vec2Fixed;
//! use bridgehead_core::simulation::Simulation;
//! use bridgehead_core::terrain::Grid;
//!
//! let mut sim = Simulation::from_grid(SimConfig::default(), Grid::new(10, 10)).unwrap();
//! let unit = sim.spawn_unit(Vec2Fixed::from_int(48, 48));
//! sim.set_unit_target(unit, Vec2Fixed::from_int(200, 48)).unwrap();
//!
//! sim.tick();
//! assert_eq!(sim.current_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::collision::resolve_collisions;
use crate::config::SimConfig;
use crate::error::{PlacementError, Result, SimError};
use crate::math::{Rect, Vec2Fixed};
use crate::structures::{occupy_footprint, validate_placement, Structure, StructureId, StructureKind};
use crate::terrain::{generate_terrain, Grid, TerrainConfig, Tile, TilePos};
use crate::units::{MotionEvent, RouteOutcome, Unit, UnitId, UnitStorage};

/// A unit finished training this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Produced {
    /// Structure that trained it.
    pub structure: StructureId,
    /// The new unit.
    pub unit: UnitId,
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick number after this update.
    pub tick: u64,
    /// Waypoint arrivals and replans, in unit order.
    pub motion: Vec<(UnitId, MotionEvent)>,
    /// Units trained this tick.
    pub produced: Vec<Produced>,
    /// Overlapping pairs pushed apart.
    pub collisions: usize,
}

/// The core simulation.
///
/// # System Execution Order
///
/// Each tick runs, in this order:
/// 1. **Motion** - every unit steps along its waypoints
/// 2. **Production** - every structure advances its training timer
/// 3. **Collision** - one pairwise overlap pass over all units
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    config: SimConfig,
    grid: Grid,
    units: UnitStorage,
    /// Indexed by `StructureId`; structures are never removed.
    structures: Vec<Structure>,
}

impl Simulation {
    /// Create a simulation over freshly generated terrain.
    pub fn new(config: SimConfig, terrain: &TerrainConfig) -> Result<Self> {
        let generated = generate_terrain(terrain)?;
        Self::from_grid(config, generated.grid)
    }

    /// Create a simulation over an existing grid.
    pub fn from_grid(config: SimConfig, grid: Grid) -> Result<Self> {
        config.validate()?;
        config.validate_extent(grid.width(), grid.height())?;
        Ok(Self {
            tick: 0,
            config,
            grid,
            units: UnitStorage::new(),
            structures: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of ticks processed.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Terrain grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Grid width and height in tiles.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.grid.width(), self.grid.height())
    }

    /// Tile at a coordinate.
    #[must_use]
    pub fn tile_at(&self, pos: TilePos) -> Option<Tile> {
        self.grid.tile(pos)
    }

    /// Every unit, in spawn order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        self.units.as_slice()
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Every structure, in placement order.
    #[must_use]
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Look up a structure.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id.0 as usize)
    }

    /// First unit whose bounds contain the point.
    #[must_use]
    pub fn unit_at(&self, point: Vec2Fixed) -> Option<UnitId> {
        self.units
            .iter()
            .find(|u| u.bounds().contains(point))
            .map(Unit::id)
    }

    /// First structure whose footprint contains the point.
    #[must_use]
    pub fn structure_at(&self, point: Vec2Fixed) -> Option<StructureId> {
        self.structures
            .iter()
            .find(|s| s.rect().contains(point))
            .map(Structure::id)
    }

    /// Ids of selected units, in spawn order.
    #[must_use]
    pub fn selected_units(&self) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.is_selected())
            .map(Unit::id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Create a unit at a pixel position.
    pub fn spawn_unit(&mut self, position: Vec2Fixed) -> UnitId {
        self.units.spawn(position, &self.config.unit)
    }

    /// Spawn a unit at the centre of a uniformly chosen grass tile.
    ///
    /// Returns `None` if the grid has no grass.
    pub fn spawn_unit_on_random_grass<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<UnitId> {
        let grass: Vec<TilePos> = self
            .grid
            .iter()
            .filter(|&(_, tile)| tile == Tile::Grass)
            .map(|(pos, _)| pos)
            .collect();
        let tile = *grass.choose(rng)?;
        Some(self.spawn_unit(tile.center(self.config.tile_size)))
    }

    /// Remove a unit from the world.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit> {
        self.units.remove(id).ok_or(SimError::UnitNotFound(id))
    }

    /// Send a unit toward a pixel target.
    pub fn set_unit_target(&mut self, id: UnitId, target: Vec2Fixed) -> Result<RouteOutcome> {
        let unit = self.units.get_mut(id).ok_or(SimError::UnitNotFound(id))?;
        let outcome = unit.set_target(target, &self.grid, self.config.tile_size);
        tracing::debug!(unit = %id, ?outcome, "Unit target set");
        Ok(outcome)
    }

    /// Flip a unit's selection flag, returning the new value.
    pub fn toggle_selection(&mut self, id: UnitId) -> Result<bool> {
        self.units
            .get_mut(id)
            .map(Unit::toggle_selected)
            .ok_or(SimError::UnitNotFound(id))
    }

    /// Deselect every unit.
    pub fn clear_selection(&mut self) {
        for unit in self.units.iter_mut() {
            unit.set_selected(false);
        }
    }

    /// Click selection.
    ///
    /// Selects the first unit under the point. Unless `additive`, every
    /// other unit is deselected, including when the click hits nothing.
    pub fn select_at(&mut self, point: Vec2Fixed, additive: bool) -> Option<UnitId> {
        let hit = self.unit_at(point);
        for unit in self.units.iter_mut() {
            if Some(unit.id()) == hit {
                unit.set_selected(true);
            } else if !additive {
                unit.set_selected(false);
            }
        }
        hit
    }

    /// Drag-box selection.
    ///
    /// Selects every unit whose bounds intersect the rectangle. Unless
    /// `additive`, every other unit is deselected. Returns the units inside.
    pub fn select_in_rect(&mut self, rect: Rect, additive: bool) -> Vec<UnitId> {
        let mut hits = Vec::new();
        for unit in self.units.iter_mut() {
            if unit.bounds().intersects(&rect) {
                unit.set_selected(true);
                hits.push(unit.id());
            } else if !additive {
                unit.set_selected(false);
            }
        }
        hits
    }

    /// Send every selected unit toward a pixel target.
    pub fn command_selected(&mut self, target: Vec2Fixed) -> Vec<(UnitId, RouteOutcome)> {
        let grid = &self.grid;
        let tile_size = self.config.tile_size;
        self.units
            .iter_mut()
            .filter(|u| u.is_selected())
            .map(|u| (u.id(), u.set_target(target, grid, tile_size)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Structures
    // ------------------------------------------------------------------

    /// Try to place a structure with its top-left tile at `origin`.
    ///
    /// All-or-nothing: on rejection neither the grid nor the structure list
    /// changes. On success the footprint tiles become [`Tile::Occupied`].
    pub fn place_structure(
        &mut self,
        origin: TilePos,
        kind: StructureKind,
    ) -> std::result::Result<StructureId, PlacementError> {
        let size_tiles = self.config.structure_size_tiles;
        if let Err(reason) = validate_placement(
            &self.grid,
            &self.structures,
            origin,
            size_tiles,
            self.config.tile_size,
        ) {
            tracing::debug!(%origin, %kind, %reason, "Placement rejected");
            return Err(reason);
        }

        let id = StructureId(self.structures.len() as u32);
        let structure = Structure::new(id, kind, origin, size_tiles, self.config.tile_size);
        occupy_footprint(&mut self.grid, &structure);
        self.structures.push(structure);
        tracing::debug!(structure = %id, %origin, %kind, "Structure placed");
        Ok(id)
    }

    /// Queue one unit at a structure.
    ///
    /// Returns `Ok(false)` for kinds that cannot produce.
    pub fn queue_unit(&mut self, id: StructureId) -> Result<bool> {
        self.structures
            .get_mut(id.0 as usize)
            .map(Structure::queue_unit)
            .ok_or(SimError::StructureNotFound(id))
    }

    /// Queue a unit at whichever structure covers the point.
    ///
    /// Returns the structure if it accepted the order.
    pub fn queue_unit_at(&mut self, point: Vec2Fixed) -> Option<StructureId> {
        let id = self.structure_at(point)?;
        self.queue_unit(id).ok()?.then_some(id)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();

        // 1. Motion
        for unit in self.units.iter_mut() {
            if let Some(event) = unit.update(&self.grid, &self.config) {
                events.motion.push((unit.id(), event));
            }
        }

        // 2. Production
        for structure in &mut self.structures {
            if let Some(spawn) = structure.advance(&self.grid, &self.config) {
                let unit = self.units.spawn(spawn, &self.config.unit);
                tracing::debug!(structure = %structure.id(), %unit, "Unit trained");
                events.produced.push(Produced {
                    structure: structure.id(),
                    unit,
                });
            }
        }

        // 3. Collision
        events.collisions = resolve_collisions(self.units.as_mut_slice());

        self.tick += 1;
        events.tick = self.tick;

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Assert world invariants after a tick.
    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        for unit in self.units.iter() {
            if let crate::units::MotionState::Moving { waypoints, .. } = unit.motion() {
                assert!(!waypoints.is_empty(), "{} moving with no waypoints", unit.id());
            }
        }
        for structure in &self.structures {
            for pos in structure.footprint_tiles() {
                assert_eq!(
                    self.grid.tile(pos),
                    Some(Tile::Occupied),
                    "{} footprint tile {pos} not occupied",
                    structure.id()
                );
            }
        }
    }

    /// Run `count` ticks, collecting every event.
    pub fn run(&mut self, count: u64) -> Vec<TickEvents> {
        (0..count).map(|_| self.tick()).collect()
    }

    // ------------------------------------------------------------------
    // Determinism helpers
    // ------------------------------------------------------------------

    /// Hash of the complete simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the simulation state to a snapshot.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize simulation: {e}")))
    }

    /// Restore a simulation from a snapshot.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let sim: Self = bincode::deserialize(data)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize simulation: {e}")))?;
        sim.config.validate()?;
        sim.config.validate_extent(sim.grid.width(), sim.grid.height())?;
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn open_sim() -> Simulation {
        Simulation::from_grid(SimConfig::default(), Grid::new(20, 15)).unwrap()
    }

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn test_new_simulation() {
        let sim = Simulation::new(SimConfig::default(), &TerrainConfig::classic()).unwrap();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.dimensions(), (40, 25));
        assert!(sim.units().is_empty());
        assert!(sim.structures().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimConfig {
            tile_size: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            Simulation::from_grid(config, Grid::new(5, 5)),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_grid_beyond_pixel_range_rejected() {
        let config = SimConfig {
            tile_size: 1 << 30,
            structure_size_tiles: 1,
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(matches!(
            Simulation::from_grid(config.clone(), Grid::new(3, 3)),
            Err(SimError::InvalidConfig(_))
        ));

        let mut sim = Simulation::from_grid(config, Grid::new(1, 1)).unwrap();
        let id = sim.spawn_unit(TilePos::new(0, 0).center(1 << 30));
        assert_eq!(sim.unit(id).unwrap().position().x, Fixed::from_num(1u32 << 29));
    }

    #[test]
    fn test_tick_increments() {
        let mut sim = open_sim();
        let events = sim.tick();
        assert_eq!(events.tick, 1);
        sim.run(9);
        assert_eq!(sim.current_tick(), 10);
    }

    #[test]
    fn test_unknown_ids() {
        let mut sim = open_sim();
        assert!(matches!(
            sim.set_unit_target(UnitId(7), Vec2Fixed::ZERO),
            Err(SimError::UnitNotFound(UnitId(7)))
        ));
        assert!(matches!(
            sim.queue_unit(StructureId(3)),
            Err(SimError::StructureNotFound(StructureId(3)))
        ));
        assert!(sim.toggle_selection(UnitId(0)).is_err());
        assert!(sim.remove_unit(UnitId(0)).is_err());
    }

    #[test]
    fn test_unit_moves_to_target() {
        let mut sim = open_sim();
        let id = sim.spawn_unit(TilePos::new(1, 1).center(32));
        let outcome = sim.set_unit_target(id, Vec2Fixed::from_int(6 * 32 + 5, 40)).unwrap();
        assert_eq!(outcome, RouteOutcome::Routed { steps: 5 });

        let events = sim.run(100);
        assert_eq!(sim.unit(id).unwrap().position(), TilePos::new(6, 1).center(32));
        assert!(events
            .iter()
            .flat_map(|e| &e.motion)
            .any(|&(u, e)| u == id && e == MotionEvent::Arrived(TilePos::new(6, 1))));
    }

    #[test]
    fn test_toggle_and_click_selection() {
        let mut sim = open_sim();
        let a = sim.spawn_unit(Vec2Fixed::from_int(100, 100));
        let b = sim.spawn_unit(Vec2Fixed::from_int(200, 150));

        assert!(sim.toggle_selection(a).unwrap());
        assert_eq!(sim.selected_units(), vec![a]);

        // Plain click on b replaces the selection.
        assert_eq!(sim.select_at(Vec2Fixed::from_int(195, 155), false), Some(b));
        assert_eq!(sim.selected_units(), vec![b]);

        // Additive click keeps b.
        sim.select_at(Vec2Fixed::from_int(100, 100), true);
        assert_eq!(sim.selected_units(), vec![a, b]);

        // Plain click on empty ground clears.
        assert_eq!(sim.select_at(Vec2Fixed::from_int(400, 400), false), None);
        assert!(sim.selected_units().is_empty());
    }

    #[test]
    fn test_box_selection() {
        let mut sim = open_sim();
        let a = sim.spawn_unit(Vec2Fixed::from_int(100, 100));
        let b = sim.spawn_unit(Vec2Fixed::from_int(200, 150));
        let c = sim.spawn_unit(Vec2Fixed::from_int(400, 300));

        let rect = Rect::from_corners(Vec2Fixed::from_int(50, 50), Vec2Fixed::from_int(195, 145));
        assert_eq!(sim.select_in_rect(rect, false), vec![a, b]);
        assert_eq!(sim.selected_units(), vec![a, b]);

        let rect = Rect::new(fixed(390), fixed(290), fixed(5), fixed(5));
        sim.select_in_rect(rect, true);
        assert_eq!(sim.selected_units(), vec![a, b, c]);

        sim.clear_selection();
        assert!(sim.selected_units().is_empty());
    }

    #[test]
    fn test_command_selected() {
        let mut sim = open_sim();
        let a = sim.spawn_unit(TilePos::new(1, 1).center(32));
        let _b = sim.spawn_unit(TilePos::new(5, 5).center(32));
        sim.toggle_selection(a).unwrap();

        let orders = sim.command_selected(TilePos::new(3, 1).center(32));
        assert_eq!(orders, vec![(a, RouteOutcome::Routed { steps: 2 })]);
    }

    #[test]
    fn test_place_structure_marks_occupied() {
        let mut sim = open_sim();
        let id = sim.place_structure(TilePos::new(4, 4), StructureKind::Barracks).unwrap();
        assert_eq!(id, StructureId(0));
        for pos in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            assert_eq!(sim.tile_at(TilePos::new(pos.0, pos.1)), Some(Tile::Occupied));
        }
        assert_eq!(sim.structure_at(Vec2Fixed::from_int(140, 140)), Some(id));
        assert_eq!(sim.structure_at(Vec2Fixed::from_int(192, 140)), None);
    }

    #[test]
    fn test_place_structure_rejections_leave_state_untouched() {
        let mut grid = Grid::new(10, 10);
        grid.set_tile(TilePos::new(1, 2), Tile::Water);
        let mut sim = Simulation::from_grid(SimConfig::default(), grid).unwrap();
        sim.place_structure(TilePos::new(5, 5), StructureKind::Depot).unwrap();
        let before = sim.clone();

        assert_eq!(
            sim.place_structure(TilePos::new(1, 1), StructureKind::Tower),
            Err(PlacementError::NonGrassTerrain { tile: TilePos::new(1, 2) })
        );
        assert_eq!(
            sim.place_structure(TilePos::new(9, 9), StructureKind::Tower),
            Err(PlacementError::OffGrid)
        );
        assert!(matches!(
            sim.place_structure(TilePos::new(6, 6), StructureKind::Tower),
            Err(PlacementError::NonGrassTerrain { .. })
        ));
        assert_eq!(sim, before);
    }

    #[test]
    fn test_production_spawns_unit() {
        let mut sim = open_sim();
        let barracks = sim.place_structure(TilePos::new(4, 4), StructureKind::Barracks).unwrap();
        assert!(sim.queue_unit(barracks).unwrap());

        let events = sim.run(119);
        assert!(events.iter().all(|e| e.produced.is_empty()));

        let events = sim.tick();
        assert_eq!(events.produced.len(), 1);
        let unit = events.produced[0].unit;
        // East neighbour of centre tile (5,5).
        assert_eq!(sim.unit(unit).unwrap().position(), TilePos::new(6, 5).center(32));
        assert_eq!(sim.structure(barracks).unwrap().queued(), 0);
        assert_eq!(sim.structure(barracks).unwrap().timer(), 0);
    }

    #[test]
    fn test_queue_unit_at_point() {
        let mut sim = open_sim();
        let barracks = sim.place_structure(TilePos::new(1, 1), StructureKind::Barracks).unwrap();
        let depot = sim.place_structure(TilePos::new(6, 6), StructureKind::Depot).unwrap();

        assert_eq!(sim.queue_unit_at(Vec2Fixed::from_int(40, 40)), Some(barracks));
        assert_eq!(sim.queue_unit_at(Vec2Fixed::from_int(200, 200)), None);
        assert_eq!(sim.queue_unit_at(Vec2Fixed::from_int(600, 400)), None);
        assert_eq!(sim.structure(barracks).unwrap().queued(), 1);
        assert_eq!(sim.structure(depot).unwrap().queued(), 0);
    }

    #[test]
    fn test_spawn_on_random_grass() {
        let mut grid = Grid::new(3, 3);
        for (pos, _) in Grid::new(3, 3).iter() {
            if pos != TilePos::new(2, 1) {
                grid.set_tile(pos, Tile::Water);
            }
        }
        let mut sim = Simulation::from_grid(SimConfig::default(), grid).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let id = sim.spawn_unit_on_random_grass(&mut rng).unwrap();
        assert_eq!(sim.unit(id).unwrap().position(), TilePos::new(2, 1).center(32));

        let flooded = Grid::from_tiles(1, 1, vec![Tile::Water]).unwrap();
        let mut water = Simulation::from_grid(SimConfig::default(), flooded).unwrap();
        assert_eq!(water.spawn_unit_on_random_grass(&mut rng), None);
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = open_sim();
        let mut b = open_sim();
        assert_eq!(a.state_hash(), b.state_hash());

        a.spawn_unit(Vec2Fixed::from_int(50, 50));
        assert_ne!(a.state_hash(), b.state_hash());

        b.spawn_unit(Vec2Fixed::from_int(50, 50));
        a.tick();
        b.tick();
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut sim = Simulation::new(SimConfig::default(), &TerrainConfig::classic()).unwrap();
        let id = sim.spawn_unit(Vec2Fixed::from_int(100, 100));
        sim.set_unit_target(id, Vec2Fixed::from_int(600, 400)).unwrap();
        sim.run(30);

        let bytes = sim.serialize().unwrap();
        let mut restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), sim.state_hash());

        sim.run(50);
        restored.run(50);
        assert_eq!(restored, sim);
    }

    #[test]
    fn test_deserialize_garbage() {
        assert!(matches!(
            Simulation::deserialize(&[1, 2, 3]),
            Err(SimError::Serialization(_))
        ));
    }
}

//! Scenario loading and configuration.
//!
//! Scenarios define the starting world for headless runs: the terrain to
//! generate, simulation tuning, starting units, and pre-placed structures.

use std::path::Path;

use bridgehead_core::config::SimConfig;
use bridgehead_core::error::{PlacementError, SimError};
use bridgehead_core::math::{Fixed, Vec2Fixed};
use bridgehead_core::simulation::Simulation;
use bridgehead_core::terrain::{TerrainConfig, TilePos};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::StructureKindName;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The simulation rejected the scenario's configuration.
    #[error("Invalid scenario: {0}")]
    Simulation(#[from] SimError),
    /// A starting structure could not be placed.
    #[error("Cannot place {kind:?} at {origin}: {source}")]
    Placement {
        /// Kind that was being placed.
        kind: StructureKindName,
        /// Requested top-left tile.
        origin: TilePos,
        /// Why placement failed.
        source: PlacementError,
    },
}

/// A starting unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Pixel x.
    pub x: i32,
    /// Pixel y.
    pub y: i32,
    /// Optional pixel target issued right after spawning.
    #[serde(default)]
    pub target: Option<(i32, i32)>,
}

impl UnitPlacement {
    /// Create an idle placement.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, target: None }
    }

    /// Send the unit somewhere once spawned.
    #[must_use]
    pub const fn with_target(mut self, x: i32, y: i32) -> Self {
        self.target = Some((x, y));
        self
    }
}

/// A pre-placed structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructurePlacement {
    /// Structure kind.
    pub kind: StructureKindName,
    /// Top-left tile x.
    pub tile_x: u32,
    /// Top-left tile y.
    pub tile_y: u32,
    /// Units queued at start.
    #[serde(default)]
    pub queued: u32,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Terrain to generate.
    #[serde(default)]
    pub terrain: TerrainConfig,
    /// Simulation tuning.
    #[serde(default)]
    pub sim: SimConfig,
    /// Starting units.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Pre-placed structures.
    #[serde(default)]
    pub structures: Vec<StructurePlacement>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Classic Island".to_string(),
            description: "Two units on a 40x25 island split by a river".to_string(),
            terrain: TerrainConfig::classic(),
            sim: SimConfig::default(),
            units: vec![UnitPlacement::new(100, 100), UnitPlacement::new(200, 150)],
            structures: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// The default scenario with a different terrain seed.
    #[must_use]
    pub fn classic(seed: u64) -> Self {
        Self {
            terrain: TerrainConfig::classic().with_seed(seed),
            ..Self::default()
        }
    }

    /// Build the starting simulation.
    ///
    /// Structures are placed before units spawn, so queued production and
    /// unit targets both see the final footprint.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let mut sim = Simulation::new(self.sim.clone(), &self.terrain)?;

        for placement in &self.structures {
            let origin = TilePos::new(placement.tile_x, placement.tile_y);
            let id = sim
                .place_structure(origin, placement.kind.into())
                .map_err(|source| ScenarioError::Placement {
                    kind: placement.kind,
                    origin,
                    source,
                })?;
            for _ in 0..placement.queued {
                if !sim.queue_unit(id)? {
                    warn!("{:?} at {} cannot train units, ignoring queue", placement.kind, origin);
                    break;
                }
            }
        }

        for placement in &self.units {
            let id = sim.spawn_unit(pixel(placement.x, placement.y));
            if let Some((tx, ty)) = placement.target {
                let outcome = sim.set_unit_target(id, pixel(tx, ty))?;
                debug!("Scenario unit {} -> ({}, {}): {:?}", id, tx, ty, outcome);
            }
        }

        Ok(sim)
    }
}

fn pixel(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgehead_core::structures::StructureKind;
    use bridgehead_core::terrain::{LakeConfig, RiverOrientation};

    fn open_terrain() -> TerrainConfig {
        TerrainConfig::classic()
            .with_size(12, 12)
            .with_lakes(LakeConfig::none())
            .with_river(RiverOrientation::Vertical)
    }

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.units.len(), 2);
        assert_eq!((scenario.terrain.width, scenario.terrain.height), (40, 25));

        let sim = scenario.build().unwrap();
        assert_eq!(sim.units().len(), 2);
        assert_eq!(sim.units()[0].position(), pixel(100, 100));
        assert_eq!(sim.units()[1].position(), pixel(200, 150));
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                terrain: TerrainConfig(width: 20, height: 15, seed: 9),
                units: [UnitPlacement(x: 40, y: 40, target: Some((200, 40)))],
                structures: [StructurePlacement(kind: barracks, tile_x: 2, tile_y: 8, queued: 2)],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.terrain.seed, 9);
        assert_eq!(scenario.sim, SimConfig::default());
        assert_eq!(scenario.units[0].target, Some((200, 40)));
        assert_eq!(scenario.structures[0].queued, 2);
    }

    #[test]
    fn test_ron_round_trip() {
        let scenario = Scenario::classic(77);
        let text = scenario.to_ron_string().unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }

    #[test]
    fn test_build_places_and_queues() {
        let scenario = Scenario {
            name: "Queue".to_string(),
            terrain: open_terrain(),
            structures: vec![
                StructurePlacement {
                    kind: StructureKindName::Barracks,
                    tile_x: 1,
                    tile_y: 1,
                    queued: 3,
                },
                StructurePlacement {
                    kind: StructureKindName::Tower,
                    tile_x: 1,
                    tile_y: 8,
                    queued: 1,
                },
            ],
            ..Scenario::default()
        };
        let sim = scenario.build().unwrap();

        assert_eq!(sim.structures()[0].kind(), StructureKind::Barracks);
        assert_eq!(sim.structures()[0].queued(), 3);
        assert_eq!(sim.structures()[1].queued(), 0);
    }

    #[test]
    fn test_build_rejects_water_structure() {
        let scenario = Scenario {
            name: "Wet".to_string(),
            terrain: open_terrain(),
            structures: vec![StructurePlacement {
                kind: StructureKindName::Depot,
                tile_x: 0,
                tile_y: 0,
                queued: 0,
            }],
            ..Scenario::default()
        };
        let err = scenario.build().unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Placement {
                source: PlacementError::NonGrassTerrain { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_sim_config_is_reported() {
        let mut scenario = Scenario::default();
        scenario.sim.tile_size = 0;
        assert!(matches!(scenario.build(), Err(ScenarioError::Simulation(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("island.ron");
        std::fs::write(&path, Scenario::classic(5).to_ron_string().unwrap()).unwrap();

        let loaded = Scenario::load(&path).unwrap();
        assert_eq!(loaded.terrain.seed, 5);
    }
}

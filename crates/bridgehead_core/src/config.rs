//! Simulation tuning values.
//!
//! Defaults reproduce the classic game: 32 px tiles, 2 px/tick units of
//! size 20, 120-tick training and 64x64 px structures.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::Fixed;
use crate::units::UnitStats;

/// Template applied to every newly spawned unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTemplate {
    /// Pixels moved per tick along each axis.
    pub speed: u32,
    /// Footprint edge length in pixels, also the collision distance.
    pub size: u32,
    /// Attack rating.
    pub attack: u32,
    /// Defense rating.
    pub defense: u32,
    /// Intellect rating.
    pub intellect: u32,
    /// Hit points.
    pub hit_points: u32,
}

impl Default for UnitTemplate {
    fn default() -> Self {
        Self {
            speed: 2,
            size: 20,
            attack: 10,
            defense: 5,
            intellect: 3,
            hit_points: 100,
        }
    }
}

impl UnitTemplate {
    /// Descriptive stat block for a new unit.
    #[must_use]
    pub const fn stats(&self) -> UnitStats {
        UnitStats {
            attack: self.attack,
            defense: self.defense,
            intellect: self.intellect,
            hit_points: self.hit_points,
        }
    }

    /// Speed as a fixed-point value.
    #[must_use]
    pub fn speed_fixed(&self) -> Fixed {
        Fixed::from_num(self.speed)
    }

    /// Size as a fixed-point value.
    #[must_use]
    pub fn size_fixed(&self) -> Fixed {
        Fixed::from_num(self.size)
    }
}

/// Simulation-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Template for spawned units.
    pub unit: UnitTemplate,
    /// Ticks a production structure needs per queued unit.
    pub train_ticks: u32,
    /// Consecutive motionless ticks tolerated before a unit replans.
    pub stall_ticks: u32,
    /// Structure footprint edge length in tiles.
    pub structure_size_tiles: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            unit: UnitTemplate::default(),
            train_ticks: 120,
            stall_ticks: 15,
            structure_size_tiles: 2,
        }
    }
}

/// Largest pixel length or coordinate a position can hold.
pub const MAX_PIXEL_EXTENT: u64 = i32::MAX as u64;

impl SimConfig {
    /// Parse a configuration from RON text and validate it.
    ///
    /// Missing fields take their default values.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every size is usable.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(SimError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.structure_size_tiles == 0 {
            return Err(SimError::InvalidConfig(
                "structure_size_tiles must be positive".into(),
            ));
        }
        if self.unit.size == 0 {
            return Err(SimError::InvalidConfig("unit size must be positive".into()));
        }
        if self.unit.speed == 0 {
            return Err(SimError::InvalidConfig("unit speed must be positive".into()));
        }
        if self.train_ticks == 0 {
            return Err(SimError::InvalidConfig("train_ticks must be positive".into()));
        }
        let lengths = [
            ("tile_size", u64::from(self.tile_size)),
            ("unit size", u64::from(self.unit.size)),
            ("unit speed", u64::from(self.unit.speed)),
            (
                "structure size",
                u64::from(self.structure_size_tiles) * u64::from(self.tile_size),
            ),
        ];
        for (name, px) in lengths {
            if px > MAX_PIXEL_EXTENT {
                return Err(SimError::InvalidConfig(format!(
                    "{name} of {px} px exceeds {MAX_PIXEL_EXTENT} px"
                )));
            }
        }
        Ok(())
    }

    /// Check that a `width` x `height` tile grid fits in pixel coordinates.
    pub fn validate_extent(&self, width: u32, height: u32) -> Result<()> {
        let extent = u64::from(width.max(height)) * u64::from(self.tile_size);
        if extent > MAX_PIXEL_EXTENT {
            return Err(SimError::InvalidConfig(format!(
                "{width}x{height} grid spans {extent} px, more than {MAX_PIXEL_EXTENT} px"
            )));
        }
        Ok(())
    }

    /// Structure edge length in pixels.
    #[must_use]
    pub const fn structure_size_px(&self) -> u32 {
        self.structure_size_tiles * self.tile_size
    }
}

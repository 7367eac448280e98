//! Mobile units and their waypoint-following motion model.
//!
//! Each unit is a small state machine: [`MotionState::Idle`] with no path,
//! or [`MotionState::Moving`] with a non-empty queue of waypoint tiles.
//! Units travel between tile centres, moving along each axis independently
//! by at most their speed per tick. A unit that makes no progress for too
//! long replans toward its remembered destination.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{SimConfig, UnitTemplate};
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::pathfinding::find_path;
use crate::terrain::{Grid, TilePos};

/// Unique identifier for a unit. Assigned in ascending spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Descriptive stats. Nothing in the simulation reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Attack rating.
    pub attack: u32,
    /// Defense rating.
    pub defense: u32,
    /// Intellect rating.
    pub intellect: u32,
    /// Hit points.
    pub hit_points: u32,
}

/// Result of asking a unit to travel somewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteOutcome {
    /// A path was found; the unit has `steps` waypoints to visit.
    Routed {
        /// Remaining waypoints.
        steps: usize,
    },
    /// The unit already stands on the destination tile.
    AlreadyThere,
    /// No walkable path leads to the destination.
    Unreachable,
}

impl RouteOutcome {
    /// True if the unit will move.
    #[must_use]
    pub const fn is_routed(self) -> bool {
        matches!(self, Self::Routed { .. })
    }
}

/// Why a unit asked for a new path on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplanTrigger {
    /// Position did not change for more than the configured stall window.
    Stalled {
        /// Consecutive motionless ticks observed.
        ticks: u32,
    },
}

/// Something notable that happened to a unit during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionEvent {
    /// Reached an intermediate waypoint.
    WaypointReached(TilePos),
    /// Reached the final waypoint and went idle.
    Arrived(TilePos),
    /// Requested a fresh path.
    Replanned {
        /// What caused the replan.
        trigger: ReplanTrigger,
        /// Result of the new search.
        outcome: RouteOutcome,
    },
}

/// Motion state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionState {
    /// No path to follow.
    #[default]
    Idle,
    /// Following a path.
    Moving {
        /// Remaining waypoint tiles, never empty.
        waypoints: VecDeque<TilePos>,
        /// Consecutive ticks without a position change.
        stalled_ticks: u32,
    },
}

impl MotionState {
    /// True when the unit has nowhere to go.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    fn from_path(path: Vec<TilePos>) -> Self {
        if path.is_empty() {
            Self::Idle
        } else {
            Self::Moving {
                waypoints: path.into(),
                stalled_ticks: 0,
            }
        }
    }
}

/// A mobile unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    /// Centre position in pixels.
    position: Vec2Fixed,
    /// Post-motion position from the previous update.
    last_position: Vec2Fixed,
    #[serde(with = "crate::math::fixed_serde")]
    speed: Fixed,
    #[serde(with = "crate::math::fixed_serde")]
    size: Fixed,
    stats: UnitStats,
    /// Destination tile remembered for replanning.
    destination: Option<TilePos>,
    motion: MotionState,
    selected: bool,
}

impl Unit {
    /// Create an idle, unselected unit centred at `position`.
    #[must_use]
    pub fn new(id: UnitId, position: Vec2Fixed, template: &UnitTemplate) -> Self {
        Self {
            id,
            position,
            last_position: position,
            speed: template.speed_fixed(),
            size: template.size_fixed(),
            stats: template.stats(),
            destination: None,
            motion: MotionState::Idle,
            selected: false,
        }
    }

    /// Unit id.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Centre position in pixels.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Move the unit without touching its path.
    pub fn set_position(&mut self, position: Vec2Fixed) {
        self.position = position;
    }

    /// Per-axis speed in pixels per tick.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Footprint edge length in pixels.
    #[must_use]
    pub const fn size(&self) -> Fixed {
        self.size
    }

    /// Descriptive stats.
    #[must_use]
    pub const fn stats(&self) -> UnitStats {
        self.stats
    }

    /// Remembered destination tile, if any target was ever set.
    #[must_use]
    pub const fn destination(&self) -> Option<TilePos> {
        self.destination
    }

    /// Current motion state.
    #[must_use]
    pub const fn motion(&self) -> &MotionState {
        &self.motion
    }

    /// True while the unit has waypoints left.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        !self.motion.is_idle()
    }

    /// Remaining waypoints, nearest first.
    #[must_use]
    pub fn waypoints(&self) -> Vec<TilePos> {
        match &self.motion {
            MotionState::Idle => Vec::new(),
            MotionState::Moving { waypoints, .. } => waypoints.iter().copied().collect(),
        }
    }

    /// Selection flag.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Set the selection flag.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Flip the selection flag and return the new value.
    pub fn toggle_selected(&mut self) -> bool {
        self.selected = !self.selected;
        self.selected
    }

    /// Square selection box centred on the unit.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::centered(self.position, self.size, self.size)
    }

    /// Tile currently under the unit's centre.
    #[must_use]
    pub fn tile(&self, grid: &Grid, tile_size: u32) -> TilePos {
        grid.tile_at_pixel(self.position, tile_size)
    }

    /// Send the unit toward a pixel target.
    ///
    /// The target is clamped into the grid and remembered so the unit can
    /// replan later. The waypoint queue is replaced; an unreachable target
    /// leaves the unit idle.
    pub fn set_target(&mut self, target: Vec2Fixed, grid: &Grid, tile_size: u32) -> RouteOutcome {
        let goal = grid.tile_at_pixel(target, tile_size);
        self.destination = Some(goal);
        self.route_to(goal, grid, tile_size)
    }

    fn route_to(&mut self, goal: TilePos, grid: &Grid, tile_size: u32) -> RouteOutcome {
        let start = self.tile(grid, tile_size);
        if start == goal {
            self.motion = MotionState::Idle;
            return RouteOutcome::AlreadyThere;
        }

        let mut path = find_path(grid, start, goal);
        // The unit already stands on the first tile.
        if path.first() == Some(&start) {
            path.remove(0);
        }

        let outcome = if path.is_empty() {
            RouteOutcome::Unreachable
        } else {
            RouteOutcome::Routed { steps: path.len() }
        };
        self.motion = MotionState::from_path(path);
        outcome
    }

    /// Advance the unit by one tick.
    pub fn update(&mut self, grid: &Grid, config: &SimConfig) -> Option<MotionEvent> {
        let tile_size = config.tile_size;
        let speed = self.speed;

        let MotionState::Moving {
            waypoints,
            stalled_ticks,
        } = &mut self.motion
        else {
            self.last_position = self.position;
            return None;
        };

        let Some(&next) = waypoints.front() else {
            self.motion = MotionState::Idle;
            self.last_position = self.position;
            return None;
        };

        let target = next.center(tile_size);
        self.position = Vec2Fixed::new(
            step_toward(self.position.x, target.x, speed),
            step_toward(self.position.y, target.y, speed),
        );

        let mut event = None;
        if (target.x - self.position.x).abs() < speed && (target.y - self.position.y).abs() < speed
        {
            self.position = target;
            waypoints.pop_front();
            *stalled_ticks = 0;
            event = Some(if waypoints.is_empty() {
                MotionEvent::Arrived(next)
            } else {
                MotionEvent::WaypointReached(next)
            });
        } else if self.position == self.last_position {
            *stalled_ticks += 1;
        } else {
            *stalled_ticks = 0;
        }

        let stalled = *stalled_ticks;
        if waypoints.is_empty() {
            self.motion = MotionState::Idle;
        }
        self.last_position = self.position;

        if stalled > config.stall_ticks {
            if let Some(goal) = self.destination {
                let outcome = self.route_to(goal, grid, tile_size);
                tracing::debug!(unit = %self.id, %goal, ?outcome, "Stalled unit replanned");
                return Some(MotionEvent::Replanned {
                    trigger: ReplanTrigger::Stalled { ticks: stalled },
                    outcome,
                });
            }
        }

        event
    }
}

/// Move `from` toward `to` by at most `speed` without overshooting.
fn step_toward(from: Fixed, to: Fixed, speed: Fixed) -> Fixed {
    if from < to {
        from + speed.min(to - from)
    } else if from > to {
        from - speed.min(from - to)
    } else {
        from
    }
}

/// Units in ascending id order.
///
/// Ids are never reused, so the backing vector stays sorted and lookups
/// can binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStorage {
    units: Vec<Unit>,
    next_id: u32,
}

impl UnitStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a unit from a template and return its id.
    pub fn spawn(&mut self, position: Vec2Fixed, template: &UnitTemplate) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        self.units.push(Unit::new(id, position, template));
        id
    }

    /// Remove a unit.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        let index = self.index_of(id)?;
        Some(self.units.remove(index))
    }

    fn index_of(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search_by_key(&id, Unit::id).ok()
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.index_of(id).map(|i| &self.units[i])
    }

    /// Get a mutable unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.index_of(id).map(|i| &mut self.units[i])
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if there are no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units in spawn order.
    #[must_use]
    pub fn as_slice(&self) -> &[Unit] {
        &self.units
    }

    /// Mutable view of all units in spawn order.
    pub fn as_mut_slice(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    /// Iterate in spawn order.
    pub fn iter(&self) -> std::slice::Iter<'_, Unit> {
        self.units.iter()
    }

    /// Iterate mutably in spawn order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Unit> {
        self.units.iter_mut()
    }
}

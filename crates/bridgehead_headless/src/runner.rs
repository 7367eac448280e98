//! Headless session runner.
//!
//! Owns one [`Simulation`] and applies protocol commands to it. The runner
//! reads from any `BufRead` and writes to any `Write`, so a session can be
//! driven over stdin/stdout or from an in-memory buffer.

use std::io::{self, BufRead, Write};

use bridgehead_core::math::{Fixed, Rect, Vec2Fixed};
use bridgehead_core::simulation::Simulation;
use bridgehead_core::structures::StructureId;
use bridgehead_core::terrain::TilePos;
use bridgehead_core::units::{MotionEvent, UnitId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::protocol::{Command, ProducedState, Response, StructureState, UnitState};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every `tick` command (vs only on query).
    pub auto_state_output: bool,
}

/// Headless runner for externally controlled sessions.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    sim: Simulation,
    /// Stream for `spawn_random`, separate from terrain generation.
    rng: ChaCha8Rng,
    finished: bool,
}

impl HeadlessRunner {
    /// Create a runner over an existing simulation.
    pub fn new(sim: Simulation, seed: u64) -> Self {
        Self::with_config(sim, seed, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(sim: Simulation, seed: u64, config: HeadlessConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(1);
        Self {
            config,
            sim,
            rng,
            finished: false,
        }
    }

    /// Build the scenario's world and wrap it in a runner.
    pub fn from_scenario(scenario: &Scenario, config: HeadlessConfig) -> Result<Self, ScenarioError> {
        info!("Loading scenario '{}'", scenario.name);
        let sim = scenario.build()?;
        Ok(Self::with_config(sim, scenario.terrain.seed, config))
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether a `quit` command has been processed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The greeting sent before any command is read.
    pub fn ready(&self) -> Response {
        let (width, height) = self.sim.dimensions();
        Response::ready(self.sim.current_tick(), width, height)
    }

    /// Run the session loop.
    ///
    /// Writes the ready message, answers each input line, and stops after
    /// `quit` or at end of input. A `bye` is always the last line written.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write!(output, "{}", self.ready().to_json_line())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            for response in self.handle_line(&line) {
                write!(output, "{}", response.to_json_line())?;
            }
            output.flush()?;
            if self.finished {
                break;
            }
        }

        if !self.finished {
            debug!("Input closed without quit");
            write!(output, "{}", Response::Bye.to_json_line())?;
            output.flush()?;
        }
        info!("Session ended at tick {}", self.sim.current_tick());
        Ok(())
    }

    /// Parse and apply one input line.
    pub fn handle_line(&mut self, line: &str) -> Vec<Response> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }
        match Command::from_json(line) {
            Ok(cmd) => self.handle(cmd),
            Err(e) => {
                warn!("Unparseable command: {}", e);
                vec![Response::error(format!("Parse error: {e}"), None)]
            }
        }
    }

    /// Apply one command.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let cmd_name = cmd.name();
        debug!("Command: {:?}", cmd);

        match cmd {
            Command::Tick { count } => self.tick(count),

            Command::Query => vec![self.state()],

            Command::Hash => vec![Response::StateHash {
                tick: self.sim.current_tick(),
                hash: self.sim.state_hash(),
            }],

            Command::Spawn { x, y } => match pixel(x, y) {
                Ok(position) => vec![Response::Spawned {
                    unit_id: self.sim.spawn_unit(position).0,
                }],
                Err(message) => vec![Response::error(message, Some(cmd_name))],
            },

            Command::SpawnRandom => match self.sim.spawn_unit_on_random_grass(&mut self.rng) {
                Some(id) => vec![Response::Spawned { unit_id: id.0 }],
                None => vec![Response::error("No grass tile to spawn on", Some(cmd_name))],
            },

            Command::Move { unit_id, x, y } => {
                let result = pixel(x, y).and_then(|target| {
                    self.sim
                        .set_unit_target(UnitId(unit_id), target)
                        .map_err(|e| e.to_string())
                });
                match result {
                    Ok(outcome) => vec![Response::route(unit_id, outcome)],
                    Err(message) => vec![Response::error(message, Some(cmd_name))],
                }
            }

            Command::MoveSelected { x, y } => match pixel(x, y) {
                Ok(target) => {
                    let routes: Vec<Response> = self
                        .sim
                        .command_selected(target)
                        .into_iter()
                        .map(|(id, outcome)| Response::route(id.0, outcome))
                        .collect();
                    if routes.is_empty() {
                        vec![Response::ack(cmd_name)]
                    } else {
                        routes
                    }
                }
                Err(message) => vec![Response::error(message, Some(cmd_name))],
            },

            Command::Select { unit_id } => match self.sim.toggle_selection(UnitId(unit_id)) {
                Ok(_) => vec![self.selection()],
                Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
            },

            Command::SelectAt { x, y, additive } => match pixel(x, y) {
                Ok(point) => {
                    self.sim.select_at(point, additive);
                    vec![self.selection()]
                }
                Err(message) => vec![Response::error(message, Some(cmd_name))],
            },

            Command::SelectRect {
                x,
                y,
                width,
                height,
                additive,
            } => match (pixel(x, y), pixel(x + width, y + height)) {
                (Ok(a), Ok(b)) => {
                    self.sim.select_in_rect(Rect::from_corners(a, b), additive);
                    vec![self.selection()]
                }
                (Err(message), _) | (_, Err(message)) => {
                    vec![Response::error(message, Some(cmd_name))]
                }
            },

            Command::Place {
                kind,
                tile_x,
                tile_y,
            } => match self
                .sim
                .place_structure(TilePos::new(tile_x, tile_y), kind.into())
            {
                Ok(id) => vec![Response::Placed { structure_id: id.0 }],
                Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
            },

            Command::Queue { structure_id } => {
                let id = StructureId(structure_id);
                match self.sim.queue_unit(id) {
                    Ok(accepted) => vec![Response::Queued {
                        structure_id,
                        accepted,
                        queued: self.sim.structure(id).map_or(0, |s| s.queued()),
                    }],
                    Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
                }
            }

            Command::Quit => {
                self.finished = true;
                vec![Response::Bye]
            }
        }
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        let mut produced = Vec::new();
        let mut replans = 0;
        let mut collisions = 0;

        for _ in 0..count {
            let events = self.sim.tick();
            produced.extend(events.produced.iter().map(|p| ProducedState {
                structure_id: p.structure.0,
                unit_id: p.unit.0,
                tick: events.tick,
            }));
            replans += events
                .motion
                .iter()
                .filter(|(_, event)| matches!(event, MotionEvent::Replanned { .. }))
                .count() as u32;
            collisions += events.collisions as u32;
        }

        let mut responses = vec![Response::Ticked {
            tick: self.sim.current_tick(),
            produced,
            replans,
            collisions,
        }];
        if self.config.auto_state_output {
            responses.push(self.state());
        }
        responses
    }

    fn selection(&self) -> Response {
        Response::Selection {
            selected: self.sim.selected_units().into_iter().map(|id| id.0).collect(),
        }
    }

    /// Full state snapshot.
    pub fn state(&self) -> Response {
        let grid = self.sim.grid();
        let tile_size = self.sim.config().tile_size;

        let units = self
            .sim
            .units()
            .iter()
            .map(|unit| {
                let tile = unit.tile(grid, tile_size);
                UnitState {
                    id: unit.id().0,
                    x: unit.position().x.to_num(),
                    y: unit.position().y.to_num(),
                    tile_x: tile.x,
                    tile_y: tile.y,
                    selected: unit.is_selected(),
                    moving: unit.is_moving(),
                    waypoints: unit.waypoints().len(),
                }
            })
            .collect();

        let structures = self
            .sim
            .structures()
            .iter()
            .map(|s| StructureState {
                id: s.id().0,
                kind: s.kind().label().to_string(),
                tile_x: s.origin().x,
                tile_y: s.origin().y,
                queued: s.queued(),
                timer: s.timer(),
            })
            .collect();

        Response::State {
            tick: self.sim.current_tick(),
            units,
            structures,
            hash: self.sim.state_hash(),
        }
    }
}

/// Convert wire coordinates to fixed-point pixels.
fn pixel(x: f64, y: f64) -> Result<Vec2Fixed, String> {
    match (Fixed::checked_from_num(x), Fixed::checked_from_num(y)) {
        (Some(x), Some(y)) => Ok(Vec2Fixed::new(x, y)),
        _ => Err(format!("Coordinate out of range: ({x}, {y})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RouteStatus, StructureKindName};
    use bridgehead_core::config::SimConfig;
    use bridgehead_test_utils::fixtures::grid_from_ascii;

    fn runner(art: &str) -> HeadlessRunner {
        let sim = Simulation::from_grid(SimConfig::default(), grid_from_ascii(art)).unwrap();
        HeadlessRunner::new(sim, 7)
    }

    fn open_runner() -> HeadlessRunner {
        runner(
            "
            ........
            ........
            ........
            ........
            ",
        )
    }

    #[test]
    fn test_spawn_move_and_tick() {
        let mut r = open_runner();
        assert_eq!(
            r.handle_line(r#"{"cmd":"spawn","x":16,"y":16}"#),
            vec![Response::Spawned { unit_id: 0 }]
        );
        assert_eq!(
            r.handle_line(r#"{"cmd":"move","unit_id":0,"x":112,"y":16}"#),
            vec![Response::Route {
                unit_id: 0,
                outcome: RouteStatus::Routed,
                steps: Some(3),
            }]
        );

        let responses = r.handle(Command::Tick { count: 48 });
        assert!(matches!(responses[0], Response::Ticked { tick: 48, .. }));
        assert_eq!(r.simulation().units()[0].position(), Vec2Fixed::from_int(112, 16));
    }

    #[test]
    fn test_unknown_unit_reports_error() {
        let mut r = open_runner();
        let responses = r.handle(Command::Move {
            unit_id: 9,
            x: 10.0,
            y: 10.0,
        });
        assert!(matches!(&responses[0], Response::Error { cmd: Some(c), .. } if c == "move"));
    }

    #[test]
    fn test_bad_json_reports_parse_error() {
        let mut r = open_runner();
        let responses = r.handle_line("{not json");
        assert!(matches!(&responses[0], Response::Error { cmd: None, .. }));
        assert!(r.handle_line("   ").is_empty());
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let mut r = open_runner();
        let responses = r.handle(Command::Spawn { x: f64::NAN, y: 0.0 });
        assert!(matches!(responses[0], Response::Error { .. }));
        assert!(r.simulation().units().is_empty());
    }

    #[test]
    fn test_selection_commands() {
        let mut r = open_runner();
        r.handle(Command::Spawn { x: 16.0, y: 16.0 });
        r.handle(Command::Spawn { x: 200.0, y: 100.0 });

        assert_eq!(
            r.handle(Command::SelectRect {
                x: 0.0,
                y: 0.0,
                width: 250.0,
                height: 120.0,
                additive: false,
            }),
            vec![Response::Selection { selected: vec![0, 1] }]
        );
        assert_eq!(
            r.handle(Command::Select { unit_id: 1 }),
            vec![Response::Selection { selected: vec![0] }]
        );
        assert_eq!(
            r.handle(Command::SelectAt {
                x: 150.0,
                y: 50.0,
                additive: false,
            }),
            vec![Response::Selection { selected: vec![] }]
        );
    }

    #[test]
    fn test_move_selected_without_selection_acks() {
        let mut r = open_runner();
        assert_eq!(
            r.handle(Command::MoveSelected { x: 50.0, y: 50.0 }),
            vec![Response::ack("move_selected")]
        );
    }

    #[test]
    fn test_place_and_queue_produces_unit() {
        let mut r = open_runner();
        let placed = r.handle(Command::Place {
            kind: StructureKindName::Barracks,
            tile_x: 2,
            tile_y: 1,
        });
        assert_eq!(placed, vec![Response::Placed { structure_id: 0 }]);

        assert_eq!(
            r.handle(Command::Queue { structure_id: 0 }),
            vec![Response::Queued {
                structure_id: 0,
                accepted: true,
                queued: 1,
            }]
        );

        let Response::Ticked { produced, .. } = r.handle(Command::Tick { count: 120 }).remove(0) else {
            panic!("expected tick summary");
        };
        assert_eq!(
            produced,
            vec![ProducedState {
                structure_id: 0,
                unit_id: 0,
                tick: 120,
            }]
        );
    }

    #[test]
    fn test_place_on_water_is_error() {
        let mut r = runner(
            "
            ~~~~
            ~..~
            ~~~~
            ",
        );
        let responses = r.handle(Command::Place {
            kind: StructureKindName::Depot,
            tile_x: 1,
            tile_y: 1,
        });
        assert!(matches!(responses[0], Response::Error { .. }));
    }

    #[test]
    fn test_spawn_random_without_grass() {
        let mut r = runner("~~\n~~");
        assert!(matches!(r.handle(Command::SpawnRandom)[0], Response::Error { .. }));
    }

    #[test]
    fn test_auto_state_output() {
        let sim = Simulation::from_grid(SimConfig::default(), grid_from_ascii("....")).unwrap();
        let mut r = HeadlessRunner::with_config(
            sim,
            1,
            HeadlessConfig {
                auto_state_output: true,
            },
        );
        let responses = r.handle(Command::Tick { count: 2 });
        assert_eq!(responses.len(), 2);
        assert!(matches!(responses[1], Response::State { tick: 2, .. }));
    }

    #[test]
    fn test_session_over_buffers() {
        let input = b"{\"cmd\":\"spawn\",\"x\":16,\"y\":16}\n{\"cmd\":\"hash\"}\n{\"cmd\":\"quit\"}\n{\"cmd\":\"query\"}\n";
        let mut output = Vec::new();
        let mut r = open_runner();
        r.run(&input[..], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains(r#""type":"ready""#));
        assert!(lines[1].contains(r#""type":"spawned""#));
        assert!(lines[2].contains(r#""type":"state_hash""#));
        assert_eq!(lines[3], r#"{"type":"bye"}"#);
        assert!(r.is_finished());
    }

    #[test]
    fn test_session_ends_with_bye_at_eof() {
        let mut output = Vec::new();
        open_runner().run(&b"{\"cmd\":\"tick\"}\n"[..], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with("{\"type\":\"bye\"}\n"));
    }
}

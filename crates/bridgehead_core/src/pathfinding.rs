//! Grid-based pathfinding using A* algorithm.
//!
//! Moves are 4-directional with unit step cost, guided by the Manhattan
//! distance heuristic. Search state lives in flat vectors indexed by tile,
//! and frontier ties are broken by discovery order, so identical inputs
//! always produce identical paths.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::terrain::{Grid, TilePos};

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    /// Tile index into the grid.
    index: usize,
    /// f = steps so far + heuristic.
    f_score: u32,
    /// Discovery sequence number. Earlier discoveries win ties.
    seq: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 4-directional movement.
const DIRECTIONS: [(i32, i32); 4] = [
    (0, 1),  // South
    (1, 0),  // East
    (0, -1), // North
    (-1, 0), // West
];

/// Find a shortest 4-connected path from `start` to `goal`.
///
/// The returned sequence begins with `start` and ends with `goal`. It is
/// empty when `start == goal`, when either endpoint is off the grid, or
/// when the goal cannot be reached. Only the tiles entered along the way
/// must be walkable, so a unit standing on water can still walk off it.
#[must_use]
pub fn find_path(grid: &Grid, start: TilePos, goal: TilePos) -> Vec<TilePos> {
    if start == goal || !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Vec::new();
    }

    let (path, expanded) = search(grid, start, goal);
    tracing::trace!(
        %start,
        %goal,
        expanded,
        length = path.len(),
        "A* search finished"
    );
    path
}

/// Number of steps in the shortest path, or `None` if unreachable.
#[must_use]
pub fn path_length(grid: &Grid, start: TilePos, goal: TilePos) -> Option<usize> {
    if start == goal {
        return grid.in_bounds(start).then_some(0);
    }
    let path = find_path(grid, start, goal);
    (!path.is_empty()).then(|| path.len() - 1)
}

/// Manhattan distance heuristic.
#[inline]
fn manhattan_heuristic(a: TilePos, b: TilePos) -> u32 {
    a.manhattan(b)
}

fn search(grid: &Grid, start: TilePos, goal: TilePos) -> (Vec<TilePos>, usize) {
    let width = grid.width() as usize;
    let cell_count = width * grid.height() as usize;
    let to_index = |pos: TilePos| pos.y as usize * width + pos.x as usize;
    let to_pos = |index: usize| TilePos::new((index % width) as u32, (index / width) as u32);

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut closed = vec![false; cell_count];
    let mut g_score = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<usize>> = vec![None; cell_count];
    let mut seq: u64 = 0;
    let mut expanded = 0;

    let start_index = to_index(start);
    let goal_index = to_index(goal);

    g_score[start_index] = 0;
    open_set.push(AStarNode {
        index: start_index,
        f_score: manhattan_heuristic(start, goal),
        seq,
    });

    while let Some(current) = open_set.pop() {
        // Stale duplicate of an already finalized tile
        if closed[current.index] {
            continue;
        }
        closed[current.index] = true;
        expanded += 1;

        if current.index == goal_index {
            return (reconstruct_path(&came_from, goal_index, to_pos), expanded);
        }

        let current_pos = to_pos(current.index);
        let current_g = g_score[current.index];

        for &(dx, dy) in &DIRECTIONS {
            let Some(next) = current_pos.offset(dx, dy) else {
                continue;
            };
            if !grid.is_walkable(next) {
                continue;
            }

            let next_index = to_index(next);
            if closed[next_index] {
                continue;
            }

            let tentative_g = current_g + 1;
            if tentative_g < g_score[next_index] {
                came_from[next_index] = Some(current.index);
                g_score[next_index] = tentative_g;
                seq += 1;
                open_set.push(AStarNode {
                    index: next_index,
                    f_score: tentative_g + manhattan_heuristic(next, goal),
                    seq,
                });
            }
        }
    }

    (Vec::new(), expanded)
}

/// Walk `came_from` links back from the goal.
fn reconstruct_path(
    came_from: &[Option<usize>],
    goal_index: usize,
    to_pos: impl Fn(usize) -> TilePos,
) -> Vec<TilePos> {
    let mut path = vec![to_pos(goal_index)];
    let mut current = goal_index;

    while let Some(prev) = came_from[current] {
        path.push(to_pos(prev));
        current = prev;
    }

    path.reverse();
    path
}

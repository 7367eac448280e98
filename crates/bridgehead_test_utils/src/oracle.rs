//! Brute-force reference answers for checking the planner.

use std::collections::VecDeque;

use bridgehead_core::terrain::{Grid, TilePos};

/// Breadth-first shortest path length in steps.
///
/// Uses the same movement rules as the planner: 4-directional, only the
/// tiles entered must be walkable. Returns `Some(0)` when `start == goal`
/// and `None` when the goal cannot be reached.
#[must_use]
pub fn bfs_distance(grid: &Grid, start: TilePos, goal: TilePos) -> Option<usize> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return None;
    }
    if start == goal {
        return Some(0);
    }

    let width = grid.width() as usize;
    let index = |p: TilePos| p.y as usize * width + p.x as usize;
    let mut dist = vec![usize::MAX; width * grid.height() as usize];
    let mut queue = VecDeque::new();

    dist[index(start)] = 0;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let d = dist[index(current)];
        for (dx, dy) in [(0, 1), (1, 0), (0, -1), (-1, 0)] {
            let Some(next) = current.offset(dx, dy) else {
                continue;
            };
            if !grid.is_walkable(next) || dist[index(next)] != usize::MAX {
                continue;
            }
            if next == goal {
                return Some(d + 1);
            }
            dist[index(next)] = d + 1;
            queue.push_back(next);
        }
    }

    None
}

/// Check that a planner result is a real path from `start` to `goal`:
/// correct endpoints, unit steps, and only walkable tiles entered.
#[must_use]
pub fn is_valid_path(grid: &Grid, path: &[TilePos], start: TilePos, goal: TilePos) -> bool {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return false;
    };
    first == start
        && last == goal
        && path.windows(2).all(|w| w[0].manhattan(w[1]) == 1)
        && path.iter().skip(1).all(|&p| grid.is_walkable(p))
}

//! Pairwise overlap correction between units.
//!
//! One pass per tick, not iterated to convergence. Clusters of three or
//! more units may stay slightly overlapped and settle over later ticks.

use crate::math::{Fixed, Vec2Fixed};
use crate::units::{Unit, UnitId};

/// Minimum centre distance for a pair: the mean of both sizes.
#[inline]
fn min_distance(a: &Unit, b: &Unit) -> Fixed {
    a.size() / Fixed::from_num(2) + b.size() / Fixed::from_num(2)
}

/// Offset from `b` to `a`, saturating at the edges of the fixed-point range.
#[inline]
fn offset_between(a: Vec2Fixed, b: Vec2Fixed) -> Vec2Fixed {
    Vec2Fixed::new(a.x.saturating_sub(b.x), a.y.saturating_sub(b.y))
}

/// True when either axis alone already separates the pair.
#[inline]
fn axis_separated(delta: Vec2Fixed, min_dist: Fixed) -> bool {
    delta.x.saturating_abs() >= min_dist || delta.y.saturating_abs() >= min_dist
}

/// Push overlapping units apart. Returns the number of pairs corrected.
///
/// Pairs are visited in `(i, j)` order with `i < j`, each correction seeing
/// the positions left by the ones before it. A pair closer than its minimum
/// distance moves apart along the line between centres, each unit taking
/// half the overlap. Coincident units get a one-pixel push along the x axis
/// in opposite directions, with the sign chosen from the parity of `i + j`.
pub fn resolve_collisions(units: &mut [Unit]) -> usize {
    let mut corrected = 0;

    for i in 0..units.len() {
        let (head, tail) = units.split_at_mut(i + 1);
        let first = &mut head[i];

        for (offset, second) in tail.iter_mut().enumerate() {
            let j = i + 1 + offset;
            let delta = offset_between(first.position(), second.position());
            let min_dist = min_distance(first, second);
            if axis_separated(delta, min_dist) {
                continue;
            }

            let dist = first.position().distance(second.position());
            if dist >= min_dist {
                continue;
            }

            let push = if dist == Fixed::ZERO {
                let dir = if (i + j) % 2 == 0 { 1 } else { -1 };
                Vec2Fixed::from_int(dir, 0)
            } else {
                let half_overlap = (min_dist - dist) / Fixed::from_num(2);
                Vec2Fixed::new(delta.x / dist * half_overlap, delta.y / dist * half_overlap)
            };

            first.set_position(first.position() + push);
            second.set_position(second.position() - push);
            corrected += 1;
        }
    }

    if corrected > 0 {
        tracing::trace!(corrected, "Resolved unit overlaps");
    }
    corrected
}

/// Pairs currently closer than their minimum distance.
#[must_use]
pub fn overlapping_pairs(units: &[Unit]) -> Vec<(UnitId, UnitId)> {
    let mut pairs = Vec::new();
    for (i, a) in units.iter().enumerate() {
        for b in &units[i + 1..] {
            let min_dist = min_distance(a, b);
            if axis_separated(offset_between(a.position(), b.position()), min_dist) {
                continue;
            }
            if a.position().distance(b.position()) < min_dist {
                pairs.push((a.id(), b.id()));
            }
        }
    }
    pairs
}

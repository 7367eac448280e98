//! Fixed-point math utilities for deterministic simulation.
//!
//! Unit positions live in pixel space with sub-pixel precision. Using
//! fixed-point instead of floats keeps ticks bit-identical across
//! platforms, so state hashes can be compared between runs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole pixel coordinates.
    #[must_use]
    pub fn from_int(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at `Fixed::MAX` for points more than about 46,000 px apart.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Returns zero for non-positive inputs.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Axis-aligned pixel rectangle.
///
/// Containment is half-open: the left and top edges are inside, the right
/// and bottom edges are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Top edge.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Width (non-negative).
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Height (non-negative).
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle centred on a point.
    #[must_use]
    pub fn centered(center: Vec2Fixed, width: Fixed, height: Fixed) -> Self {
        let two = Fixed::from_num(2);
        Self::new(
            center.x - width / two,
            center.y - height / two,
            width,
            height,
        )
    }

    /// Normalize a drag rectangle spanned by two corners.
    #[must_use]
    pub fn from_corners(a: Vec2Fixed, b: Vec2Fixed) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Right edge (exclusive).
    #[must_use]
    pub fn right(&self) -> Fixed {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn bottom(&self) -> Fixed {
        self.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        let two = Fixed::from_num(2);
        Vec2Fixed::new(self.x + self.width / two, self.y + self.height / two)
    }

    /// Check whether a point lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Check whether two rectangles share any interior area.
    ///
    /// Rectangles that only touch along an edge do not intersect, and an
    /// empty rectangle intersects nothing.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        if self.width <= Fixed::ZERO
            || self.height <= Fixed::ZERO
            || other.width <= Fixed::ZERO
            || other.height <= Fixed::ZERO
        {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

pub type Result<T> = std::result::Result<T, crate::error::SchemError>;

/// A fractional coordinate as handed in by placers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The cell containing this position.
    pub fn floor(self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

/// An integer cell coordinate, also used for region sizes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ZERO: BlockPos = BlockPos::new(0, 0, 0);
    pub const ONE: BlockPos = BlockPos::new(1, 1, 1);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn min(self, other: BlockPos) -> BlockPos {
        BlockPos::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(self, other: BlockPos) -> BlockPos {
        BlockPos::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    /// Product of the components, treating negative components as empty. Saturates
    /// instead of overflowing.
    pub fn volume(self) -> usize {
        [self.x, self.y, self.z]
            .iter()
            .map(|&c| usize::try_from(c).unwrap_or(0))
            .fold(1, usize::saturating_mul)
    }

    pub fn checked_add(self, rhs: BlockPos) -> Option<BlockPos> {
        Some(BlockPos::new(
            self.x.checked_add(rhs.x)?,
            self.y.checked_add(rhs.y)?,
            self.z.checked_add(rhs.z)?,
        ))
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from([x, y, z]: [i32; 3]) -> Self {
        BlockPos::new(x, y, z)
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_negative_fractions() {
        assert_eq!(Position::new(1.9, -0.1, -3.0).floor(), BlockPos::new(1, -1, -3));
    }

    #[test]
    fn test_component_min_max() {
        let a = BlockPos::new(1, 5, -2);
        let b = BlockPos::new(3, -4, 0);
        assert_eq!(a.min(b), BlockPos::new(1, -4, -2));
        assert_eq!(a.max(b), BlockPos::new(3, 5, 0));
        assert_eq!(b - a + BlockPos::ONE, BlockPos::new(3, -8, 3));
    }

    #[test]
    fn test_volume() {
        assert_eq!(BlockPos::new(2, 1, 3).volume(), 6);
        assert_eq!(BlockPos::ZERO.volume(), 0);
        assert_eq!(BlockPos::new(-1, 4, 4).volume(), 0);
        assert_eq!(BlockPos::new(i32::MAX, i32::MAX, i32::MAX).volume(), usize::MAX);
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(
            BlockPos::new(1, -2, 3).checked_add(BlockPos::ONE),
            Some(BlockPos::new(2, -1, 4))
        );
        assert_eq!(BlockPos::new(0, i32::MAX, 0).checked_add(BlockPos::ONE), None);
    }
}

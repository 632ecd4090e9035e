use std::{
    fmt::{Display, Formatter},
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChunkLocation(pub i32, pub i32);

impl From<BlockLocation> for ChunkLocation {
    fn from(loc: BlockLocation) -> Self {
        Self(loc.x >> 4, loc.z >> 4)
    }
}

impl From<BlockLocation2D> for ChunkLocation {
    fn from(loc: BlockLocation2D) -> Self {
        Self(loc.x >> 4, loc.z >> 4)
    }
}

/// A block location stored by (x,z) = i32, y = i16. y is signed to preserve
/// compatibility with 1.17, where the world height can be much higher and goes
/// to negative values.
#[derive(
    Copy, Clone, Debug, Hash, PartialOrd, PartialEq, Ord, Eq, Default, Serialize, Deserialize,
)]
pub struct BlockLocation {
    pub x: i32,
    pub y: i16,
    pub z: i32,
}

impl From<BlockLocation> for BlockLocation2D {
    fn from(loc: BlockLocation) -> Self {
        Self { x: loc.x, z: loc.z }
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockLocation2D {
    pub x: i32,
    pub z: i32,
}

impl BlockLocation2D {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn dist2(self, other: Self) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dz = self.z.abs_diff(other.z) as u64;
        dx * dx + dz * dz
    }
}

impl Add<Change> for BlockLocation {
    type Output = Self;

    fn add(self, rhs: Change) -> Self::Output {
        let Self { x, y, z } = self;
        Self::new(x + rhs.dx, y + rhs.dy, z + rhs.dz)
    }
}

impl Sub for BlockLocation {
    type Output = Change;

    fn sub(self, rhs: Self) -> Self::Output {
        Change::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl BlockLocation {
    pub const fn new(x: i32, y: i16, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn below(&self) -> Self {
        self.add_y(-1)
    }

    pub const fn above(&self) -> Self {
        self.add_y(1)
    }

    pub const fn add_y(&self, dy: i16) -> Self {
        let &Self { x, y, z } = self;
        Self { x, y: y + dy, z }
    }

    /// The six blocks sharing a face with this one.
    pub fn neighbors(self) -> [Self; 6] {
        [
            self.above(),
            self.below(),
            self + Change::new(1, 0, 0),
            self + Change::new(-1, 0, 0),
            self + Change::new(0, 0, 1),
            self + Change::new(0, 0, -1),
        ]
    }

    pub const fn abs_dif(&self, other: Self) -> (u32, u16, u32) {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        (dx, dy, dz)
    }

    pub fn dist2(&self, other: Self) -> f64 {
        let (dx, dy, dz) = self.abs_dif(other);
        let (dx, dy, dz) = (f64::from(dx), f64::from(dy), f64::from(dz));
        dx * dx + dy * dy + dz * dz
    }

    pub fn dist(&self, other: Self) -> f64 {
        self.dist2(other).sqrt()
    }

    pub const fn manhatten(&self, other: Self) -> u64 {
        let (dx, dy, dz) = self.abs_dif(other);
        dx as u64 + dy as u64 + dz as u64
    }
}

impl Display for BlockLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("[{}, {}, {}]", self.x, self.y, self.z))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Change {
    pub dx: i32,
    pub dy: i16,
    pub dz: i32,
}

impl Change {
    pub const fn new(dx: i32, dy: i16, dz: i32) -> Self {
        Self { dx, dy, dz }
    }

    pub const fn scale(self, amount: i32) -> Self {
        Self {
            dx: self.dx * amount,
            dy: self.dy * amount as i16,
            dz: self.dz * amount,
        }
    }
}

impl Add for Change {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy, self.dz + rhs.dz)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CardinalDirection {
    North,
    South,
    West,
    East,
}

impl CardinalDirection {
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    pub const fn unit_change(self) -> Change {
        match self {
            Self::North => Change::new(1, 0, 0),
            Self::South => Change::new(-1, 0, 0),
            Self::West => Change::new(0, 0, 1),
            Self::East => Change::new(0, 0, -1),
        }
    }
}

/// Combination of two perpendicular cardinal directions
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DiagonalDirection(pub CardinalDirection, pub CardinalDirection);

impl DiagonalDirection {
    pub const ALL: [Self; 4] = {
        use CardinalDirection::{East, North, South, West};
        [
            Self(North, West),
            Self(North, East),
            Self(South, West),
            Self(South, East),
        ]
    };

    pub const fn unit_change(self) -> Change {
        let a = self.0.unit_change();
        let b = self.1.unit_change();
        Change::new(a.dx + b.dx, 0, a.dz + b.dz)
    }
}

#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SimpleType {
    Solid,
    Water,
    Avoid,
    WalkThrough,
}

impl SimpleType {
    pub const fn id(self) -> u8 {
        match self {
            Self::Solid => 0,
            Self::Water => 1,
            Self::Avoid => 2,
            Self::WalkThrough => 3,
        }
    }

    /// if an agent's body can occupy the block
    pub const fn passable(self) -> bool {
        matches!(self, Self::WalkThrough | Self::Water)
    }

    /// if a block could be placed into this space
    pub const fn replaceable(self) -> bool {
        matches!(self, Self::WalkThrough | Self::Water)
    }
}

impl From<u8> for SimpleType {
    fn from(id: u8) -> Self {
        match id {
            0 => Self::Solid,
            1 => Self::Water,
            2 => Self::Avoid,
            _ => Self::WalkThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{BlockLocation, CardinalDirection, Change, DiagonalDirection, SimpleType};

    #[test]
    fn test_cardinal_round_trip() {
        let origin = BlockLocation::new(3, 64, -2);
        for direction in CardinalDirection::ALL {
            let moved = origin + direction.unit_change();
            assert_eq!(moved.manhatten(origin), 1);
            assert_eq!(moved - origin, direction.unit_change());
        }
    }

    #[test]
    fn test_diagonal_is_two_blocks_away() {
        let origin = BlockLocation::default();
        for diagonal in DiagonalDirection::ALL {
            let moved = origin + diagonal.unit_change();
            assert_eq!(moved.manhatten(origin), 2);
            assert_eq!(moved.y, origin.y);
        }
    }

    #[test]
    fn test_scale() {
        let change = CardinalDirection::West.unit_change().scale(3);
        assert_eq!(change, Change::new(0, 0, 3));
    }

    #[test]
    fn test_simple_type_ids() {
        for kind in [
            SimpleType::Solid,
            SimpleType::Water,
            SimpleType::Avoid,
            SimpleType::WalkThrough,
        ] {
            assert_eq!(SimpleType::from(kind.id()), kind);
        }
    }

    #[test]
    fn test_serialize_location() {
        let loc = BlockLocation::new(1, -2, 3);
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, r#"{"x":1,"y":-2,"z":3}"#);
    }
}

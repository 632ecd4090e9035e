//! Types shared between the navigation core and anything driving it.

pub mod types;

pub use types::{
    BlockLocation, BlockLocation2D, CardinalDirection, Change, ChunkLocation, DiagonalDirection,
    SimpleType,
};

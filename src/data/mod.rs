//! Per-level data: coordinate containers.

pub mod coordinates;

pub use coordinates::{CoordinateContainer, EquidistantCoordinates, TensorProductCoordinates};

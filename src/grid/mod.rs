//! The grid hierarchy and its user-facing types.

pub mod config;
pub mod entity;
pub mod level;
pub mod partition;
pub mod yasp;

pub use config::GridConfig;
pub use entity::Entity;
pub use level::{GridLevel, LevelLayout, PartitionRanges};
pub use partition::{CommDirection, InterfaceType, LinkClass, PartitionType};
pub use yasp::{EquidistantGrid, MAX_LEVELS, TensorProductGrid, YaspGrid};

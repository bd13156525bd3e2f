//! GridError: unified error type for the structured grid.
//!
//! Configuration mistakes are reported when a grid or a level is built;
//! transport failures carry the neighbor rank they occurred with.

use thiserror::Error;

/// Unified error type for grid construction, refinement and communication.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Tensor-product coordinates must be strictly increasing along each axis.
    #[error("coordinates along axis {axis} are not strictly increasing")]
    NonMonotonicCoordinates { axis: usize },
    /// An axis needs at least two coordinates to span one cell.
    #[error("axis {axis} needs at least two coordinates")]
    TooFewCoordinates { axis: usize },
    /// A domain with zero cells (or a non-positive length) along an axis.
    #[error("domain is empty along axis {axis}")]
    EmptyDomain { axis: usize },
    /// Requested a grid level that does not exist.
    #[error("level {level} out of range (max level is {max_level})")]
    LevelOutOfRange { level: usize, max_level: usize },
    /// More coarsening steps requested than levels available.
    #[error("only {available} levels left, coarsening {requested} levels requested")]
    CoarsenTooFar { requested: usize, available: usize },
    /// The level hierarchy is bounded.
    #[error("level hierarchy is limited to {max} levels")]
    TooManyLevels { max: usize },
    /// The overlap would reach past a neighboring subdomain.
    #[error("overlap {overlap} exceeds the smallest subdomain extent {min_extent} along axis {axis}")]
    OverlapTooWide {
        axis: usize,
        overlap: usize,
        min_extent: usize,
    },
    /// A coordinate container does not cover the local cells it was built for.
    #[error("coordinate container has {found} cells along axis {axis}, expected {expected}")]
    CoordinateMismatch {
        axis: usize,
        expected: usize,
        found: usize,
    },
    /// Codimension larger than the grid dimension.
    #[error("codimension {codim} out of range for a {dim}-dimensional grid")]
    CodimOutOfRange { codim: usize, dim: usize },
    /// The load balancer or communicator produced an unusable process grid.
    #[error("invalid process grid: {0}")]
    InvalidProcessGrid(String),
    /// Rejected grid configuration.
    #[error("invalid grid configuration: {0}")]
    InvalidConfig(String),
    /// A transfer with a neighbor failed or delivered an unexpected length.
    #[error("communication with rank {neighbor} failed: {reason}")]
    CommError { neighbor: usize, reason: String },
}

#![cfg_attr(docsrs, feature(doc_cfg))]
//! # yasp-grid
//!
//! yasp-grid is a structured, parallel grid for finite-volume and finite-element
//! codes. A rectangular domain is split into a Cartesian grid of subdomains, one
//! per process; every subdomain is widened by a configurable number of ghost
//! layers (the overlap), and data living on cells, faces, edges or vertices is
//! kept consistent across processes by halo exchanges.
//!
//! ## Features
//! - Dimension as a const generic; cells, faces, edges and vertices of every
//!   orientation addressed by global index tuples
//! - Equidistant and tensor-product coordinates, periodic along any axis
//! - Four nested partition families per entity orientation (interior,
//!   interior+border, overlap, overlap+front) and the neighbor intersections
//!   between them
//! - Two-phase (size, then data) halo exchange driven by a user [`DataHandle`](algs::DataHandle)
//! - Global refinement and coarsening of the whole level hierarchy
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! yasp-grid = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ```rust,ignore
//! use yasp_grid::prelude::*;
//!
//! let mut grid = EquidistantGrid::<2>::sequential([1.0, 1.0], [8, 8], [true, false], 1)?;
//! grid.global_refine(1)?;
//! for cell in grid.entities(1, 0, PartitionType::Interior)? {
//!     let x = grid.center(&cell)?;
//! }
//! ```
//!
//! ## Determinism
//!
//! Neighbor lists and entity iteration orders depend only on the global
//! grid parameters and the process count, so every run (and every process)
//! sees the same message layout.

pub mod algs;
pub mod data;
pub mod grid;
pub mod grid_error;
pub mod topology;

pub use grid_error::GridError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::data_handle::{DataHandle, MessageBuffer};
    pub use crate::data::coordinates::{
        CoordinateContainer, EquidistantCoordinates, TensorProductCoordinates,
    };
    pub use crate::grid::config::GridConfig;
    pub use crate::grid::entity::Entity;
    pub use crate::grid::partition::{CommDirection, InterfaceType, PartitionType};
    pub use crate::grid::yasp::{EquidistantGrid, TensorProductGrid, YaspGrid};
    pub use crate::grid_error::GridError;
    pub use crate::topology::index_range::IndexRange;
    pub use crate::topology::load_balance::{DefaultLoadBalance, LoadBalance, SlabLoadBalance};
    pub use crate::topology::shift::Shift;
}

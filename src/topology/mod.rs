//! Index-space and process topology.
//!
//! - [`shift`]: entity orientations as axis bitmasks
//! - [`index_range`]: axis-aligned boxes of global indices
//! - [`load_balance`]: choosing the process grid
//! - [`torus`]: the Cartesian process grid and its neighbor stencil

pub mod index_range;
pub mod load_balance;
pub mod shift;
pub mod torus;

pub use index_range::IndexRange;
pub use load_balance::{DefaultLoadBalance, LoadBalance, SlabLoadBalance};
pub use shift::Shift;
pub use torus::Torus;

//! Communication algorithms: transport, wire format, neighbor
//! intersections and the halo exchange protocol.

pub mod communicator;
pub mod data_handle;
pub mod halo_exchange;
pub mod intersections;
pub mod wire;

pub use communicator::{CommTag, Communicator, LocalComm, NoComm};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use data_handle::{DataHandle, MessageBuffer};
pub use intersections::{Intersection, Links};

//! Logical Cartesian process grid ("torus") and its transport.
//!
//! Every process owns one coordinate in a `D`-dimensional process grid that
//! wraps around in every direction. The torus enumerates the full
//! `3^D - 1` neighbor stencil (faces, edges and corners) and pairs it into a
//! send list and a receive list with the same indexing:
//!
//! * send entry `k` goes to the process at `coord + delta_k`,
//! * receive entry `k` comes from the process at `coord - delta_k`.
//!
//! A process posting its sends in send-list order and its receives in
//! receive-list order therefore matches its peers message for message, even
//! when one peer appears several times (small or periodic process grids).
//!
//! Offsets are enumerated in base 3 with axis 0 as the lowest digit, so the
//! entry of `-delta` sits at the mirrored position of the entry of `delta`.

use crate::algs::communicator::{CommTag, Communicator, Envelope, Expect};
use crate::algs::wire::{WireF64, WireInt, cast_slice, decode_vec};
use crate::grid_error::GridError;
use crate::topology::load_balance::LoadBalance;
use bytes::Bytes;
use std::fmt;

/// Tag of all grid-internal point-to-point rounds.
pub const GRID_TAG: CommTag = CommTag::new(17);
/// Tag of collective reductions.
pub const REDUCE_TAG: CommTag = CommTag::new(18);

/// One entry of a neighbor list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor<const D: usize> {
    /// Rank of the neighbor process.
    pub rank: usize,
    /// Offset to the neighbor in process coordinates (each entry in -1..=1).
    pub delta: [i64; D],
    /// Number of axes along which the neighbor differs.
    pub distance: usize,
    /// Position in the neighbor list.
    pub index: usize,
}

/// Cartesian process topology over a [`Communicator`].
pub struct Torus<const D: usize, M: Communicator> {
    comm: M,
    tag: CommTag,
    dims: [usize; D],
    coord: [usize; D],
    send_list: Vec<Neighbor<D>>,
    recv_list: Vec<Neighbor<D>>,
}

impl<const D: usize, M: Communicator> Torus<D, M> {
    /// Arrange all processes of `comm` into a process grid for a domain of
    /// `size` cells, as proposed by `lb`.
    pub fn new(
        comm: M,
        tag: CommTag,
        size: [usize; D],
        lb: &dyn LoadBalance<D>,
    ) -> Result<Self, GridError> {
        let procs = comm.size();
        let dims = lb.process_dims(size, procs);
        if dims.iter().any(|&d| d == 0) || dims.iter().product::<usize>() != procs {
            return Err(GridError::InvalidProcessGrid(format!(
                "process grid {dims:?} does not hold {procs} processes"
            )));
        }
        if let Some(axis) = (0..D).find(|&i| dims[i] > size[i]) {
            return Err(GridError::InvalidProcessGrid(format!(
                "{} processes along axis {axis} but only {} cells",
                dims[axis], size[axis]
            )));
        }
        let mut torus = Self {
            coord: [0; D],
            comm,
            tag,
            dims,
            send_list: Vec::new(),
            recv_list: Vec::new(),
        };
        torus.coord = torus.coord_of(torus.comm.rank());
        torus.build_neighbor_lists();
        Ok(torus)
    }

    fn build_neighbor_lists(&mut self) {
        let stencil = 3usize.pow(D as u32);
        let mut index = 0;
        for k in 0..stencil {
            let mut delta = [0i64; D];
            let mut rest = k;
            for d in delta.iter_mut() {
                *d = (rest % 3) as i64 - 1;
                rest /= 3;
            }
            if delta.iter().all(|&d| d == 0) {
                continue;
            }
            let distance = delta.iter().filter(|&&d| d != 0).count();
            let mut minus = delta;
            minus.iter_mut().for_each(|d| *d = -*d);
            self.send_list.push(Neighbor {
                rank: self.rank_of(&self.wrapped(&delta)),
                delta,
                distance,
                index,
            });
            self.recv_list.push(Neighbor {
                rank: self.rank_of(&self.wrapped(&minus)),
                delta: minus,
                distance,
                index,
            });
            index += 1;
        }
    }

    fn wrapped(&self, delta: &[i64; D]) -> [usize; D] {
        let mut c = [0usize; D];
        for i in 0..D {
            let n = self.dims[i] as i64;
            c[i] = (self.coord[i] as i64 + delta[i]).rem_euclid(n) as usize;
        }
        c
    }

    /// Rank of the process at `coord` (axis 0 runs fastest).
    pub fn rank_of(&self, coord: &[usize; D]) -> usize {
        let mut rank = 0;
        let mut stride = 1;
        for i in 0..D {
            rank += coord[i] * stride;
            stride *= self.dims[i];
        }
        rank
    }

    /// Process coordinate of `rank`.
    pub fn coord_of(&self, mut rank: usize) -> [usize; D] {
        let mut c = [0usize; D];
        for i in 0..D {
            c[i] = rank % self.dims[i];
            rank /= self.dims[i];
        }
        c
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    #[inline]
    pub fn procs(&self) -> usize {
        self.comm.size()
    }

    #[inline]
    pub fn coord(&self) -> [usize; D] {
        self.coord
    }

    #[inline]
    pub fn dims(&self) -> [usize; D] {
        self.dims
    }

    #[inline]
    pub fn dim(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    /// Number of entries in each neighbor list.
    #[inline]
    pub fn neighbors(&self) -> usize {
        self.send_list.len()
    }

    pub fn send_list(&self) -> &[Neighbor<D>] {
        &self.send_list
    }

    pub fn recv_list(&self) -> &[Neighbor<D>] {
        &self.recv_list
    }

    pub fn comm(&self) -> &M {
        &self.comm
    }

    /// Split the cell block `origin`/`size` among the processes. The last
    /// `size % dims` processes along an axis receive one extra cell.
    ///
    /// Returns this process's interior origin and size, and the load
    /// imbalance (largest over mean subdomain volume).
    pub fn partition(&self, origin: [i64; D], size: [usize; D]) -> ([i64; D], [usize; D], f64) {
        let mut o = [0i64; D];
        let mut s = [0usize; D];
        let mut max_volume = 1.0;
        let mut volume = 1.0;
        for i in 0..D {
            let m = size[i] / self.dims[i];
            let r = size[i] % self.dims[i];
            let c = self.coord[i];
            if c < self.dims[i] - r {
                o[i] = origin[i] + (c * m) as i64;
                s[i] = m;
            } else {
                o[i] = origin[i] + ((self.dims[i] - r) * m + (c - (self.dims[i] - r)) * (m + 1)) as i64;
                s[i] = m + 1;
            }
            max_volume *= if r > 0 { (m + 1) as f64 } else { m as f64 };
            volume *= size[i] as f64;
        }
        let imbalance = max_volume / (volume / self.procs() as f64);
        (o, s, imbalance)
    }

    /// Start a communication round on this torus.
    pub fn round(&self) -> ExchangeRound<'_, M> {
        ExchangeRound {
            comm: &self.comm,
            tag: self.tag,
            sends: Vec::new(),
            recvs: Vec::new(),
        }
    }

    /// Maximum of `value` over all processes.
    pub fn global_max_i64(&self, value: i64) -> Result<i64, GridError> {
        let all = self
            .comm
            .all_gather(REDUCE_TAG, cast_slice(&[WireInt::new(value)]))?;
        Ok(all
            .iter()
            .flat_map(|b| decode_vec::<WireInt>(b))
            .map(|w| w.get())
            .fold(value, i64::max))
    }

    /// Minimum of `value` over all processes.
    pub fn global_min_i64(&self, value: i64) -> Result<i64, GridError> {
        Ok(-self.global_max_i64(-value)?)
    }

    /// Maximum of `value` over all processes.
    pub fn global_max_f64(&self, value: f64) -> Result<f64, GridError> {
        let all = self
            .comm
            .all_gather(REDUCE_TAG, cast_slice(&[WireF64::new(value)]))?;
        Ok(all
            .iter()
            .flat_map(|b| decode_vec::<WireF64>(b))
            .map(|w| w.get())
            .fold(value, f64::max))
    }
}

impl<const D: usize, M: Communicator> fmt::Display for Torus<D, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = self.rank();
        writeln!(
            f,
            "[{rank}]: torus dims={:?} coord={:?} procs={}",
            self.dims,
            self.coord,
            self.procs()
        )?;
        for n in &self.send_list {
            writeln!(f, "[{rank}]:   send to {} delta={:?} dist={}", n.rank, n.delta, n.distance)?;
        }
        for n in &self.recv_list {
            writeln!(f, "[{rank}]:   recv from {} delta={:?} dist={}", n.rank, n.delta, n.distance)?;
        }
        Ok(())
    }
}

/// Sends and receives of one round, completed together by [`ExchangeRound::exchange`].
pub struct ExchangeRound<'t, M: Communicator> {
    comm: &'t M,
    tag: CommTag,
    sends: Vec<Envelope>,
    recvs: Vec<Expect>,
}

impl<M: Communicator> ExchangeRound<'_, M> {
    pub fn send(&mut self, rank: usize, payload: impl Into<Bytes>) {
        self.sends.push(Envelope {
            peer: rank,
            payload: payload.into(),
        });
    }

    /// Post a receive of `len` bytes; returns its slot in the result of
    /// [`exchange`](Self::exchange).
    pub fn recv(&mut self, rank: usize, len: usize) -> usize {
        self.recvs.push(Expect { peer: rank, len });
        self.recvs.len() - 1
    }

    /// Complete every transfer of the round.
    pub fn exchange(self) -> Result<Vec<Bytes>, GridError> {
        log::trace!(
            "[{}] exchange: {} sends, {} recvs",
            self.comm.rank(),
            self.sends.len(),
            self.recvs.len()
        );
        self.comm.exchange(self.tag, self.sends, &self.recvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};
    use crate::topology::load_balance::{DefaultLoadBalance, SlabLoadBalance};

    #[test]
    fn serial_torus_neighbors_are_all_self() {
        let t = Torus::<2, _>::new(NoComm, GRID_TAG, [4, 4], &DefaultLoadBalance).unwrap();
        assert_eq!(t.neighbors(), 8);
        assert!(t.send_list().iter().all(|n| n.rank == 0));
        assert!(t.recv_list().iter().all(|n| n.rank == 0));
    }

    #[test]
    fn receive_list_mirrors_send_list() {
        let t = Torus::<3, _>::new(NoComm, GRID_TAG, [4, 4, 4], &DefaultLoadBalance).unwrap();
        let n = t.neighbors();
        for (k, s) in t.send_list().iter().enumerate() {
            let r = &t.recv_list()[k];
            assert_eq!(r.delta, s.delta.map(|d| -d));
            // mirrored position holds the opposite offset
            assert_eq!(t.send_list()[n - 1 - k].delta, r.delta);
            assert_eq!(s.distance, s.delta.iter().filter(|&&d| d != 0).count());
        }
    }

    #[test]
    fn partition_gives_extra_cells_to_the_last_processes() {
        let comms = LocalComm::group(3);
        let parts: Vec<_> = comms
            .into_iter()
            .map(|c| {
                let t = Torus::<1, _>::new(c, GRID_TAG, [10], &SlabLoadBalance { axis: 0 }).unwrap();
                let (o, s, _) = t.partition([0], [10]);
                (o[0], s[0])
            })
            .collect();
        assert_eq!(parts, vec![(0, 3), (3, 3), (6, 4)]);
    }

    #[test]
    fn float_maximum_agrees_on_every_rank() {
        let comms = LocalComm::group(3);
        let got: Vec<f64> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|c| {
                    s.spawn(move || {
                        let t = Torus::<1, _>::new(c, GRID_TAG, [9], &DefaultLoadBalance).unwrap();
                        let local = [1.25, -4.0, 0.5][t.rank()];
                        t.global_max_f64(local).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(got, vec![1.25; 3]);
    }

    #[test]
    fn too_many_processes_for_the_domain() {
        let comm = LocalComm::group(4).remove(0);
        let err = Torus::<1, _>::new(comm, GRID_TAG, [2], &DefaultLoadBalance).err();
        assert!(matches!(err, Some(GridError::InvalidProcessGrid(_))));
    }

    #[test]
    fn rank_coord_round_trip() {
        let comm = LocalComm::group(6).remove(5);
        let t = Torus::<2, _>::new(comm, GRID_TAG, [12, 12], &DefaultLoadBalance).unwrap();
        assert_eq!(t.dims().iter().product::<usize>(), 6);
        for r in 0..6 {
            assert_eq!(t.rank_of(&t.coord_of(r)), r);
        }
        assert_eq!(t.rank_of(&t.coord()), 5);
    }
}

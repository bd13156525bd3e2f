//! Cross-process intersections of index ranges.
//!
//! For one pair (send range, receive range) every process ships both boxes
//! to each neighbor of the torus, translated into the neighbor's frame when
//! the neighbor is reached across a periodic boundary. Intersecting the own
//! send range with a neighbor's receive range yields what has to be sent to
//! it; intersecting the own receive range with a neighbor's send range
//! yields what arrives from it. Both sides compute the same boxes up to the
//! periodic translation, so they iterate the same entities in the same order.

use crate::algs::communicator::Communicator;
use crate::algs::wire::{decode_range, encode_range, range_wire_len};
use crate::grid_error::GridError;
use crate::topology::index_range::IndexRange;
use crate::topology::torus::Torus;
use bytes::Bytes;
use std::collections::VecDeque;

/// Part of a local range exchanged with one neighbor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intersection<const D: usize> {
    /// Rank of the remote process.
    pub rank: usize,
    /// Local entities sent to or received from `rank`.
    pub range: IndexRange<D>,
    /// Number of axes along which the neighbor differs.
    pub distance: usize,
}

/// Send and receive intersections of one (send range, receive range) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Links<const D: usize> {
    pub send: VecDeque<Intersection<D>>,
    pub recv: VecDeque<Intersection<D>>,
}

/// Displacement that moves a local box into the frame of the neighbor at
/// `delta`, or `None` when that neighbor lies beyond a non-periodic boundary.
pub fn periodic_displacement<const D: usize>(
    coord: &[usize; D],
    dims: &[usize; D],
    delta: &[i64; D],
    periodic: &[bool; D],
    global_size: &[usize; D],
) -> Option<[i64; D]> {
    let mut v = [0i64; D];
    for k in 0..D {
        let nb = coord[k] as i64 + delta[k];
        if nb < 0 {
            if !periodic[k] {
                return None;
            }
            v[k] += global_size[k] as i64;
        }
        if nb >= dims[k] as i64 {
            if !periodic[k] {
                return None;
            }
            v[k] -= global_size[k] as i64;
        }
    }
    Some(v)
}

/// Compute the send and receive intersections of `send_range` and
/// `recv_range` with every torus neighbor. Collective over the torus.
///
/// The send list is built in reverse neighbor order. Since the entry of
/// `-delta` sits at the mirrored stencil position, this makes the sequence
/// of sends to any one peer agree with the sequence in which that peer
/// lists its receives from us.
pub fn compute_intersections<const D: usize, M: Communicator>(
    torus: &Torus<D, M>,
    periodic: &[bool; D],
    global_size: &[usize; D],
    send_range: &IndexRange<D>,
    recv_range: &IndexRange<D>,
) -> Result<Links<D>, GridError> {
    let coord = torus.coord();
    let dims = torus.dims();

    let mut moved_send = Vec::with_capacity(torus.neighbors());
    let mut moved_recv = Vec::with_capacity(torus.neighbors());
    for nb in torus.send_list() {
        match periodic_displacement(&coord, &dims, &nb.delta, periodic, global_size) {
            Some(v) => {
                moved_send.push(send_range.move_by(&v));
                moved_recv.push(recv_range.move_by(&v));
            }
            None => {
                moved_send.push(IndexRange::empty(send_range.shift()));
                moved_recv.push(IndexRange::empty(recv_range.shift()));
            }
        }
    }

    let their_send = swap_ranges(torus, &moved_send)?;
    let their_recv = swap_ranges(torus, &moved_recv)?;

    let mut links = Links::default();
    for (k, nb) in torus.recv_list().iter().enumerate() {
        let theirs: IndexRange<D> = decode_range(&their_recv[k], recv_range.shift());
        let to_send = send_range.intersection(&theirs);
        if !to_send.is_empty() {
            links.send.push_front(Intersection {
                rank: nb.rank,
                range: to_send,
                distance: nb.distance,
            });
        }

        let theirs: IndexRange<D> = decode_range(&their_send[k], send_range.shift());
        let to_recv = recv_range.intersection(&theirs);
        if !to_recv.is_empty() {
            links.recv.push_back(Intersection {
                rank: nb.rank,
                range: to_recv,
                distance: nb.distance,
            });
        }
    }
    Ok(links)
}

/// One round: send `ranges[k]` to send-list entry `k`, receive one range
/// from every receive-list entry.
fn swap_ranges<const D: usize, M: Communicator>(
    torus: &Torus<D, M>,
    ranges: &[IndexRange<D>],
) -> Result<Vec<Bytes>, GridError> {
    let mut round = torus.round();
    for (nb, r) in torus.send_list().iter().zip(ranges) {
        round.send(nb.rank, encode_range(r));
    }
    for nb in torus.recv_list() {
        round.recv(nb.rank, range_wire_len::<D>());
    }
    round.exchange()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_wraps_only_periodic_axes() {
        let coord = [0, 1];
        let dims = [2, 2];
        let size = [8, 6];
        assert_eq!(
            periodic_displacement(&coord, &dims, &[-1, 1], &[true, true], &size),
            Some([8, -6])
        );
        assert_eq!(
            periodic_displacement(&coord, &dims, &[-1, 0], &[false, true], &size),
            None
        );
        assert_eq!(
            periodic_displacement(&coord, &dims, &[1, -1], &[false, false], &size),
            Some([0, 0])
        );
    }
}

//! Two-phase halo exchange over the intersections of one grid level.
//!
//! 1. **Sizes** (only for variable-size data): every process sends, per
//!    outgoing intersection, the value count of each entity in range order.
//! 2. **Data**: values are gathered in range order into one flat buffer per
//!    intersection, exchanged, and scattered in the same order on the peer.
//!
//! Each phase is a single [`ExchangeRound`](crate::topology::torus::ExchangeRound);
//! sends and receives are posted in list order, which both sides agree on
//! per peer. The wire carries no entity indices.

use crate::algs::communicator::Communicator;
use crate::algs::data_handle::{DataHandle, MessageBuffer};
use crate::algs::intersections::Intersection;
use crate::algs::wire::{WireSize, cast_slice, decode_sizes, decode_vec, encode_sizes};
use crate::data::coordinates::CoordinateContainer;
use crate::grid::level::{GridLevel, entities_of};
use crate::grid::partition::{CommDirection, InterfaceType, LinkClass};
use crate::grid_error::GridError;
use crate::topology::torus::Torus;
use bytes::Bytes;

/// Exchange the data of `handle` for all entities of `codim` on the
/// interface `iface` of `level`. Collective over `torus`.
pub fn communicate_codim<const D: usize, C, M, H>(
    torus: &Torus<D, M>,
    level: &GridLevel<D, C>,
    codim: usize,
    iface: InterfaceType,
    dir: CommDirection,
    handle: &mut H,
) -> Result<(), GridError>
where
    C: CoordinateContainer<D>,
    M: Communicator,
    H: DataHandle<D>,
{
    if !handle.contains(D, codim) {
        return Ok(());
    }
    let class = LinkClass::from(iface);
    let (send_list, recv_list) = match dir {
        CommDirection::Forward => (level.send_list(codim, class)?, level.recv_list(codim, class)?),
        CommDirection::Backward => (level.recv_list(codim, class)?, level.send_list(codim, class)?),
    };
    let lvl = level.level();
    let entities = |(component, is): &(usize, &Intersection<D>)| {
        entities_of(lvl, codim, *component, is.range)
    };

    log::debug!(
        "[{}] communicate level {lvl} codim {codim} {iface:?} {dir:?}: {} sends, {} recvs",
        torus.rank(),
        send_list.len(),
        recv_list.len()
    );

    let fixed = handle.fixed_size(D, codim);

    // Phase 1: value counts.
    let (send_total, recv_sizes): (Vec<usize>, Vec<Vec<usize>>) = if fixed {
        let per_entity = |link: &(usize, &Intersection<D>)| {
            entities(link)
                .next()
                .map_or(0, |e| handle.size(&e) * link.1.range.total_size())
        };
        let send_total = send_list.iter().map(|l| per_entity(l)).collect();
        let recv_sizes = recv_list.iter().map(|l| vec![per_entity(l)]).collect();
        (send_total, recv_sizes)
    } else {
        let mut round = torus.round();
        let mut send_total = Vec::with_capacity(send_list.len());
        for link in &send_list {
            let sizes: Vec<usize> = entities(link).map(|e| handle.size(&e)).collect();
            send_total.push(sizes.iter().sum());
            round.send(link.1.rank, encode_sizes(&sizes));
        }
        for (_, is) in &recv_list {
            round.recv(is.rank, is.range.total_size() * std::mem::size_of::<WireSize>());
        }
        let recv_sizes = round.exchange()?.iter().map(|b| decode_sizes(b)).collect();
        (send_total, recv_sizes)
    };

    // Phase 2: payload.
    let value_len = std::mem::size_of::<H::Data>();
    let mut round = torus.round();
    for (link, &total) in send_list.iter().zip(&send_total) {
        let mut buf = MessageBuffer::with_capacity(total);
        for e in entities(link) {
            handle.gather(&mut buf, &e);
        }
        round.send(link.1.rank, Bytes::copy_from_slice(cast_slice(buf.as_slice())));
    }
    for ((_, is), sizes) in recv_list.iter().zip(&recv_sizes) {
        round.recv(is.rank, sizes.iter().sum::<usize>() * value_len);
    }
    let received = round.exchange()?;

    for ((link, sizes), bytes) in recv_list.iter().zip(&recv_sizes).zip(&received) {
        let mut buf = MessageBuffer::from_vec(decode_vec::<H::Data>(bytes));
        if fixed {
            let mut it = entities(link).peekable();
            let n = it.peek().map_or(0, |e| handle.size(e));
            for e in it {
                handle.scatter(&mut buf, &e, n);
            }
        } else {
            for (e, &n) in entities(link).zip(sizes) {
                handle.scatter(&mut buf, &e, n);
            }
        }
    }
    Ok(())
}

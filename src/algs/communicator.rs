//! Thin façade over serial, intra-process or inter-process (MPI) message passing.
//!
//! Messages are contiguous byte buffers. A grid never talks to a transport
//! directly; it batches the sends and receives of one communication round
//! and hands them to [`Communicator::exchange`], which returns once every
//! transfer of the round has completed.
//!
//! Matching rule: messages between one (source, destination, tag) triple are
//! delivered in the order they were posted, and receives posted for that
//! triple consume them in posting order. Every backend honours this; the
//! neighbor lists of a grid level are built to rely on nothing else.

use crate::grid_error::GridError;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Message tag of a communication round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    #[inline]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// An outgoing message.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub peer: usize,
    pub payload: Bytes,
}

/// A posted receive: who from, and how many bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expect {
    pub peer: usize,
    pub len: usize,
}

/// Blocking round-based communication interface.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Post all `sends` and `recvs` of one round and wait for completion.
    ///
    /// Returns the received buffers in the order of `recvs`.
    fn exchange(
        &self,
        tag: CommTag,
        sends: Vec<Envelope>,
        recvs: &[Expect],
    ) -> Result<Vec<Bytes>, GridError>;

    /// Collect `local` from every rank, indexed by rank. All ranks must pass
    /// buffers of the same length.
    fn all_gather(&self, tag: CommTag, local: &[u8]) -> Result<Vec<Bytes>, GridError> {
        let payload = Bytes::copy_from_slice(local);
        let sends = (0..self.size())
            .map(|peer| Envelope {
                peer,
                payload: payload.clone(),
            })
            .collect();
        let recvs: Vec<_> = (0..self.size())
            .map(|peer| Expect {
                peer,
                len: local.len(),
            })
            .collect();
        self.exchange(tag, sends, &recvs)
    }
}

fn check_len(peer: usize, got: &Bytes, expected: usize) -> Result<(), GridError> {
    if got.len() == expected {
        Ok(())
    } else {
        Err(GridError::CommError {
            neighbor: peer,
            reason: format!("expected {expected} bytes, got {}", got.len()),
        })
    }
}

/// Bytes landed in a receive buffer posted for `expected` bytes, of which
/// the transport reports `count` as written.
#[cfg_attr(not(feature = "mpi-support"), allow(dead_code))]
fn received(
    peer: usize,
    mut buf: Vec<u8>,
    count: usize,
    expected: usize,
) -> Result<Bytes, GridError> {
    buf.truncate(count);
    let got = Bytes::from(buf);
    check_len(peer, &got, expected)?;
    Ok(got)
}

/// Single-process communicator. Only messages to self are legal; they are
/// matched to receives in posting order.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(
        &self,
        _tag: CommTag,
        sends: Vec<Envelope>,
        recvs: &[Expect],
    ) -> Result<Vec<Bytes>, GridError> {
        let mut queue = VecDeque::with_capacity(sends.len());
        for env in sends {
            if env.peer != 0 {
                return Err(GridError::CommError {
                    neighbor: env.peer,
                    reason: "serial communicator can only send to rank 0".into(),
                });
            }
            queue.push_back(env.payload);
        }
        let mut out = Vec::with_capacity(recvs.len());
        for e in recvs {
            let got = queue
                .pop_front()
                .filter(|_| e.peer == 0)
                .ok_or_else(|| GridError::CommError {
                    neighbor: e.peer,
                    reason: "no matching message".into(),
                })?;
            check_len(e.peer, &got, e.len)?;
            out.push(got);
        }
        Ok(out)
    }
}

// --- LocalComm: intra-process, one thread per rank ---
type Key = (usize, usize, u16); // (src, dst, tag)

/// Shared message store of a [`LocalComm`] group.
#[derive(Debug, Default)]
pub struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
}

impl Mailbox {
    fn post(&self, key: Key, payload: Bytes) {
        self.slots.entry(key).or_default().push_back(payload);
    }

    fn take(&self, key: Key) -> Bytes {
        loop {
            if let Some(bytes) = self.slots.get_mut(&key).and_then(|mut q| q.pop_front()) {
                return bytes;
            }
            std::thread::yield_now();
        }
    }
}

/// In-process loopback transport: N ranks on N threads sharing a [`Mailbox`].
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl LocalComm {
    pub fn new(rank: usize, size: usize, mailbox: Arc<Mailbox>) -> Self {
        Self {
            rank,
            size,
            mailbox,
        }
    }

    /// One communicator per rank, all sharing a fresh mailbox.
    pub fn group(size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| Self::new(rank, size, mailbox.clone()))
            .collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(
        &self,
        tag: CommTag,
        sends: Vec<Envelope>,
        recvs: &[Expect],
    ) -> Result<Vec<Bytes>, GridError> {
        for env in sends {
            if env.peer >= self.size {
                return Err(GridError::CommError {
                    neighbor: env.peer,
                    reason: format!("rank out of range for a group of {}", self.size),
                });
            }
            self.mailbox
                .post((self.rank, env.peer, tag.as_u16()), env.payload);
        }
        let mut out = Vec::with_capacity(recvs.len());
        for e in recvs {
            let got = self.mailbox.take((e.peer, self.rank, tag.as_u16()));
            check_len(e.peer, &got, e.len)?;
            out.push(got);
        }
        Ok(out)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// Communicator over an MPI process group.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self { world, rank, size }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn exchange(
            &self,
            tag: CommTag,
            sends: Vec<Envelope>,
            recvs: &[Expect],
        ) -> Result<Vec<Bytes>, GridError> {
            let tag = tag.as_u16() as i32;
            let mut bufs: Vec<Vec<u8>> = recvs.iter().map(|e| vec![0u8; e.len]).collect();
            let counts = mpi::request::scope(|scope| {
                let mut recv_reqs = Vec::with_capacity(recvs.len());
                for (buf, e) in bufs.iter_mut().zip(recvs) {
                    recv_reqs.push(
                        self.world
                            .process_at_rank(e.peer as i32)
                            .immediate_receive_into_with_tag(scope, &mut buf[..], tag),
                    );
                }
                let mut send_reqs = Vec::with_capacity(sends.len());
                for env in &sends {
                    send_reqs.push(
                        self.world
                            .process_at_rank(env.peer as i32)
                            .immediate_send_with_tag(scope, &env.payload[..], tag),
                    );
                }
                let counts: Vec<usize> = recv_reqs
                    .into_iter()
                    .map(|req| req.wait().count(u8::equivalent_datatype()).max(0) as usize)
                    .collect();
                for req in send_reqs {
                    req.wait();
                }
                counts
            });
            bufs.into_iter()
                .zip(counts)
                .zip(recvs)
                .map(|((buf, count), e)| received(e.peer, buf, count, e.len))
                .collect()
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

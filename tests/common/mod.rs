#![allow(dead_code)]

use yasp_grid::algs::communicator::LocalComm;
use yasp_grid::algs::data_handle::{DataHandle, MessageBuffer};
use yasp_grid::data::coordinates::EquidistantCoordinates;
use yasp_grid::grid::entity::Entity;
use yasp_grid::grid::level::GridLevel;

/// Run `f` once per rank of an `n`-rank [`LocalComm`] group, each on its own
/// thread, and collect the results by rank.
pub fn run_ranks<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(LocalComm) -> T + Sync,
{
    std::thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = LocalComm::group(n)
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank panicked"))
            .collect()
    })
}

/// One `f64` per entity of a single codimension, stored by level index.
pub struct Field<'g, const D: usize> {
    pub level: &'g GridLevel<D, EquidistantCoordinates<D>>,
    pub codim: usize,
    pub values: Vec<f64>,
    /// Add incoming values instead of overwriting.
    pub accumulate: bool,
}

impl<'g, const D: usize> Field<'g, D> {
    pub fn new(level: &'g GridLevel<D, EquidistantCoordinates<D>>, codim: usize, init: f64) -> Self {
        let n = level.size(codim).unwrap();
        Self {
            level,
            codim,
            values: vec![init; n],
            accumulate: false,
        }
    }

    pub fn get(&self, e: &Entity<D>) -> f64 {
        self.values[self.level.index(e).unwrap()]
    }

    pub fn set(&mut self, e: &Entity<D>, v: f64) {
        let i = self.level.index(e).unwrap();
        self.values[i] = v;
    }
}

impl<const D: usize> DataHandle<D> for Field<'_, D> {
    type Data = f64;

    fn contains(&self, _dim: usize, codim: usize) -> bool {
        codim == self.codim
    }

    fn fixed_size(&self, _dim: usize, _codim: usize) -> bool {
        true
    }

    fn size(&self, _entity: &Entity<D>) -> usize {
        1
    }

    fn gather(&mut self, buf: &mut MessageBuffer<f64>, entity: &Entity<D>) {
        buf.write(self.get(entity));
    }

    fn scatter(&mut self, buf: &mut MessageBuffer<f64>, entity: &Entity<D>, n: usize) {
        assert_eq!(n, 1);
        let v = buf.read().expect("message too short");
        let i = self.level.index(entity).unwrap();
        if self.accumulate {
            self.values[i] += v;
        } else {
            self.values[i] = v;
        }
    }
}

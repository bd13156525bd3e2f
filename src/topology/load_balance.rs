//! Choice of the logical process grid.
//!
//! A [`LoadBalance`] strategy decides how many processes go along each axis.
//! Strategies are passed explicitly when a grid is built.

/// Strategy that factors a process count into a `D`-dimensional process grid.
pub trait LoadBalance<const D: usize>: Send + Sync {
    /// Processes per axis for a domain of `size` cells on `procs` processes.
    /// The product of the result must equal `procs`.
    fn process_dims(&self, size: [usize; D], procs: usize) -> [usize; D];
}

/// Picks the factorisation that minimises the largest cells-per-process
/// ratio over all axes. Axes whose cell count is not divisible by their
/// process count are penalised threefold.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLoadBalance;

impl DefaultLoadBalance {
    fn measure<const D: usize>(size: &[usize; D], dims: &[usize; D]) -> f64 {
        let mut worst = -1.0f64;
        for k in 0..D {
            let mut m = size[k] as f64 / dims[k] as f64;
            if size[k] % dims[k] != 0 {
                m *= 3.0;
            }
            worst = worst.max(m);
        }
        worst
    }

    fn search<const D: usize>(
        axis: usize,
        size: &[usize; D],
        procs: usize,
        trial: &mut [usize; D],
        best: &mut ([usize; D], f64),
    ) {
        if axis == 0 {
            trial[0] = procs;
            let m = Self::measure(size, trial);
            if m < best.1 {
                *best = (*trial, m);
            }
            return;
        }
        for k in (1..=procs).filter(|k| procs % k == 0) {
            trial[axis] = k;
            Self::search(axis - 1, size, procs / k, trial, best);
        }
    }
}

impl<const D: usize> LoadBalance<D> for DefaultLoadBalance {
    fn process_dims(&self, size: [usize; D], procs: usize) -> [usize; D] {
        if D == 0 {
            return [1; D];
        }
        let mut trial = [1; D];
        let mut best = ([1; D], f64::INFINITY);
        Self::search(D - 1, &size, procs.max(1), &mut trial, &mut best);
        best.0
    }
}

/// Puts every process along one axis.
#[derive(Clone, Copy, Debug)]
pub struct SlabLoadBalance {
    pub axis: usize,
}

impl<const D: usize> LoadBalance<D> for SlabLoadBalance {
    fn process_dims(&self, _size: [usize; D], procs: usize) -> [usize; D] {
        let mut dims = [1; D];
        if let Some(d) = dims.get_mut(self.axis) {
            *d = procs;
        }
        dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_domain_gets_square_process_grid() {
        let dims = DefaultLoadBalance.process_dims([64, 64], 4);
        assert_eq!(dims, [2, 2]);
    }

    #[test]
    fn elongated_domain_is_cut_across_its_long_axis() {
        let dims = DefaultLoadBalance.process_dims([128, 8], 4);
        assert_eq!(dims, [4, 1]);
    }

    #[test]
    fn product_always_matches() {
        for p in 1..=12 {
            let d = DefaultLoadBalance.process_dims([30, 20, 10], p);
            assert_eq!(d.iter().product::<usize>(), p);
        }
    }

    #[test]
    fn slab_strategy() {
        let d: [usize; 3] = SlabLoadBalance { axis: 1 }.process_dims([4, 4, 4], 3);
        assert_eq!(d, [1, 3, 1]);
    }
}

//! The structured parallel grid.
//!
//! A [`YaspGrid`] is a hierarchy of [`GridLevel`]s over one [`Torus`]. The
//! coarse level is split among the processes; each further level bisects
//! every cell of the previous one. Levels are only ever appended or removed
//! at the fine end.

use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::data_handle::DataHandle;
use crate::algs::halo_exchange::communicate_codim;
use crate::data::coordinates::{
    CoordinateContainer, EquidistantCoordinates, TensorProductCoordinates, check_monotonic,
};
use crate::grid::config::GridConfig;
use crate::grid::entity::Entity;
use crate::grid::level::{GridLevel, LevelLayout};
use crate::grid::partition::{CommDirection, InterfaceType, PartitionType};
use crate::grid_error::GridError;
use crate::topology::load_balance::{DefaultLoadBalance, LoadBalance};
use crate::topology::torus::{GRID_TAG, Torus};
use log::{debug, warn};
use std::fmt;

/// Upper bound on the number of levels of one grid.
pub const MAX_LEVELS: usize = 32;

/// Structured grid over `D` axes with coordinates `C`, distributed over the
/// processes of `M`.
pub struct YaspGrid<const D: usize, C, M: Communicator = NoComm> {
    torus: Torus<D, M>,
    levels: Vec<GridLevel<D, C>>,
    periodic: [bool; D],
    coarse_size: [usize; D],
    keep_physical_overlap: bool,
    adapt_ref_count: i32,
    adapt_active: bool,
    boundary_segments: usize,
}

/// Grid with a constant mesh width per axis.
pub type EquidistantGrid<const D: usize, M = NoComm> = YaspGrid<D, EquidistantCoordinates<D>, M>;

/// Grid with arbitrary coordinates per axis.
pub type TensorProductGrid<const D: usize, M = NoComm> =
    YaspGrid<D, TensorProductCoordinates<D>, M>;

impl<const D: usize, M: Communicator> YaspGrid<D, EquidistantCoordinates<D>, M> {
    /// Domain `[0, lengths]` split into `cells` coarse cells.
    pub fn equidistant(
        comm: M,
        lengths: [f64; D],
        cells: [usize; D],
        periodic: [bool; D],
        overlap: usize,
        lb: &dyn LoadBalance<D>,
    ) -> Result<Self, GridError> {
        if let Some(axis) = (0..D).find(|&i| !(lengths[i] > 0.0)) {
            return Err(GridError::InvalidConfig(format!(
                "length along axis {axis} must be positive, got {}",
                lengths[axis]
            )));
        }
        Self::setup(comm, cells, periodic, overlap, lb, |layout| {
            let mut origin = [0.0; D];
            let mut h = [0.0; D];
            let mut size = [0; D];
            for i in 0..D {
                h[i] = lengths[i] / cells[i] as f64;
                origin[i] = layout.overlap_origin(i) as f64 * h[i];
                size[i] = layout.overlap_cells(i);
            }
            Ok(EquidistantCoordinates::new(origin, h, size))
        })
    }

    /// Build from a [`GridConfig`].
    pub fn from_config(comm: M, cfg: &GridConfig, lb: &dyn LoadBalance<D>) -> Result<Self, GridError> {
        let (lengths, cells, periodic) = cfg.validate::<D>()?;
        let mut grid = Self::equidistant(comm, lengths, cells, periodic, cfg.overlap, lb)?;
        grid.keep_physical_overlap = cfg.keep_physical_overlap;
        Ok(grid)
    }
}

impl<const D: usize> YaspGrid<D, EquidistantCoordinates<D>, NoComm> {
    /// Single-process equidistant grid.
    pub fn sequential(
        lengths: [f64; D],
        cells: [usize; D],
        periodic: [bool; D],
        overlap: usize,
    ) -> Result<Self, GridError> {
        Self::equidistant(NoComm, lengths, cells, periodic, overlap, &DefaultLoadBalance)
    }
}

impl<const D: usize, M: Communicator> YaspGrid<D, TensorProductCoordinates<D>, M> {
    /// Grid whose coarse vertices along axis `i` are `coords[i]`.
    ///
    /// Along periodic axes the coordinates are continued beyond the domain
    /// by whole domain lengths.
    pub fn tensor_product(
        comm: M,
        coords: [Vec<f64>; D],
        periodic: [bool; D],
        overlap: usize,
        lb: &dyn LoadBalance<D>,
    ) -> Result<Self, GridError> {
        check_monotonic(&coords)?;
        let cells: [usize; D] = std::array::from_fn(|i| coords[i].len() - 1);
        Self::setup(comm, cells, periodic, overlap, lb, |layout| {
            let local: [Vec<f64>; D] = std::array::from_fn(|i| {
                let c = &coords[i];
                let n = cells[i] as i64;
                let length = c[cells[i]] - c[0];
                let first = layout.overlap_origin(i);
                (first..=first + layout.overlap_cells(i) as i64)
                    .map(|g| c[g.rem_euclid(n) as usize] + g.div_euclid(n) as f64 * length)
                    .collect()
            });
            TensorProductCoordinates::try_new(local, std::array::from_fn(|i| layout.overlap_origin(i)))
        })
    }
}

impl<const D: usize> YaspGrid<D, TensorProductCoordinates<D>, NoComm> {
    /// Single-process tensor-product grid.
    pub fn sequential_tensor(
        coords: [Vec<f64>; D],
        periodic: [bool; D],
        overlap: usize,
    ) -> Result<Self, GridError> {
        Self::tensor_product(NoComm, coords, periodic, overlap, &DefaultLoadBalance)
    }
}

impl<const D: usize, C: CoordinateContainer<D>, M: Communicator> YaspGrid<D, C, M> {
    fn setup(
        comm: M,
        cells: [usize; D],
        periodic: [bool; D],
        overlap: usize,
        lb: &dyn LoadBalance<D>,
        make_coords: impl FnOnce(&LevelLayout<D>) -> Result<C, GridError>,
    ) -> Result<Self, GridError> {
        if let Some(axis) = (0..D).find(|&i| cells[i] == 0) {
            return Err(GridError::EmptyDomain { axis });
        }
        let torus = Torus::new(comm, GRID_TAG, cells, lb)?;
        for axis in 0..D {
            // only axes with neighbors carry an overlap
            if torus.dim(axis) > 1 || periodic[axis] {
                let min_extent = cells[axis] / torus.dim(axis);
                if overlap > min_extent {
                    return Err(GridError::OverlapTooWide {
                        axis,
                        overlap,
                        min_extent,
                    });
                }
            }
            if periodic[axis] && overlap == 0 {
                warn!("periodic axis {axis} has no overlap; nothing wraps around");
            }
        }

        let (interior_origin, interior_size, imbalance) = torus.partition([0; D], cells);
        let imbalance = torus.global_max_f64(imbalance)?;
        debug!(
            "[{}] {} processes as {:?}, load imbalance {:.3}",
            torus.rank(),
            torus.procs(),
            torus.dims(),
            imbalance
        );

        let layout = LevelLayout {
            periodic,
            global_size: cells,
            interior_origin,
            interior_size,
            overlap,
        };
        let coords = make_coords(&layout)?;
        let level = GridLevel::build(0, coords, layout, &torus)?;

        let mut grid = Self {
            torus,
            levels: vec![level],
            periodic,
            coarse_size: cells,
            keep_physical_overlap: true,
            adapt_ref_count: 0,
            adapt_active: false,
            boundary_segments: 0,
        };
        grid.boundary_segments = grid.count_boundary_segments()?;
        Ok(grid)
    }

    /// Coarse cell faces on the physical boundary within the overlap.
    fn count_boundary_segments(&self) -> Result<usize, GridError> {
        let cells = &self.levels[0].components(0)?[0].ranges().overlap;
        let size = cells.size();
        let mut total = 0;
        for k in 0..D {
            if self.periodic[k] {
                continue;
            }
            let sides = usize::from(cells.origin()[k] == 0)
                + usize::from(cells.end(k) == self.coarse_size[k] as i64);
            let face: usize = (0..D).filter(|&l| l != k).map(|l| size[l] as usize).product();
            total += sides * face;
        }
        Ok(total)
    }

    pub fn torus(&self) -> &Torus<D, M> {
        &self.torus
    }

    pub fn comm(&self) -> &M {
        self.torus.comm()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        D
    }

    /// Index of the finest level.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, level: usize) -> Result<&GridLevel<D, C>, GridError> {
        self.levels.get(level).ok_or(GridError::LevelOutOfRange {
            level,
            max_level: self.max_level(),
        })
    }

    pub fn levels(&self) -> &[GridLevel<D, C>] {
        &self.levels
    }

    fn finest(&self) -> &GridLevel<D, C> {
        &self.levels[self.levels.len() - 1]
    }

    /// Cells of the whole domain along `axis` on `level`.
    pub fn level_size(&self, level: usize, axis: usize) -> Result<usize, GridError> {
        Ok(self.level(level)?.global_size()[axis])
    }

    /// Cells of the whole domain along `axis` on the finest level.
    pub fn global_size(&self, axis: usize) -> usize {
        self.finest().global_size()[axis]
    }

    pub fn is_periodic(&self, axis: usize) -> bool {
        self.periodic[axis]
    }

    pub fn overlap_size(&self, level: usize) -> Result<usize, GridError> {
        Ok(self.level(level)?.overlap())
    }

    /// Stored entities of `codim` on `level`.
    pub fn size(&self, level: usize, codim: usize) -> Result<usize, GridError> {
        self.level(level)?.size(codim)
    }

    pub fn entities(
        &self,
        level: usize,
        codim: usize,
        partition: PartitionType,
    ) -> Result<impl Iterator<Item = Entity<D>> + '_, GridError> {
        self.level(level)?.entities(codim, partition)
    }

    pub fn index(&self, entity: &Entity<D>) -> Option<usize> {
        self.levels.get(entity.level)?.index(entity)
    }

    pub fn center(&self, entity: &Entity<D>) -> Result<[f64; D], GridError> {
        Ok(self.level(entity.level)?.center(entity))
    }

    pub fn num_boundary_segments(&self) -> usize {
        self.boundary_segments
    }

    /// Whether refinement doubles the overlap (keeping its physical width)
    /// or keeps its cell count.
    pub fn refine_options(&mut self, keep_physical_overlap: bool) {
        self.keep_physical_overlap = keep_physical_overlap;
    }

    pub fn keep_physical_overlap(&self) -> bool {
        self.keep_physical_overlap
    }

    /// Add `ref_count` finer levels, or remove `-ref_count` levels when
    /// negative. Collective.
    pub fn global_refine(&mut self, ref_count: i32) -> Result<(), GridError> {
        if ref_count < 0 {
            let requested = ref_count.unsigned_abs() as usize;
            let available = self.max_level();
            if requested > available {
                return Err(GridError::CoarsenTooFar {
                    requested,
                    available,
                });
            }
            self.levels.truncate(self.levels.len() - requested);
            debug!(
                "[{}] coarsened by {requested}, max level now {}",
                self.torus.rank(),
                self.max_level()
            );
            return Ok(());
        }

        for _ in 0..ref_count {
            if self.levels.len() >= MAX_LEVELS {
                return Err(GridError::TooManyLevels { max: MAX_LEVELS });
            }
            let coarse = self.finest();
            let keep = self.keep_physical_overlap;
            let overlap = if keep {
                2 * coarse.overlap()
            } else {
                coarse.overlap()
            };
            let coords = coarse.coords().refine(
                coarse.overlap_low(),
                coarse.overlap_up(),
                keep,
                coarse.overlap(),
            );
            let layout = LevelLayout {
                periodic: self.periodic,
                global_size: coarse.global_size().map(|n| 2 * n),
                interior_origin: coarse.interior_origin().map(|o| 2 * o),
                interior_size: coarse.interior_size().map(|s| 2 * s),
                overlap,
            };
            let fine = GridLevel::build(coarse.level() + 1, coords, layout, &self.torus)?;
            self.levels.push(fine);
            debug!(
                "[{}] refined to level {} (overlap {overlap})",
                self.torus.rank(),
                self.max_level()
            );
        }
        Ok(())
    }

    /// Record a refinement request for `entity`. Only entities of the
    /// finest level can be marked; the grid refines or coarsens as a whole
    /// by the largest requested count. Marks are refused while an
    /// adaptation cycle is in progress.
    pub fn mark(&mut self, ref_count: i32, entity: &Entity<D>) -> bool {
        if self.adapt_active || entity.level != self.max_level() {
            return false;
        }
        self.adapt_ref_count = self.adapt_ref_count.max(ref_count);
        true
    }

    pub fn get_mark(&self, entity: &Entity<D>) -> i32 {
        if entity.level == self.max_level() {
            self.adapt_ref_count
        } else {
            0
        }
    }

    /// Agree on the refinement count across all processes (the smallest
    /// request wins). Returns whether the grid will coarsen. Collective.
    pub fn pre_adapt(&mut self) -> Result<bool, GridError> {
        self.adapt_active = true;
        let agreed = self.torus.global_min_i64(i64::from(self.adapt_ref_count))?;
        self.adapt_ref_count = agreed as i32;
        Ok(self.adapt_ref_count < 0)
    }

    /// Apply the agreed refinement. Returns whether new levels were added.
    pub fn adapt(&mut self) -> Result<bool, GridError> {
        self.global_refine(self.adapt_ref_count)?;
        Ok(self.adapt_ref_count > 0)
    }

    pub fn post_adapt(&mut self) {
        self.adapt_active = false;
        self.adapt_ref_count = 0;
    }

    /// Is an adaptation cycle between [`pre_adapt`](Self::pre_adapt) and
    /// [`post_adapt`](Self::post_adapt) in progress?
    pub fn adapt_active(&self) -> bool {
        self.adapt_active
    }

    /// Halo exchange of every codimension `handle` contains, from
    /// vertices up to cells. Collective.
    pub fn communicate<H: DataHandle<D>>(
        &self,
        handle: &mut H,
        iface: InterfaceType,
        dir: CommDirection,
        level: usize,
    ) -> Result<(), GridError> {
        for codim in (0..=D).rev() {
            self.communicate_codim(handle, iface, dir, level, codim)?;
        }
        Ok(())
    }

    /// Halo exchange of a single codimension. Collective.
    pub fn communicate_codim<H: DataHandle<D>>(
        &self,
        handle: &mut H,
        iface: InterfaceType,
        dir: CommDirection,
        level: usize,
        codim: usize,
    ) -> Result<(), GridError> {
        let lvl = self.level(level)?;
        communicate_codim(&self.torus, lvl, codim, iface, dir, handle)
    }
}

impl<const D: usize, C, M: Communicator> fmt::Display for YaspGrid<D, C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}]: YaspGrid<{D}> coarse size {:?} periodic {:?} max level {}",
            self.torus.rank(),
            self.coarse_size,
            self.periodic,
            self.levels.len() - 1
        )?;
        write!(f, "{}", self.torus)?;
        for level in &self.levels {
            write!(f, "{level}")?;
        }
        Ok(())
    }
}

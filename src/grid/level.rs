//! One level of the grid hierarchy.
//!
//! A [`GridLevel`] owns the coordinate container of the cells stored on this
//! process and, per codimension and orientation, four nested index ranges:
//!
//! ```text
//! overlap_front  ⊇  overlap  ⊇  interior_border  ⊇  interior
//! ```
//!
//! plus the send/receive intersections of the four [`LinkClass`] pairs with
//! every neighbor process. Levels are immutable once built; refinement
//! builds a new level from the coordinates of the previous one.

use crate::algs::communicator::Communicator;
use crate::algs::intersections::{Intersection, Links, compute_intersections};
use crate::data::coordinates::CoordinateContainer;
use crate::grid::entity::Entity;
use crate::grid::partition::{LinkClass, PartitionType};
use crate::grid_error::GridError;
use crate::topology::index_range::IndexRange;
use crate::topology::shift::{Shift, entity_shifts};
use crate::topology::torus::Torus;
use itertools::Itertools;
use std::fmt;

/// Where this process's cells sit on one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelLayout<const D: usize> {
    pub periodic: [bool; D],
    /// Cells of the whole domain on this level.
    pub global_size: [usize; D],
    /// First interior cell of this process.
    pub interior_origin: [i64; D],
    /// Interior cells of this process.
    pub interior_size: [usize; D],
    /// Ghost layers on every side that has a neighbor.
    pub overlap: usize,
}

impl<const D: usize> LevelLayout<D> {
    /// Is there an overlap region below the interior along `axis`?
    pub fn overlap_low(&self, axis: usize) -> bool {
        self.periodic[axis] || self.interior_origin[axis] > 0
    }

    /// Is there an overlap region above the interior along `axis`?
    pub fn overlap_up(&self, axis: usize) -> bool {
        self.periodic[axis]
            || self.interior_origin[axis] + (self.interior_size[axis] as i64)
                < self.global_size[axis] as i64
    }

    /// First stored cell along `axis`.
    pub fn overlap_origin(&self, axis: usize) -> i64 {
        let low = if self.overlap_low(axis) { self.overlap } else { 0 };
        self.interior_origin[axis] - low as i64
    }

    /// Stored cells (interior plus overlap) along `axis`.
    pub fn overlap_cells(&self, axis: usize) -> usize {
        let mut n = self.interior_size[axis];
        if self.overlap_low(axis) {
            n += self.overlap;
        }
        if self.overlap_up(axis) {
            n += self.overlap;
        }
        n
    }

    /// The four nested ranges of one orientation.
    pub fn partition_ranges(&self, shift: Shift) -> PartitionRanges<D> {
        let ov = self.overlap as i64;
        let mut o = [0i64; D];
        let mut s = [0i64; D];
        for i in 0..D {
            o[i] = self.overlap_origin(i);
            s[i] = self.overlap_cells(i) as i64 + i64::from(!shift.is_set(i));
        }
        let overlap_front = IndexRange::new(o, s, shift);

        for i in 0..D {
            if !shift.is_set(i) {
                if self.overlap_low(i) {
                    o[i] += 1;
                    s[i] -= 1;
                }
                if self.overlap_up(i) {
                    s[i] -= 1;
                }
            }
        }
        let overlap = IndexRange::new(o, s, shift);

        for i in 0..D {
            // vertices on the overlap boundary are border, not overlap
            let trim = ov - i64::from(!shift.is_set(i));
            if self.overlap_low(i) {
                o[i] += trim;
                s[i] -= trim;
            }
            if self.overlap_up(i) {
                s[i] -= trim;
            }
        }
        let interior_border = IndexRange::new(o, s, shift);

        for i in 0..D {
            if !shift.is_set(i) {
                if self.overlap_low(i) {
                    o[i] += 1;
                    s[i] -= 1;
                }
                if self.overlap_up(i) {
                    s[i] -= 1;
                }
            }
        }
        let interior = IndexRange::new(o, s, shift);

        PartitionRanges {
            interior,
            interior_border,
            overlap,
            overlap_front,
        }
    }
}

/// The four nested ranges of one orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionRanges<const D: usize> {
    pub interior: IndexRange<D>,
    pub interior_border: IndexRange<D>,
    pub overlap: IndexRange<D>,
    pub overlap_front: IndexRange<D>,
}

impl<const D: usize> PartitionRanges<D> {
    /// Range visited by `partition`; `None` for ghosts.
    pub fn get(&self, partition: PartitionType) -> Option<&IndexRange<D>> {
        match partition {
            PartitionType::Interior => Some(&self.interior),
            PartitionType::InteriorBorder => Some(&self.interior_border),
            PartitionType::Overlap => Some(&self.overlap),
            PartitionType::OverlapFront | PartitionType::All => Some(&self.overlap_front),
            PartitionType::Ghost => None,
        }
    }
}

/// Ranges and neighbor links of one entity orientation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component<const D: usize> {
    shift: Shift,
    ranges: PartitionRanges<D>,
    links: [Links<D>; 4],
}

impl<const D: usize> Component<D> {
    pub fn shift(&self) -> Shift {
        self.shift
    }

    pub fn ranges(&self) -> &PartitionRanges<D> {
        &self.ranges
    }

    pub fn links(&self, class: LinkClass) -> &Links<D> {
        &self.links[class as usize]
    }
}

/// A fully built level.
#[derive(Clone, Debug)]
pub struct GridLevel<const D: usize, C> {
    level: usize,
    coords: C,
    layout: LevelLayout<D>,
    /// indexed by codimension, then orientation component
    components: Vec<Vec<Component<D>>>,
}

impl<const D: usize, C: CoordinateContainer<D>> GridLevel<D, C> {
    /// Build level `level` from `coords`, which must cover exactly the
    /// interior plus overlap cells described by `layout`.
    ///
    /// Collective over `torus`: computes the neighbor intersections of every
    /// orientation and link class.
    pub fn build<M: Communicator>(
        level: usize,
        coords: C,
        layout: LevelLayout<D>,
        torus: &Torus<D, M>,
    ) -> Result<Self, GridError> {
        for axis in 0..D {
            let expected = layout.overlap_cells(axis);
            let found = coords.size(axis);
            if found != expected {
                return Err(GridError::CoordinateMismatch {
                    axis,
                    expected,
                    found,
                });
            }
        }

        let mut components = Vec::with_capacity(D + 1);
        for codim in 0..=D {
            let mut per_codim = Vec::new();
            for shift in entity_shifts(D, codim) {
                let r = layout.partition_ranges(shift);
                let isect = |send: &IndexRange<D>, recv: &IndexRange<D>| {
                    compute_intersections(torus, &layout.periodic, &layout.global_size, send, recv)
                };
                // same order as LinkClass
                let links = [
                    isect(&r.overlap_front, &r.overlap_front)?,
                    isect(&r.overlap, &r.overlap_front)?,
                    isect(&r.interior_border, &r.interior_border)?,
                    isect(&r.interior_border, &r.overlap_front)?,
                ];
                per_codim.push(Component {
                    shift,
                    ranges: r,
                    links,
                });
            }
            components.push(per_codim);
        }

        log::debug!(
            "[{}] built level {level}: overlap={} interior origin={:?} size={:?}",
            torus.rank(),
            layout.overlap,
            layout.interior_origin,
            layout.interior_size
        );

        Ok(Self {
            level,
            coords,
            layout,
            components,
        })
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn coords(&self) -> &C {
        &self.coords
    }

    pub fn layout(&self) -> &LevelLayout<D> {
        &self.layout
    }

    #[inline]
    pub fn overlap(&self) -> usize {
        self.layout.overlap
    }

    pub fn global_size(&self) -> [usize; D] {
        self.layout.global_size
    }

    pub fn interior_origin(&self) -> [i64; D] {
        self.layout.interior_origin
    }

    pub fn interior_size(&self) -> [usize; D] {
        self.layout.interior_size
    }

    pub fn overlap_low(&self) -> [bool; D] {
        std::array::from_fn(|i| self.layout.overlap_low(i))
    }

    pub fn overlap_up(&self) -> [bool; D] {
        std::array::from_fn(|i| self.layout.overlap_up(i))
    }

    fn check_codim(codim: usize) -> Result<(), GridError> {
        if codim > D {
            Err(GridError::CodimOutOfRange { codim, dim: D })
        } else {
            Ok(())
        }
    }

    /// Orientation components of `codim`, in increasing shift order.
    pub fn components(&self, codim: usize) -> Result<&[Component<D>], GridError> {
        Self::check_codim(codim)?;
        Ok(&self.components[codim])
    }

    /// `(component, range)` of `partition` for every orientation of `codim`.
    pub fn ranges(
        &self,
        codim: usize,
        partition: PartitionType,
    ) -> Result<impl Iterator<Item = (usize, &IndexRange<D>)> + '_, GridError> {
        Ok(self
            .components(codim)?
            .iter()
            .enumerate()
            .filter_map(move |(c, comp)| comp.ranges.get(partition).map(|r| (c, r))))
    }

    /// `(component, intersection)` pairs to send for `class`.
    pub fn send_list(
        &self,
        codim: usize,
        class: LinkClass,
    ) -> Result<Vec<(usize, &Intersection<D>)>, GridError> {
        Ok(self
            .components(codim)?
            .iter()
            .enumerate()
            .flat_map(|(c, comp)| comp.links(class).send.iter().map(move |is| (c, is)))
            .collect())
    }

    /// `(component, intersection)` pairs to receive for `class`.
    pub fn recv_list(
        &self,
        codim: usize,
        class: LinkClass,
    ) -> Result<Vec<(usize, &Intersection<D>)>, GridError> {
        Ok(self
            .components(codim)?
            .iter()
            .enumerate()
            .flat_map(|(c, comp)| comp.links(class).recv.iter().map(move |is| (c, is)))
            .collect())
    }

    /// Entities of `codim` in `partition`, component by component.
    pub fn entities(
        &self,
        codim: usize,
        partition: PartitionType,
    ) -> Result<impl Iterator<Item = Entity<D>> + '_, GridError> {
        let level = self.level;
        Ok(self
            .ranges(codim, partition)?
            .flat_map(move |(component, range)| entities_of(level, codim, component, *range)))
    }

    /// Number of stored entities of `codim` over all orientations.
    pub fn size(&self, codim: usize) -> Result<usize, GridError> {
        Ok(self
            .components(codim)?
            .iter()
            .map(|c| c.ranges.overlap_front.total_size())
            .sum())
    }

    /// Consecutive index of `entity` among all stored entities of its
    /// codimension, or `None` if it does not live on this level.
    pub fn index(&self, entity: &Entity<D>) -> Option<usize> {
        if entity.level != self.level {
            return None;
        }
        let comps = self.components.get(entity.codim)?;
        let comp = comps.get(entity.component)?;
        if comp.shift != entity.shift {
            return None;
        }
        let offset: usize = comps
            .iter()
            .take(entity.component)
            .map(|c| c.ranges.overlap_front.total_size())
            .sum();
        let local = comp.ranges.overlap_front.linear_index(&entity.coord)?;
        Some(offset + local)
    }

    /// Physical center of `entity`.
    pub fn center(&self, entity: &Entity<D>) -> [f64; D] {
        std::array::from_fn(|i| {
            let local = entity.coord[i] - self.layout.overlap_origin(i);
            if entity.shift.is_set(i) {
                0.5 * (self.coords.coordinate(i, local) + self.coords.coordinate(i, local + 1))
            } else {
                self.coords.coordinate(i, local)
            }
        })
    }
}

/// Entity seeds of one range.
pub(crate) fn entities_of<const D: usize>(
    level: usize,
    codim: usize,
    component: usize,
    range: IndexRange<D>,
) -> impl Iterator<Item = Entity<D>> {
    let shift = range.shift();
    range.iter().map(move |coord| Entity {
        level,
        codim,
        component,
        shift,
        coord,
    })
}

impl<const D: usize, C> fmt::Display for GridLevel<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "level {} overlap={} interior origin={:?} size={:?}",
            self.level, self.layout.overlap, self.layout.interior_origin, self.layout.interior_size
        )?;
        for (codim, comps) in self.components.iter().enumerate() {
            for comp in comps {
                let r = &comp.ranges;
                writeln!(
                    f,
                    "  codim {codim} shift {}: of={} o={} ib={} i={}",
                    comp.shift, r.overlap_front, r.overlap, r.interior_border, r.interior
                )?;
                for class in LinkClass::ALL {
                    let links = comp.links(class);
                    if links.send.is_empty() && links.recv.is_empty() {
                        continue;
                    }
                    let show = |l: &std::collections::VecDeque<Intersection<D>>| {
                        l.iter()
                            .map(|is| format!("{}->{}", is.rank, is.range))
                            .join(" ")
                    };
                    writeln!(
                        f,
                        "    {} send [{}] recv [{}]",
                        class.name(),
                        show(&links.send),
                        show(&links.recv)
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::data::coordinates::EquidistantCoordinates;
    use crate::topology::load_balance::DefaultLoadBalance;
    use crate::topology::torus::GRID_TAG;

    fn layout_1d(periodic: bool, overlap: usize) -> LevelLayout<1> {
        LevelLayout {
            periodic: [periodic],
            global_size: [4],
            interior_origin: [0],
            interior_size: [4],
            overlap,
        }
    }

    fn serial_level(layout: LevelLayout<1>) -> GridLevel<1, EquidistantCoordinates<1>> {
        let torus = Torus::new(NoComm, GRID_TAG, layout.global_size, &DefaultLoadBalance).unwrap();
        let o = layout.overlap_origin(0) as f64 * 0.25;
        let coords = EquidistantCoordinates::new([o], [0.25], [layout.overlap_cells(0)]);
        GridLevel::build(0, coords, layout, &torus).unwrap()
    }

    #[test]
    fn no_overlap_means_one_family() {
        let level = serial_level(layout_1d(false, 0));
        for codim in 0..=1 {
            let r = level.components(codim).unwrap()[0].ranges();
            assert_eq!(r.interior, r.interior_border);
            assert_eq!(r.interior, r.overlap);
            assert_eq!(r.interior, r.overlap_front);
            for class in LinkClass::ALL {
                assert!(level.send_list(codim, class).unwrap().is_empty());
                assert!(level.recv_list(codim, class).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn periodic_overlap_wraps_to_self() {
        let level = serial_level(layout_1d(true, 1));
        let cells = level.components(0).unwrap()[0].ranges();
        assert_eq!(cells.overlap_front, IndexRange::new([-1], [6], Shift::cell(1)));
        assert_eq!(cells.interior, IndexRange::new([0], [4], Shift::cell(1)));

        let send = level.send_list(0, LinkClass::BorderFront).unwrap();
        let recv = level.recv_list(0, LinkClass::BorderFront).unwrap();
        assert_eq!(send.len(), 2);
        assert_eq!(recv.len(), 2);
        assert!(send.iter().chain(&recv).all(|(_, is)| is.rank == 0 && is.range.total_size() == 1));
        // the first cell goes where the upper ghost lives, and vice versa
        assert_eq!(send[0].1.range.origin(), [0]);
        assert_eq!(recv[0].1.range.origin(), [4]);
        assert_eq!(send[1].1.range.origin(), [3]);
        assert_eq!(recv[1].1.range.origin(), [-1]);
    }

    #[test]
    fn mismatched_coordinates_are_rejected() {
        let layout = layout_1d(true, 1);
        let torus = Torus::new(NoComm, GRID_TAG, [4], &DefaultLoadBalance).unwrap();
        let coords = EquidistantCoordinates::new([0.0], [0.25], [4]);
        let err = GridLevel::build(0, coords, layout, &torus).err();
        assert_eq!(
            err,
            Some(GridError::CoordinateMismatch {
                axis: 0,
                expected: 6,
                found: 4
            })
        );
    }

    #[test]
    fn index_and_center_of_vertices() {
        let level = serial_level(layout_1d(false, 0));
        let v: Vec<_> = level.entities(1, PartitionType::All).unwrap().collect();
        assert_eq!(v.len(), 5);
        assert_eq!(level.size(1).unwrap(), 5);
        for (k, e) in v.iter().enumerate() {
            assert_eq!(level.index(e), Some(k));
        }
        let mut wrong = v[2];
        wrong.shift = Shift::cell(1);
        assert_eq!(level.index(&wrong), None);
        assert_eq!(level.center(&v[2]), [0.5]);
        let c: Vec<_> = level.entities(0, PartitionType::Interior).unwrap().collect();
        assert_eq!(level.center(&c[0]), [0.125]);
        assert_eq!(level.entities(0, PartitionType::Ghost).unwrap().count(), 0);
    }
}

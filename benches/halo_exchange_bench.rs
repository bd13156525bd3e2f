use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use yasp_grid::algs::data_handle::{DataHandle, MessageBuffer};
use yasp_grid::data::coordinates::EquidistantCoordinates;
use yasp_grid::grid::entity::Entity;
use yasp_grid::grid::level::GridLevel;
use yasp_grid::grid::partition::{CommDirection, InterfaceType, PartitionType};
use yasp_grid::grid::yasp::EquidistantGrid;

struct Cells<'g> {
    level: &'g GridLevel<2, EquidistantCoordinates<2>>,
    values: Vec<f64>,
    variable: bool,
}

impl DataHandle<2> for Cells<'_> {
    type Data = f64;

    fn contains(&self, _dim: usize, codim: usize) -> bool {
        codim == 0
    }

    fn fixed_size(&self, _dim: usize, _codim: usize) -> bool {
        !self.variable
    }

    fn size(&self, _e: &Entity<2>) -> usize {
        1
    }

    fn gather(&mut self, buf: &mut MessageBuffer<f64>, e: &Entity<2>) {
        if let Some(i) = self.level.index(e) {
            buf.write(self.values[i]);
        }
    }

    fn scatter(&mut self, buf: &mut MessageBuffer<f64>, e: &Entity<2>, _n: usize) {
        if let (Some(i), Some(v)) = (self.level.index(e), buf.read()) {
            self.values[i] = v;
        }
    }
}

fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("halo_exchange");
    for &n in &[32usize, 128] {
        for overlap in [1usize, 2] {
            let grid =
                EquidistantGrid::<2>::sequential([1.0, 1.0], [n, n], [true, true], overlap).unwrap();
            let level = grid.level(0).unwrap();
            for variable in [false, true] {
                let mut handle = Cells {
                    level,
                    values: vec![0.0; level.size(0).unwrap()],
                    variable,
                };
                for e in level.entities(0, PartitionType::Interior).unwrap() {
                    let i = level.index(&e).unwrap();
                    handle.values[i] = (e.coord[0] + e.coord[1]) as f64;
                }
                let id = format!("n{n}_ov{overlap}_{}", if variable { "var" } else { "fixed" });
                group.bench_function(BenchmarkId::new("ib_all", id), |b| {
                    b.iter(|| {
                        grid.communicate(
                            black_box(&mut handle),
                            InterfaceType::InteriorBorderAll,
                            CommDirection::Forward,
                            0,
                        )
                        .unwrap()
                    })
                });
            }
        }
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_3d_periodic_level", |b| {
        b.iter(|| {
            EquidistantGrid::<3>::sequential([1.0; 3], black_box([16, 16, 16]), [true; 3], 1).unwrap()
        })
    });
}

criterion_group!(benches, bench_exchange, bench_build);
criterion_main!(benches);

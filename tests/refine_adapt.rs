mod common;

use common::run_ranks;
use yasp_grid::algs::communicator::{Communicator, LocalComm};
use yasp_grid::grid::config::GridConfig;
use yasp_grid::grid::partition::PartitionType;
use yasp_grid::grid::yasp::{EquidistantGrid, TensorProductGrid};
use yasp_grid::grid_error::GridError;
use yasp_grid::topology::load_balance::DefaultLoadBalance;

#[test]
fn refinement_doubles_every_interior_cell_range() {
    for keep in [true, false] {
        let sizes = run_ranks(2, move |comm: LocalComm| {
            let mut grid = EquidistantGrid::<2, LocalComm>::equidistant(
                comm,
                [1.0, 1.0],
                [6, 3],
                [false, true],
                1,
                &DefaultLoadBalance,
            )
            .unwrap();
            grid.refine_options(keep);
            grid.global_refine(1).unwrap();
            let interior = |l: usize| grid.level(l).unwrap().components(0).unwrap()[0].ranges().interior;
            let (coarse, fine) = (interior(0), interior(1));
            (coarse.size(), fine.size(), coarse.origin(), fine.origin(), grid.overlap_size(1).unwrap())
        });
        for (coarse, fine, o_coarse, o_fine, overlap) in sizes {
            assert_eq!(fine, coarse.map(|s| 2 * s));
            assert_eq!(o_fine, o_coarse.map(|o| 2 * o));
            assert_eq!(overlap, if keep { 2 } else { 1 });
        }
    }
}

#[test]
fn overlap_keeps_its_cell_count_when_asked() {
    let mut grid = EquidistantGrid::<1>::sequential([1.0], [4], [true], 1).unwrap();
    grid.refine_options(false);
    grid.global_refine(2).unwrap();
    let level = grid.level(2).unwrap();
    let front = level.components(0).unwrap()[0].ranges().overlap_front;
    assert_eq!(front.origin(), [-1]);
    assert_eq!(front.size(), [18]);
    // the first ghost cell sits one fine cell below zero
    let ghost = level.entities(0, PartitionType::All).unwrap().next().unwrap();
    assert_eq!(grid.center(&ghost).unwrap(), [-0.03125]);
}

#[test]
fn coarsening_past_level_zero_fails() {
    let mut grid = EquidistantGrid::<2>::sequential([1.0; 2], [2, 2], [false; 2], 0).unwrap();
    grid.global_refine(3).unwrap();
    assert_eq!(grid.max_level(), 3);
    assert_eq!(grid.level_size(3, 0), Ok(16));
    assert_eq!(grid.level_size(1, 1), Ok(4));
    assert_eq!(
        grid.level_size(4, 0),
        Err(GridError::LevelOutOfRange {
            level: 4,
            max_level: 3
        })
    );
    assert!(grid.level_size(64, 0).is_err());
    assert_eq!(
        grid.global_refine(-4),
        Err(GridError::CoarsenTooFar {
            requested: 4,
            available: 3
        })
    );
    assert_eq!(grid.max_level(), 3);
    grid.global_refine(-3).unwrap();
    assert_eq!(grid.max_level(), 0);
    assert_eq!(grid.global_size(0), 2);
}

#[test]
fn marks_only_count_on_the_finest_level() {
    let mut grid = EquidistantGrid::<2>::sequential([1.0; 2], [2, 2], [false; 2], 0).unwrap();
    let cell = grid.entities(0, 0, PartitionType::Interior).unwrap().next().unwrap();
    assert!(grid.mark(1, &cell));
    assert_eq!(grid.get_mark(&cell), 1);
    assert!(!grid.pre_adapt().unwrap());
    assert!(grid.adapt_active());
    // the agreed count is fixed once the cycle has started
    assert!(!grid.mark(3, &cell));
    assert_eq!(grid.get_mark(&cell), 1);
    assert!(grid.adapt().unwrap());
    grid.post_adapt();
    assert!(!grid.adapt_active());
    assert_eq!(grid.max_level(), 1);
    // level 0 is no longer the leaf level
    assert!(!grid.mark(1, &cell));
    assert_eq!(grid.get_mark(&cell), 0);
}

#[test]
fn the_smallest_request_wins_across_processes() {
    let levels = run_ranks(2, |comm: LocalComm| {
        let rank = comm.rank();
        let mut grid = EquidistantGrid::<1, LocalComm>::equidistant(
            comm,
            [1.0],
            [4],
            [false],
            0,
            &DefaultLoadBalance,
        )
        .unwrap();
        let cell = grid.entities(0, 0, PartitionType::Interior).unwrap().next().unwrap();
        if rank == 0 {
            grid.mark(1, &cell);
        }
        grid.pre_adapt().unwrap();
        let refined_once = grid.adapt().unwrap();
        grid.post_adapt();

        grid.mark(1, &cell);
        grid.pre_adapt().unwrap();
        let refined_twice = grid.adapt().unwrap();
        grid.post_adapt();
        (refined_once, refined_twice, grid.max_level())
    });
    assert_eq!(levels, vec![(false, true, 1); 2]);
}

#[test]
fn config_round_trips_through_json() {
    let cfg = GridConfig::new(vec![2.0, 1.0], vec![8, 4])
        .with_periodic(vec![true, false])
        .with_overlap(1)
        .with_keep_physical_overlap(false);
    let json = serde_json::to_string(&cfg).unwrap();
    let back: GridConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);

    let sparse: GridConfig = serde_json::from_str(r#"{"lengths":[1.0],"cells":[4]}"#).unwrap();
    assert_eq!(sparse.overlap, 0);
    assert!(sparse.keep_physical_overlap);
    assert!(sparse.periodic.is_empty());
}

#[test]
fn grid_from_config_honours_the_overlap_policy() {
    let cfg = GridConfig::new(vec![2.0, 1.0], vec![8, 4])
        .with_periodic(vec![true, false])
        .with_overlap(1)
        .with_keep_physical_overlap(false);
    let mut grid =
        EquidistantGrid::<2>::from_config(yasp_grid::algs::NoComm, &cfg, &DefaultLoadBalance)
            .unwrap();
    assert!(grid.is_periodic(0));
    assert!(!grid.is_periodic(1));
    grid.global_refine(1).unwrap();
    assert_eq!(grid.overlap_size(1).unwrap(), 1);

    let err = EquidistantGrid::<3>::from_config(yasp_grid::algs::NoComm, &cfg, &DefaultLoadBalance);
    assert!(matches!(err, Err(GridError::InvalidConfig(_))));
}

#[test]
fn tensor_product_grid_rejects_bad_coordinates() {
    let err = TensorProductGrid::<2>::sequential_tensor(
        [vec![0.0, 1.0, 0.5], vec![0.0, 1.0]],
        [false; 2],
        0,
    );
    assert!(matches!(err, Err(GridError::NonMonotonicCoordinates { axis: 0 })));
}

#[test]
fn tensor_product_centers_follow_the_coordinates() {
    let mut grid =
        TensorProductGrid::<1>::sequential_tensor([vec![0.0, 1.0, 4.0]], [false], 0).unwrap();
    grid.global_refine(1).unwrap();
    let centers: Vec<_> = grid
        .entities(1, 0, PartitionType::Interior)
        .unwrap()
        .map(|e| grid.center(&e).unwrap()[0])
        .collect();
    assert_eq!(centers, vec![0.25, 0.75, 1.75, 3.25]);
}

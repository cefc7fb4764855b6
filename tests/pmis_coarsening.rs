//! Tests for PMIS coarsening on one and several ranks

use amgcore::gallery::{classical_strength, laplacian_5pt, laplacian_7pt, uniform_row_starts};
use amgcore::{
    pmis_coarsen, AmgError, CfInit, CfMarker, CoarsenConfig, CoarsenResult, Communicator,
    LocalComm, ParCsrMatrix, PmisSelector, SerialComm, SparseMatrixCSR,
};
use proptest::prelude::*;

/// Coarsens `s` split across `ranks` ranks; returns the global markers and
/// each rank's result
fn coarsen_on_ranks(
    s: &SparseMatrixCSR<f64>,
    ranks: usize,
    config: &CoarsenConfig,
    preset: Option<&[CfMarker]>,
) -> (Vec<CfMarker>, Vec<CoarsenResult>) {
    coarsen_partitioned(s, &uniform_row_starts(s.n_rows, ranks), config, preset)
}

/// Coarsens `s` with rank `r` owning rows `starts[r]..starts[r + 1]`
fn coarsen_partitioned(
    s: &SparseMatrixCSR<f64>,
    starts: &[usize],
    config: &CoarsenConfig,
    preset: Option<&[CfMarker]>,
) -> (Vec<CfMarker>, Vec<CoarsenResult>) {
    let ranks = starts.len() - 1;

    let results = if ranks == 1 {
        let local = ParCsrMatrix::from_global(s, starts, 0).unwrap();
        vec![pmis_coarsen(&local, &SerialComm, config, &PmisSelector, preset).unwrap()]
    } else {
        LocalComm::spawn(ranks, |comm| {
            let rank = comm.rank();
            let local = ParCsrMatrix::from_global(s, starts, rank).unwrap();
            let preset = preset.map(|p| &p[starts[rank]..starts[rank + 1]]);
            pmis_coarsen(&local, &comm, config, &PmisSelector, preset).unwrap()
        })
    };

    let markers = results.iter().flat_map(|r| r.cf_marker.iter().copied()).collect();
    (markers, results)
}

/// Checks coverage, independence and domination of a split of a
/// symmetric strength graph
fn assert_valid_split(s: &SparseMatrixCSR<f64>, markers: &[CfMarker]) {
    assert_eq!(markers.len(), s.n_rows);

    for i in 0..s.n_rows {
        assert!(!markers[i].is_undecided(), "row {} left undecided", i);
        let mut neighbors = s.row_iter(i).map(|(j, _)| j).filter(|&j| j != i);

        if markers[i].is_coarse() {
            assert!(
                neighbors.all(|j| !markers[j].is_coarse()),
                "coarse row {} has a coarse neighbor",
                i
            );
        } else if markers[i] == CfMarker::Fine {
            assert!(
                neighbors.any(|j| markers[j].is_coarse()),
                "fine row {} has no coarse neighbor",
                i
            );
        }
    }
}

/// Checks coverage and that every fine row strongly depends on a coarse
/// row, unless no row depends on it at all
fn assert_fine_rows_depend_on_coarse(s: &SparseMatrixCSR<f64>, markers: &[CfMarker]) {
    let mut influenced = vec![0usize; s.n_rows];
    for &col in &s.col_idx {
        influenced[col] += 1;
    }

    for i in 0..s.n_rows {
        assert!(!markers[i].is_undecided(), "row {} left undecided", i);
        if markers[i] == CfMarker::Fine && influenced[i] > 0 {
            assert!(
                s.row_iter(i).any(|(j, _)| markers[j].is_coarse()),
                "fine row {} depends on no coarse row",
                i
            );
        }
    }
}

fn assert_graph_shrinks(results: &[CoarsenResult], n_rows: usize) {
    for result in results {
        let sizes = &result.graph_sizes;
        assert_eq!(sizes.last(), Some(&0));
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]), "graph grew: {:?}", sizes);
        assert!(result.iterations <= n_rows);
        assert_eq!(sizes.len(), result.iterations + 1);
    }
}

fn grid_strength(n: usize) -> SparseMatrixCSR<f64> {
    classical_strength(&laplacian_5pt(n, n), 0.25)
}

#[test]
fn test_grid_4x4_on_one_two_and_three_ranks() {
    let s = grid_strength(4);

    for ranks in 1..=3 {
        let (markers, results) = coarsen_on_ranks(&s, ranks, &CoarsenConfig::default(), None);

        assert_valid_split(&s, &markers);
        assert_graph_shrinks(&results, 16);
        let total_coarse: usize = results.iter().map(|r| r.num_coarse).sum();
        assert!(total_coarse > 0 && total_coarse < 16, "{} ranks: {} coarse", ranks, total_coarse);

        // Every rank sees the same global undecided counts
        for result in &results[1..] {
            assert_eq!(result.graph_sizes, results[0].graph_sizes);
        }
    }
}

#[test]
fn test_larger_3d_problem_across_ranks() {
    let s = classical_strength(&laplacian_7pt(6, 5, 4, [1.0, 1.0, 1.0]), 0.25);

    let (markers, results) = coarsen_on_ranks(&s, 3, &CoarsenConfig::default(), None);

    assert_valid_split(&s, &markers);
    assert_graph_shrinks(&results, s.n_rows);
}

#[test]
fn test_same_seed_same_split() {
    let s = grid_strength(6);
    let config = CoarsenConfig::with_seed(7);

    let (first, _) = coarsen_on_ranks(&s, 2, &config, None);
    let (second, _) = coarsen_on_ranks(&s, 2, &config, None);

    assert_eq!(first, second);
}

#[test]
fn test_preset_coarse_point_marks_neighbors_fine() {
    let s = grid_strength(4);
    let mut preset = vec![CfMarker::Undecided; 16];
    preset[5] = CfMarker::Coarse;
    let config = CoarsenConfig {
        cf_init: CfInit::Preset,
        ..CoarsenConfig::default()
    };

    for ranks in [1, 2] {
        let (markers, results) = coarsen_on_ranks(&s, ranks, &config, Some(&preset));

        assert_eq!(markers[5], CfMarker::Coarse);
        for neighbor in [1, 4, 6, 9] {
            assert_eq!(markers[neighbor], CfMarker::Fine, "{} ranks, row {}", ranks, neighbor);
        }
        assert_valid_split(&s, &markers);
        assert_eq!(results[0].graph_sizes[0], 15);
    }
}

/// Appends a row and column without any strong connection
fn with_isolated_row(s: &SparseMatrixCSR<f64>) -> SparseMatrixCSR<f64> {
    let mut row_ptr = s.row_ptr.clone();
    row_ptr.push(s.nnz());
    SparseMatrixCSR::new(s.n_rows + 1, s.n_cols + 1, row_ptr, s.col_idx.clone(), s.values.clone())
}

#[test]
fn test_isolated_rows_by_init_mode() {
    let s = with_isolated_row(&grid_strength(4));

    let (fresh, _) = coarsen_on_ranks(&s, 2, &CoarsenConfig::default(), None);
    assert_eq!(fresh[16], CfMarker::StrongFine);
    assert_valid_split(&s, &fresh);

    for code in [3, 4] {
        let config = CoarsenConfig {
            cf_init: CfInit::from_code(code).unwrap(),
            ..CoarsenConfig::default()
        };
        let (isolated_coarse, _) = coarsen_on_ranks(&s, 2, &config, None);
        assert_eq!(isolated_coarse[16], CfMarker::Coarse, "code {}", code);
        assert_valid_split(&s, &isolated_coarse);
    }
}

/// Row `i` lists the rows it strongly depends on
fn directed_graph(rows: &[&[usize]]) -> SparseMatrixCSR<f64> {
    let mut row_ptr = vec![0];
    let mut col_idx = Vec::new();
    for row in rows {
        col_idx.extend_from_slice(row);
        row_ptr.push(col_idx.len());
    }
    let nnz = col_idx.len();
    SparseMatrixCSR::new(rows.len(), rows.len(), row_ptr, col_idx, vec![1.0; nnz])
}

#[test]
fn test_row_influencing_a_coarse_point_stays_undecided() {
    // Row 2 wins the first round. Row 0 only influences it, so row 0 is
    // decided later on its own, whatever the partition.
    let s = directed_graph(&[&[1], &[2], &[0, 1, 3], &[2], &[2], &[2]]);
    let expected = vec![
        CfMarker::Coarse,
        CfMarker::Fine,
        CfMarker::Coarse,
        CfMarker::Fine,
        CfMarker::Fine,
        CfMarker::Fine,
    ];

    for starts in [vec![0, 6], vec![0, 1, 6], vec![0, 2, 4, 6]] {
        let (markers, results) = coarsen_partitioned(&s, &starts, &CoarsenConfig::default(), None);

        assert_eq!(markers, expected, "partition {:?}", starts);
        assert_fine_rows_depend_on_coarse(&s, &markers);
        assert_eq!(results[0].graph_sizes, vec![4, 1, 0]);
    }
}

#[test]
fn test_uninfluential_row_starts_fine() {
    // Row 0 depends on row 1 but no row depends on row 0
    let s = SparseMatrixCSR::new(3, 3, vec![0, 1, 2, 3], vec![1, 2, 1], vec![1.0; 3]);

    let (markers, results) = coarsen_on_ranks(&s, 1, &CoarsenConfig::default(), None);

    assert_eq!(markers[0], CfMarker::Fine);
    assert_eq!(results[0].graph_sizes[0], 2);
    assert!(markers[1].is_coarse() != markers[2].is_coarse());
}

#[test]
fn test_unknown_cf_init_code() {
    assert!(matches!(CfInit::from_code(2), Err(AmgError::InvalidCfInit(2))));
}

/// Symmetric graph on `n` vertices from an edge list, without self loops
fn symmetric_graph(n: usize, edges: &[(usize, usize)]) -> SparseMatrixCSR<f64> {
    let mut adjacency = vec![Vec::new(); n];
    for &(u, v) in edges {
        let (u, v) = (u % n, v % n);
        if u != v {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }
    }

    let mut row_ptr = vec![0];
    let mut col_idx = Vec::new();
    for mut row in adjacency {
        row.sort_unstable();
        row.dedup();
        col_idx.extend(row);
        row_ptr.push(col_idx.len());
    }
    let nnz = col_idx.len();
    SparseMatrixCSR::new(n, n, row_ptr, col_idx, vec![1.0; nnz])
}

/// Directed graph on `n` vertices from an edge list, without self loops
fn random_directed_graph(n: usize, edges: &[(usize, usize)]) -> SparseMatrixCSR<f64> {
    let mut adjacency = vec![Vec::new(); n];
    for &(u, v) in edges {
        let (u, v) = (u % n, v % n);
        if u != v {
            adjacency[u].push(v);
        }
    }
    for row in &mut adjacency {
        row.sort_unstable();
        row.dedup();
    }
    let rows: Vec<&[usize]> = adjacency.iter().map(Vec::as_slice).collect();
    directed_graph(&rows)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_random_directed_graphs_dominate_fine_rows(
        n in 1usize..40,
        edges in prop::collection::vec((0usize..40, 0usize..40), 0..120),
        ranks in 1usize..4,
        seed in any::<u64>(),
    ) {
        let s = random_directed_graph(n, &edges);
        let config = CoarsenConfig::with_seed(seed);

        let (markers, results) = coarsen_on_ranks(&s, ranks, &config, None);

        assert_fine_rows_depend_on_coarse(&s, &markers);
        assert_graph_shrinks(&results, n);
    }

    #[test]
    fn prop_random_symmetric_graphs_split_validly(
        n in 1usize..40,
        edges in prop::collection::vec((0usize..40, 0usize..40), 0..120),
        ranks in 1usize..4,
        seed in any::<u64>(),
    ) {
        let s = symmetric_graph(n, &edges);
        let config = CoarsenConfig::with_seed(seed);

        let (markers, results) = coarsen_on_ranks(&s, ranks, &config, None);

        assert_valid_split(&s, &markers);
        assert_graph_shrinks(&results, n);
        for (i, marker) in markers.iter().enumerate() {
            if s.row_nnz(i) == 0 {
                prop_assert_eq!(*marker, CfMarker::StrongFine);
            }
        }
    }
}

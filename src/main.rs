use std::process;
use std::time::Instant;

use amgcore::constants::DEFAULT_STRENGTH_THRESHOLD;
use amgcore::gallery::{classical_strength, laplacian_7pt, uniform_row_starts};
use amgcore::{
    pmis_coarsen, rap, spgemm_with_stats, CfMarker, Communicator, LocalComm, ParCsrMatrix,
    PmisSelector, Result, RuntimeConfig, RuntimeContext, SparseMatrixCSR,
};
use log::{error, info};

const GRID: usize = 24;
const RANKS: usize = 3;

/// Piecewise-constant prolongation: every fine row takes the value of the
/// first coarse point in its row of the strength graph
fn injection_prolongation(s: &SparseMatrixCSR<f64>, markers: &[CfMarker]) -> SparseMatrixCSR<f64> {
    let mut coarse_index = vec![usize::MAX; markers.len()];
    let mut n_coarse = 0;
    for (i, m) in markers.iter().enumerate() {
        if m.is_coarse() {
            coarse_index[i] = n_coarse;
            n_coarse += 1;
        }
    }

    let mut row_ptr = vec![0];
    let mut col_idx = Vec::new();
    for (i, m) in markers.iter().enumerate() {
        if m.is_coarse() {
            col_idx.push(coarse_index[i]);
        } else if let Some((j, _)) = s.row_iter(i).find(|&(j, _)| markers[j].is_coarse()) {
            col_idx.push(coarse_index[j]);
        }
        row_ptr.push(col_idx.len());
    }

    let nnz = col_idx.len();
    SparseMatrixCSR::new(markers.len(), n_coarse, row_ptr, col_idx, vec![1.0; nnz])
}

fn run(context: &RuntimeContext) -> Result<()> {
    let a = laplacian_7pt(GRID, GRID, GRID, [1.0, 1.0, 1.0]);
    let s = classical_strength(&a, DEFAULT_STRENGTH_THRESHOLD);
    let row_starts = uniform_row_starts(a.n_rows, RANKS);
    info!("7-point Laplacian: {} rows, {} nonzeros, {} ranks", a.n_rows, a.nnz(), RANKS);

    // Rank threads block in receives, so they run outside the worker pool
    let coarsen_config = context.coarsen_config();
    let start = Instant::now();
    let per_rank = LocalComm::spawn(RANKS, |comm| {
        let local = ParCsrMatrix::from_global(&s, &row_starts, comm.rank())?;
        pmis_coarsen(&local, &comm, &coarsen_config, &PmisSelector, None)
    });

    let mut markers = Vec::with_capacity(a.n_rows);
    for result in per_rank {
        let result = result?;
        info!(
            "rank coarsened in {} iterations, undecided per iteration {:?}",
            result.iterations, result.graph_sizes
        );
        markers.extend(result.cf_marker);
    }
    let n_coarse = markers.iter().filter(|m| m.is_coarse()).count();
    info!(
        "PMIS: {} coarse points out of {} ({:.1}%) in {:.2?}",
        n_coarse,
        markers.len(),
        100.0 * n_coarse as f64 / markers.len() as f64,
        start.elapsed()
    );

    let p = injection_prolongation(&s, &markers);
    let config = context.spgemm_config();

    let start = Instant::now();
    let (ap, stats) = context.install(|| spgemm_with_stats(&a, &p, &config))?;
    info!(
        "A*P: {} nonzeros, {} rows rerun, {} global slots in {:.2?}",
        ap.nnz(),
        stats.attempt2_rows,
        stats.attempt2_global_capacity,
        start.elapsed()
    );

    let start = Instant::now();
    let coarse = context.install(|| rap(&a, &p, &config))?;
    info!(
        "coarse operator: {}x{} with {} nonzeros in {:.2?}",
        coarse.n_rows,
        coarse.n_cols,
        coarse.nnz(),
        start.elapsed()
    );

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            process::exit(1);
        }
    };

    let context = match RuntimeContext::init(config) {
        Ok(context) => context,
        Err(e) => {
            error!("failed to initialize runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&context) {
        error!("{}", e);
        process::exit(1);
    }

    context.finalize();
}

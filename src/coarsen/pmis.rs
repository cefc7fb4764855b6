//! Parallel modified independent set (PMIS) coarsening driver

use log::{debug, info};
use num_traits::Num;
use rayon::prelude::*;

use super::indep_set::{IndependentSetSelector, StrengthView};
use super::measure::global_measure;
use super::{CfMarker, CoarsenResult};
use crate::comm::{exchange, Communicator};
use crate::constants::MIN_SELECTABLE_MEASURE;
use crate::error::{AmgError, Result};
use crate::matrix::config::{CfInit, CoarsenConfig};
use crate::matrix::transpose::transpose;
use crate::matrix::ParCsrMatrix;

/// Splits the rows of the strength graph `s` into coarse and fine points
///
/// Must be called on every rank of `comm` with that rank's part of the
/// same global graph. `preset` supplies the starting markers in
/// [`CfInit::Preset`] mode and is ignored otherwise.
pub fn pmis_coarsen<T, C, S>(
    s: &ParCsrMatrix<T>,
    comm: &C,
    config: &CoarsenConfig,
    selector: &S,
    preset: Option<&[CfMarker]>,
) -> Result<CoarsenResult>
where
    T: Copy + Num + Send + Sync,
    C: Communicator,
    S: IndependentSetSelector,
{
    let n_local = s.num_local_rows();
    let preset = match (config.cf_init, preset) {
        (CfInit::Preset, None) => {
            return Err(AmgError::InvalidConfig(
                "CfInit::Preset requires preset markers".to_string(),
            ))
        }
        (CfInit::Preset, Some(markers)) if markers.len() != n_local => {
            return Err(AmgError::DimensionMismatch {
                context: "pmis_coarsen preset markers",
                left: markers.len(),
                right: n_local,
            })
        }
        (CfInit::Preset, markers) => markers,
        _ => None,
    };

    let pkg = s.comm_pkg(comm)?;
    let mut measure = global_measure(s, comm, pkg, config.seed)?;
    let mut cf_marker = initial_markers(s, config.cf_init, preset, &mut measure);
    let mut cf_marker_offd: Vec<CfMarker> = exchange(comm, pkg, &cf_marker)?;
    let mut measure_offd: Vec<f64> = exchange(comm, pkg, &measure)?;

    let diag_t = transpose(s.diag(), false);
    let mut graph: Vec<usize> = (0..n_local).filter(|&i| cf_marker[i].is_undecided()).collect();

    let max_iterations = config.max_iterations.unwrap_or(s.global_num_rows() + 1);
    let mut graph_sizes = Vec::new();
    let mut iteration = 0;

    loop {
        let global_size = comm.all_reduce_sum(graph.len() as u64)?;
        graph_sizes.push(global_size);
        debug!(
            "rank {}: PMIS iteration {} with {} undecided rows ({} local)",
            comm.rank(),
            iteration,
            global_size,
            graph.len()
        );
        if global_size == 0 {
            break;
        }
        if iteration >= max_iterations {
            return Err(AmgError::NoProgress { iterations: iteration });
        }

        if config.cf_init != CfInit::Preset || iteration > 0 {
            let view = StrengthView {
                diag: s.diag(),
                diag_t: &diag_t,
                offd: s.offd(),
                first_row: s.first_row(),
                col_map_offd: s.col_map_offd(),
                measure: &measure,
                measure_offd: &measure_offd,
            };
            for row in selector.select(&view, &graph, &cf_marker) {
                cf_marker[row] = CfMarker::Coarse;
            }
            cf_marker_offd = exchange(comm, pkg, &cf_marker)?;
        }
        iteration += 1;

        update_markers(s, &graph, &mut cf_marker, &cf_marker_offd, &mut measure);
        graph.retain(|&row| cf_marker[row].is_undecided());

        measure_offd = exchange(comm, pkg, &measure)?;
    }

    let num_coarse = cf_marker.iter().filter(|m| m.is_coarse()).count();
    info!(
        "rank {}: PMIS finished after {} iterations, {} of {} local rows coarse",
        comm.rank(),
        iteration,
        num_coarse,
        n_local
    );

    Ok(CoarsenResult {
        cf_marker,
        iterations: iteration,
        graph_sizes,
        num_coarse,
    })
}

/// Initial markers; every row decided here gets measure 0
fn initial_markers<T>(
    s: &ParCsrMatrix<T>,
    mode: CfInit,
    preset: Option<&[CfMarker]>,
    measure: &mut [f64],
) -> Vec<CfMarker>
where
    T: Copy + Num + Send + Sync,
{
    let diag = s.diag();
    let offd = s.offd();

    measure
        .par_iter_mut()
        .enumerate()
        .map(|(i, m)| {
            let given = preset.map_or(CfMarker::Undecided, |p| p[i]);
            let marker = if !given.is_undecided() {
                given
            } else if diag.row_nnz(i) == 0 && offd.row_nnz(i) == 0 {
                match mode {
                    CfInit::IsolatedCoarse => CfMarker::Coarse,
                    _ => CfMarker::StrongFine,
                }
            } else if *m < MIN_SELECTABLE_MEASURE {
                CfMarker::Fine
            } else {
                CfMarker::Undecided
            };

            if !marker.is_undecided() {
                *m = 0.0;
            }
            marker
        })
        .collect()
}

/// Marks every undecided row that strongly depends on a coarse point fine
///
/// Only the row's own entries count: a row that merely influences a
/// coarse point stays undecided. Decisions are computed for all graph rows
/// against the current markers and applied afterwards.
fn update_markers<T>(
    s: &ParCsrMatrix<T>,
    graph: &[usize],
    cf_marker: &mut [CfMarker],
    cf_marker_offd: &[CfMarker],
    measure: &mut [f64],
) where
    T: Copy + Num + Send + Sync,
{
    let diag = s.diag();
    let offd = s.offd();
    let markers: &[CfMarker] = cf_marker;

    let decided: Vec<(usize, CfMarker)> = graph
        .par_iter()
        .filter_map(|&row| {
            if markers[row].is_coarse() {
                return Some((row, markers[row]));
            }
            let coarse_influence = diag
                .row_iter(row)
                .any(|(j, _)| j != row && markers[j].is_coarse())
                || offd.row_iter(row).any(|(j, _)| cf_marker_offd[j].is_coarse());
            coarse_influence.then_some((row, CfMarker::Fine))
        })
        .collect();

    for (row, marker) in decided {
        cf_marker[row] = marker;
        measure[row] = 0.0;
    }
}

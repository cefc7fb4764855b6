//! Independent set selection

use num_traits::Num;
use rayon::prelude::*;

use super::CfMarker;
use crate::matrix::SparseMatrixCSR;

/// What a selector may look at while choosing coarse points on one rank
pub struct StrengthView<'a, T> {
    /// Local block of the strength graph
    pub diag: &'a SparseMatrixCSR<T>,
    /// Pattern of the transposed local block
    pub diag_t: &'a SparseMatrixCSR<T>,
    /// Off-rank block of the strength graph
    pub offd: &'a SparseMatrixCSR<T>,
    /// Global index of local row 0
    pub first_row: usize,
    /// Global index of each off-rank column
    pub col_map_offd: &'a [usize],
    /// Measures of local rows; decided rows have measure 0
    pub measure: &'a [f64],
    /// Ghost copy of the measures of off-rank columns
    pub measure_offd: &'a [f64],
}

/// Chooses new coarse points among the undecided rows of the graph
pub trait IndependentSetSelector: Sync {
    /// Returns the rows of `graph` to mark coarse, in increasing order
    ///
    /// No two returned rows may be neighbors in the strength graph.
    fn select<T: Copy + Num + Sync>(
        &self,
        view: &StrengthView<'_, T>,
        graph: &[usize],
        cf_marker: &[CfMarker],
    ) -> Vec<usize>;
}

/// Selects every undecided row whose key beats all of its undecided
/// neighbors
///
/// The key of a row is its measure, with ties broken toward the lower
/// global index. A row is still competing exactly when its measure is
/// positive. Neighbors are the row's entries in the local and off-rank
/// blocks plus the rows of the local block that list it, so two rows of
/// one rank joined by an edge in either direction never enter the same
/// set.
#[derive(Debug, Default, Clone, Copy)]
pub struct PmisSelector;

#[inline]
fn beats(measure_j: f64, global_j: usize, measure_i: f64, global_i: usize) -> bool {
    measure_j > measure_i || (measure_j == measure_i && global_j < global_i)
}

impl IndependentSetSelector for PmisSelector {
    fn select<T: Copy + Num + Sync>(
        &self,
        view: &StrengthView<'_, T>,
        graph: &[usize],
        cf_marker: &[CfMarker],
    ) -> Vec<usize> {
        graph
            .par_iter()
            .copied()
            .filter(|&i| {
                debug_assert!(cf_marker[i].is_undecided());
                let m_i = view.measure[i];
                let g_i = view.first_row + i;

                let local_loses = view
                    .diag
                    .row_iter(i)
                    .chain(view.diag_t.row_iter(i))
                    .map(|(j, _)| j)
                    .filter(|&j| j != i)
                    .any(|j| {
                        // decided rows carry measure 0
                        debug_assert!(view.measure[j] <= 0.0 || cf_marker[j].is_undecided());
                        view.measure[j] > 0.0 && beats(view.measure[j], view.first_row + j, m_i, g_i)
                    });
                if local_loses {
                    return false;
                }

                !view
                    .offd
                    .row_iter(i)
                    .map(|(j, _)| j)
                    .any(|j| {
                        view.measure_offd[j] > 0.0
                            && beats(view.measure_offd[j], view.col_map_offd[j], m_i, g_i)
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::transpose::transpose;

    // Path 0 - 1 - 2 - 3
    fn path4() -> SparseMatrixCSR<f64> {
        SparseMatrixCSR::new(4, 4, vec![0, 1, 3, 5, 6], vec![1, 0, 2, 1, 3, 2], vec![1.0; 6])
    }

    #[test]
    fn test_local_maxima_are_selected() {
        let s = path4();
        let s_t = transpose(&s, false);
        let offd = SparseMatrixCSR::<f64>::zeros(4, 0);
        let measure = vec![1.5, 2.9, 2.1, 1.2];
        let markers = vec![CfMarker::Undecided; 4];
        let view = StrengthView {
            diag: &s,
            diag_t: &s_t,
            offd: &offd,
            first_row: 0,
            col_map_offd: &[],
            measure: &measure,
            measure_offd: &[],
        };

        let selected = PmisSelector.select(&view, &[0, 1, 2, 3], &markers);

        // row 3 loses to row 2, which itself loses to row 1
        assert_eq!(selected, vec![1]);
    }

    #[test]
    fn test_ties_go_to_lower_index() {
        let s = path4();
        let s_t = transpose(&s, false);
        let offd = SparseMatrixCSR::<f64>::zeros(4, 0);
        let measure = vec![2.0; 4];
        let markers = vec![CfMarker::Undecided; 4];
        let view = StrengthView {
            diag: &s,
            diag_t: &s_t,
            offd: &offd,
            first_row: 0,
            col_map_offd: &[],
            measure: &measure,
            measure_offd: &[],
        };

        assert_eq!(PmisSelector.select(&view, &[0, 1, 2, 3], &markers), vec![0]);
    }

    #[test]
    fn test_decided_neighbors_do_not_compete() {
        let s = path4();
        let s_t = transpose(&s, false);
        let offd = SparseMatrixCSR::<f64>::zeros(4, 0);
        let measure = vec![1.5, 0.0, 2.1, 1.2];
        let mut markers = vec![CfMarker::Undecided; 4];
        markers[1] = CfMarker::Fine;
        let view = StrengthView {
            diag: &s,
            diag_t: &s_t,
            offd: &offd,
            first_row: 0,
            col_map_offd: &[],
            measure: &measure,
            measure_offd: &[],
        };

        assert_eq!(PmisSelector.select(&view, &[0, 2, 3], &markers), vec![0, 2]);
    }
}

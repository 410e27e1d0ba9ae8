//! finite_diff::sparsity — column grouping for sparse finite differences.
//!
//! Purpose
//! -------
//! Turn the nonzero structure of a declared sparse Jacobian into a small set
//! of simultaneous perturbations. Columns whose nonzero rows do not overlap
//! can be perturbed together: one model evaluation then fills every column
//! in the group.
//!
//! Key behaviors
//! -------------
//! - [`SparsityPattern::from_jacobian`] reads the row indices of each column
//!   from a faer CSC matrix; a dense input is rejected.
//! - [`SparsityPattern::column_groups`] performs greedy (CPR-style) grouping
//!   in column order.
//! - [`SparsityPattern::gather`] keeps only the pattern's entries of a
//!   dense result.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every column appears in exactly one group.
//! - Within a group, row sets are pairwise disjoint.
use crate::{
    errors::{FitError, FitResult},
    types::JacobianMatrix,
};
use ndarray::Array2;

/// Nonzero structure of a Jacobian, stored column by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityPattern {
    nrows: usize,
    ncols: usize,
    rows_of_col: Vec<Vec<usize>>,
}

impl SparsityPattern {
    /// Pattern of a declared sparse Jacobian.
    ///
    /// # Errors
    /// [`FitError::SparseJacobianIsDense`] if `jac` is stored densely.
    pub fn from_jacobian(jac: &JacobianMatrix) -> FitResult<Self> {
        if !jac.is_sparse() {
            return Err(FitError::SparseJacobianIsDense);
        }
        let mut rows_of_col = vec![Vec::new(); jac.ncols()];
        for (row, col, _) in jac.triplets() {
            rows_of_col[col].push(row);
        }
        for rows in rows_of_col.iter_mut() {
            rows.sort_unstable();
            rows.dedup();
        }
        Ok(Self { nrows: jac.nrows(), ncols: jac.ncols(), rows_of_col })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.rows_of_col.iter().map(Vec::len).sum()
    }

    pub fn rows_of_col(&self, col: usize) -> &[usize] {
        &self.rows_of_col[col]
    }

    /// Greedy grouping: each column joins the first group it does not
    /// overlap with, or opens a new one.
    pub fn column_groups(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut covered: Vec<Vec<bool>> = Vec::new();
        for (col, rows) in self.rows_of_col.iter().enumerate() {
            let slot = covered.iter().position(|mask| rows.iter().all(|&r| !mask[r]));
            let idx = match slot {
                Some(idx) => idx,
                None => {
                    groups.push(Vec::new());
                    covered.push(vec![false; self.nrows]);
                    groups.len() - 1
                }
            };
            groups[idx].push(col);
            for &r in rows {
                covered[idx][r] = true;
            }
        }
        groups
    }

    /// Gather the pattern's entries from a dense result into a sparse matrix.
    pub fn gather(&self, dense: &Array2<f64>) -> FitResult<JacobianMatrix> {
        let mut triplets = Vec::with_capacity(self.nnz());
        for (col, rows) in self.rows_of_col.iter().enumerate() {
            for &row in rows {
                triplets.push((row, col, dense[[row, col]]));
            }
        }
        JacobianMatrix::from_triplets(self.nrows, self.ncols, &triplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Pattern extraction and dense rejection.
    // - Greedy grouping of structurally orthogonal columns.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Columns of a diagonal pattern collapse into one group.
    //
    // Given
    // -----
    // - A 3×3 diagonal sparse Jacobian.
    //
    // Expect
    // ------
    // - One group `[0, 1, 2]` and three nonzeros.
    fn diagonal_pattern_uses_single_group() {
        // Arrange
        let jac = JacobianMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)])
            .unwrap();

        // Act
        let pattern = SparsityPattern::from_jacobian(&jac).unwrap();

        // Assert
        assert_eq!(pattern.nnz(), 3);
        assert_eq!(pattern.column_groups(), vec![vec![0, 1, 2]]);
    }

    #[test]
    // Purpose
    // -------
    // Overlapping columns are split into separate groups.
    //
    // Given
    // -----
    // - Column 0 touches rows {0, 1}, column 1 touches {1}, column 2 touches {2}.
    //
    // Expect
    // ------
    // - Groups `[0, 2]` and `[1]`.
    fn overlapping_columns_are_split() {
        // Arrange
        let jac = JacobianMatrix::from_triplets(
            3,
            3,
            &[(0, 0, 1.0), (1, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)],
        )
        .unwrap();

        // Act
        let pattern = SparsityPattern::from_jacobian(&jac).unwrap();

        // Assert
        assert_eq!(pattern.column_groups(), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    // Purpose
    // -------
    // A dense "sparse" Jacobian is rejected; gathering keeps the pattern.
    //
    // Given
    // -----
    // - A dense 2×2 matrix, and a pattern with entries (0,0), (1,1).
    //
    // Expect
    // ------
    // - `SparseJacobianIsDense`; gather drops the off-pattern values.
    fn dense_input_rejected_and_gather_respects_pattern() {
        // Arrange
        let dense = JacobianMatrix::Dense(array![[1.0, 2.0], [3.0, 4.0]]);
        let sparse = JacobianMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap();
        let pattern = SparsityPattern::from_jacobian(&sparse).unwrap();

        // Act
        let err = SparsityPattern::from_jacobian(&dense).expect_err("dense must fail");
        let gathered = pattern.gather(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();

        // Assert
        assert_eq!(err, FitError::SparseJacobianIsDense);
        assert!(gathered.is_sparse());
        assert_eq!(gathered.to_dense(), array![[1.0, 0.0], [0.0, 4.0]]);
    }
}

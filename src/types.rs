//! types — shared numeric aliases, data overrides and the Jacobian container.
//!
//! Purpose
//! -------
//! Centralize the numeric shapes used across cost functions and derivative
//! engines so that the rest of the crate stays agnostic to `ndarray` and
//! `faer` generics.
//!
//! Key behaviors
//! -------------
//! - Define aliases for parameters, residuals, gradients and Hessians.
//! - Provide [`DataOverride`], the optional `x`/`y`/`e` replacement accepted
//!   by residual and cost evaluations.
//! - Provide [`JacobianMatrix`], a dense-or-sparse Jacobian with the handful
//!   of linear-algebra operations the chain rule needs (row scaling, `Jᵀv`,
//!   column sums, `JᵀJ`), preserving sparsity where possible.
//!
//! Conventions
//! -----------
//! - Jacobian rows are observations (after row-major flattening of
//!   vector-valued outputs) and columns are parameters.
//! - Residual Hessians are indexed `[param_i, param_j, observation]`.
use crate::errors::{FitError, FitResult};
use faer::sparse::{SparseColMat, Triplet};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayViewD};

/// Parameter vector `p`.
pub type Params = Array1<f64>;

/// Flattened residual vector `r(p)`.
pub type Residuals = Array1<f64>;

/// Gradient of the scalar cost with respect to `p`.
pub type Grad = Array1<f64>;

/// Dense `n_params × n_params` Hessian of the scalar cost.
pub type CostHessian = Array2<f64>;

/// Second derivatives of the residuals (or model), `[param_i, param_j, obs]`.
pub type ResidualHessian = Array3<f64>;

/// Sparse Jacobian storage (compressed sparse columns).
pub type SparseJacobian = SparseColMat<usize, f64>;

/// Optional replacement data for a single evaluation.
///
/// Any field left as `None` falls back to the problem's own data. Caches are
/// consulted and updated only when every field is `None`.
#[derive(Debug, Clone, Default)]
pub struct DataOverride<'a> {
    pub x: Option<ArrayView1<'a, f64>>,
    pub y: Option<ArrayViewD<'a, f64>>,
    pub e: Option<ArrayViewD<'a, f64>>,
}

impl<'a> DataOverride<'a> {
    /// Use the problem's own data.
    pub fn none() -> Self {
        Self::default()
    }

    /// Replace x and y for one evaluation.
    pub fn with_xy(x: ArrayView1<'a, f64>, y: ArrayViewD<'a, f64>) -> Self {
        Self { x: Some(x), y: Some(y), e: None }
    }

    /// Replace x, y and e for one evaluation.
    pub fn with_xye(x: ArrayView1<'a, f64>, y: ArrayViewD<'a, f64>, e: ArrayViewD<'a, f64>) -> Self {
        Self { x: Some(x), y: Some(y), e: Some(e) }
    }

    /// `true` when no field is overridden.
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.e.is_none()
    }
}

/// Model or residual Jacobian, dense or sparse.
#[derive(Debug, Clone)]
pub enum JacobianMatrix {
    Dense(Array2<f64>),
    Sparse(SparseJacobian),
}

impl JacobianMatrix {
    /// Build a sparse Jacobian from `(row, col, value)` triplets.
    ///
    /// # Errors
    /// [`FitError::SparseConstruction`] when faer rejects the triplets
    /// (e.g. an index out of bounds).
    pub fn from_triplets(
        nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)],
    ) -> FitResult<Self> {
        let triplets: Vec<Triplet<usize, usize, f64>> =
            triplets.iter().map(|&(row, col, val)| Triplet::new(row, col, val)).collect();
        let mat = SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)
            .map_err(|e| FitError::SparseConstruction { text: e.to_string() })?;
        Ok(JacobianMatrix::Sparse(mat))
    }

    pub fn nrows(&self) -> usize {
        match self {
            JacobianMatrix::Dense(m) => m.nrows(),
            JacobianMatrix::Sparse(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            JacobianMatrix::Dense(m) => m.ncols(),
            JacobianMatrix::Sparse(m) => m.ncols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, JacobianMatrix::Sparse(_))
    }

    /// Stored `(row, col, value)` entries; every entry for a dense matrix.
    pub fn triplets(&self) -> Vec<(usize, usize, f64)> {
        match self {
            JacobianMatrix::Dense(m) => m.indexed_iter().map(|((i, j), &v)| (i, j, v)).collect(),
            JacobianMatrix::Sparse(m) => {
                let symbolic = m.symbolic();
                let mut out = Vec::new();
                for col in 0..m.ncols() {
                    let rows = symbolic.row_idx_of_col_raw(col);
                    let vals = m.val_of_col(col);
                    out.extend(rows.iter().zip(vals.iter()).map(|(&row, &val)| (row, col, val)));
                }
                out
            }
        }
    }

    /// Dense copy of the matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            JacobianMatrix::Dense(m) => m.clone(),
            JacobianMatrix::Sparse(m) => {
                let mut dense = Array2::zeros((m.nrows(), m.ncols()));
                for (row, col, val) in self.triplets() {
                    dense[[row, col]] += val;
                }
                dense
            }
        }
    }

    /// Multiply row `i` by `scale[i]`, keeping the storage format.
    ///
    /// This is the chain-rule step shared by every residual law
    /// (`-1`, `-1/e`, `-1/(2√f)`, `1 - y/f`).
    pub fn scale_rows(&self, scale: ArrayView1<'_, f64>) -> FitResult<Self> {
        if scale.len() != self.nrows() {
            return Err(FitError::JacobianShapeMismatch {
                expected: (scale.len(), self.ncols()),
                found: (self.nrows(), self.ncols()),
            });
        }
        match self {
            JacobianMatrix::Dense(m) => {
                let mut out = m.clone();
                for (mut row, &s) in out.rows_mut().into_iter().zip(scale.iter()) {
                    row *= s;
                }
                Ok(JacobianMatrix::Dense(out))
            }
            JacobianMatrix::Sparse(m) => {
                let scaled: Vec<(usize, usize, f64)> = self
                    .triplets()
                    .into_iter()
                    .map(|(row, col, val)| (row, col, val * scale[row]))
                    .collect();
                JacobianMatrix::from_triplets(m.nrows(), m.ncols(), &scaled)
            }
        }
    }

    /// Multiply every entry by `factor`.
    pub fn scaled(&self, factor: f64) -> FitResult<Self> {
        let scale = Array1::from_elem(self.nrows(), factor);
        self.scale_rows(scale.view())
    }

    /// `Jᵀ v`.
    pub fn t_dot(&self, v: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            JacobianMatrix::Dense(m) => m.t().dot(&v),
            JacobianMatrix::Sparse(m) => {
                let mut out = Array1::zeros(m.ncols());
                for (row, col, val) in self.triplets() {
                    out[col] += val * v[row];
                }
                out
            }
        }
    }

    /// Sum over observations (axis 0).
    pub fn column_sums(&self) -> Array1<f64> {
        let ones = Array1::ones(self.nrows());
        self.t_dot(ones.view())
    }

    /// `Jᵀ J` as a dense matrix.
    pub fn gram(&self) -> Array2<f64> {
        let dense = self.to_dense();
        dense.t().dot(&dense)
    }

    /// Row `i` as a dense vector.
    pub fn row(&self, i: usize) -> Array1<f64> {
        match self {
            JacobianMatrix::Dense(m) => m.row(i).to_owned(),
            JacobianMatrix::Sparse(m) => {
                let mut out = Array1::zeros(m.ncols());
                for (row, col, val) in self.triplets() {
                    if row == i {
                        out[col] = val;
                    }
                }
                out
            }
        }
    }

    /// Replace NaN entries with zero.
    pub fn substitute_nans(&self) -> FitResult<Self> {
        match self {
            JacobianMatrix::Dense(m) => {
                Ok(JacobianMatrix::Dense(m.mapv(|v| if v.is_nan() { 0.0 } else { v })))
            }
            JacobianMatrix::Sparse(m) => {
                let cleaned: Vec<(usize, usize, f64)> = self
                    .triplets()
                    .into_iter()
                    .map(|(row, col, val)| (row, col, if val.is_nan() { 0.0 } else { val }))
                    .collect();
                JacobianMatrix::from_triplets(m.nrows(), m.ncols(), &cleaned)
            }
        }
    }
}

impl From<Array2<f64>> for JacobianMatrix {
    fn from(m: Array2<f64>) -> Self {
        JacobianMatrix::Dense(m)
    }
}

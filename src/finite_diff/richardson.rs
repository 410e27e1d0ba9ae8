//! finite_diff::richardson — step-sequence differencing with extrapolation.
//!
//! Purpose
//! -------
//! Provide the adaptive schemes behind the `numdifftools` engines: each
//! derivative is estimated at a geometric sequence of step sizes and the
//! estimates are combined in a Richardson table, which cancels the leading
//! truncation-error terms without requiring a hand-tuned step.
//!
//! Key behaviors
//! -------------
//! - [`NdMethod`] parses `central`, `forward`, `backward`, `complex`,
//!   `multicomplex`. The real schemes are handled here; the complex ones are
//!   routed to `complex_step` by the engines.
//! - [`richardson_jacobian`] returns, elementwise, the extrapolated estimate
//!   whose change from the previous extrapolation level is smallest.
//!
//! Invariants & assumptions
//! ------------------------
//! - Steps are `h_s = base_step · max(1, |p_k|) / step_ratio^s`.
//! - Central differences have error terms in even powers of `h`; one-sided
//!   differences in every power. The table uses `step_ratio^(order·l) - 1`
//!   as the elimination factor at level `l`.
use crate::{
    errors::{FitError, FitResult},
    types::Params,
};
use ndarray::{Array1, Array2, Zip};
use std::str::FromStr;

/// Method strings accepted by [`NdMethod::from_str`].
pub const ND_METHODS: &[&str] = &["central", "forward", "backward", "complex", "multicomplex"];

/// Differencing scheme selected by the `numdifftools` engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdMethod {
    Central,
    Forward,
    Backward,
    Complex,
    Multicomplex,
}

impl NdMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NdMethod::Central => "central",
            NdMethod::Forward => "forward",
            NdMethod::Backward => "backward",
            NdMethod::Complex => "complex",
            NdMethod::Multicomplex => "multicomplex",
        }
    }

    /// `true` for schemes evaluated on the complex model.
    pub fn is_complex(&self) -> bool {
        matches!(self, NdMethod::Complex | NdMethod::Multicomplex)
    }
}

impl FromStr for NdMethod {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "central" => Ok(NdMethod::Central),
            "forward" => Ok(NdMethod::Forward),
            "backward" => Ok(NdMethod::Backward),
            "complex" => Ok(NdMethod::Complex),
            "multicomplex" => Ok(NdMethod::Multicomplex),
            other => Err(FitError::InvalidJacobianMethod {
                engine: "numdifftools",
                method: other.to_string(),
                valid: ND_METHODS,
            }),
        }
    }
}

/// Step sequence used by [`richardson_jacobian`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RichardsonConfig {
    pub base_step: f64,
    pub num_steps: usize,
    pub step_ratio: f64,
}

impl RichardsonConfig {
    /// Defaults per scheme: wider steps for central differences, whose
    /// truncation error is second order.
    pub fn for_method(method: NdMethod) -> Self {
        let base_step = match method {
            NdMethod::Central => 1e-2,
            _ => 1e-3,
        };
        Self { base_step, num_steps: 5, step_ratio: 2.0 }
    }
}

/// richardson_jacobian — extrapolated Jacobian of a vector function.
///
/// Purpose
/// -------
/// Approximate `∂f/∂p` at `params` with the central, forward or backward
/// scheme, refining each column with Richardson extrapolation.
///
/// Parameters
/// ----------
/// - `params`: `&Params`
///   Point at which to differentiate.
/// - `f0`: `&Array1<f64>`
///   `func(params)`; used directly by the one-sided schemes.
/// - `func`: `&F`
///   Fallible vector-valued function.
/// - `method`: [`NdMethod`]
///   Must be a real scheme.
/// - `cfg`: [`RichardsonConfig`]
///   Step sequence.
///
/// Returns
/// -------
/// `FitResult<Array2<f64>>`
///   `(f0.len() × params.len())` Jacobian.
///
/// Errors
/// ------
/// - Propagates errors of `func`.
/// - [`FitError::ShapeMismatch`] when an evaluation changes output length.
/// - [`FitError::NotSupported`] for complex schemes.
pub fn richardson_jacobian<F>(
    params: &Params, f0: &Array1<f64>, func: &F, method: NdMethod, cfg: RichardsonConfig,
) -> FitResult<Array2<f64>>
where
    F: Fn(&Params) -> FitResult<Array1<f64>>,
{
    let order = match method {
        NdMethod::Central => 2,
        NdMethod::Forward | NdMethod::Backward => 1,
        NdMethod::Complex | NdMethod::Multicomplex => {
            return Err(FitError::NotSupported {
                owner: "Richardson differencing".to_string(),
                operation: method.as_str(),
            });
        }
    };
    let m = f0.len();
    let eval = |p: &Params| -> FitResult<Array1<f64>> {
        let values = func(p)?;
        if values.len() != m {
            return Err(FitError::ShapeMismatch { expected: vec![m], found: vec![values.len()] });
        }
        Ok(values)
    };

    let mut jac = Array2::zeros((m, params.len()));
    for k in 0..params.len() {
        let scale = params[k].abs().max(1.0);
        let mut estimates = Vec::with_capacity(cfg.num_steps);
        for s in 0..cfg.num_steps.max(1) {
            let h = cfg.base_step * scale / cfg.step_ratio.powi(s as i32);
            let mut plus = params.clone();
            plus[k] += h;
            let mut minus = params.clone();
            minus[k] -= h;
            let estimate = match method {
                NdMethod::Central => (eval(&plus)? - eval(&minus)?) / (2.0 * h),
                NdMethod::Forward => (eval(&plus)? - f0) / h,
                _ => (f0 - &eval(&minus)?) / h,
            };
            estimates.push(estimate);
        }
        jac.column_mut(k).assign(&extrapolate(&estimates, cfg.step_ratio, order));
    }
    Ok(jac)
}

// ---- Helper methods ----

/// Richardson table over `estimates` (coarsest first); returns, per entry,
/// the diagonal value with the smallest change from its predecessor.
fn extrapolate(estimates: &[Array1<f64>], ratio: f64, order: i32) -> Array1<f64> {
    let mut table: Vec<Vec<Array1<f64>>> = Vec::with_capacity(estimates.len());
    for (s, estimate) in estimates.iter().enumerate() {
        let mut row = vec![estimate.clone()];
        for l in 1..=s {
            let factor = ratio.powi(order * l as i32) - 1.0;
            let refined = &row[l - 1] + &((&row[l - 1] - &table[s - 1][l - 1]) / factor);
            row.push(refined);
        }
        table.push(row);
    }

    let diag: Vec<&Array1<f64>> = table.iter().enumerate().map(|(l, row)| &row[l]).collect();
    if diag.len() < 2 {
        return diag.first().map(|d| (*d).clone()).unwrap_or_else(|| Array1::zeros(0));
    }
    let mut best = diag[1].clone();
    let mut best_err = (diag[1] - diag[0]).mapv(f64::abs);
    for l in 2..diag.len() {
        let err = (diag[l] - diag[l - 1]).mapv(f64::abs);
        Zip::from(&mut best).and(&mut best_err).and(diag[l]).and(&err).for_each(
            |b, be, &d, &e| {
                if e < *be {
                    *b = d;
                    *be = e;
                }
            },
        );
    }
    best
}

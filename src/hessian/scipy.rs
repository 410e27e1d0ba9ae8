//! hessian::scipy — finite differences of the attached Jacobian.
//!
//! Purpose
//! -------
//! Approximate the model Hessian by differencing the flattened output of the
//! attached Jacobian engine, one observation row at a time in effect.
//!
//! Key behaviors
//! -------------
//! - `2-point` / `3-point`: forward/central differences of
//!   `p ↦ vec(J(p))`, reshaped to `[n_params, n_params, n_obs]`.
//! - `cs`: hybrid complex step on the problem's complex model (a complex
//!   step through the Jacobian engine is not available in real arithmetic).
//! - The Jacobian at the unperturbed point is memoized per parameter vector.
//! - Results are symmetrized before returning.
use crate::{
    cache::{ParamCache, cached_func_values},
    errors::FitResult,
    finite_diff::{
        FD_METHODS, FdMethod, complex_step_hessian, fd_jacobian, stack_to_residual_hessian,
        symmetrize_residual_hessian, validate_residual_hessian,
    },
    hessian::traits::{Hessian, HessianKind, check_hessian_method},
    jacobian::Jacobian,
    problem::{FittingProblem, flatten},
    types::{Params, ResidualHessian},
};
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use std::{cell::RefCell, rc::Rc};

/// Problem formats that must not be combined with a given method.
pub const SCIPY_HESSIAN_INCOMPATIBLE_PROBLEMS: &[(&str, &[&str])] = &[("cs", &["mantid"])];

pub struct ScipyHessian {
    problem: Rc<dyn FittingProblem>,
    jacobian: Rc<dyn Jacobian>,
    method: String,
    cache_jac: RefCell<ParamCache<Array1<f64>>>,
}

impl ScipyHessian {
    /// Engine with the default `2-point` method.
    pub fn new(problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>) -> Self {
        Self {
            problem,
            jacobian,
            method: "2-point".to_string(),
            cache_jac: RefCell::new(ParamCache::new()),
        }
    }
}

/// Row-major flattened dense Jacobian: entry `obs * n_params + j`.
pub(crate) fn flat_jacobian(
    jacobian: &dyn Jacobian, params: &Params, x: Option<ArrayView1<'_, f64>>,
) -> FitResult<Array1<f64>> {
    let dense = jacobian.eval(params, x)?.to_dense();
    Ok(flatten(&dense.into_dyn()))
}

impl Hessian for ScipyHessian {
    fn kind(&self) -> HessianKind {
        HessianKind::Scipy
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_hessian_method("scipy", method, FD_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        FD_METHODS
    }

    fn incompatible_problems(&self) -> &'static [(&'static str, &'static [&'static str])] {
        SCIPY_HESSIAN_INCOMPATIBLE_PROBLEMS
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<ResidualHessian> {
        let scheme: FdMethod = self.method.parse()?;
        let x_eval = x.map(|v| v.reborrow()).unwrap_or_else(|| self.problem.data_x());
        let n_obs = x_eval.len() * self.problem.outputs_per_obs();
        let mut hes = match scheme {
            FdMethod::ComplexStep => {
                let func = |pc: &Array1<Complex64>| self.problem.eval_model_complex_flat(pc, x_eval);
                complex_step_hessian(params, &func)?
            }
            _ => {
                let g0 = match x {
                    Some(_) => flat_jacobian(self.jacobian.as_ref(), params, x)?,
                    None => cached_func_values(&self.cache_jac, params, || {
                        flat_jacobian(self.jacobian.as_ref(), params, None)
                    })?,
                };
                let g = |p: &Params| flat_jacobian(self.jacobian.as_ref(), p, x);
                let stacked = fd_jacobian(params, &g0, &g, scheme)?;
                stack_to_residual_hessian(&stacked, params.len())?
            }
        };
        validate_residual_hessian(&hes, params.len(), n_obs)?;
        symmetrize_residual_hessian(&mut hes);
        Ok(hes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jacobian::AnalyticJacobian, problem::FunctionProblem};
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, Array3, ArrayD, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of 2-point, 3-point and cs with an analytic Hessian.
    // - Exact symmetry of the result.
    // -------------------------------------------------------------------------

    // f(x, p) = (x (p0 + p1)²)²
    fn problem() -> Rc<dyn FittingProblem> {
        Rc::new(
            FunctionProblem::builder(
                "quartic",
                array![1.0, 2.0, 3.0],
                array![1.0, 2.0, 3.0],
                |p: &Params, x: ArrayView1<'_, f64>| {
                    let s = (p[0] + p[1]).powi(2);
                    Ok(x.mapv(|xi| (xi * s).powi(2)).into_dyn())
                },
            )
            .complex_model(|p: &Array1<Complex64>, x: ArrayView1<'_, f64>| {
                let s = (p[0] + p[1]) * (p[0] + p[1]);
                let out: Array1<Complex64> = x.iter().map(|&xi| (s * xi) * (s * xi)).collect();
                Ok::<ArrayD<Complex64>, crate::errors::FitError>(out.into_dyn())
            })
            .jacobian(|x: ArrayView1<'_, f64>, p: &Params| {
                let s = p[0] + p[1];
                let mut j = Array2::zeros((x.len(), 2));
                for (i, &xi) in x.iter().enumerate() {
                    let d = 4.0 * xi * xi * s.powi(3);
                    j[[i, 0]] = d;
                    j[[i, 1]] = d;
                }
                Ok(j)
            })
            .build()
            .unwrap(),
        )
    }

    fn analytic_hessian(p: &Params) -> Array3<f64> {
        let s = p[0] + p[1];
        let mut h = Array3::zeros((2, 2, 3));
        for (i, xi) in [1.0_f64, 2.0, 3.0].iter().enumerate() {
            let d2 = 12.0 * xi * xi * s * s;
            for a in 0..2 {
                for b in 0..2 {
                    h[[a, b, i]] = d2;
                }
            }
        }
        h
    }

    #[test]
    // Purpose
    // -------
    // Every scheme agrees with the analytic Hessian and is symmetric.
    //
    // Given
    // -----
    // - `f(x, p) = (x (p0 + p1)²)²` at `p = [1, 2]` with an analytic Jacobian.
    //
    // Expect
    // ------
    // - Relative agreement within 1e-5 and `H[0,1,:] == H[1,0,:]`.
    fn schemes_match_analytic_hessian() {
        // Arrange
        let p = array![1.0, 2.0];
        let problem = problem();
        let jacobian: Rc<dyn Jacobian> = Rc::new(AnalyticJacobian::new(problem.clone()).unwrap());
        let expected = analytic_hessian(&p);

        for method in ["2-point", "3-point", "cs"] {
            let mut hes = ScipyHessian::new(problem.clone(), jacobian.clone());
            hes.set_method(method).unwrap();

            // Act
            let h = hes.eval(&p, None).unwrap();

            // Assert
            for ((idx, &value), &target) in h.indexed_iter().zip(expected.iter()) {
                assert_abs_diff_eq!(value / target, 1.0, epsilon = 1e-5);
                assert_eq!(value, h[[idx.1, idx.0, idx.2]]);
            }
        }
    }
}

//! hessian::numdifftools — adaptive-step differences of the attached Jacobian.
//!
//! Real schemes apply Richardson-extrapolated differencing to
//! `p ↦ vec(J(p))`; `complex`/`multicomplex` use the hybrid complex step on
//! the problem's complex model. Results are symmetrized.
use crate::{
    errors::FitResult,
    finite_diff::{
        ND_METHODS, NdMethod, RichardsonConfig, complex_step_hessian, richardson_jacobian,
        stack_to_residual_hessian, symmetrize_residual_hessian, validate_residual_hessian,
    },
    hessian::{
        scipy::flat_jacobian,
        traits::{Hessian, HessianKind, check_hessian_method},
    },
    jacobian::Jacobian,
    problem::FittingProblem,
    types::{Params, ResidualHessian},
};
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use std::rc::Rc;

pub struct NumdifftoolsHessian {
    problem: Rc<dyn FittingProblem>,
    jacobian: Rc<dyn Jacobian>,
    method: String,
}

impl NumdifftoolsHessian {
    /// Engine with the default `central` method.
    pub fn new(problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>) -> Self {
        Self { problem, jacobian, method: "central".to_string() }
    }
}

impl Hessian for NumdifftoolsHessian {
    fn kind(&self) -> HessianKind {
        HessianKind::Numdifftools
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_hessian_method("numdifftools", method, ND_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        ND_METHODS
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<ResidualHessian> {
        let scheme: NdMethod = self.method.parse()?;
        let x_eval = x.map(|v| v.reborrow()).unwrap_or_else(|| self.problem.data_x());
        let mut hes = if scheme.is_complex() {
            let func = |pc: &Array1<Complex64>| self.problem.eval_model_complex_flat(pc, x_eval);
            complex_step_hessian(params, &func)?
        } else {
            let g0 = flat_jacobian(self.jacobian.as_ref(), params, x)?;
            let g = |p: &Params| flat_jacobian(self.jacobian.as_ref(), p, x);
            let stacked =
                richardson_jacobian(params, &g0, &g, scheme, RichardsonConfig::for_method(scheme))?;
            stack_to_residual_hessian(&stacked, params.len())?
        };
        validate_residual_hessian(
            &hes,
            params.len(),
            x_eval.len() * self.problem.outputs_per_obs(),
        )?;
        symmetrize_residual_hessian(&mut hes);
        Ok(hes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jacobian::AnalyticJacobian, problem::FunctionProblem};
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array, s};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the real schemes with a closed-form Hessian.
    // - Exact symmetry of every returned slice.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Central, forward and backward schemes recover the model curvature.
    //
    // Given
    // -----
    // - `f(x, p) = p0² p1 x` with analytic Jacobian `[2 p0 p1 x, p0² x]`,
    //   at `p = [1.5, 2]`.
    //
    // Expect
    // ------
    // - `H[:, :, i] = x_i [[2 p1, 2 p0], [2 p0, 0]]` within 1e-6.
    // - `H[i, j, :] == H[j, i, :]` bit for bit, also for the one-sided
    //   schemes whose raw differences are not symmetric.
    fn real_schemes_match_closed_form() {
        // Arrange
        let problem: Rc<dyn FittingProblem> = Rc::new(
            FunctionProblem::builder(
                "poly",
                array![1.0, 2.0],
                array![0.0, 0.0],
                |p: &Params, x: ArrayView1<'_, f64>| Ok(x.mapv(|xi| p[0] * p[0] * p[1] * xi).into_dyn()),
            )
            .jacobian(|x: ArrayView1<'_, f64>, p: &Params| {
                let mut j = Array2::zeros((x.len(), 2));
                for (i, &xi) in x.iter().enumerate() {
                    j[[i, 0]] = 2.0 * p[0] * p[1] * xi;
                    j[[i, 1]] = p[0] * p[0] * xi;
                }
                Ok(j)
            })
            .build()
            .unwrap(),
        );
        let jacobian: Rc<dyn Jacobian> = Rc::new(AnalyticJacobian::new(problem.clone()).unwrap());
        let p = array![1.5, 2.0];

        for method in ["central", "forward", "backward"] {
            let mut hes = NumdifftoolsHessian::new(problem.clone(), jacobian.clone());
            hes.set_method(method).unwrap();

            // Act
            let h = hes.eval(&p, None).unwrap();

            // Assert
            for (i, xi) in [1.0, 2.0].iter().enumerate() {
                assert_abs_diff_eq!(h[[0, 0, i]], 4.0 * xi, epsilon = 1e-6);
                assert_abs_diff_eq!(h[[0, 1, i]], 3.0 * xi, epsilon = 1e-6);
                assert_abs_diff_eq!(h[[1, 1, i]], 0.0, epsilon = 1e-6);
            }
            for j in 0..2 {
                for k in 0..2 {
                    assert_eq!(h.slice(s![j, k, ..]), h.slice(s![k, j, ..]), "{method}");
                }
            }
        }
    }
}

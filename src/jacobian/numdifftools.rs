//! jacobian::numdifftools — adaptive-step Jacobians of the model.
//!
//! Real schemes (`central`, `forward`, `backward`) use Richardson
//! extrapolation over a geometric step sequence; `complex` and
//! `multicomplex` use the complex step on the problem's complex model.
use crate::{
    cache::{ParamCache, cached_func_values},
    errors::{FitError, FitResult},
    finite_diff::{
        ND_METHODS, NdMethod, RichardsonConfig, complex_step_jacobian, richardson_jacobian,
        validate_jacobian_shape,
    },
    jacobian::traits::{Jacobian, JacobianKind, VectorFn, check_jacobian_method},
    problem::FittingProblem,
    types::{JacobianMatrix, Params},
};
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use std::{cell::RefCell, rc::Rc};

pub struct NumdifftoolsJacobian {
    problem: Rc<dyn FittingProblem>,
    method: String,
    cache_fx: RefCell<ParamCache<Array1<f64>>>,
}

impl NumdifftoolsJacobian {
    /// Engine with the default `central` method.
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { problem, method: "central".to_string(), cache_fx: RefCell::new(ParamCache::new()) }
    }

    fn scheme(&self) -> FitResult<NdMethod> {
        self.method.parse()
    }
}

impl Jacobian for NumdifftoolsJacobian {
    fn kind(&self) -> JacobianKind {
        JacobianKind::Numdifftools
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_jacobian_method("numdifftools", method, ND_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        ND_METHODS
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix> {
        let scheme = self.scheme()?;
        let x_eval = x.map(|v| v.reborrow()).unwrap_or_else(|| self.problem.data_x());
        let jac = if scheme.is_complex() {
            let func = |pc: &Array1<Complex64>| self.problem.eval_model_complex_flat(pc, x_eval);
            complex_step_jacobian(params, &func)?
        } else {
            let f0 = match x {
                Some(x) => self.problem.eval_model_flat(params, x)?,
                None => cached_func_values(&self.cache_fx, params, || {
                    self.problem.eval_model_flat(params, x_eval)
                })?,
            };
            let func = |p: &Params| self.problem.eval_model_flat(p, x_eval);
            richardson_jacobian(params, &f0, &func, scheme, RichardsonConfig::for_method(scheme))?
        };
        let expected = (x_eval.len() * self.problem.outputs_per_obs(), params.len());
        validate_jacobian_shape(jac.dim(), expected)?;
        Ok(JacobianMatrix::Dense(jac))
    }

    fn eval_func(&self, params: &Params, func: &VectorFn<'_>) -> FitResult<JacobianMatrix> {
        let scheme = self.scheme()?;
        if scheme.is_complex() {
            return Err(FitError::NotSupported { owner: self.name(), operation: "eval_func" });
        }
        let f0 = func(params)?;
        let jac =
            richardson_jacobian(params, &f0, &func, scheme, RichardsonConfig::for_method(scheme))?;
        Ok(JacobianMatrix::Dense(jac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::FunctionProblem;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of every scheme with the analytic Jacobian.
    // - Complex schemes on problems without a complex model.
    // -------------------------------------------------------------------------

    fn problem(complex: bool) -> Rc<dyn FittingProblem> {
        let mut builder = FunctionProblem::builder(
            "sine",
            array![1.0, 2.0, 3.0],
            array![0.5, 0.9, 0.1],
            |p: &Params, x: ArrayView1<'_, f64>| Ok(x.mapv(|xi| p[0] * (p[1] * xi).sin()).into_dyn()),
        );
        if complex {
            builder = builder.complex_model(|p: &Array1<Complex64>, x: ArrayView1<'_, f64>| {
                let out: Array1<Complex64> = x.iter().map(|&xi| p[0] * (p[1] * xi).sin()).collect();
                Ok(out.into_dyn())
            });
        }
        Rc::new(builder.build().unwrap())
    }

    #[test]
    // Purpose
    // -------
    // All five schemes agree with the analytic Jacobian.
    //
    // Given
    // -----
    // - `f(x, p) = p0 sin(p1 x)` at `p = [1.2, 0.7]`.
    //
    // Expect
    // ------
    // - Agreement within 1e-7.
    fn all_schemes_match_analytic() {
        // Arrange
        let p = array![1.2, 0.7];
        let mut expected = Array2::zeros((3, 2));
        for (i, x) in [1.0_f64, 2.0, 3.0].iter().enumerate() {
            expected[[i, 0]] = (0.7 * x).sin();
            expected[[i, 1]] = 1.2 * x * (0.7 * x).cos();
        }

        for method in ND_METHODS {
            let mut jac = NumdifftoolsJacobian::new(problem(true));
            jac.set_method(method).unwrap();

            // Act
            let j = jac.eval(&p, None).unwrap();

            // Assert
            assert_abs_diff_eq!(j.to_dense(), expected, epsilon = 1e-7);
        }
    }

    #[test]
    // Purpose
    // -------
    // Complex schemes need a complex model.
    //
    // Given
    // -----
    // - A real-only problem and method "complex".
    //
    // Expect
    // ------
    // - `ComplexModelUnavailable`.
    fn complex_scheme_without_complex_model_fails() {
        // Arrange
        let mut jac = NumdifftoolsJacobian::new(problem(false));
        jac.set_method("complex").unwrap();

        // Act
        let err = jac.eval(&array![1.0, 1.0], None).expect_err("must fail");

        // Assert
        assert!(matches!(err, FitError::ComplexModelUnavailable { .. }));
    }
}

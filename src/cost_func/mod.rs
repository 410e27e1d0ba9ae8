//! cost_func — objectives minimized by a controller.
//!
//! Purpose
//! -------
//! Turn a fitting problem into a scalar objective with residuals and
//! derivatives: least squares (`nlls`), error-weighted least squares
//! (`weighted_nlls`), root/Hellinger least squares, Poisson deviance and the
//! weighted log-likelihood form used by Bayesian fits.
//!
//! Key behaviors
//! -------------
//! - [`traits::CostFunc`] is the single polymorphic interface.
//! - Derivative engines are attached after construction
//!   (`set_jacobian`/`set_hessian`); each variant applies its own chain rule
//!   to the model derivatives they return.
//! - [`factory`] maps configuration keys to constructors.
//!
//! Invariants & assumptions
//! ------------------------
//! - For least-squares variants `eval_cost(p) == eval_r(p) · eval_r(p)`.
//! - The cost, the residuals and the model output are memoized on the exact
//!   parameter vector, only when evaluating on the problem's own data, and
//!   only after a successful computation.
//!
//! Downstream usage
//! ----------------
//! - `create_cost_func(key)?.build(problem)?`, attach engines, then call
//!   `eval_cost`/`jac_cost`/`hes_cost` from the minimizer loop.
//! - Run `validate_problem` and `validate_algorithm_type` before fitting.
pub mod factory;
pub mod loglike_nlls;
pub(crate) mod nlls_base;
pub mod nlls;
pub mod poisson;
pub mod root_nlls;
pub mod traits;
pub mod weighted_nlls;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::factory::{
    CostFuncEntry, create_cost_func, create_nlls_cost_func, registered_cost_funcs,
};
pub use self::loglike_nlls::LoglikeNLLSCostFunc;
pub use self::nlls::NLLSCostFunc;
pub use self::poisson::{PoissonCostFunc, safe_a_log_b};
pub use self::root_nlls::{RootNLLSCostFunc, RootVariant};
pub use self::traits::{CostFunc, CostFuncCore};
pub use self::weighted_nlls::WeightedNLLSCostFunc;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fitbench::cost_func::prelude::*;
//
// to import the cost function surface in a single line.

pub mod prelude {
    pub use super::factory::{create_cost_func, create_nlls_cost_func};
    pub use super::traits::CostFunc;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::{
        cost_func::CostFunc,
        hessian::AnalyticHessian,
        jacobian::{AnalyticJacobian, Jacobian},
        problem::{FittingProblem, FunctionProblem},
        types::Params,
    };
    use ndarray::{Array1, Array2, Array3, ArrayView1, array};
    use std::rc::Rc;

    /// `f(x, p) = x + p0` on x = [1, 8, 11], y = [6, 10, 20], with analytic
    /// Jacobian (ones) and Hessian (zeros). The concrete handle exposes the
    /// model evaluation counter.
    pub(crate) fn linear_problem(
        e: Option<Array1<f64>>,
    ) -> (Rc<dyn FittingProblem>, Rc<FunctionProblem>) {
        let mut builder = FunctionProblem::builder(
            "linear",
            array![1.0, 8.0, 11.0],
            array![6.0, 10.0, 20.0],
            |p: &Params, x: ArrayView1<'_, f64>| Ok((&x + p[0]).into_dyn()),
        )
        .jacobian(|x: ArrayView1<'_, f64>, _p: &Params| Ok(Array2::ones((x.len(), 1))))
        .hessian(|x: ArrayView1<'_, f64>, _p: &Params| Ok(Array3::zeros((1, 1, x.len()))));
        if let Some(e) = e {
            builder = builder.errors(e);
        }
        let concrete = Rc::new(builder.build().expect("valid fixture"));
        let shared: Rc<dyn FittingProblem> = concrete.clone();
        (shared, concrete)
    }

    /// Attach analytic Jacobian and Hessian engines.
    pub(crate) fn attach_analytic(cost: &mut dyn CostFunc) {
        let problem = cost.problem().clone();
        let jacobian: Rc<dyn Jacobian> =
            Rc::new(AnalyticJacobian::new(problem.clone()).expect("analytic Jacobian"));
        cost.set_jacobian(jacobian);
        cost.set_hessian(Box::new(AnalyticHessian::new(problem).expect("analytic Hessian")));
    }
}

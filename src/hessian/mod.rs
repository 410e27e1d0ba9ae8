//! hessian — model Hessian engines and their registry.
//!
//! Purpose
//! -------
//! Provide second derivatives of the model, `[n_params, n_params, n_obs]`,
//! either analytically or by differencing a Jacobian engine, and combine
//! them with residuals into the cost Hessian of least-squares costs.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every engine returns a Hessian symmetric in its first two axes.
//! - Numerical engines share the cost function's Jacobian engine.
//!
//! Downstream usage
//! ----------------
//! - Controllers call `resolve_hessian(method, num_method, problem, jac)`
//!   and attach the result with `CostFunc::set_hessian`.
pub mod analytic;
pub mod best_available;
pub mod factory;
pub mod numdifftools;
pub mod scipy;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::analytic::AnalyticHessian;
pub use self::best_available::BestAvailableHessian;
pub use self::factory::{HessianEntry, create_hessian, registered_hessians, resolve_hessian};
pub use self::numdifftools::NumdifftoolsHessian;
pub use self::scipy::{SCIPY_HESSIAN_INCOMPATIBLE_PROBLEMS, ScipyHessian};
pub use self::traits::{Hessian, HessianKind};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fitbench::hessian::prelude::*;
//
// to import the Hessian surface in a single line.

pub mod prelude {
    pub use super::factory::{create_hessian, resolve_hessian};
    pub use super::traits::{Hessian, HessianKind};
}

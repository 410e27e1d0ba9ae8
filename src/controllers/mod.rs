//! controllers — reference minimizer loop built on argmin.
//!
//! Purpose
//! -------
//! Drive a [`CostFunc`](crate::cost_func::CostFunc) to a minimum with
//! argmin solvers, the way a benchmarking controller would: resolve the
//! cost function and derivative engines from configuration keys, check the
//! minimizer against the cost function's algorithm-type restrictions, run
//! the solver, and report a normalized outcome.
//!
//! Key behaviors
//! -------------
//! - [`CostFuncAdapter`] exposes `eval_cost`/`jac_cost` as argmin's
//!   `CostFunction`/`Gradient`, finite-differencing the cost when the
//!   attached Jacobian is a `default`/`solver` marker.
//! - [`ALGORITHM_CHECK`] publishes the algorithm types of every minimizer.
//! - [`fit`] runs L-BFGS (More–Thuente or Hager–Zhang line search),
//!   Nelder–Mead or steepest descent.
//! - [`standard_errors`] derives parameter uncertainties from `hes_cost`.
//!
//! Conventions
//! -----------
//! - Options are validated at construction (`Tolerances::new`,
//!   `FitOptions::new`); argmin errors are converted into `FitError`.
//! - With feature `obs_slog` and `FitOptions::verbose`, iterations are
//!   logged to the terminal through argmin's slog observer.
pub mod adapter;
pub mod algorithm_check;
pub mod api;
pub mod builders;
pub mod options;
pub mod run;
pub mod types;
pub mod uncertainty;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adapter::CostFuncAdapter;
pub use self::algorithm_check::{ALGORITHM_CHECK, minimizers_of_type};
pub use self::api::{CostFuncConfig, build_cost_func, fit};
pub use self::options::{FitOptions, FitOutcome, LineSearcher, Minimizer, Tolerances};
pub use self::run::run_solver;
pub use self::types::{DEFAULT_LBFGS_MEM, DEFAULT_SIMPLEX_SCALE, FnEvalMap};
pub use self::uncertainty::{parameter_covariance, standard_errors};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fitbench::controllers::prelude::*;
//
// to import the controller surface in a single line.

pub mod prelude {
    pub use super::api::{CostFuncConfig, build_cost_func, fit};
    pub use super::options::{FitOptions, FitOutcome, Minimizer, Tolerances};
    pub use super::uncertainty::standard_errors;
}

//! jacobian — model Jacobian engines and their registry.
//!
//! Purpose
//! -------
//! Provide every way the fitting core can obtain `∂f/∂p`: the problem's own
//! analytic derivative, finite differences (forward, central, complex step,
//! optionally sparse), adaptive Richardson differencing, marker engines that
//! defer to the minimizer, and a best-available wrapper.
//!
//! Key behaviors
//! -------------
//! - [`traits::Jacobian`] is the single polymorphic interface; engines are
//!   shared between a cost function and its Hessian as `Rc<dyn Jacobian>`.
//! - [`factory`] maps configuration keys to constructors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Jacobians are of the model, `(n_obs_flat × n_params)`; residual chain
//!   rules are applied by the cost functions.
//! - Engines cache only the unperturbed model value, keyed on exact
//!   parameter equality, and only for the problem's own x.
//!
//! Downstream usage
//! ----------------
//! - Controllers call `resolve_jacobian(jac_method, num_method, problem)`
//!   and attach the result to a cost function.
//! - Controllers consult `use_default_jac`/`use_solver_jac` to decide
//!   whether to hand derivative work to the minimizer.

pub mod analytic;
pub mod best_available;
pub mod default;
pub mod factory;
pub mod numdifftools;
pub mod scipy;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::analytic::AnalyticJacobian;
pub use self::best_available::BestAvailableJacobian;
pub use self::default::{DefaultJacobian, SolverJacobian};
pub use self::factory::{JacobianEntry, create_jacobian, registered_jacobians, resolve_jacobian};
pub use self::numdifftools::NumdifftoolsJacobian;
pub use self::scipy::{SCIPY_INCOMPATIBLE_PROBLEMS, ScipyJacobian};
pub use self::traits::{Jacobian, JacobianKind, VectorFn};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fitbench::jacobian::prelude::*;
//
// to import the Jacobian surface in a single line.

pub mod prelude {
    pub use super::factory::{create_jacobian, resolve_jacobian};
    pub use super::traits::{Jacobian, JacobianKind};
}

//! problem — the fitting-problem abstraction consumed by the fitting core.
//!
//! Purpose
//! -------
//! Define what a parsed benchmark problem must provide (data, a model and
//! optional analytic derivatives) and ship one concrete implementation built
//! from closures.
//!
//! Key behaviors
//! -------------
//! - [`traits::FittingProblem`] is the only contract cost functions and
//!   derivative engines rely on.
//! - [`function_problem::FunctionProblem`] wraps user closures, validates
//!   the data once and counts model evaluations.
//!
//! Invariants & assumptions
//! ------------------------
//! - Problems are shared read-only via `Rc<dyn FittingProblem>` between a
//!   cost function and its Jacobian/Hessian engines.
//! - Vector-valued models are flattened row-major everywhere downstream.
//!
//! Downstream usage
//! ----------------
//! - Parsers implement `FittingProblem` for their own types.
//! - Tests and bindings construct `FunctionProblem` through its builder.

pub mod function_problem;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::function_problem::{FunctionProblem, FunctionProblemBuilder};
pub use self::traits::{FittingProblem, flatten, flatten_view};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fitbench::problem::prelude::*;
//
// to import the problem surface in a single line.

pub mod prelude {
    pub use super::function_problem::FunctionProblem;
    pub use super::traits::FittingProblem;
}

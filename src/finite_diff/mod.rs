//! finite_diff — numerical differentiation shared by the derivative engines.
//!
//! Purpose
//! -------
//! Collect every numerical differencing scheme the Jacobian and Hessian
//! engines need behind small, fallible functions, so that the engines only
//! decide *what* to differentiate and never touch step sizes or the
//! `finitediff` API directly.
//!
//! Key behaviors
//! -------------
//! - `fd`: forward/central Jacobians through `finitediff`, dense or
//!   restricted to a sparsity pattern, with error capture and baseline reuse.
//! - `complex_step`: complex-step Jacobians and hybrid complex-step Hessians
//!   on a problem's complex model.
//! - `richardson`: step-sequence differencing with Richardson extrapolation.
//! - `sparsity`: greedy grouping of structurally orthogonal columns.
//! - `validation`: shape checks and exact symmetrization of residual
//!   Hessians.
//!
//! Invariants & assumptions
//! ------------------------
//! - Differentiated functions return flattened model outputs of a fixed
//!   length; a change of length is an error, not a panic.
//! - Jacobians are `(n_outputs × n_params)`; residual Hessians are
//!   `[n_params, n_params, n_outputs]`.
//!
//! Testing notes
//! -------------
//! - Each submodule checks its scheme against closed-form derivatives of
//!   small smooth models.

pub mod complex_step;
pub mod fd;
pub mod richardson;
pub mod sparsity;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::complex_step::{COMPLEX_STEP, complex_step_hessian, complex_step_jacobian};
pub use self::fd::{
    FD_METHODS, FdMethod, fd_jacobian, fd_jacobian_sparse, stack_to_residual_hessian,
};
pub use self::richardson::{ND_METHODS, NdMethod, RichardsonConfig, richardson_jacobian};
pub use self::sparsity::SparsityPattern;
pub use self::validation::{
    symmetrize_residual_hessian, validate_jacobian_shape, validate_residual_hessian,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_fitbench::finite_diff::prelude::*;
//
// to import the differencing schemes in a single line.

pub mod prelude {
    pub use super::fd::FdMethod;
    pub use super::richardson::NdMethod;
    pub use super::sparsity::SparsityPattern;
}

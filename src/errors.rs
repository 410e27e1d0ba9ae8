//! errors — unified error surface for cost functions, derivatives and controllers.
//!
//! Purpose
//! -------
//! Collect every failure the fitting core can raise into a single enum,
//! [`FitError`], with a crate-wide result alias [`FitResult<T>`]. Each
//! variant maps onto a coarse [`ErrorKind`] so that a benchmarking driver can
//! record a stable failure reason against a fit attempt and move on to the
//! next (problem, cost function, Jacobian, minimizer) combination.
//!
//! Key behaviors
//! -------------
//! - Group variants by origin: cost-function data checks, Jacobian and
//!   Hessian availability, compatibility checks, model evaluation, and the
//!   reference argmin controller.
//! - Provide [`FitError::kind`] and [`ErrorKind::as_str`] for reporting.
//! - Convert `argmin::core::Error` into [`FitError`], recovering a
//!   [`FitError`] that was raised inside an argmin callback unchanged.
//!
//! Invariants & assumptions
//! ------------------------
//! - Errors are raised synchronously at the point of detection and are never
//!   retried inside the crate.
//! - No variant carries non-`Send`/`Sync` data, so a [`FitError`] can travel
//!   through argmin's `anyhow`-based error type and back.
//!
//! Conventions
//! -----------
//! - Messages are lower-level diagnostics; controllers should key off
//!   [`ErrorKind`] rather than string matching on `Display` output.
use argmin::core::{ArgminError, Error};

/// Crate-wide result alias.
pub type FitResult<T> = Result<T, FitError>;

/// Coarse failure classes surfaced to controllers and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CostFunc,
    NoJacobian,
    NoHessian,
    NoSparseJacobian,
    SparseJacobianIsDense,
    IncompatibleMinimizer,
    IncompatibleCostFunction,
    ModelEvaluation,
    Derivative,
    Unsupported,
    Controller,
}

impl ErrorKind {
    /// Stable failure-reason tag recorded against a fit attempt.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CostFunc => "cost_func_error",
            ErrorKind::NoJacobian => "no_jacobian",
            ErrorKind::NoHessian => "no_hessian",
            ErrorKind::NoSparseJacobian => "no_sparse_jacobian",
            ErrorKind::SparseJacobianIsDense => "sparse_jacobian_is_dense",
            ErrorKind::IncompatibleMinimizer => "incompatible_minimizer",
            ErrorKind::IncompatibleCostFunction => "incompatible_cost_function",
            ErrorKind::ModelEvaluation => "model_evaluation",
            ErrorKind::Derivative => "derivative_error",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Controller => "controller_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    // ---- Cost function ----
    /// x, y (and e when weighting is used) must share their leading length.
    LengthMismatch {
        x_len: usize,
        y_len: usize,
        e_len: Option<usize>,
    },
    /// Model output shape must equal the shape of the y data.
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Residuals requested with only one of x and y overridden.
    PartialDataOverride,
    /// A weighted cost function was used on a problem without errors.
    MissingErrors {
        cost_func: &'static str,
    },
    /// Data supplied to a cost function is outside its domain.
    NegativeData {
        index: usize,
        value: f64,
    },
    /// Observational data failed a construction-time check.
    InvalidData {
        what: &'static str,
        index: usize,
        value: f64,
        reason: &'static str,
    },
    /// The cost function registry has no entry for this key.
    UnknownCostFunc {
        name: String,
    },
    /// No Jacobian/Hessian has been attached to the cost function yet.
    DerivativeNotAttached {
        slot: &'static str,
        cost_func: &'static str,
    },

    // ---- Jacobian ----
    NoJacobian {
        reason: String,
    },
    UnknownJacobian {
        name: String,
    },
    InvalidJacobianMethod {
        engine: &'static str,
        method: String,
        valid: &'static [&'static str],
    },
    NoSparseJacobian {
        reason: String,
    },
    SparseJacobianIsDense,
    JacobianShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    // ---- Hessian ----
    NoHessian {
        reason: String,
    },
    UnknownHessian {
        name: String,
    },
    InvalidHessianMethod {
        engine: &'static str,
        method: String,
        valid: &'static [&'static str],
    },
    HessianShapeMismatch {
        expected: (usize, usize, usize),
        found: Vec<usize>,
    },

    // ---- Derivative engines ----
    /// Complex-step schemes need the problem to evaluate on complex parameters.
    ComplexModelUnavailable {
        problem: String,
    },
    /// Faer rejected the triplets of a sparse matrix.
    SparseConstruction {
        text: String,
    },
    /// Operation not provided by this implementation.
    NotSupported {
        owner: String,
        operation: &'static str,
    },

    // ---- Compatibility ----
    IncompatibleMinimizer {
        minimizer: String,
        algorithm_type: String,
        cost_func: &'static str,
    },
    IncompatibleCostFunction {
        cost_func: &'static str,
        reason: &'static str,
    },

    // ---- Model ----
    ModelEvaluation {
        text: String,
    },

    // ---- Controller options ----
    UnknownMinimizer {
        name: String,
    },
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    NoTolerancesProvided,
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },
    InvalidSimplexScale {
        value: f64,
        reason: &'static str,
    },

    // ---- Controller outcome ----
    NonFiniteCost {
        value: f64,
    },
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },
    InvalidParamsHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },
    MissingParamsHat,
    InvalidCostHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Argmin ----
    InvalidParameter {
        text: String,
    },
    NotImplemented {
        text: String,
    },
    NotInitialized {
        text: String,
    },
    ConditionViolated {
        text: String,
    },
    CheckPointNotFound {
        text: String,
    },
    PotentialBug {
        text: String,
    },
    ImpossibleError {
        text: String,
    },
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl FitError {
    /// Failure class used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FitError::LengthMismatch { .. }
            | FitError::ShapeMismatch { .. }
            | FitError::PartialDataOverride
            | FitError::MissingErrors { .. }
            | FitError::NegativeData { .. }
            | FitError::InvalidData { .. }
            | FitError::UnknownCostFunc { .. }
            | FitError::DerivativeNotAttached { .. } => ErrorKind::CostFunc,

            FitError::NoJacobian { .. }
            | FitError::UnknownJacobian { .. }
            | FitError::InvalidJacobianMethod { .. } => ErrorKind::NoJacobian,
            FitError::NoSparseJacobian { .. } => ErrorKind::NoSparseJacobian,
            FitError::SparseJacobianIsDense => ErrorKind::SparseJacobianIsDense,

            FitError::NoHessian { .. }
            | FitError::UnknownHessian { .. }
            | FitError::InvalidHessianMethod { .. } => ErrorKind::NoHessian,

            FitError::JacobianShapeMismatch { .. }
            | FitError::HessianShapeMismatch { .. }
            | FitError::ComplexModelUnavailable { .. }
            | FitError::SparseConstruction { .. } => ErrorKind::Derivative,
            FitError::NotSupported { .. } => ErrorKind::Unsupported,

            FitError::IncompatibleMinimizer { .. } => ErrorKind::IncompatibleMinimizer,
            FitError::IncompatibleCostFunction { .. } => ErrorKind::IncompatibleCostFunction,

            FitError::ModelEvaluation { .. } => ErrorKind::ModelEvaluation,

            _ => ErrorKind::Controller,
        }
    }
}

impl std::error::Error for FitError {}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Cost function ----
            FitError::LengthMismatch { x_len, y_len, e_len: None } => {
                write!(
                    f,
                    "The length of the x and y are not the same, len(x)={x_len} and len(y)={y_len}."
                )
            }
            FitError::LengthMismatch { x_len, y_len, e_len: Some(e_len) } => {
                write!(
                    f,
                    "The length of the x, y and e are not the same, len(x)={x_len}, \
                     len(y)={y_len} and len(e)={e_len}."
                )
            }
            FitError::ShapeMismatch { expected, found } => {
                write!(f, "Model output shape {found:?} does not match data shape {expected:?}")
            }
            FitError::PartialDataOverride => {
                write!(f, "Residuals could not be computed with only one of x and y.")
            }
            FitError::MissingErrors { cost_func } => {
                write!(f, "Cost function '{cost_func}' requires data errors (e), none provided")
            }
            FitError::NegativeData { index, value } => {
                write!(
                    f,
                    "This cost function is designed for use with positive experimental values, \
                     found y[{index}] = {value}; try again with a different cost function."
                )
            }
            FitError::InvalidData { what, index, value, reason } => {
                write!(f, "Invalid {what} at index {index}: {value}: {reason}")
            }
            FitError::UnknownCostFunc { name } => {
                write!(f, "Could not find cost function class with type as {name}.")
            }
            FitError::DerivativeNotAttached { slot, cost_func } => {
                write!(f, "No {slot} attached to cost function '{cost_func}'")
            }

            // ---- Jacobian ----
            FitError::NoJacobian { reason } => write!(f, "No Jacobian available: {reason}"),
            FitError::UnknownJacobian { name } => {
                write!(f, "Could not find Jacobian class with type as {name}.")
            }
            FitError::InvalidJacobianMethod { engine, method, valid } => {
                write!(f, "Invalid method '{method}' for {engine} Jacobian; valid: {valid:?}")
            }
            FitError::NoSparseJacobian { reason } => {
                write!(f, "No sparse Jacobian available: {reason}")
            }
            FitError::SparseJacobianIsDense => {
                write!(f, "The declared sparse Jacobian is not a sparse matrix")
            }
            FitError::JacobianShapeMismatch { expected, found } => {
                write!(f, "Jacobian shape mismatch: expected {expected:?}, found {found:?}")
            }

            // ---- Hessian ----
            FitError::NoHessian { reason } => write!(f, "No Hessian available: {reason}"),
            FitError::UnknownHessian { name } => {
                write!(f, "Could not find Hessian class with type as {name}.")
            }
            FitError::InvalidHessianMethod { engine, method, valid } => {
                write!(f, "Invalid method '{method}' for {engine} Hessian; valid: {valid:?}")
            }
            FitError::HessianShapeMismatch { expected, found } => {
                write!(f, "Hessian shape mismatch: expected {expected:?}, found {found:?}")
            }

            // ---- Derivative engines ----
            FitError::ComplexModelUnavailable { problem } => {
                write!(f, "Problem '{problem}' cannot evaluate its model on complex parameters")
            }
            FitError::SparseConstruction { text } => {
                write!(f, "Sparse matrix construction failed: {text}")
            }
            FitError::NotSupported { owner, operation } => {
                write!(f, "'{operation}' is not supported by {owner}")
            }

            // ---- Compatibility ----
            FitError::IncompatibleMinimizer { minimizer, algorithm_type, cost_func } => {
                write!(
                    f,
                    "The minimizer chosen ({minimizer}) is of algorithm type '{algorithm_type}', \
                     which is not compatible with the '{cost_func}' cost function."
                )
            }
            FitError::IncompatibleCostFunction { cost_func, reason } => {
                write!(f, "Problem is incompatible with cost function '{cost_func}': {reason}")
            }

            // ---- Model ----
            FitError::ModelEvaluation { text } => write!(f, "Model evaluation failed: {text}"),

            // ---- Controller options ----
            FitError::UnknownMinimizer { name } => write!(f, "Unknown minimizer '{name}'"),
            FitError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            FitError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            FitError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            FitError::NoTolerancesProvided => write!(f, "No tolerances provided"),
            FitError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            FitError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            FitError::InvalidSimplexScale { value, reason } => {
                write!(f, "Invalid initial simplex scale {value}: {reason}")
            }

            // ---- Controller outcome ----
            FitError::NonFiniteCost { value } => write!(f, "Non-finite cost value: {value}"),
            FitError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            FitError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }
            FitError::InvalidParamsHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            FitError::MissingParamsHat => write!(f, "Missing estimated parameters"),
            FitError::InvalidCostHessian { row, col, value } => {
                write!(f, "Invalid cost Hessian at ({row}, {col}): {value}, must be finite")
            }

            // ---- Argmin ----
            FitError::InvalidParameter { text } => write!(f, "Invalid parameter: {text}"),
            FitError::NotImplemented { text } => write!(f, "Not implemented: {text}"),
            FitError::NotInitialized { text } => write!(f, "Not initialized: {text}"),
            FitError::ConditionViolated { text } => write!(f, "Condition violated: {text}"),
            FitError::CheckPointNotFound { text } => write!(f, "Checkpoint not found: {text}"),
            FitError::PotentialBug { text } => write!(f, "Potential bug: {text}"),
            FitError::ImpossibleError { text } => write!(f, "Impossible error: {text}"),
            FitError::BackendError { text } => write!(f, "Backend error: {text}"),

            // ---- Fallback ----
            FitError::UnknownError => write!(f, "Unknown error"),
        }
    }
}

impl From<Error> for FitError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<FitError>() {
            Ok(fit_err) => return fit_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => FitError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => FitError::NotImplemented { text },
                ArgminError::NotInitialized { text } => FitError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => FitError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => FitError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => FitError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => FitError::ImpossibleError { text },
                _ => FitError::UnknownError,
            },
            Err(err) => FitError::BackendError { text: err.to_string() },
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<FitError> for pyo3::PyErr {
    fn from(err: FitError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Mapping of variants onto the reporting taxonomy (`ErrorKind`).
    // - Round-tripping a `FitError` through argmin's error type.
    // - Conversion of native argmin errors.
    //
    // They intentionally DO NOT cover:
    // - Where each error is raised (tested beside the raising code).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check that the taxonomy groups cost-function, Jacobian and Hessian
    // failures into their documented kinds.
    //
    // Given
    // -----
    // - One representative variant per kind.
    //
    // Expect
    // ------
    // - `kind()` returns the matching `ErrorKind` and a stable tag.
    fn kind_maps_variants_onto_taxonomy() {
        // Arrange
        let cases = [
            (FitError::UnknownCostFunc { name: "normal".into() }, ErrorKind::CostFunc),
            (FitError::NegativeData { index: 0, value: -1.0 }, ErrorKind::CostFunc),
            (FitError::UnknownJacobian { name: "foo".into() }, ErrorKind::NoJacobian),
            (FitError::UnknownHessian { name: "foo".into() }, ErrorKind::NoHessian),
            (FitError::NoSparseJacobian { reason: "none".into() }, ErrorKind::NoSparseJacobian),
            (FitError::SparseJacobianIsDense, ErrorKind::SparseJacobianIsDense),
            (
                FitError::IncompatibleMinimizer {
                    minimizer: "nelder_mead".into(),
                    algorithm_type: "simplex".into(),
                    cost_func: "loglike_nlls",
                },
                ErrorKind::IncompatibleMinimizer,
            ),
        ];

        // Act / Assert
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "wrong kind for {err:?}");
        }
        assert_eq!(ErrorKind::NoJacobian.as_str(), "no_jacobian");
    }

    #[test]
    // Purpose
    // -------
    // Ensure a `FitError` raised inside an argmin callback is recovered intact.
    //
    // Given
    // -----
    // - A `FitError::NonFiniteCost` converted into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - Converting back yields the identical variant.
    fn fit_error_round_trips_through_argmin_error() {
        // Arrange
        let original = FitError::NonFiniteCost { value: f64::INFINITY };
        let wrapped: Error = original.clone().into();

        // Act
        let recovered = FitError::from(wrapped);

        // Assert
        assert_eq!(recovered, original);
    }

    #[test]
    // Purpose
    // -------
    // Verify that native argmin errors map onto their wrapper variants.
    //
    // Given
    // -----
    // - An `ArgminError::InvalidParameter`.
    //
    // Expect
    // ------
    // - `FitError::InvalidParameter` with the same text and a controller kind.
    fn argmin_invalid_parameter_maps_to_wrapper() {
        // Arrange
        let wrapped: Error = ArgminError::InvalidParameter { text: "bad tol".into() }.into();

        // Act
        let err = FitError::from(wrapped);

        // Assert
        match &err {
            FitError::InvalidParameter { text } => assert_eq!(text, "bad tol"),
            other => panic!("Expected InvalidParameter, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Controller);
    }
}

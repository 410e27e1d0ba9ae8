//! controllers::options — minimizer selection, tolerances and fit results.
//!
//! - [`Minimizer`]: the argmin solvers the reference controller can run.
//! - [`LineSearcher`]: line search used by the L-BFGS variants.
//! - [`Tolerances`] and [`FitOptions`]: validated run configuration.
//! - [`FitOutcome`]: normalized result returned by [`fit`](super::api::fit).
//!
//! Convention: the controller *minimizes* `CostFunc::eval_cost` directly, so
//! the reported `cost` is the objective value itself (no sign flip).
use crate::{
    controllers::{
        types::{DEFAULT_SIMPLEX_SCALE, FnEvalMap},
        validation::{validate_cost, validate_params_hat, verify_tol_cost, verify_tol_grad},
    },
    errors::{FitError, FitResult},
    types::Params,
};
use argmin::core::{TerminationReason, TerminationStatus};
use std::{fmt, str::FromStr};

/// Line-search algorithm used inside L-BFGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(FitError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Minimizers offered by the reference controller.
///
/// The string keys are the ones listed in
/// [`ALGORITHM_CHECK`](super::algorithm_check::ALGORITHM_CHECK) and are what
/// `CostFunc::validate_algorithm_type` is called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Minimizer {
    Lbfgs(LineSearcher),
    NelderMead,
    SteepestDescent,
}

impl Minimizer {
    pub const ALL: [Minimizer; 4] = [
        Minimizer::Lbfgs(LineSearcher::MoreThuente),
        Minimizer::Lbfgs(LineSearcher::HagerZhang),
        Minimizer::NelderMead,
        Minimizer::SteepestDescent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Minimizer::Lbfgs(LineSearcher::MoreThuente) => "lbfgs_more_thuente",
            Minimizer::Lbfgs(LineSearcher::HagerZhang) => "lbfgs_hager_zhang",
            Minimizer::NelderMead => "nelder_mead",
            Minimizer::SteepestDescent => "steepest_descent",
        }
    }

    /// `true` for minimizers that call `Gradient::gradient`.
    pub fn uses_gradient(&self) -> bool {
        !matches!(self, Minimizer::NelderMead)
    }
}

impl fmt::Display for Minimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Minimizer {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_lowercase();
        Minimizer::ALL
            .into_iter()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| FitError::UnknownMinimizer { name: s.to_string() })
    }
}

/// Stopping criteria.
///
/// - `tol_grad`: L-BFGS gradient-norm tolerance; also accepted as a
///   convergence signal for steepest descent.
/// - `tol_cost`: L-BFGS cost-change tolerance and Nelder–Mead simplex
///   standard-deviation tolerance.
/// - `max_iter`: iteration cap for every minimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - [`FitError::NoTolerancesProvided`] if every field is `None`.
    /// - [`FitError::InvalidTolCost`] / [`FitError::InvalidTolGrad`] for
    ///   non-finite or non-positive tolerances.
    /// - [`FitError::InvalidMaxIter`] for `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> FitResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(FitError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(FitError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-8), tol_cost: None, max_iter: Some(1000) }
    }
}

/// Run configuration for [`fit`](super::api::fit).
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub tols: Tolerances,
    pub lbfgs_mem: Option<usize>,
    /// Relative edge length of the initial Nelder–Mead simplex.
    pub simplex_scale: f64,
    pub verbose: bool,
}

impl FitOptions {
    /// # Errors
    /// - [`FitError::InvalidLBFGSMem`] for `lbfgs_mem == Some(0)`.
    /// - [`FitError::InvalidSimplexScale`] unless `simplex_scale` is finite
    ///   and positive.
    pub fn new(
        tols: Tolerances, lbfgs_mem: Option<usize>, simplex_scale: Option<f64>, verbose: bool,
    ) -> FitResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(FitError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        let simplex_scale = simplex_scale.unwrap_or(DEFAULT_SIMPLEX_SCALE);
        if !simplex_scale.is_finite() || simplex_scale <= 0.0 {
            return Err(FitError::InvalidSimplexScale {
                value: simplex_scale,
                reason: "Simplex scale must be finite and positive.",
            });
        }
        Ok(Self { tols, lbfgs_mem, simplex_scale, verbose })
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            lbfgs_mem: None,
            simplex_scale: DEFAULT_SIMPLEX_SCALE,
            verbose: false,
        }
    }
}

/// Result of a controller run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub params: Params,
    pub cost: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    pub minimizer: Minimizer,
}

impl FitOutcome {
    /// Normalize argmin's final state.
    ///
    /// A run counts as converged when the solver reports `SolverConverged` or
    /// `TargetCostReached`, or when it stopped for another reason with a
    /// final gradient norm at or below `tol_grad`.
    ///
    /// # Errors
    /// [`FitError::MissingParamsHat`] / [`FitError::InvalidParamsHat`] for a
    /// missing or non-finite estimate, [`FitError::NonFiniteCost`] for a
    /// non-finite cost.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params_hat: Option<Params>, cost: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad_norm: Option<f64>, tol_grad: Option<f64>, minimizer: Minimizer,
    ) -> FitResult<Self> {
        let params = validate_params_hat(params_hat)?;
        validate_cost(cost)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => {
                let solver_converged = matches!(
                    reason,
                    TerminationReason::SolverConverged | TerminationReason::TargetCostReached
                );
                let small_gradient = match (grad_norm, tol_grad) {
                    (Some(norm), Some(tol)) => norm <= tol,
                    _ => false,
                };
                (solver_converged || small_gradient, format!("{reason:?}"))
            }
        };
        Ok(Self {
            params,
            cost,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
            minimizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - String parsing of minimizers and line searches.
    // - Validation performed by `Tolerances::new` and `FitOptions::new`.
    // - The convergence rule applied by `FitOutcome::new`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Minimizer keys parse case-insensitively and round-trip through
    // `as_str`.
    //
    // Given
    // -----
    // - Every key in `Minimizer::ALL`, "NELDER_MEAD", and "bfgs".
    //
    // Expect
    // ------
    // - Round trip for every key; "bfgs" fails with `UnknownMinimizer`.
    fn minimizer_keys_parse() {
        // Arrange / Act / Assert
        for m in Minimizer::ALL {
            assert_eq!(m.as_str().parse::<Minimizer>().unwrap(), m);
        }
        assert_eq!("NELDER_MEAD".parse::<Minimizer>().unwrap(), Minimizer::NelderMead);
        assert_eq!(
            "bfgs".parse::<Minimizer>().expect_err("unknown"),
            FitError::UnknownMinimizer { name: "bfgs".to_string() }
        );
        assert_eq!("HagerZhang".parse::<LineSearcher>().unwrap(), LineSearcher::HagerZhang);
        assert!("wolfe".parse::<LineSearcher>().is_err());
    }

    #[test]
    // Purpose
    // -------
    // Option constructors reject empty or degenerate settings.
    //
    // Given
    // -----
    // - No tolerances at all, `max_iter = 0`, `lbfgs_mem = 0`, and a negative
    //   simplex scale.
    //
    // Expect
    // ------
    // - The matching error for each.
    fn options_reject_degenerate_settings() {
        // Arrange / Act / Assert
        assert_eq!(Tolerances::new(None, None, None), Err(FitError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(FitError::InvalidMaxIter { max_iter: 0, .. })
        ));
        let tols = Tolerances::new(Some(1e-6), None, Some(50)).unwrap();
        assert!(matches!(
            FitOptions::new(tols, Some(0), None, false),
            Err(FitError::InvalidLBFGSMem { mem: 0, .. })
        ));
        assert!(matches!(
            FitOptions::new(tols, None, Some(-1.0), false),
            Err(FitError::InvalidSimplexScale { .. })
        ));
        let opts = FitOptions::new(tols, Some(5), None, false).unwrap();
        assert_eq!(opts.simplex_scale, DEFAULT_SIMPLEX_SCALE);
    }

    #[test]
    // Purpose
    // -------
    // Max-iteration stops only count as converged with a small gradient.
    //
    // Given
    // -----
    // - Two `MaxItersReached` outcomes, with gradient norms 1e-10 and 1.0
    //   and `tol_grad = 1e-8`, and one `SolverConverged` outcome.
    //
    // Expect
    // ------
    // - Converged, not converged, converged.
    fn convergence_rule() {
        // Arrange
        let stopped = TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        let build = |status: TerminationStatus, norm: f64| {
            FitOutcome::new(
                Some(array![1.0]),
                0.5,
                status,
                10,
                FnEvalMap::new(),
                Some(norm),
                Some(1e-8),
                Minimizer::SteepestDescent,
            )
            .unwrap()
        };

        // Act
        let small = build(stopped.clone(), 1e-10);
        let large = build(stopped, 1.0);
        let solved = build(TerminationStatus::Terminated(TerminationReason::SolverConverged), 1.0);

        // Assert
        assert!(small.converged);
        assert!(!large.converged);
        assert!(solved.converged);
        assert_eq!(small.iterations, 10);
    }
}

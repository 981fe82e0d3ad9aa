//! ARIMA(p, d, q) estimation and forecasting.
//!
//! The series is differenced `d` times and an ARMA(p, q) process is fitted
//! to the result by exact Gaussian maximum likelihood. The likelihood is
//! evaluated with a Kalman filter over the Harvey state-space form and the
//! innovation variance is concentrated out, leaving only the AR and MA
//! coefficients (plus a mean when `d == 0`) for the optimizer.
//!
//! Coefficients are searched in an unconstrained space and mapped through
//! partial autocorrelations, so every candidate model is stationary and
//! invertible.

use std::f64::consts::PI;

use accident_forecast_forecast_models::{ArimaOrder, ModelConfig, ModelSummary};

use crate::ModelFitError;
use crate::optimize::{Minimum, NelderMead};

/// An unfitted ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArimaModel {
    order: ArimaOrder,
    optimizer: NelderMead,
}

/// A fitted ARIMA model, ready to forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArima {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: Option<f64>,
    sigma2: f64,
    log_likelihood: f64,
    observations: usize,
    iterations: usize,
    /// Last value of each differencing level `0..d`, used to integrate
    /// forecasts back to the original scale.
    level_tails: Vec<f64>,
    /// One-step-ahead predicted state after the final observation.
    state: Vec<f64>,
}

impl ArimaModel {
    /// Creates a model from the configured order and optimizer settings.
    #[must_use]
    pub const fn new(config: &ModelConfig) -> Self {
        Self {
            order: config.order,
            optimizer: NelderMead {
                max_iterations: config.max_iterations,
                tolerance: config.tolerance,
            },
        }
    }

    /// Fits the model to `values` by maximum likelihood.
    ///
    /// # Errors
    ///
    /// Returns [`ModelFitError`] if the series is too short, contains
    /// non-finite values, is constant after differencing, or the optimizer
    /// fails to converge.
    pub fn fit(&self, values: &[f64]) -> Result<FittedArima, ModelFitError> {
        let ArimaOrder { p, d, q } = self.order;

        let required = self.order.min_observations();
        if values.len() < required {
            return Err(ModelFitError::InsufficientData {
                observations: values.len(),
                required,
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ModelFitError::NonFiniteValue { index });
        }

        let levels = difference_levels(values, d);
        let level_tails: Vec<f64> = levels[..d]
            .iter()
            .map(|level| level.last().copied().unwrap_or_default())
            .collect();
        let stationary = &levels[d];

        let (center, spread) = mean_and_std(stationary);
        if spread <= 1e-9 * center.abs().max(1.0) {
            return Err(ModelFitError::Degenerate {
                reason: format!(
                    "series is constant after {d} difference(s) (value {center})"
                ),
            });
        }

        let include_mean = d == 0;
        let params = Params { p, q, include_mean };

        let mut steps = vec![0.5; p + q];
        if include_mean {
            steps.push(spread);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = stationary.len() as f64;
        let objective = |x: &[f64]| {
            let (ar, ma, mean) = params.unpack(x);
            kalman_filter(stationary, &ar, &ma, mean)
                .map_or(f64::INFINITY, |run| run.concentrated_objective() / n)
        };

        let mut best: Option<Minimum> = None;
        let mut exhausted = 0;
        for mut start in starting_points(p + q) {
            if include_mean {
                start.push(center);
            }
            let candidate = self.optimizer.minimize(&objective, &start, &steps);
            if !candidate.converged {
                exhausted = exhausted.max(candidate.iterations);
                continue;
            }
            if best.as_ref().is_none_or(|b| candidate.value < b.value) {
                best = Some(candidate);
            }
        }
        let Some(mut minimum) = best else {
            return Err(ModelFitError::DidNotConverge {
                iterations: exhausted,
            });
        };

        // A collapsed simplex may sit on a ridge; restart from its best
        // vertex until the objective stops improving.
        for _ in 0..MAX_RESTARTS {
            let restarted = self.optimizer.minimize(&objective, &minimum.point, &steps);
            let gain = minimum.value - restarted.value;
            let improved = restarted.converged
                && gain > self.optimizer.tolerance * (1.0 + minimum.value.abs());
            minimum.iterations += restarted.iterations;
            if !improved {
                break;
            }
            minimum.point = restarted.point;
            minimum.value = restarted.value;
        }

        let (ar, ma, mean) = params.unpack(&minimum.point);
        let run = kalman_filter(stationary, &ar, &ma, mean).ok_or_else(|| {
            ModelFitError::Degenerate {
                reason: "likelihood is undefined at the optimum".to_string(),
            }
        })?;

        let sigma2 = run.sigma2();
        let log_likelihood = run.log_likelihood();
        if !sigma2.is_finite() || sigma2 <= 0.0 || !log_likelihood.is_finite() {
            return Err(ModelFitError::Degenerate {
                reason: format!("innovation variance {sigma2} is not positive"),
            });
        }

        Ok(FittedArima {
            order: self.order,
            ar,
            ma,
            mean: include_mean.then_some(mean),
            sigma2,
            log_likelihood,
            observations: stationary.len(),
            iterations: minimum.iterations,
            level_tails,
            state: run.state,
        })
    }
}

impl FittedArima {
    /// Point forecasts for the next `horizon` periods on the original scale.
    #[must_use]
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let transition = Transition::new(&self.ar, self.state.len());
        let mean = self.mean.unwrap_or(0.0);

        let mut state = self.state.clone();
        let mut forecasts = Vec::new();
        for _ in 0..horizon {
            forecasts.push(state[0] + mean);
            state = transition.apply(&state);
        }

        for tail in self.level_tails.iter().rev() {
            forecasts = integrate(&forecasts, *tail);
        }
        forecasts
    }

    /// Autoregressive coefficients, lag 1 first.
    #[must_use]
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// Moving-average coefficients, lag 1 first.
    #[must_use]
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Innovation variance.
    #[must_use]
    pub const fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Maximised log-likelihood.
    #[must_use]
    pub const fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Number of estimated parameters, including the innovation variance.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.ar.len() + self.ma.len() + usize::from(self.mean.is_some()) + 1
    }

    /// Akaike information criterion.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aic(&self) -> f64 {
        2.0f64.mul_add(self.parameter_count() as f64, -2.0 * self.log_likelihood)
    }

    /// Bayesian information criterion.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bic(&self) -> f64 {
        (self.parameter_count() as f64)
            .mul_add((self.observations as f64).ln(), -2.0 * self.log_likelihood)
    }

    /// Serializable summary of the fit.
    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            order: self.order,
            ar_coefficients: self.ar.clone(),
            ma_coefficients: self.ma.clone(),
            mean: self.mean,
            sigma2: self.sigma2,
            log_likelihood: self.log_likelihood,
            aic: self.aic(),
            bic: self.bic(),
            observations: self.observations,
            iterations: self.iterations,
        }
    }
}

/// Restarts from the best vertex after the first search converges.
const MAX_RESTARTS: usize = 5;

/// Unconstrained coordinate used for the off-origin starting points. Maps to
/// a partial autocorrelation of about 0.89.
const SEED_LEVEL: f64 = 2.0;

/// Coefficient counts up to this size are seeded with the full
/// `{-SEED_LEVEL, 0, SEED_LEVEL}` grid.
const FULL_GRID_COEFFICIENTS: usize = 3;

/// Starting points for the coefficient search, origin first.
///
/// The ARMA likelihood has local optima where AR and MA roots nearly cancel,
/// and seasonal series often peak near the invertibility boundary. Small
/// orders are seeded on a full grid, larger ones along each axis and both
/// diagonals.
fn starting_points(coefficients: usize) -> Vec<Vec<f64>> {
    let levels = [0.0, -SEED_LEVEL, SEED_LEVEL];
    if coefficients <= FULL_GRID_COEFFICIENTS {
        let mut points = vec![Vec::with_capacity(coefficients)];
        for _ in 0..coefficients {
            points = points
                .into_iter()
                .flat_map(|prefix| {
                    levels.iter().map(move |&level| {
                        let mut point = prefix.clone();
                        point.push(level);
                        point
                    })
                })
                .collect();
        }
        return points;
    }

    let mut points = vec![vec![0.0; coefficients]];
    for axis in 0..coefficients {
        for level in [-SEED_LEVEL, SEED_LEVEL] {
            let mut point = vec![0.0; coefficients];
            point[axis] = level;
            points.push(point);
        }
    }
    points.push(vec![SEED_LEVEL; coefficients]);
    points.push(vec![-SEED_LEVEL; coefficients]);
    points
}

/// Layout of the optimizer's parameter vector.
#[derive(Debug, Clone, Copy)]
struct Params {
    p: usize,
    q: usize,
    include_mean: bool,
}

impl Params {
    /// Maps unconstrained optimizer coordinates to (AR, MA, mean).
    fn unpack(self, x: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
        let ar = constrain_stationary(&x[..self.p]);
        let negated: Vec<f64> = x[self.p..self.p + self.q].iter().map(|v| -v).collect();
        let ma = constrain_stationary(&negated).into_iter().map(|v| -v).collect();
        let mean = if self.include_mean {
            x[self.p + self.q]
        } else {
            0.0
        };
        (ar, ma, mean)
    }
}

/// Maps unconstrained values to the coefficients of a stationary AR
/// polynomial via partial autocorrelations and the Durbin–Levinson
/// recursion.
pub(crate) fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let mut coeffs: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for (k, &u) in unconstrained.iter().enumerate() {
        let partial = u / u.mul_add(u, 1.0).sqrt();
        let previous = coeffs.clone();
        coeffs.push(partial);
        for j in 0..k {
            coeffs[j] = partial.mul_add(-previous[k - 1 - j], previous[j]);
        }
    }
    coeffs
}

/// Returns `[y, Δy, Δ²y, …, Δᵈy]`.
fn difference_levels(values: &[f64], d: usize) -> Vec<Vec<f64>> {
    let mut levels = Vec::with_capacity(d + 1);
    let mut current = values.to_vec();
    for _ in 0..d {
        let next: Vec<f64> = current.windows(2).map(|w| w[1] - w[0]).collect();
        levels.push(current);
        current = next;
    }
    levels.push(current);
    levels
}

/// Cumulative sum of `diffs` starting from `last`.
fn integrate(diffs: &[f64], last: f64) -> Vec<f64> {
    diffs
        .iter()
        .scan(last, |acc, diff| {
            *acc += diff;
            Some(*acc)
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// State transition of the Harvey form: AR coefficients down the first
/// column and an identity shifted one place right.
struct Transition {
    first_column: Vec<f64>,
}

impl Transition {
    fn new(ar: &[f64], dim: usize) -> Self {
        let mut first_column = vec![0.0; dim];
        first_column[..ar.len()].copy_from_slice(ar);
        Self { first_column }
    }

    fn dim(&self) -> usize {
        self.first_column.len()
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        if j == 0 {
            self.first_column[i]
        } else if j == i + 1 {
            1.0
        } else {
            0.0
        }
    }

    fn apply(&self, state: &[f64]) -> Vec<f64> {
        let r = self.dim();
        (0..r)
            .map(|i| {
                let shifted = if i + 1 < r { state[i + 1] } else { 0.0 };
                self.first_column[i].mul_add(state[0], shifted)
            })
            .collect()
    }

    /// `T · P · Tᵀ`.
    fn sandwich(&self, p: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let r = self.dim();
        let tp: Vec<Vec<f64>> = (0..r)
            .map(|i| {
                (0..r)
                    .map(|j| (0..r).map(|k| self.get(i, k) * p[k][j]).sum())
                    .collect()
            })
            .collect();
        (0..r)
            .map(|i| {
                (0..r)
                    .map(|j| (0..r).map(|k| tp[i][k] * self.get(j, k)).sum())
                    .collect()
            })
            .collect()
    }
}

/// Result of one pass of the Kalman filter with unit innovation variance.
struct FilterRun {
    /// Σ vₜ² / Fₜ.
    weighted_squares: f64,
    /// Σ ln Fₜ.
    log_det: f64,
    observations: usize,
    /// Predicted state for the period after the last observation.
    state: Vec<f64>,
}

impl FilterRun {
    #[allow(clippy::cast_precision_loss)]
    fn sigma2(&self) -> f64 {
        self.weighted_squares / self.observations as f64
    }

    /// Negative concentrated log-likelihood without constant terms.
    #[allow(clippy::cast_precision_loss)]
    fn concentrated_objective(&self) -> f64 {
        0.5 * (self.observations as f64).mul_add(self.sigma2().ln(), self.log_det)
    }

    #[allow(clippy::cast_precision_loss)]
    fn log_likelihood(&self) -> f64 {
        let n = self.observations as f64;
        -0.5 * n * ((2.0 * PI).ln() + 1.0) - self.concentrated_objective()
    }
}

/// Runs the Kalman filter for a zero-mean ARMA model on `values - mean`.
///
/// Returns `None` when the stationary state covariance cannot be computed
/// or a prediction variance is not positive.
fn kalman_filter(values: &[f64], ar: &[f64], ma: &[f64], mean: f64) -> Option<FilterRun> {
    let r = ar.len().max(ma.len() + 1);
    let transition = Transition::new(ar, r);

    let mut loading = vec![0.0; r];
    loading[0] = 1.0;
    loading[1..=ma.len()].copy_from_slice(ma);
    let noise: Vec<Vec<f64>> = loading
        .iter()
        .map(|a| loading.iter().map(|b| a * b).collect())
        .collect();

    let mut state = vec![0.0; r];
    let mut cov = stationary_covariance(&transition, &noise)?;

    let mut weighted_squares = 0.0;
    let mut log_det = 0.0;

    for &value in values {
        let f = cov[0][0];
        if !f.is_finite() || f <= 0.0 {
            return None;
        }
        let innovation = value - mean - state[0];
        weighted_squares += innovation * innovation / f;
        log_det += f.ln();

        let gain: Vec<f64> = (0..r).map(|i| cov[i][0] / f).collect();
        let updated_state: Vec<f64> = (0..r)
            .map(|i| gain[i].mul_add(innovation, state[i]))
            .collect();
        let updated_cov: Vec<Vec<f64>> = (0..r)
            .map(|i| (0..r).map(|j| cov[i][j] - gain[i] * cov[0][j]).collect())
            .collect();

        state = transition.apply(&updated_state);
        cov = transition.sandwich(&updated_cov);
        for i in 0..r {
            for j in 0..r {
                cov[i][j] += noise[i][j];
            }
        }
    }

    Some(FilterRun {
        weighted_squares,
        log_det,
        observations: values.len(),
        state,
    })
}

/// Solves `P = T P Tᵀ + Q` for the unconditional state covariance.
fn stationary_covariance(transition: &Transition, noise: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let r = transition.dim();
    let size = r * r;

    let mut system = vec![vec![0.0; size + 1]; size];
    for i in 0..r {
        for j in 0..r {
            let row = i * r + j;
            for k in 0..r {
                for l in 0..r {
                    system[row][k * r + l] -= transition.get(i, k) * transition.get(j, l);
                }
            }
            system[row][row] += 1.0;
            system[row][size] = noise[i][j];
        }
    }

    let solution = solve(system)?;
    Some(solution.chunks(r).map(<[f64]>::to_vec).collect())
}

/// Gaussian elimination with partial pivoting on an augmented matrix.
fn solve(mut augmented: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = augmented.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| {
            augmented[a][col]
                .abs()
                .total_cmp(&augmented[b][col].abs())
        })?;
        if augmented[pivot][col].abs() < 1e-12 {
            return None;
        }
        augmented.swap(col, pivot);

        for row in col + 1..n {
            let factor = augmented[row][col] / augmented[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                augmented[row][k] -= factor * augmented[col][k];
            }
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| augmented[row][k] * x[k]).sum();
        x[row] = (augmented[row][n] - tail) / augmented[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

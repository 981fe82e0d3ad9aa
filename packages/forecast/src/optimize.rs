//! Derivative-free minimisation with the Nelder–Mead simplex method.
//!
//! Used to maximise the ARIMA likelihood. The search is fully deterministic:
//! the same objective, start point, and settings always visit the same
//! points in the same order.

/// Outcome of a minimisation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best point found.
    pub point: Vec<f64>,
    /// Objective value at [`point`](Minimum::point).
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the simplex collapsed within tolerance before the iteration
    /// budget ran out.
    pub converged: bool,
}

/// Nelder–Mead settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    /// Iteration budget.
    pub max_iterations: usize,
    /// Convergence threshold on the spread of objective values across the
    /// simplex, relative to `1 + |best|`.
    pub tolerance: f64,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimises `objective` starting from `start`.
    ///
    /// `steps` gives the initial simplex edge length along each axis and must
    /// have the same length as `start`. Non-finite objective values are
    /// treated as `+inf`, so the objective may signal infeasible points by
    /// returning `f64::INFINITY` or `NaN`.
    pub fn minimize<F>(&self, objective: F, start: &[f64], steps: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() { v } else { f64::INFINITY }
        };

        let n = start.len();
        if n == 0 {
            return Minimum {
                point: Vec::new(),
                value: eval(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += steps.get(i).copied().unwrap_or(1.0);
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|x| eval(x.as_slice())).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            order(&mut simplex, &mut values);

            let best = values[0];
            let worst = values[n];
            if best.is_finite() && (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                converged = true;
                break;
            }

            iterations += 1;

            let centroid = centroid(&simplex[..n]);
            let reflected = along(&centroid, &simplex[n], -REFLECTION);
            let f_reflected = eval(reflected.as_slice());

            if f_reflected < values[0] {
                let expanded = along(&centroid, &reflected, EXPANSION);
                let f_expanded = eval(expanded.as_slice());
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            let (contracted, accept_below) = if f_reflected < values[n] {
                (along(&centroid, &reflected, CONTRACTION), f_reflected)
            } else {
                (along(&centroid, &simplex[n], CONTRACTION), values[n])
            };
            let f_contracted = eval(contracted.as_slice());
            if f_contracted < accept_below {
                simplex[n] = contracted;
                values[n] = f_contracted;
                continue;
            }

            let anchor = simplex[0].clone();
            for (vertex, value) in simplex.iter_mut().zip(values.iter_mut()).skip(1) {
                *vertex = along(&anchor, vertex.as_slice(), SHRINK);
                *value = eval(vertex.as_slice());
            }
        }

        order(&mut simplex, &mut values);

        Minimum {
            point: simplex.swap_remove(0),
            value: values[0],
            iterations,
            converged,
        }
    }
}

/// Sorts vertices by ascending objective value. The sort is stable so ties
/// keep their previous order.
fn order(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut paired: Vec<(Vec<f64>, f64)> = simplex.drain(..).zip(values.drain(..)).collect();
    paired.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (vertex, value) in paired {
        simplex.push(vertex);
        values.push(value);
    }
}

fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let dim = vertices[0].len();
    #[allow(clippy::cast_precision_loss)]
    let count = vertices.len() as f64;
    (0..dim)
        .map(|i| vertices.iter().map(|v| v[i]).sum::<f64>() / count)
        .collect()
}

/// `origin + scale * (target - origin)`.
fn along(origin: &[f64], target: &[f64], scale: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, t)| o + scale * (t - o))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: NelderMead = NelderMead {
        max_iterations: 5_000,
        tolerance: 1e-14,
    };

    #[test]
    fn finds_quadratic_minimum() {
        let result = SETTINGS.minimize(
            |x| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2),
            &[0.0, 0.0],
            &[0.5, 0.5],
        );
        assert!(result.converged);
        assert!((result.point[0] - 3.0).abs() < 1e-4, "{:?}", result.point);
        assert!((result.point[1] + 1.0).abs() < 1e-4, "{:?}", result.point);
    }

    #[test]
    fn finds_rosenbrock_minimum() {
        let rosenbrock = |x: &[f64]| 100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2);
        let result = SETTINGS.minimize(rosenbrock, &[-1.2, 1.0], &[0.5, 0.5]);
        assert!(result.converged);
        assert!((result.point[0] - 1.0).abs() < 1e-3, "{:?}", result.point);
        assert!((result.point[1] - 1.0).abs() < 1e-3, "{:?}", result.point);
    }

    #[test]
    fn avoids_infeasible_region() {
        // Infinite outside x > 0; minimum of (x - 2)^2 lies inside.
        let result = SETTINGS.minimize(
            |x| if x[0] <= 0.0 { f64::NAN } else { (x[0] - 2.0).powi(2) },
            &[1.0],
            &[0.5],
        );
        assert!(result.converged);
        assert!((result.point[0] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn reports_exhausted_budget() {
        let settings = NelderMead {
            max_iterations: 3,
            tolerance: 1e-14,
        };
        let result = settings.minimize(|x| x[0].powi(2) + x[1].powi(2), &[5.0, 5.0], &[1.0, 1.0]);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn zero_dimensional_problem_is_trivially_converged() {
        let result = SETTINGS.minimize(|_| 4.0, &[], &[]);
        assert!(result.converged);
        assert!((result.value - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn is_deterministic() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[0] * x[1] - 1.0).powi(2);
        let a = SETTINGS.minimize(f, &[0.0, 0.0], &[0.5, 0.5]);
        let b = SETTINGS.minimize(f, &[0.0, 0.0], &[0.5, 0.5]);
        assert_eq!(a, b);
    }
}

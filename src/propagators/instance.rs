/*
    CR3BP validator, consistency checks for Earth-Moon periodic orbits
    Copyright (C) 2024 Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::error_ctrl::ErrorCtrl;
use super::{
    IntegrationDetails, InvalidDurationSnafu, MaxStepsReachedSnafu, NonFiniteStateSnafu,
    PropagationError, Propagator, RadauIIA5, StepSizeUnderflowSnafu, TooManyAttemptsSnafu,
};
use crate::dynamics::Dynamics;
use crate::linalg::{Matrix6, SMatrix, SVector, Vector6};
use snafu::ensure;

/// Largest growth of the step size between two accepted steps
const MAX_FACTOR: f64 = 8.0;
/// Largest reduction of the step size after a rejected step
const MIN_FACTOR: f64 = 0.2;

/// Stacked stage increments (Z1, Z2, Z3) of the three Radau stages
type StageVector = SVector<f64, 18>;
type StageMatrix = SMatrix<f64, 18, 18>;

/// A propagation instance: a state being integrated by a given [`Propagator`].
///
/// The adapted step size is kept between calls so that successive calls to `for_duration` continue smoothly.
#[derive(Debug)]
pub struct PropInstance<'a, D: Dynamics, E: ErrorCtrl> {
    /// The state of this propagator instance
    pub state: Vector6<f64>,
    /// Non-dimensional time of the state, starting at zero
    pub t: f64,
    /// The propagator setup (dynamics and options)
    pub prop: &'a Propagator<D, E>,
    /// Stores the details of the previous integration step
    pub details: IntegrationDetails,
    pub(crate) step_size: Option<f64>, // Stores the adapted step magnitude for the _next_ call
    pub(crate) steps: usize,           // Steps attempted during the current call
}

impl<'a, D: Dynamics, E: ErrorCtrl> PropInstance<'a, D, E> {
    /// Allows setting the magnitude of the next step of the propagator
    pub fn set_step(&mut self, step_size: f64) {
        self.step_size = Some(step_size.abs());
    }

    /// Propagates the dynamics for the provided duration, which may be negative. Returns the final state.
    ///
    /// Fails if the integrator cannot converge within its step budget: the result is never silently approximated.
    pub fn for_duration(&mut self, duration: f64) -> Result<Vector6<f64>, PropagationError> {
        ensure!(duration.is_finite(), InvalidDurationSnafu { duration });
        ensure!(
            self.state.iter().all(|v| v.is_finite()),
            NonFiniteStateSnafu { t: self.t }
        );
        if duration == 0.0 {
            return Ok(self.state);
        }

        let stop_time = self.t + duration;
        let dir = duration.signum();
        self.steps = 0;

        let mut step = match self.step_size {
            Some(step) => step.min(self.prop.opts.max_step),
            None => self.initial_step(duration)?,
        };

        loop {
            let remaining = stop_time - self.t;
            if remaining * dir <= 0.0 {
                // Reached the stop time
                self.step_size = Some(step);
                debug!(
                    "propagated {duration} until t = {stop_time} in {} steps",
                    self.steps
                );
                return Ok(self.state);
            }

            // Take one final step of exactly the needed duration until the stop time, also absorbing a
            // leftover which would be smaller than the minimum step
            let last = remaining.abs() - step <= self.prop.opts.min_step;
            let h = if last { remaining } else { dir * step };

            let (taken, next_step) = self.single_step(h)?;
            self.t = if last && taken == h {
                stop_time
            } else {
                self.t + taken
            };
            step = next_step;
        }
    }

    /// Propagates the dynamics until the provided time. Returns the end state.
    pub fn until_time(&mut self, end_time: f64) -> Result<Vector6<f64>, PropagationError> {
        let duration = end_time - self.t;
        self.for_duration(duration)
    }

    /// Propagates through each of the provided times, in order, and returns the state at each of them.
    pub fn through_times(&mut self, times: &[f64]) -> Result<Vec<Vector6<f64>>, PropagationError> {
        let mut states = Vec::with_capacity(times.len());
        for t in times {
            states.push(self.until_time(*t)?);
        }
        Ok(states)
    }

    /// Takes a single step of at most `h`, shrinking it until the error estimate is within tolerance.
    ///
    /// Returns the step actually taken and the proposed magnitude of the next step.
    pub fn single_step(&mut self, h: f64) -> Result<(f64, f64), PropagationError> {
        let opts = &self.prop.opts;
        let y0 = self.state;
        // The Jacobian is only evaluated once per step, at the start (simplified Newton)
        let (f0, jac) = self.prop.dynamics.dual_eom(self.t, &y0)?;

        let mut h = h;
        let mut rejected = false;
        self.details.attempts = 1;

        loop {
            self.steps += 1;
            ensure!(
                self.steps <= opts.max_steps,
                MaxStepsReachedSnafu {
                    max_steps: opts.max_steps,
                    t: self.t,
                    stop_time: self.t + h,
                }
            );
            ensure!(
                !rejected || h.abs() >= opts.min_step,
                StepSizeUnderflowSnafu {
                    step: h.abs(),
                    min_step: opts.min_step,
                    t: self.t,
                }
            );
            ensure!(
                self.details.attempts <= opts.attempts,
                TooManyAttemptsSnafu {
                    attempts: self.details.attempts,
                    t: self.t,
                }
            );

            let factor = match self.solve_stages(&y0, &jac, h) {
                None => {
                    debug!("stage solve did not converge with h = {h:e} at t = {}", self.t);
                    0.5
                }
                Some((z, newton_iterations)) => {
                    let candidate = y0 + z.fixed_rows::<6>(12);
                    let refine = rejected || self.details.step == 0.0;
                    let error = self
                        .error_estimate(&y0, &f0, &jac, &z, h, refine)
                        .map(|err_vec| E::estimate(&err_vec, &candidate, &y0, &opts.tolerances))
                        .filter(|err| err.is_finite());

                    match error {
                        Some(error) if error <= 1.0 && candidate.iter().all(|v| v.is_finite()) => {
                            self.state = candidate;
                            self.details.step = h;
                            self.details.error = error;
                            self.details.newton_iterations = newton_iterations;

                            let mut next = h.abs() * self.step_factor(error).min(MAX_FACTOR);
                            if rejected {
                                // Do not grow right after a rejection
                                next = next.min(h.abs());
                            }
                            trace!("t = {} {}", self.t + h, self.details);
                            return Ok((h, next.min(opts.max_step)));
                        }
                        Some(error) => self.step_factor(error).max(MIN_FACTOR),
                        None => MIN_FACTOR,
                    }
                }
            };

            // Error is too high and we aren't using the smallest step, so let's adapt the step size.
            rejected = true;
            self.details.attempts = self.details.attempts.saturating_add(1);
            h *= factor;
        }
    }

    /// Copy the details of the latest integration step.
    pub fn latest_details(&self) -> IntegrationDetails {
        self.details
    }

    /// Step size factor from a normalized error
    fn step_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            MAX_FACTOR
        } else {
            self.prop.opts.safety * error.powf(-1.0 / (f64::from(RadauIIA5::ERROR_ORDER) + 1.0))
        }
    }

    /// Solves the implicit stage equations `Z = h (A ⊗ I) F(y0 + Z)` with a simplified Newton iteration.
    ///
    /// Returns the stage increments and the number of iterations, or None if the iteration diverged.
    fn solve_stages(
        &self,
        y0: &Vector6<f64>,
        jac: &Matrix6<f64>,
        h: f64,
    ) -> Option<(StageVector, u8)> {
        let opts = &self.prop.opts;
        let a = RadauIIA5::a_coeffs();
        let c = RadauIIA5::c_coeffs();

        // Iteration matrix I - h (A ⊗ J)
        let mut iter_mat = StageMatrix::identity();
        for i in 0..3 {
            for j in 0..3 {
                let mut block = iter_mat.fixed_view_mut::<6, 6>(6 * i, 6 * j);
                block -= jac * (h * a[(i, j)]);
            }
        }
        let lu = iter_mat.lu();

        let scale = Vector6::from_fn(|k, _| opts.tolerances.scale(y0[k]));
        let newton_tol = opts.newton_tolerance();

        let mut z = StageVector::zeros();
        let mut prev_norm: Option<f64> = None;

        for iteration in 1..=opts.max_newton_iter {
            let mut stage_f = [Vector6::zeros(); 3];
            for (i, fi) in stage_f.iter_mut().enumerate() {
                let yi = y0 + z.fixed_rows::<6>(6 * i);
                *fi = self.prop.dynamics.eom(self.t + c[i] * h, &yi).ok()?;
            }

            let mut residual = StageVector::zeros();
            for i in 0..3 {
                let mut ri = -z.fixed_rows::<6>(6 * i).into_owned();
                for (j, fj) in stage_f.iter().enumerate() {
                    ri += fj * (h * a[(i, j)]);
                }
                residual.fixed_rows_mut::<6>(6 * i).copy_from(&ri);
            }

            let dz = lu.solve(&residual)?;
            z += dz;

            let mut sum = 0.0;
            for i in 0..3 {
                sum += dz.fixed_rows::<6>(6 * i).component_div(&scale).norm_squared();
            }
            let dz_norm = (sum / 18.0).sqrt();
            if !dz_norm.is_finite() {
                return None;
            }

            match prev_norm {
                Some(prev) => {
                    let theta = dz_norm / prev;
                    if theta >= 0.99 {
                        return None;
                    }
                    if theta / (1.0 - theta) * dz_norm <= newton_tol {
                        return Some((z, iteration));
                    }
                }
                None => {
                    if dz_norm <= f64::EPSILON {
                        return Some((z, iteration));
                    }
                }
            }
            prev_norm = Some(dz_norm);
        }
        None
    }

    /// Embedded error estimate of the step, filtered through `(gamma0 / h - J)^-1` to remain bounded on stiff
    /// components. When `refine` is set (first step or after a rejection), a large estimate is improved with one
    /// more evaluation of the dynamics.
    fn error_estimate(
        &self,
        y0: &Vector6<f64>,
        f0: &Vector6<f64>,
        jac: &Matrix6<f64>,
        z: &StageVector,
        h: f64,
        refine: bool,
    ) -> Option<Vector6<f64>> {
        let e = RadauIIA5::e_coeffs();
        let ez = (z.fixed_rows::<6>(0) * e[0] + z.fixed_rows::<6>(6) * e[1] + z.fixed_rows::<6>(12) * e[2]) / h;

        let lu = (Matrix6::identity() * (RadauIIA5::gamma0() / h) - jac).lu();
        let err_vec = lu.solve(&(f0 + ez))?;

        let candidate = y0 + z.fixed_rows::<6>(12);
        if refine && E::estimate(&err_vec, &candidate, y0, &self.prop.opts.tolerances) > 1.0 {
            if let Ok(f_pert) = self.prop.dynamics.eom(self.t, &(y0 + err_vec)) {
                return lu.solve(&(f_pert + ez));
            }
        }
        Some(err_vec)
    }

    /// Initial step, following Hairer, Norsett & Wanner, Solving Ordinary Differential Equations I, II.4.
    fn initial_step(&self, duration: f64) -> Result<f64, PropagationError> {
        let opts = &self.prop.opts;
        let y0 = self.state;
        let f0 = self.prop.dynamics.eom(self.t, &y0)?;

        let scale = Vector6::from_fn(|k, _| opts.tolerances.scale(y0[k]));
        let rms = |v: &Vector6<f64>| (v.component_div(&scale).norm_squared() / 6.0).sqrt();

        let d0 = rms(&y0);
        let d1 = rms(&f0);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        }
        .min(duration.abs());

        let dir = duration.signum();
        let y1 = y0 + f0 * (dir * h0);
        let f1 = self.prop.dynamics.eom(self.t + dir * h0, &y1)?;
        let d2 = rms(&(f1 - f0)) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (f64::from(RadauIIA5::ERROR_ORDER) + 1.0))
        };

        Ok((100.0 * h0).min(h1).min(duration.abs()).min(opts.max_step))
    }
}

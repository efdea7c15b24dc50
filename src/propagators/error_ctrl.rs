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

use super::Tolerances;
use crate::linalg::Vector6;

/// The Error Control trait manages how a propagator computes the error in the current step.
///
/// The returned value is normalized by the tolerances: a step is accepted when the estimate is at most one.
pub trait ErrorCtrl: Copy + Default + Send + Sync {
    /// Computes the normalized error of the step from `cur_state` to `candidate` given the local error estimate.
    fn estimate(
        error_est: &Vector6<f64>,
        candidate: &Vector6<f64>,
        cur_state: &Vector6<f64>,
        tolerances: &Tolerances,
    ) -> f64;
}

/// Weight of each component, using the largest magnitude of the two states.
fn weights(candidate: &Vector6<f64>, cur_state: &Vector6<f64>, tolerances: &Tolerances) -> Vector6<f64> {
    Vector6::from_fn(|i, _| tolerances.scale(candidate[i].abs().max(cur_state[i].abs())))
}

/// A weighted root mean square error control, as in Hairer's RADAU5 code.
///
/// This is the default: every component contributes, each weighted by its own tolerance.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedRmsStep;

impl ErrorCtrl for WeightedRmsStep {
    fn estimate(
        error_est: &Vector6<f64>,
        candidate: &Vector6<f64>,
        cur_state: &Vector6<f64>,
        tolerances: &Tolerances,
    ) -> f64 {
        let scaled = error_est.component_div(&weights(candidate, cur_state, tolerances));
        (scaled.norm_squared() / 6.0).sqrt()
    }
}

/// A weighted largest error control: the worst component drives the step size.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedMaxStep;

impl ErrorCtrl for WeightedMaxStep {
    fn estimate(
        error_est: &Vector6<f64>,
        candidate: &Vector6<f64>,
        cur_state: &Vector6<f64>,
        tolerances: &Tolerances,
    ) -> f64 {
        error_est
            .component_div(&weights(candidate, cur_state, tolerances))
            .amax()
    }
}

#[test]
fn test_error_ctrl() {
    let tol = Tolerances::new(1e-8, 1e-8);
    let cur = Vector6::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
    let candidate = cur;
    let err = Vector6::new(2e-8, 0.0, 0.0, 0.0, 0.0, 0.0);
    // Weight of the first component is 1e-8 + 1e-8 * 1.0
    assert!((WeightedMaxStep::estimate(&err, &candidate, &cur, &tol) - 1.0).abs() < 1e-12);
    assert!((WeightedRmsStep::estimate(&err, &candidate, &cur, &tol) - (1.0f64 / 6.0).sqrt()).abs() < 1e-12);
    assert_eq!(
        WeightedRmsStep::estimate(&Vector6::zeros(), &candidate, &cur, &tol),
        0.0
    );
}

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

use crate::linalg::{Vector3, Vector6};

/// Returns the radii vector of a Cartesian state
pub fn radii(state: &Vector6<f64>) -> Vector3<f64> {
    state.fixed_rows::<3>(0).into_owned()
}

/// Returns the velocity vector of a Cartesian state
pub fn velocity(state: &Vector6<f64>) -> Vector3<f64> {
    state.fixed_rows::<3>(3).into_owned()
}

/// Returns the root sum squared (RSS) position and velocity errors between two states.
///
/// This is the Euclidean norm of the position residual and of the velocity residual, in non-dimensional units.
pub fn rss_state_errors(prop: &Vector6<f64>, truth: &Vector6<f64>) -> (f64, f64) {
    let err = prop - truth;
    (radii(&err).norm(), velocity(&err).norm())
}

/// Returns the first index `i` at which `times[i + 1] <= times[i]`, if any.
///
/// NaN values never compare as increasing and are therefore reported too.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn first_non_increasing(times: &[f64]) -> Option<usize> {
    times.windows(2).position(|pair| !(pair[1] > pair[0]))
}

#[test]
fn test_rss_state_errors() {
    use approx::assert_abs_diff_eq;

    let truth = Vector6::new(1.0, 2.0, 3.0, 0.1, 0.2, 0.3);
    let prop = Vector6::new(1.0, 2.0, 3.0 + 3.0, 0.1 + 4.0, 0.2, 0.3);
    let (pos, vel) = rss_state_errors(&prop, &truth);
    assert_abs_diff_eq!(pos, 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(vel, 4.0, epsilon = 1e-12);
    assert_eq!(rss_state_errors(&truth, &truth), (0.0, 0.0));
}

#[test]
fn test_first_non_increasing() {
    assert_eq!(first_non_increasing(&[0.0, 0.1, 0.2]), None);
    assert_eq!(first_non_increasing(&[0.0]), None);
    assert_eq!(first_non_increasing(&[]), None);
    assert_eq!(first_non_increasing(&[0.0, 0.0, 0.1]), Some(0));
    assert_eq!(first_non_increasing(&[0.0, 0.1, 0.05]), Some(1));
    assert_eq!(first_non_increasing(&[0.0, f64::NAN]), Some(0));
}

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

use crate::linalg::{Matrix3, Vector3};

/// Three stage Radau IIA collocation method, of order five, with an embedded error estimator of order three.
///
/// The method is L-stable and stiffly accurate: the last stage is the state at the end of the step.
/// Coefficients are those of Hairer & Wanner, Solving Ordinary Differential Equations II, section IV.8.
pub struct RadauIIA5;

impl RadauIIA5 {
    /// Order of the error estimator, used to adapt the step size
    pub const ERROR_ORDER: u8 = 3;

    /// Stage times as fractions of the step
    pub fn c_coeffs() -> Vector3<f64> {
        let sq6 = 6.0_f64.sqrt();
        Vector3::new((4.0 - sq6) / 10.0, (4.0 + sq6) / 10.0, 1.0)
    }

    /// The A matrix of the Butcher tableau
    pub fn a_coeffs() -> Matrix3<f64> {
        let sq6 = 6.0_f64.sqrt();
        Matrix3::new(
            (88.0 - 7.0 * sq6) / 360.0,
            (296.0 - 169.0 * sq6) / 1800.0,
            (-2.0 + 3.0 * sq6) / 225.0,
            (296.0 + 169.0 * sq6) / 1800.0,
            (88.0 + 7.0 * sq6) / 360.0,
            (-2.0 - 3.0 * sq6) / 225.0,
            (16.0 - sq6) / 36.0,
            (16.0 + sq6) / 36.0,
            1.0 / 9.0,
        )
    }

    /// Weights of the stage increments in the embedded error estimate
    pub fn e_coeffs() -> Vector3<f64> {
        let sq6 = 6.0_f64.sqrt();
        Vector3::new(
            -(13.0 + 7.0 * sq6) / 3.0,
            (-13.0 + 7.0 * sq6) / 3.0,
            -1.0 / 3.0,
        )
    }

    /// Inverse of the real eigenvalue of A: the error estimate solves `(gamma0 / h - J) err = ...`
    pub fn gamma0() -> f64 {
        30.0 / (6.0 + 81.0_f64.cbrt() - 9.0_f64.cbrt())
    }
}

#[test]
fn test_radau_tableau() {
    let a = RadauIIA5::a_coeffs();
    let c = RadauIIA5::c_coeffs();
    // Consistency: c_i = sum_j a_ij
    for i in 0..3 {
        assert!((a.row(i).sum() - c[i]).abs() < 1e-14);
    }
    // Stiffly accurate: the weights are the last row and sum to one
    assert!((a.row(2).sum() - 1.0).abs() < 1e-14);
    // gamma0 is the real eigenvalue of A^-1
    let a_inv = a.try_inverse().unwrap();
    let eig = a_inv.complex_eigenvalues();
    assert!(eig
        .iter()
        .any(|l| (l.re - RadauIIA5::gamma0()).abs() < 1e-9 && l.im.abs() < 1e-9));
}

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

use std::fmt;

use super::{ErrorCtrl, WeightedRmsStep};
use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Relative and absolute integration tolerances, applied component wise as `atol + rtol * |y|`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerances {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    /// Error weight of a component whose magnitude is `magnitude`
    pub fn scale(&self, magnitude: f64) -> f64 {
        self.atol + self.rtol * magnitude.abs()
    }
}

impl Default for Tolerances {
    /// Both tolerances at 1e-8, as used to generate and validate the periodic orbit datasets.
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-8,
        }
    }
}

impl fmt::Display for Tolerances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rtol: {:e}, atol: {:e}", self.rtol, self.atol)
    }
}

/// PropOpts stores the integrator options: tolerances, step size limits, and the budgets after which the
/// integration is declared failed.
///
/// All durations are in non-dimensional CR3BP time units. Options are passed explicitly to each propagator so that
/// concurrent runs with different precision requirements never interfere.
#[derive(Clone, Copy, Debug, TypedBuilder)]
#[builder(doc)]
pub struct PropOpts<E: ErrorCtrl> {
    #[builder(default)]
    pub tolerances: Tolerances,
    /// Initial step, automatically selected from the initial derivatives when unset
    #[builder(default, setter(strip_option))]
    pub init_step: Option<f64>,
    #[builder(default = 1e-14)]
    pub min_step: f64,
    #[builder(default = f64::INFINITY)]
    pub max_step: f64,
    /// Maximum number of steps (accepted or rejected) for a single propagation
    #[builder(default = 100_000)]
    pub max_steps: usize,
    /// Maximum number of rejected attempts of a single step
    #[builder(default = 50)]
    pub attempts: u8,
    /// Maximum number of simplified Newton iterations per stage solve
    #[builder(default = 7)]
    pub max_newton_iter: u8,
    #[builder(default = 0.9)]
    pub safety: f64,
    #[builder(default)]
    pub error_ctrl: E,
}

impl<E: ErrorCtrl> PropOpts<E> {
    /// Set the maximum step size and clamps the initial step to that value if currently greater
    pub fn set_max_step(&mut self, max_step: f64) {
        if let Some(init_step) = self.init_step {
            if init_step > max_step {
                self.init_step = Some(max_step);
            }
        }
        self.max_step = max_step;
    }

    /// Tolerance of the Newton iteration on the scaled stage increments.
    pub(crate) fn newton_tolerance(&self) -> f64 {
        let rtol = self.tolerances.rtol;
        (10.0 * f64::EPSILON / rtol).max(rtol.sqrt().min(0.03))
    }
}

impl<E: ErrorCtrl> fmt::Display for PropOpts<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, min_step: {:e}, max_step: {:e}, max_steps: {}, attempts: {}",
            self.tolerances, self.min_step, self.max_step, self.max_steps, self.attempts,
        )
    }
}

impl PropOpts<WeightedRmsStep> {
    /// Returns the default options with specific tolerances.
    #[allow(clippy::field_reassign_with_default)]
    pub fn with_tolerances(rtol: f64, atol: f64) -> Self {
        let mut opts = Self::default();
        opts.tolerances = Tolerances::new(rtol, atol);
        opts
    }
}

impl Default for PropOpts<WeightedRmsStep> {
    fn default() -> PropOpts<WeightedRmsStep> {
        Self::builder().build()
    }
}

#[test]
fn test_options() {
    use super::error_ctrl::WeightedMaxStep;

    let opts: PropOpts<WeightedRmsStep> = Default::default();
    assert_eq!(opts.tolerances, Tolerances::new(1e-8, 1e-8));
    assert!(opts.init_step.is_none());
    assert_eq!(opts.max_steps, 100_000);
    assert_eq!(opts.attempts, 50);
    assert!(opts.max_step.is_infinite());
    assert!((opts.newton_tolerance() - 1e-4).abs() < 1e-12);

    let opts = PropOpts::with_tolerances(1e-10, 1e-12);
    assert!((opts.tolerances.rtol - 1e-10).abs() < f64::EPSILON);
    assert!((opts.tolerances.atol - 1e-12).abs() < f64::EPSILON);

    let mut opts = PropOpts::builder()
        .init_step(0.5)
        .error_ctrl(WeightedMaxStep {})
        .build();
    opts.set_max_step(0.1);
    assert_eq!(opts.init_step, Some(0.1));
    assert_eq!(opts.max_step, 0.1);
}

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

use snafu::prelude::*;
use std::fmt;

/// Provides different methods for controlling the error computation of the integrator.
pub mod error_ctrl;
pub use self::error_ctrl::*;

// Re-Export
mod instance;
pub use instance::*;
mod propagator;
pub use propagator::*;
mod radau;
pub use radau::*;
mod options;
pub use options::*;

use crate::dynamics::DynamicsError;

/// Stores the details of the previous integration step of a given propagator. Access as `my_prop.latest_details()`.
#[derive(Copy, Clone, Debug, Default)]
pub struct IntegrationDetails {
    /// step size used, in non-dimensional time units
    pub step: f64,
    /// normalized error in the previous integration step (accepted when at most one)
    pub error: f64,
    /// number of attempts needed by an adaptive step size to be within the tolerance
    pub attempts: u8,
    /// number of Newton iterations needed to solve the implicit stages
    pub newton_iterations: u8,
}

impl fmt::Display for IntegrationDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IntegrationDetails {{step: {:.3e}, error: {:.3e}, attempts: {}, newton: {}}}",
            self.step, self.error, self.attempts, self.newton_iterations
        )
    }
}

/// Reasons why the adaptive integrator could not reach its target time.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display("encountered a dynamics error {source}"))]
    Dynamics { source: DynamicsError },
    #[snafu(display("step budget of {max_steps} steps exhausted at t = {t} before reaching {stop_time}"))]
    MaxStepsReached {
        max_steps: usize,
        t: f64,
        stop_time: f64,
    },
    #[snafu(display("step size {step:e} below minimum of {min_step:e} at t = {t}"))]
    StepSizeUnderflow { step: f64, min_step: f64, t: f64 },
    #[snafu(display("too many rejected attempts ({attempts}) at t = {t}"))]
    TooManyAttempts { attempts: u8, t: f64 },
    #[snafu(display("state became non finite at t = {t}"))]
    NonFiniteState { t: f64 },
    #[snafu(display("requested propagation for a non finite duration {duration}"))]
    InvalidDuration { duration: f64 },
}

impl From<DynamicsError> for PropagationError {
    fn from(source: DynamicsError) -> Self {
        Self::Dynamics { source }
    }
}

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

/*! # cr3bp-validator

Consistency checks for generated periodic orbits of the Earth-Moon Circular Restricted Three-Body Problem (CR3BP).

Each trajectory is re-propagated pair by pair through the CR3BP equations of motion with an implicit Radau IIA
integrator, and the recorded samples are compared against the propagated ones (the dynamical defect). The Jacobi
constant is also tracked along each trajectory to measure its drift. Batches of trajectories are validated through
the [`validation::ErrorAggregator`], which reports cumulative and per time step errors for each requested
[`validation::ErrorKind`].

```
use cr3bp_validator::cosmic::{jacobi, MassRatio};

let mu = MassRatio::earth_moon();
let l1_like = [0.8369, 0.0, 0.0, 0.0, 0.0, 0.0];
let energy = jacobi(&l1_like, mu).unwrap();
assert!(energy.jacobi.is_finite());
```
*/

/// Provides the implicit Radau IIA propagator and its options.
pub mod propagators;

/// Provides the CR3BP equations of motion.
pub mod dynamics;

/// Mass ratio, Earth-Moon constants, Lagrange points and the Jacobi constant.
pub mod cosmic;

/// Trajectory containers, consistency checks, batch aggregation and reporting.
pub mod validation;

/// Configuration files and batch loading.
pub mod io;

/// Utility functions shared by different modules.
pub mod utils;

mod errors;
/// Functions which may fail will return a `CheckError`.
pub use self::errors::CheckError;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::cosmic::{MassRatio, EARTH_MOON_MU};
pub use self::propagators::{propagate, PropOpts, Propagator, Tolerances};
pub use self::validation::{
    aggregate, dynamics_defect, energy_drift, AggregateCfg, ErrorAggregator, ErrorKind, ErrorReport,
    Trajectory, TrajectoryBatch,
};

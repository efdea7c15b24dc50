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

use snafu::ensure;

use crate::errors::{InvalidInputSnafu, NonMonotonicTimeSnafu, ShapeMismatchSnafu};
use crate::linalg::{DMatrix, Vector6};
use crate::utils::first_non_increasing;
use crate::CheckError;

/// Number of components of a synodic state
pub const STATE_SIZE: usize = 6;
/// Number of components of a timed state: the time followed by the synodic state
pub const TIMED_STATE_SIZE: usize = 7;

/// An ordered sequence of samples of one orbit, stored as a (components, timepoints) matrix.
///
/// Each column is a sample: either a synodic state (6 components) or a timed state (7 components, the time first).
/// The time axis of a timed trajectory is expected to be strictly increasing, see [`Trajectory::ensure_monotonic`].
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    data: DMatrix<f64>,
}

impl Trajectory {
    /// Wraps a (components, timepoints) matrix.
    pub fn new(data: DMatrix<f64>) -> Self {
        Self { data }
    }

    /// Builds a trajectory from its samples, one sample per item, like the rows of a (timepoints, components) table.
    ///
    /// All samples must have the same number of components.
    pub fn from_samples<S: AsRef<[f64]>>(samples: &[S]) -> Result<Self, CheckError> {
        let width = samples.first().map_or(0, |s| s.as_ref().len());
        for sample in samples {
            let got = sample.as_ref().len();
            ensure!(
                got == width,
                InvalidInputSnafu {
                    msg: format!("all samples must have {width} components but one has {got}")
                }
            );
        }
        Ok(Self::new(DMatrix::from_fn(width, samples.len(), |r, c| {
            samples[c].as_ref()[r]
        })))
    }

    /// Builds a six component trajectory from synodic states.
    pub fn from_states(states: &[Vector6<f64>]) -> Self {
        Self::new(DMatrix::from_fn(STATE_SIZE, states.len(), |r, c| {
            states[c][r]
        }))
    }

    /// Builds a seven component trajectory from the sample times and the synodic states.
    pub fn from_timed_states(times: &[f64], states: &[Vector6<f64>]) -> Result<Self, CheckError> {
        ensure!(
            times.len() == states.len(),
            InvalidInputSnafu {
                msg: format!(
                    "got {} sample times for {} states",
                    times.len(),
                    states.len()
                )
            }
        );
        Ok(Self::from_states(states).with_time_axis(times))
    }

    /// Number of components of each sample
    pub fn components(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the first component of each sample is the time
    pub fn has_time(&self) -> bool {
        self.components() == TIMED_STATE_SIZE
    }

    /// Returns the underlying (components, timepoints) matrix
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Offset of the synodic state within each sample: zero for six components, one for seven.
    pub fn state_offset(&self) -> Result<usize, CheckError> {
        match self.components() {
            STATE_SIZE => Ok(0),
            TIMED_STATE_SIZE => Ok(1),
            got => ShapeMismatchSnafu {
                expected: "6 or 7",
                got,
            }
            .fail(),
        }
    }

    /// Returns the synodic state of sample `i`.
    ///
    /// # Panics
    /// If the trajectory has neither 6 nor 7 components, or `i` is out of bounds.
    pub fn state(&self, i: usize) -> Vector6<f64> {
        let offset = self.components() - STATE_SIZE;
        self.data.fixed_view::<6, 1>(offset, i).into_owned()
    }

    /// Returns all of the synodic states of this trajectory.
    pub fn states(&self) -> Result<Vec<Vector6<f64>>, CheckError> {
        self.state_offset()?;
        Ok((0..self.len()).map(|i| self.state(i)).collect())
    }

    /// Returns the time axis, if the samples are timed
    pub fn times(&self) -> Option<Vec<f64>> {
        if self.has_time() {
            Some(self.data.row(0).iter().copied().collect())
        } else {
            None
        }
    }

    /// Returns the time of sample `i`, if the samples are timed
    pub fn time(&self, i: usize) -> Option<f64> {
        if self.has_time() {
            self.data.get((0, i)).copied()
        } else {
            None
        }
    }

    /// Ensures that the time axis is strictly increasing. The orbit index is only used in the error.
    ///
    /// Fails with [`CheckError::ShapeMismatch`] if the trajectory is not timed.
    pub fn ensure_monotonic(&self, orbit: usize) -> Result<(), CheckError> {
        let times = self.times().ok_or(CheckError::ShapeMismatch {
            expected: "7",
            got: self.components(),
        })?;
        match first_non_increasing(&times) {
            None => Ok(()),
            Some(index) => NonMonotonicTimeSnafu {
                orbit,
                index,
                prev: times[index],
                next: times[index + 1],
            }
            .fail(),
        }
    }

    /// Returns a copy of this trajectory with the provided time axis as its first component.
    ///
    /// # Panics
    /// If the number of times differs from the number of samples.
    pub fn with_time_axis(&self, times: &[f64]) -> Self {
        assert_eq!(times.len(), self.len(), "one time per sample is required");
        let mut data = self.data.clone().insert_row(0, 0.0);
        for (t, time) in data.row_mut(0).iter_mut().zip(times) {
            *t = *time;
        }
        Self { data }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Trajectory of {} samples with {} components",
            self.len(),
            self.components()
        )
    }
}

/// A collection of trajectories with the same number of components and samples, as a
/// (num_orbits, components, num_timepoints) array.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryBatch {
    orbits: Vec<Trajectory>,
}

impl TrajectoryBatch {
    /// Builds a batch from its orbits, which must all have the same shape.
    pub fn from_orbits(orbits: Vec<Trajectory>) -> Result<Self, CheckError> {
        ensure!(
            !orbits.is_empty(),
            InvalidInputSnafu {
                msg: "a batch requires at least one orbit"
            }
        );
        let (components, timepoints) = (orbits[0].components(), orbits[0].len());
        for (idx, orbit) in orbits.iter().enumerate() {
            ensure!(
                orbit.len() == timepoints,
                InvalidInputSnafu {
                    msg: format!(
                        "orbit #{idx} has {} samples but orbit #0 has {timepoints}",
                        orbit.len()
                    )
                }
            );
            ensure!(
                orbit.components() == components,
                ShapeMismatchSnafu {
                    expected: "the same number of components for every orbit",
                    got: orbit.components(),
                }
            );
        }
        Ok(Self { orbits })
    }

    /// Builds a batch from a flat array in row major (C) order of the provided (num_orbits, components,
    /// num_timepoints) shape.
    pub fn from_flat(data: &[f64], shape: (usize, usize, usize)) -> Result<Self, CheckError> {
        let (num_orbits, components, timepoints) = shape;
        ensure!(
            data.len() == num_orbits * components * timepoints,
            InvalidInputSnafu {
                msg: format!(
                    "{} values cannot be shaped as ({num_orbits}, {components}, {timepoints})",
                    data.len()
                )
            }
        );
        let orbits = (0..num_orbits)
            .map(|o| {
                Trajectory::new(DMatrix::from_fn(components, timepoints, |r, c| {
                    data[(o * components + r) * timepoints + c]
                }))
            })
            .collect();
        Self::from_orbits(orbits)
    }

    /// Returns the (num_orbits, components, num_timepoints) shape of this batch
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.len(), self.components(), self.timepoints())
    }

    /// Number of orbits
    pub fn len(&self) -> usize {
        self.orbits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orbits.is_empty()
    }

    /// Number of components of each sample
    pub fn components(&self) -> usize {
        self.orbits.first().map_or(0, Trajectory::components)
    }

    /// Number of samples of each orbit
    pub fn timepoints(&self) -> usize {
        self.orbits.first().map_or(0, Trajectory::len)
    }

    /// Returns the orbit at the provided index
    pub fn orbit(&self, idx: usize) -> Option<&Trajectory> {
        self.orbits.get(idx)
    }

    pub fn orbits(&self) -> &[Trajectory] {
        &self.orbits
    }
}

impl fmt::Display for TrajectoryBatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (n, c, m) = self.shape();
        write!(f, "TrajectoryBatch of shape ({n}, {c}, {m})")
    }
}

/// Layout of a batch, as accepted by the aggregator.
///
/// Both layouts are normalized into a seven component batch before any check is run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BatchLayout {
    /// Seven components per sample, the first being the time
    WithTime,
    /// Six components per sample, sampled every `time_step` from zero
    WithoutTime { time_step: f64 },
}

impl BatchLayout {
    /// Determines the layout of a batch. A seven component batch uses its own time axis and ignores `time_step`.
    pub fn classify(batch: &TrajectoryBatch, time_step: Option<f64>) -> Result<Self, CheckError> {
        match (batch.components(), time_step) {
            (TIMED_STATE_SIZE, _) => Ok(Self::WithTime),
            (STATE_SIZE, Some(time_step)) => Ok(Self::WithoutTime { time_step }),
            (got, _) => ShapeMismatchSnafu {
                expected: "7, or 6 with a time step",
                got,
            }
            .fail(),
        }
    }

    /// Returns the seven component version of the batch, synthesizing the time axis `(0, dt, 2 dt, ...)` if needed.
    pub fn normalize(&self, batch: &TrajectoryBatch) -> TrajectoryBatch {
        match self {
            Self::WithTime => batch.clone(),
            Self::WithoutTime { time_step } => {
                let times = (0..batch.timepoints())
                    .map(|i| i as f64 * time_step)
                    .collect::<Vec<_>>();
                TrajectoryBatch {
                    orbits: batch
                        .orbits
                        .iter()
                        .map(|orbit| orbit.with_time_axis(&times))
                        .collect(),
                }
            }
        }
    }
}

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

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use enum_iterator::all;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator, ProgressStyle};
use rayon::prelude::*;
use rstats::Stats;
use snafu::{ensure, ResultExt};
use typed_builder::TypedBuilder;

use super::{BatchLayout, ConsistencyChecker, ErrorKind, ReportSink, StepDefect, TrajectoryBatch};
use crate::cosmic::MassRatio;
use crate::errors::{InvalidInputSnafu, ReportSnafu};
use crate::propagators::{PropOpts, WeightedRmsStep};
use crate::CheckError;

/// Configuration of an aggregation: which orbits, which error kinds, and how to propagate.
///
/// Every field has a default, built fresh for each configuration: all orbits, all three error kinds, no time step,
/// default propagator options, parallel over the orbits, no progress bar.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(doc)]
pub struct AggregateCfg {
    /// Indices of the orbits to validate, defaults to all of the orbits of the batch
    #[builder(default, setter(strip_option))]
    pub orbit_indices: Option<Vec<usize>>,
    /// Error kinds to compute, in order
    #[builder(default = all::<ErrorKind>().collect())]
    pub error_kinds: Vec<ErrorKind>,
    /// Time between two samples, only used (and required) for batches without a time axis
    #[builder(default, setter(strip_option))]
    pub time_step: Option<f64>,
    #[builder(default)]
    pub opts: PropOpts<WeightedRmsStep>,
    /// Distribute the orbits over the rayon thread pool
    #[builder(default = true)]
    pub parallel: bool,
    /// Show a progress bar over the orbits of each error kind
    #[builder(default)]
    pub progress: bool,
}

impl Default for AggregateCfg {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Summary of one error kind over all of the selected orbits.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    /// Sum of the errors of all of the selected orbits
    pub cumulative: f64,
    /// Cumulative error divided by the number of time steps (number of samples minus one)
    pub average: f64,
    /// Error of each time step, summed over the selected orbits
    pub evolution: Vec<f64>,
}

impl ErrorSummary {
    pub fn new(kind: ErrorKind, cumulative: f64, evolution: Vec<f64>, num_timepoints: usize) -> Self {
        Self {
            kind,
            cumulative,
            average: cumulative / (num_timepoints as f64 - 1.0),
            evolution,
        }
    }

    /// Returns the index and the value of the time step with the largest error
    pub fn worst_step(&self) -> Option<(usize, f64)> {
        self.evolution
            .iter()
            .copied()
            .enumerate()
            .fold(None, |worst, (idx, err)| match worst {
                Some((_, max)) if max >= err => worst,
                _ => Some((idx, err)),
            })
    }

    /// Arithmetic mean of the per time step errors
    pub fn mean_step(&self) -> Option<f64> {
        self.evolution.amean().ok()
    }
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: cumulative {:.6e}, average per time step {:.6e}",
            self.kind, self.cumulative, self.average
        )
    }
}

/// Errors of a batch for each of the requested kinds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorReport {
    summaries: BTreeMap<ErrorKind, ErrorSummary>,
}

impl ErrorReport {
    pub fn get(&self, kind: ErrorKind) -> Option<&ErrorSummary> {
        self.summaries.get(&kind)
    }

    /// Cumulative error of this kind, if computed
    pub fn cumulative(&self, kind: ErrorKind) -> Option<f64> {
        self.get(kind).map(|s| s.cumulative)
    }

    /// Average error per time step of this kind, if computed
    pub fn average(&self, kind: ErrorKind) -> Option<f64> {
        self.get(kind).map(|s| s.average)
    }

    /// Returns the (cumulative, average) pair of each computed kind
    pub fn totals(&self) -> BTreeMap<ErrorKind, (f64, f64)> {
        self.summaries
            .iter()
            .map(|(kind, s)| (*kind, (s.cumulative, s.average)))
            .collect()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ErrorKind> {
        self.summaries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorSummary> {
        self.summaries.values()
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    fn insert(&mut self, summary: ErrorSummary) {
        self.summaries.insert(summary.kind, summary);
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for summary in self.iter() {
            writeln!(f, "{summary}")?;
        }
        Ok(())
    }
}

/// Errors of one orbit for one kind: the cumulative error and the error of each time step.
struct OrbitErrors {
    cumulative: f64,
    steps: Vec<f64>,
}

/// Validates a batch of trajectories by computing the requested error kinds over the selected orbits.
///
/// Any failure (shape, time axis, integration) aborts the whole aggregation: no partial report is returned. When
/// orbits are processed in parallel, the error returned is the one of the first failing orbit in index order.
#[derive(Clone, Debug)]
pub struct ErrorAggregator {
    pub mu: MassRatio,
    pub cfg: AggregateCfg,
}

impl ErrorAggregator {
    pub fn new(mu: MassRatio, cfg: AggregateCfg) -> Self {
        Self { mu, cfg }
    }

    /// Computes the report without any reporting sink.
    pub fn run(&self, batch: &TrajectoryBatch) -> Result<ErrorReport, CheckError> {
        self.aggregate(batch, None)
    }

    /// Computes the report and hands the summary of each error kind to the sink.
    pub fn run_with_sink(
        &self,
        batch: &TrajectoryBatch,
        sink: &mut dyn ReportSink,
    ) -> Result<ErrorReport, CheckError> {
        self.aggregate(batch, Some(sink))
    }

    fn aggregate(
        &self,
        batch: &TrajectoryBatch,
        mut sink: Option<&mut dyn ReportSink>,
    ) -> Result<ErrorReport, CheckError> {
        let layout = BatchLayout::classify(batch, self.cfg.time_step)?;
        let working = layout.normalize(batch);
        let (num_orbits, _, num_timepoints) = working.shape();
        ensure!(
            num_timepoints >= 2,
            InvalidInputSnafu {
                msg: format!("at least two samples per orbit are required, got {num_timepoints}")
            }
        );

        let indices = match &self.cfg.orbit_indices {
            Some(indices) => {
                if let Some(idx) = indices.iter().find(|idx| **idx >= num_orbits) {
                    return InvalidInputSnafu {
                        msg: format!("orbit index {idx} out of bounds for a batch of {num_orbits} orbits"),
                    }
                    .fail();
                }
                indices.clone()
            }
            None => (0..num_orbits).collect(),
        };

        let mut kinds = Vec::with_capacity(self.cfg.error_kinds.len());
        for kind in &self.cfg.error_kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        info!(
            "Validating {} orbits of {working} ({:?}) with mu = {} for {} error kinds",
            indices.len(),
            layout,
            self.mu,
            kinds.len()
        );

        let checker = ConsistencyChecker::with_opts(self.mu, self.cfg.opts);
        // Each pair of samples is propagated once, for both the position and the velocity errors
        let mut defects: Option<Vec<Vec<StepDefect>>> = None;
        let mut report = ErrorReport::default();

        for kind in kinds {
            let start = Instant::now();
            let per_orbit = if kind.is_defect() {
                if defects.is_none() {
                    defects = Some(self.map_orbits(&indices, kind, |idx| {
                        let orbit = &working.orbits()[idx];
                        orbit.ensure_monotonic(idx)?;
                        checker.dynamics_defect_steps(orbit)
                    })?);
                }
                defects
                    .iter()
                    .flatten()
                    .map(|steps| {
                        let steps = steps
                            .iter()
                            .map(|d| match kind {
                                ErrorKind::Position => d.position,
                                _ => d.velocity,
                            })
                            .collect::<Vec<_>>();
                        OrbitErrors {
                            cumulative: steps.iter().sum(),
                            steps,
                        }
                    })
                    .collect::<Vec<_>>()
            } else {
                self.map_orbits(&indices, kind, |idx| {
                    let orbit = &working.orbits()[idx];
                    orbit.ensure_monotonic(idx)?;
                    Ok(OrbitErrors {
                        cumulative: checker.energy_drift(orbit)?,
                        steps: checker.energy_steps(orbit)?,
                    })
                })?
            };

            let mut cumulative = 0.0;
            let mut evolution = vec![0.0; num_timepoints - 1];
            for orbit in &per_orbit {
                cumulative += orbit.cumulative;
                for (total, step) in evolution.iter_mut().zip(&orbit.steps) {
                    *total += step;
                }
            }

            let summary = ErrorSummary::new(kind, cumulative, evolution, num_timepoints);
            info!("{summary} ({:.3} s)", start.elapsed().as_secs_f64());
            if let Some(sink) = sink.as_mut() {
                sink.report(&summary).context(ReportSnafu)?;
            }
            report.insert(summary);
        }

        Ok(report)
    }

    /// Applies `f` to each orbit index, in parallel if configured, and returns the results in index order or the
    /// error of the first failing orbit.
    fn map_orbits<T, F>(&self, indices: &[usize], kind: ErrorKind, f: F) -> Result<Vec<T>, CheckError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, CheckError> + Sync + Send,
    {
        let results: Vec<Result<T, CheckError>> = match (self.cfg.parallel, self.cfg.progress) {
            (true, true) => indices
                .par_iter()
                .progress_with(self.progress_bar(indices.len(), kind))
                .map(|idx| f(*idx))
                .collect(),
            (true, false) => indices.par_iter().map(|idx| f(*idx)).collect(),
            (false, true) => indices
                .iter()
                .progress_with(self.progress_bar(indices.len(), kind))
                .map(|idx| f(*idx))
                .collect(),
            (false, false) => indices.iter().map(|idx| f(*idx)).collect(),
        };

        let mut values = Vec::with_capacity(results.len());
        for (idx, result) in indices.iter().zip(results) {
            match result {
                Ok(value) => values.push(value),
                Err(e) => {
                    warn!("{kind} error of orbit #{idx} could not be computed: {e}");
                    return Err(e);
                }
            }
        }
        Ok(values)
    }

    // Just the template for the progress bar
    fn progress_bar(&self, num_orbits: usize, kind: ErrorKind) -> ProgressBar {
        let pb = ProgressBar::new(num_orbits as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_message(format!("{kind} errors"));
        pb
    }
}

/// Computes the requested error kinds over the selected orbits of the batch.
pub fn aggregate(
    batch: &TrajectoryBatch,
    mu: MassRatio,
    cfg: &AggregateCfg,
) -> Result<ErrorReport, CheckError> {
    ErrorAggregator::new(mu, cfg.clone()).run(batch)
}

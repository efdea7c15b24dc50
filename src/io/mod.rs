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

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use enum_iterator::all;
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::cosmic::{MassRatio, EARTH_MOON_MU};
use crate::propagators::{PropOpts, Tolerances};
use crate::validation::{AggregateCfg, ErrorKind};
use crate::CheckError;

/// Loads trajectory batches from CSV files.
pub mod batch;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: io::Error },

    #[snafu(display("failed to parse YAML configuration file: {source}"))]
    ParseError { source: serde_yaml::Error },

    #[snafu(display("failed to {action} CSV data: {source}"))]
    CsvError {
        action: &'static str,
        source: csv::Error,
    },

    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

pub trait ConfigRepr: Debug + Sized + serde::Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds "Self" from the provided string of a yaml
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}

/// A validation run as stored in a YAML file.
///
/// ```yaml
/// mass_ratio: 0.0122
/// time_step: 0.01
/// orbit_indices: [0, 3]
/// error_kinds: [position, energy]
/// tolerances:
///   rtol: 1.0e-8
///   atol: 1.0e-8
/// ```
///
/// Error kinds are kept as strings here so that an unknown kind is reported as such when building the
/// configuration, instead of a generic parsing failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationScenario {
    /// Mass ratio of the system, defaults to the Earth-Moon one
    #[serde(default = "default_mass_ratio")]
    pub mass_ratio: f64,
    /// Time between two samples, only used for batches without a time axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbit_indices: Option<Vec<usize>>,
    /// Defaults to all of the error kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kinds: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerances: Option<Tolerances>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step: Option<f64>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_mass_ratio() -> f64 {
    EARTH_MOON_MU
}

fn default_parallel() -> bool {
    true
}

impl ConfigRepr for ValidationScenario {}

impl Default for ValidationScenario {
    fn default() -> Self {
        Self {
            mass_ratio: default_mass_ratio(),
            time_step: None,
            orbit_indices: None,
            error_kinds: None,
            tolerances: None,
            max_step: None,
            parallel: default_parallel(),
        }
    }
}

impl ValidationScenario {
    /// Converts this scenario into the mass ratio and the aggregation configuration.
    pub fn to_cfg(&self) -> Result<(MassRatio, AggregateCfg), CheckError> {
        let mu = MassRatio::new(self.mass_ratio)?;

        let error_kinds = match &self.error_kinds {
            Some(kinds) => kinds
                .iter()
                .map(|kind| kind.parse::<ErrorKind>())
                .collect::<Result<Vec<_>, _>>()?,
            None => all::<ErrorKind>().collect(),
        };

        if let Some(time_step) = self.time_step {
            ensure!(
                time_step.is_finite(),
                InvalidConfigSnafu {
                    msg: format!("time step must be finite, got {time_step}")
                }
            );
        }

        let mut opts = PropOpts::default();
        if let Some(tolerances) = self.tolerances {
            ensure!(
                tolerances.rtol > 0.0 && tolerances.atol > 0.0,
                InvalidConfigSnafu {
                    msg: format!("tolerances must be positive, got {tolerances}")
                }
            );
            opts.tolerances = tolerances;
        }
        if let Some(max_step) = self.max_step {
            opts.set_max_step(max_step);
        }

        let cfg = AggregateCfg {
            orbit_indices: self.orbit_indices.clone(),
            error_kinds,
            time_step: self.time_step,
            opts,
            parallel: self.parallel,
            progress: false,
        };
        Ok((mu, cfg))
    }
}

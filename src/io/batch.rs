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
use std::io::Read;
use std::path::Path;

use snafu::ResultExt;

use super::{ConfigError, CsvSnafu, InvalidConfigSnafu};
use crate::validation::{Trajectory, TrajectoryBatch};
use crate::CheckError;

/// Loads a batch of trajectories from a CSV file with a header row.
///
/// Each row is one sample: the orbit number followed by either the six state components (`orbit,x,y,z,vx,vy,vz`)
/// or the time and the six state components (`orbit,t,x,y,z,vx,vy,vz`). Samples are kept in file order within each
/// orbit, and orbits are sorted by their number. All orbits must have the same number of samples.
pub fn batch_from_csv<P: AsRef<Path>>(path: P) -> Result<TrajectoryBatch, CheckError> {
    let rdr = csv::Reader::from_path(path).context(CsvSnafu { action: "open" })?;
    read_batch(rdr)
}

/// Same as [`batch_from_csv`] from any reader.
pub fn batch_from_reader<R: Read>(reader: R) -> Result<TrajectoryBatch, CheckError> {
    read_batch(csv::Reader::from_reader(reader))
}

fn read_batch<R: Read>(mut rdr: csv::Reader<R>) -> Result<TrajectoryBatch, CheckError> {
    let width = rdr.headers().context(CsvSnafu { action: "read" })?.len();
    if width != 7 && width != 8 {
        return Err(ConfigError::InvalidConfig {
            msg: format!("expected 7 or 8 columns (orbit, [t,] x, y, z, vx, vy, vz) but found {width}"),
        }
        .into());
    }

    let mut orbits: BTreeMap<usize, Vec<Vec<f64>>> = BTreeMap::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.context(CsvSnafu { action: "read" })?;
        let orbit = record
            .get(0)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| {
                InvalidConfigSnafu {
                    msg: format!("row {row}: orbit number must be a non negative integer"),
                }
                .build()
            })?;
        let sample = record
            .iter()
            .skip(1)
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                InvalidConfigSnafu {
                    msg: format!("row {row}: {e}"),
                }
                .build()
            })?;
        orbits.entry(orbit).or_default().push(sample);
    }

    debug!("loaded {} orbits from CSV", orbits.len());
    let trajectories = orbits
        .values()
        .map(|samples| Trajectory::from_samples(samples.as_slice()))
        .collect::<Result<Vec<_>, _>>()?;
    TrajectoryBatch::from_orbits(trajectories)
}

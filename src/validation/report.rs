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

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use snafu::prelude::*;

use super::ErrorSummary;

/// Errors of the reporting sinks
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReportError {
    #[snafu(display("could not write CSV report: {source}"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("report I/O error: {source}"))]
    Io { source: io::Error },
}

/// A consumer of the summary of each error kind, e.g. to print, chart or store the evolution of the errors.
///
/// The aggregator calls the sink at most once per error kind, after that kind is fully computed.
pub trait ReportSink {
    fn report(&mut self, summary: &ErrorSummary) -> Result<(), ReportError>;
}

/// Logs the textual summary of each error kind at the info level.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&mut self, summary: &ErrorSummary) -> Result<(), ReportError> {
        info!(
            "Cumulative {} error for selected orbits: {}",
            summary.kind, summary.cumulative
        );
        info!(
            "Average {} error per time step: {}",
            summary.kind, summary.average
        );
        if let Some(mean) = summary.mean_step() {
            info!("Mean {} error over the time steps: {mean}", summary.kind);
        }
        if let Some((index, worst)) = summary.worst_step() {
            info!("Largest {} error at time step #{index}: {worst}", summary.kind);
        }
        Ok(())
    }
}

/// Writes the per time step evolution of each error kind as CSV rows of `kind,step,error`.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl CsvSink<File> {
    /// Creates (or truncates) the CSV file at the provided path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        Ok(Self::new(
            csv::Writer::from_path(path).context(CsvWriteSnafu)?,
        ))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(wtr: W) -> Self {
        Self::new(csv::Writer::from_writer(wtr))
    }

    fn new(writer: csv::Writer<W>) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    /// Flushes the rows and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, ReportError> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context(IoSnafu)
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn report(&mut self, summary: &ErrorSummary) -> Result<(), ReportError> {
        if !self.header_written {
            self.writer
                .write_record(["kind", "step", "error"])
                .context(CsvWriteSnafu)?;
            self.header_written = true;
        }
        let kind = summary.kind.to_string();
        for (step, error) in summary.evolution.iter().enumerate() {
            self.writer
                .write_record([kind.clone(), step.to_string(), format!("{error:e}")])
                .context(CsvWriteSnafu)?;
        }
        self.writer.flush().context(IoSnafu)
    }
}

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::{
    config::{Axis, ParameterSet, SweepRanges},
    error::SweepError,
    report::Reading,
    simulator::Simulator,
};

/// Axis value -> worst-case execution cycles.
pub type AxisResults = BTreeMap<u32, u64>;
/// Workload -> varied axis -> results.
pub type ResultsTable = BTreeMap<String, BTreeMap<Axis, AxisResults>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub workload: String,
    pub axis: Axis,
    pub value: u32,
    pub cycles: u64,
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}={}: {} cycles",
            self.workload, self.axis, self.value, self.cycles
        )
    }
}

/// One-factor-at-a-time sweep over the cache geometry.
#[derive(Debug)]
pub struct Sweep<'a> {
    workloads: &'a [String],
    defaults: ParameterSet,
    ranges: &'a SweepRanges,
    work_dir: &'a Path,
}

/// Temporary report location for one run.
pub fn report_path(work_dir: &Path, workload: &str, axis: Axis, value: u32) -> PathBuf {
    let workload: String = workload
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    work_dir.join(format!("temp_{workload}_{axis}{value}.txt"))
}

impl<'a> Sweep<'a> {
    pub fn new(
        workloads: &'a [String],
        defaults: ParameterSet,
        ranges: &'a SweepRanges,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            workloads,
            defaults,
            ranges,
            work_dir,
        }
    }

    /// Runs every point of the sweep in order. Each report path is pushed to
    /// `reports` before its run starts, so the caller can clean up after a
    /// failure too.
    pub fn run<S: Simulator>(
        &self,
        simulator: &S,
        reports: &mut Vec<PathBuf>,
    ) -> Result<ResultsTable, SweepError> {
        let mut table = ResultsTable::new();
        for workload in self.workloads {
            // Inserted only once every axis of the workload has finished.
            let mut axes = BTreeMap::new();
            for axis in Axis::ALL {
                let mut results = AxisResults::new();
                for &value in self.ranges.get(axis) {
                    let run = self.run_point(simulator, workload, axis, value, reports)?;
                    results.insert(run.value, run.cycles);
                }
                axes.insert(axis, results);
            }
            table.insert(workload.clone(), axes);
        }
        Ok(table)
    }

    fn run_point<S: Simulator>(
        &self,
        simulator: &S,
        workload: &str,
        axis: Axis,
        value: u32,
        reports: &mut Vec<PathBuf>,
    ) -> Result<RunResult, SweepError> {
        let params = self.defaults.with(axis, value);
        let output = report_path(self.work_dir, workload, axis, value);
        reports.push(output.clone());

        let reading = simulator
            .run(workload, &params, &output)
            .map_err(|source| SweepError::Invocation {
                workload: workload.to_string(),
                axis,
                value,
                source,
            })?;
        if reading == Reading::Missing {
            warn!(
                "{}: no core statistics found, recording 0 cycles for {workload} {axis}={value}",
                output.display()
            );
        }
        let result = RunResult {
            workload: workload.to_string(),
            axis,
            value,
            cycles: reading.cycles(),
        };
        info!("{result}");
        Ok(result)
    }
}

/// One line per workload and axis, values ascending.
pub fn summary_lines(table: &ResultsTable) -> Vec<String> {
    let mut lines = Vec::new();
    for (workload, axes) in table {
        for (axis, results) in axes {
            let points: Vec<String> = results
                .iter()
                .map(|(value, cycles)| format!("{value}: {cycles}"))
                .collect();
            lines.push(format!("{workload} {axis} sweep: {}", points.join(", ")));
        }
    }
    lines
}

/// Logs the collected table; stdout is kept for the final confirmation.
pub fn log_summary(table: &ResultsTable) {
    for line in summary_lines(table) {
        info!("{line}");
    }
}

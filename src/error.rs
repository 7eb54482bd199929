use std::{io, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

use crate::config::Axis;

/// Failure of a single simulator run.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to start simulator `{}`: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("simulator exited with {status}{}", stderr_suffix(stderr))]
    Exit { status: ExitStatus, stderr: String },
    #[error("simulator did not finish within {}s and was killed", after.as_secs_f64())]
    Timeout { after: Duration },
    #[error("failed to wait for simulator: {0}")]
    Wait(#[source] io::Error),
    #[error("failed to read report `{}`: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("simulation failed for workload `{workload}` with {axis}={value}: {source}")]
    Invocation {
        workload: String,
        axis: Axis,
        value: u32,
        #[source]
        source: SimulatorError,
    },
    #[error("failed to prepare `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render chart `{}`: {message}", path.display())]
    Chart { path: PathBuf, message: String },
}

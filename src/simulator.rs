use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::{
    config::{Axis, ParameterSet},
    error::{SimulatorError, SweepError},
    report::{parse_report, Reading},
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long to wait for stderr to close once the simulator itself has exited.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Something that can run one simulation and report its execution time.
pub trait Simulator {
    /// Runs `workload` with cache geometry `params`, writing the report to
    /// `output`.
    fn run(
        &self,
        workload: &str,
        params: &ParameterSet,
        output: &Path,
    ) -> Result<Reading, SimulatorError>;
}

/// The external simulator binary.
#[derive(Debug)]
pub struct ExternalSimulator {
    binary: PathBuf,
    trace_dir: PathBuf,
    timeout: Duration,
}

impl ExternalSimulator {
    pub fn command(&self, workload: &str, params: &ParameterSet, output: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-t")
            .arg(self.trace_dir.join(workload))
            .arg("-s")
            .arg(params.s.to_string())
            .arg("-b")
            .arg(params.b.to_string())
            .arg("-E")
            .arg(params.e.to_string())
            .arg("-o")
            .arg(output);
        cmd
    }

    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus, SimulatorError> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(SimulatorError::Wait)? {
                return Ok(status);
            }
            if start.elapsed() >= self.timeout {
                // The child may exit between try_wait and kill.
                if let Err(e) = child.kill() {
                    debug!("kill after timeout failed: {e}");
                }
                child.wait().map_err(SimulatorError::Wait)?;
                return Err(SimulatorError::Timeout {
                    after: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Simulator for ExternalSimulator {
    fn run(
        &self,
        workload: &str,
        params: &ParameterSet,
        output: &Path,
    ) -> Result<Reading, SimulatorError> {
        let mut cmd = self.command(workload, params, output);
        debug!("running {cmd:?}");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SimulatorError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        let (stderr_tx, stderr_rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                let _ = stderr_tx.send(buf);
            });
        }

        // Processes spawned by the simulator can hold the pipe open after it
        // is gone, so the reader is never joined.
        let status = self.wait(&mut child)?;
        let stderr = stderr_rx.recv_timeout(STDERR_GRACE).unwrap_or_default();

        if !status.success() {
            return Err(SimulatorError::Exit { status, stderr });
        }

        let content = fs::read_to_string(output).map_err(|e| SimulatorError::Report {
            path: output.to_path_buf(),
            source: e,
        })?;
        let report = parse_report(&content);
        for core in &report.cores {
            debug!("core {} took {} cycles", core.core, core.cycles);
        }
        let mismatches = report.params.mismatches(params);
        if !mismatches.is_empty() {
            warn!(
                "{} echoes different values for {} than requested ({params:?})",
                output.display(),
                mismatches
                    .iter()
                    .map(Axis::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(report.reading())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    binary: Option<PathBuf>,
    trace_dir: PathBuf,
    timeout: Duration,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorOptions {
    pub fn new() -> Self {
        Self {
            binary: None,
            trace_dir: PathBuf::from("."),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn binary<P: Into<PathBuf>>(mut self, binary: P) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn trace_dir<P: Into<PathBuf>>(mut self, trace_dir: P) -> Self {
        self.trace_dir = trace_dir.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ExternalSimulator, SweepError> {
        let Some(binary) = self.binary else {
            return Err(SweepError::Config("simulator binary not set".into()));
        };
        if self.timeout.is_zero() {
            return Err(SweepError::Config("simulator timeout must be positive".into()));
        }
        Ok(ExternalSimulator {
            binary,
            trace_dir: self.trace_dir,
            timeout: self.timeout,
        })
    }
}

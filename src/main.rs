use std::{path::PathBuf, process, time::Duration};

use clap::Parser;
use config::SweepConfig;
use log::{error, info};
use simulator::SimulatorOptions;
use sweep::Sweep;

mod artifacts;
mod chart;
mod config;
mod error;
mod logger;
mod report;
mod simulator;
mod sweep;

pub type BoxDynError = Box<dyn std::error::Error>;
pub type Result<T> = std::result::Result<T, BoxDynError>;

#[derive(clap::Parser, Debug)]
struct Args {
    /// Whether should print debug information
    #[arg(long)]
    debug: bool,

    /// Path to a JSON sweep configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the cache simulator binary
    #[arg(long)]
    simulator: Option<PathBuf>,

    /// Directory holding the workload traces
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Directory the charts are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory for the temporary simulator reports
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Seconds a single simulator run may take
    #[arg(long)]
    timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::load(path)?,
            None => SweepConfig::default(),
        };
        if let Some(simulator) = self.simulator {
            config.simulator = simulator;
        }
        if let Some(trace_dir) = self.trace_dir {
            config.trace_dir = trace_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(work_dir) = self.work_dir {
            config.work_dir = work_dir;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(config: &SweepConfig) -> Result<()> {
    let simulator = SimulatorOptions::new()
        .binary(&config.simulator)
        .trace_dir(&config.trace_dir)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    artifacts::prepare_output_dir(&config.output_dir)?;

    let sweep = Sweep::new(
        &config.workloads,
        config.defaults,
        &config.ranges,
        &config.work_dir,
    );
    let mut reports = Vec::new();
    let table = sweep.run(&simulator, &mut reports);
    let charts = table.and_then(|table| {
        sweep::log_summary(&table);
        chart::render_all(&table, &config.output_dir)
    });

    // Reports go away whether or not the sweep finished.
    let removed = artifacts::cleanup_reports(&reports);
    info!("removed {removed} temporary report(s)");

    let charts = charts?;
    info!("rendered {} chart(s)", charts.len());
    Ok(())
}

fn main() {
    let args = Args::parse();
    logger::init(args.debug);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(2);
        }
    };

    if let Err(e) = run(&config) {
        error!("{e}");
        process::exit(1);
    }
    println!(
        "Graphs generated and saved in the '{}' folder",
        config.output_dir.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_defaults() {
        let args = Args::parse_from([
            "cache-sweep",
            "--simulator",
            "/opt/sim",
            "-o",
            "charts",
            "--timeout",
            "5",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.simulator, PathBuf::from("/opt/sim"));
        assert_eq!(config.output_dir, PathBuf::from("charts"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.trace_dir, PathBuf::from("assignment3_traces"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = Args::parse_from(["cache-sweep", "--timeout", "0"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn config_file_is_read_and_then_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(
            &path,
            r#"{ "workloads": ["app3"], "work_dir": "/tmp/x", "timeout_secs": 30 }"#,
        )
        .unwrap();
        let args = Args::parse_from([
            "cache-sweep",
            "-c",
            path.to_str().unwrap(),
            "--work-dir",
            "scratch",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.workloads, vec!["app3"]);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.work_dir, PathBuf::from("scratch"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_run_leaves_no_reports_and_no_charts() {
        use std::{fs, os::unix::fs::PermissionsExt};

        let dir = tempfile::tempdir().unwrap();
        let sim = dir.path().join("sim.sh");
        // Writes a report for every run, then fails once E reaches 3.
        fs::write(
            &sim,
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do case \"$1\" in -E) e=\"$2\" ;; -o) o=\"$2\" ;; esac; shift 2; done\n\
             printf 'Core 0 Statistics:\\nTotal Execution Cycles: 10\\n' > \"$o\"\n\
             [ \"$e\" -lt 3 ]\n",
        )
        .unwrap();
        fs::set_permissions(&sim, fs::Permissions::from_mode(0o755)).unwrap();

        let config = SweepConfig {
            simulator: sim,
            output_dir: dir.path().join("assets"),
            work_dir: dir.path().to_path_buf(),
            timeout_secs: 20,
            ..SweepConfig::default()
        };
        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("app1"));
        assert!(err.to_string().contains("E=3"));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("temp_"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(fs::read_dir(dir.path().join("assets")).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn full_pipeline_renders_every_chart() {
        use std::{fs, os::unix::fs::PermissionsExt};

        let dir = tempfile::tempdir().unwrap();
        let sim = dir.path().join("sim.sh");
        fs::write(
            &sim,
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do case \"$1\" in -s) s=\"$2\" ;; -o) o=\"$2\" ;; esac; shift 2; done\n\
             printf 'Core 0 Statistics:\\nTotal Execution Cycles: %d\\n' $((s * 10)) > \"$o\"\n",
        )
        .unwrap();
        fs::set_permissions(&sim, fs::Permissions::from_mode(0o755)).unwrap();

        let config = SweepConfig {
            simulator: sim,
            output_dir: dir.path().join("assets"),
            work_dir: dir.path().to_path_buf(),
            timeout_secs: 20,
            ..SweepConfig::default()
        };
        run(&config).unwrap();
        run(&config).unwrap();

        let mut charts: Vec<String> = fs::read_dir(dir.path().join("assets"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        charts.sort();
        assert_eq!(
            charts,
            vec![
                "app1_E_variation.svg",
                "app1_b_variation.svg",
                "app1_s_variation.svg",
                "app2_E_variation.svg",
                "app2_b_variation.svg",
                "app2_s_variation.svg",
            ]
        );
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .map(|e| e.file_name().to_string_lossy().starts_with("temp_"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
    }
}

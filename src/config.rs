use std::{collections::BTreeSet, fmt, fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// The cache geometry parameter varied by one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "s")]
    S,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "b")]
    B,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::S, Axis::E, Axis::B];

    pub fn label(self) -> &'static str {
        match self {
            Axis::S => "Set Index Bits (s)",
            Axis::E => "Associativity (E)",
            Axis::B => "Block Bits (b)",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::S => "s",
            Axis::E => "E",
            Axis::B => "b",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(rename = "s")]
    pub s: u32,
    #[serde(rename = "b")]
    pub b: u32,
    #[serde(rename = "E")]
    pub e: u32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self { s: 6, b: 5, e: 2 }
    }
}

impl ParameterSet {
    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::S => self.s,
            Axis::E => self.e,
            Axis::B => self.b,
        }
    }

    /// Copy of `self` with only `axis` replaced by `value`.
    pub fn with(mut self, axis: Axis, value: u32) -> Self {
        match axis {
            Axis::S => self.s = value,
            Axis::E => self.e = value,
            Axis::B => self.b = value,
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRanges {
    #[serde(rename = "s")]
    pub s: Vec<u32>,
    #[serde(rename = "E")]
    pub e: Vec<u32>,
    #[serde(rename = "b")]
    pub b: Vec<u32>,
}

impl SweepRanges {
    /// One below the default up to two above it, on every axis.
    pub fn around(defaults: ParameterSet) -> Self {
        let span = |d: u32| (d.saturating_sub(1)..=d + 2).collect::<BTreeSet<_>>();
        Self {
            s: span(defaults.s).into_iter().collect(),
            e: span(defaults.e.max(1))
                .into_iter()
                .filter(|&e| e > 0)
                .collect(),
            b: span(defaults.b).into_iter().collect(),
        }
    }

    pub fn get(&self, axis: Axis) -> &[u32] {
        match axis {
            Axis::S => &self.s,
            Axis::E => &self.e,
            Axis::B => &self.b,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    #[serde(rename = "simulator")]
    pub simulator: PathBuf,
    #[serde(rename = "trace_dir")]
    pub trace_dir: PathBuf,
    #[serde(rename = "output_dir")]
    pub output_dir: PathBuf,
    #[serde(rename = "work_dir")]
    pub work_dir: PathBuf,
    #[serde(rename = "timeout_secs")]
    pub timeout_secs: u64,
    #[serde(rename = "workloads")]
    pub workloads: Vec<String>,
    #[serde(rename = "defaults")]
    pub defaults: ParameterSet,
    #[serde(rename = "ranges")]
    pub ranges: SweepRanges,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let defaults = ParameterSet::default();
        Self {
            simulator: PathBuf::from("./bin/L1simulate"),
            trace_dir: PathBuf::from("assignment3_traces"),
            output_dir: PathBuf::from("assets"),
            work_dir: PathBuf::from("."),
            timeout_secs: 600,
            workloads: vec!["app1".to_string(), "app2".to_string()],
            defaults,
            ranges: SweepRanges::around(defaults),
        }
    }
}

impl SweepConfig {
    pub fn load(path: &str) -> Result<Self, SweepError> {
        let content = fs::read_to_string(path).map_err(|e| SweepError::Io {
            path: PathBuf::from(path),
            source: e,
        })?;
        Self::from_json(&content)
            .map_err(|e| SweepError::Config(format!("cannot parse `{path}`: {e}")))
    }

    /// Parses a configuration. Without an explicit `ranges` object the sweep
    /// is centred on the configured `defaults`.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let has_ranges = value.get("ranges").is_some();
        let mut config: Self = serde_json::from_value(value)?;
        if !has_ranges {
            config.ranges = SweepRanges::around(config.defaults);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if self.workloads.is_empty() {
            return Err(SweepError::Config("no workloads configured".into()));
        }
        if self.timeout_secs == 0 {
            return Err(SweepError::Config("timeout must be positive".into()));
        }
        if self.defaults.e == 0 {
            return Err(SweepError::Config("default associativity must be positive".into()));
        }
        let mut seen = BTreeSet::new();
        for workload in &self.workloads {
            if workload.is_empty() {
                return Err(SweepError::Config("empty workload name".into()));
            }
            if !seen.insert(workload) {
                return Err(SweepError::Config(format!("workload `{workload}` listed twice")));
            }
        }
        for axis in Axis::ALL {
            let values = self.ranges.get(axis);
            if values.is_empty() {
                return Err(SweepError::Config(format!("sweep range for {axis} is empty")));
            }
            let unique: BTreeSet<_> = values.iter().collect();
            if unique.len() != values.len() {
                return Err(SweepError::Config(format!(
                    "sweep range for {axis} contains duplicates: {values:?}"
                )));
            }
            if axis == Axis::E && values.contains(&0) {
                return Err(SweepError::Config("associativity values must be positive".into()));
            }
            let default = self.defaults.get(axis);
            if !values.contains(&default) {
                return Err(SweepError::Config(format!(
                    "sweep range for {axis} {values:?} does not include the default {default}"
                )));
            }
        }
        Ok(())
    }
}

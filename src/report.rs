//! Reading the statistics report written by the simulator.
//!
//! A report holds a `Simulation Parameters:` header followed by one block per
//! core. Only the blocks' `Total Execution Cycles` lines matter for the sweep;
//! the echoed parameters are used to catch a simulator ignoring its flags.

use std::sync::OnceLock;

use log::warn;
use regex::Regex;

use crate::config::{Axis, ParameterSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreCycles {
    /// Core number as printed; never interpreted.
    pub core: String,
    pub cycles: u64,
}

/// Cache geometry as printed back by the simulator. Fields are `None` when the
/// corresponding line is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoedParameters {
    pub s: Option<u32>,
    pub e: Option<u32>,
    pub b: Option<u32>,
}

impl EchoedParameters {
    pub fn get(&self, axis: Axis) -> Option<u32> {
        match axis {
            Axis::S => self.s,
            Axis::E => self.e,
            Axis::B => self.b,
        }
    }

    /// Axes whose echoed value differs from `requested`.
    pub fn mismatches(&self, requested: &ParameterSet) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|&axis| self.get(axis).is_some_and(|v| v != requested.get(axis)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub cores: Vec<CoreCycles>,
    pub params: EchoedParameters,
}

/// Execution time read from one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Worst-case cycles over all cores.
    Cycles(u64),
    /// The report had no core statistics block.
    Missing,
}

impl Reading {
    pub fn cycles(self) -> u64 {
        match self {
            Reading::Cycles(cycles) => cycles,
            Reading::Missing => 0,
        }
    }
}

fn core_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Core ([0-9]+) Statistics:.*?Total Execution Cycles: ([0-9]+)")
            .expect("core block pattern is valid")
    })
}

fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(Set Index Bits|Associativity|Block Bits): ([0-9]+)\s*$")
            .expect("parameter pattern is valid")
    })
}

pub fn parse_report(content: &str) -> Report {
    let cores = core_block_regex()
        .captures_iter(content)
        .map(|cap| {
            let core = cap[1].to_string();
            // Only digits are captured, so parsing can fail only on overflow.
            let cycles = cap[2].parse().unwrap_or_else(|_| {
                warn!(
                    "core {core} reports {} cycles, beyond u64; using u64::MAX",
                    &cap[2]
                );
                u64::MAX
            });
            CoreCycles { core, cycles }
        })
        .collect();

    let mut params = EchoedParameters::default();
    // Only the header is searched, so core blocks cannot shadow it.
    let header = content
        .find("Core ")
        .map_or(content, |idx| &content[..idx]);
    for cap in param_regex().captures_iter(header) {
        let value = cap[2].parse().ok();
        match &cap[1] {
            "Set Index Bits" => params.s = value,
            "Associativity" => params.e = value,
            "Block Bits" => params.b = value,
            _ => {}
        }
    }

    Report { cores, params }
}

impl Report {
    pub fn reading(&self) -> Reading {
        self.cores
            .iter()
            .map(|core| core.cycles)
            .max()
            .map_or(Reading::Missing, Reading::Cycles)
    }
}

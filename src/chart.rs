use std::path::{Path, PathBuf};

use log::{debug, info};
use plotters::prelude::*;

use crate::{
    config::Axis,
    error::SweepError,
    sweep::{AxisResults, ResultsTable},
};

const CHART_SIZE: (u32, u32) = (1000, 600);
pub const CHART_EXTENSION: &str = "svg";

pub fn chart_path(output_dir: &Path, workload: &str, axis: Axis) -> PathBuf {
    output_dir.join(format!("{workload}_{axis}_variation.{CHART_EXTENSION}"))
}

/// Points of one chart, ascending by axis value.
pub fn series(results: &AxisResults) -> Vec<(u32, u64)> {
    // BTreeMap iteration is already ordered by key.
    results.iter().map(|(&value, &cycles)| (value, cycles)).collect()
}

/// Renders every (workload, axis) pair of `table` and returns the written paths.
pub fn render_all(table: &ResultsTable, output_dir: &Path) -> Result<Vec<PathBuf>, SweepError> {
    let mut written = Vec::new();
    for (workload, axes) in table {
        for (&axis, results) in axes {
            let points = series(results);
            if points.is_empty() {
                debug!("no points for {workload} {axis}, skipping chart");
                continue;
            }
            let path = chart_path(output_dir, workload, axis);
            render(&path, workload, axis, &points).map_err(|e| SweepError::Chart {
                path: path.clone(),
                message: e.to_string(),
            })?;
            info!("wrote {}", path.display());
            written.push(path);
        }
    }
    Ok(written)
}

fn render(
    path: &Path,
    workload: &str,
    axis: Axis,
    points: &[(u32, u64)],
) -> crate::Result<()> {
    let x_min = points.iter().map(|p| p.0).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.0).max().unwrap_or(0);
    let y_max = points.iter().map(|p| p.1).max().unwrap_or(0);
    // Pad both ranges so a single point still spans a drawable area.
    let x_range = x_min.saturating_sub(1)..x_max + 1;
    let y_range = 0..y_max + y_max / 10 + 1;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{workload}: Effect of {} on Execution Cycles", axis.label()),
            ("sans-serif", 24),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(axis.label())
        .y_desc("Maximum Execution Cycles")
        .x_labels(points.len() + 2)
        .light_line_style(BLACK.mix(0.1))
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        BLUE.stroke_width(2),
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|&point| Circle::new(point, 5, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::error::SweepError;

/// Creates the chart directory if needed. Safe to call repeatedly.
pub fn prepare_output_dir(output_dir: &Path) -> Result<(), SweepError> {
    fs::create_dir_all(output_dir).map_err(|e| SweepError::Io {
        path: output_dir.to_path_buf(),
        source: e,
    })
}

/// Deletes the temporary reports of a sweep and returns how many existed.
///
/// Files that are already gone are skipped; any other failure is only logged,
/// since the charts have been written by the time this runs.
pub fn cleanup_reports(reports: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in reports {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("removed {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {}: {e}", path.display()),
        }
    }
    removed
}

//! Versioned calibration-state persistence.
//!
//! State files are write-once: each save creates `calibration_state.v{N}.json`
//! with `create_new`, so a concurrent writer racing for the same version fails
//! loudly instead of clobbering history. Loads pick the highest version
//! present.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::CalibrationState;
use crate::error::{AppError, ErrorKind};

const PREFIX: &str = "calibration_state.v";
const SUFFIX: &str = ".json";

fn state_path(dir: &Path, version: u32) -> PathBuf {
    dir.join(format!("{PREFIX}{version}{SUFFIX}"))
}

fn parse_version(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PREFIX)?
        .strip_suffix(SUFFIX)?
        .parse()
        .ok()
}

/// Load the highest-versioned state file in `dir`, if any.
pub fn load_latest(dir: &Path) -> Result<Option<CalibrationState>, AppError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppError::new(
                ErrorKind::Io,
                format!("Failed to read state directory '{}': {e}", dir.display()),
            ))
        }
    };

    let mut latest: Option<u32> = None;
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::new(ErrorKind::Io, format!("Failed to scan state directory: {e}"))
        })?;
        if let Some(version) = entry.file_name().to_str().and_then(parse_version) {
            latest = Some(latest.map_or(version, |v| v.max(version)));
        }
    }
    let Some(version) = latest else {
        return Ok(None);
    };

    let path = state_path(dir, version);
    let file = File::open(&path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to open state file '{}': {e}", path.display()),
        )
    })?;
    let state: CalibrationState = serde_json::from_reader(file).map_err(|e| {
        AppError::new(
            ErrorKind::InvalidInput,
            format!("Corrupt state file '{}': {e}", path.display()),
        )
    })?;
    if state.version != version {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!(
                "State file '{}' claims version {} but is named v{version}",
                path.display(),
                state.version
            ),
        ));
    }
    info!(version, path = %path.display(), "loaded calibration state");
    Ok(Some(state))
}

/// Persist `state` as the next version. Returns the written state (with the
/// bumped version) and its path.
pub fn save_next(dir: &Path, state: &CalibrationState) -> Result<(CalibrationState, PathBuf), AppError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create state directory '{}': {e}", dir.display()),
        )
    })?;

    let next = CalibrationState {
        version: state.version + 1,
        ..state.clone()
    };
    let path = state_path(dir, next.version);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!(
                    "Failed to create state file '{}' (already written by another run?): {e}",
                    path.display()
                ),
            )
        })?;
    serde_json::to_writer_pretty(file, &next).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to write state file '{}': {e}", path.display()),
        )
    })?;
    info!(version = next.version, path = %path.display(), "saved calibration state");
    Ok((next, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ValidationStatus, Weights};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "access-engine-state-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn empty_directory_has_no_state() {
        let dir = temp_dir("empty");
        assert!(load_latest(&dir).unwrap().is_none());
    }

    #[test]
    fn save_bumps_version_and_load_picks_the_latest() {
        let dir = temp_dir("roundtrip");
        let initial = CalibrationState::initial(Weights::default());

        let (v1, _) = save_next(&dir, &initial).unwrap();
        assert_eq!(v1.version, 1);
        let (v2, _) = save_next(&dir, &v1).unwrap();
        assert_eq!(v2.version, 2);

        let loaded = load_latest(&dir).unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.weights, Weights::default());
        assert_eq!(loaded.status, ValidationStatus::NotValidated);
    }

    #[test]
    fn versions_are_write_once() {
        let dir = temp_dir("write-once");
        let initial = CalibrationState::initial(Weights::default());
        save_next(&dir, &initial).unwrap();

        // A second writer starting from the same base version must fail.
        let err = save_next(&dir, &initial).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = temp_dir("noise");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a state file").unwrap();
        std::fs::write(dir.join("calibration_state.vX.json"), "{}").unwrap();
        assert!(load_latest(&dir).unwrap().is_none());
    }
}

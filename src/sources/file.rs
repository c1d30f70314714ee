//! Directory-of-JSON-files configuration store
//!
//! Layout:
//!
//! ```text
//! <dir>/configuration.json
//! <dir>/baseline_<kind>.json
//! ```
//!
//! Writes go to a temporary sibling first and are renamed into place, so a crash
//! mid-write leaves the previous file intact.

use super::ConfigurationStore;
use crate::baseline::{BaselineCalibrator, SignalKind};
use crate::config::LoadConfiguration;
use crate::error::EngineError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIGURATION_FILE: &str = "configuration.json";

/// Configuration store persisting each value as a JSON file under one directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| storage_error(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn calibrator_path(&self, kind: SignalKind) -> PathBuf {
        self.dir.join(format!("baseline_{}.json", kind.as_str()))
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, EngineError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(path, e)),
        }
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| storage_error(path, e))?;
        debug!(path = %path.display(), "state written");
        Ok(())
    }
}

impl ConfigurationStore for JsonFileStore {
    fn load_configuration(&self) -> Result<Option<LoadConfiguration>, EngineError> {
        self.read(&self.dir.join(CONFIGURATION_FILE))
    }

    fn save_configuration(
        &mut self,
        configuration: &LoadConfiguration,
    ) -> Result<(), EngineError> {
        self.write(&self.dir.join(CONFIGURATION_FILE), configuration)
    }

    fn load_calibrator(&self, kind: SignalKind) -> Result<Option<BaselineCalibrator>, EngineError> {
        let calibrator: Option<BaselineCalibrator> = self.read(&self.calibrator_path(kind))?;
        match calibrator {
            Some(c) if c.kind() != kind => Err(EngineError::Storage(format!(
                "{} holds a {} calibrator",
                self.calibrator_path(kind).display(),
                c.kind()
            ))),
            other => Ok(other),
        }
    }

    fn save_calibrator(&mut self, calibrator: &BaselineCalibrator) -> Result<(), EngineError> {
        self.write(&self.calibrator_path(calibrator.kind()), calibrator)
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> EngineError {
    EngineError::Storage(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConditionPreset, RecoveryWindow};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.load_configuration().unwrap(), None);
        assert_eq!(store.load_calibrator(SignalKind::Load).unwrap(), None);
    }

    #[test]
    fn test_round_trip_and_no_leftover_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("state")).unwrap();

        let mut config = LoadConfiguration::Preset {
            preset: ConditionPreset::Fibromyalgia,
        };
        config.set_recovery(RecoveryWindow::Fast);
        store.save_configuration(&config).unwrap();

        let mut calibrator = BaselineCalibrator::new(SignalKind::Load);
        calibrator.start_calibration().unwrap();
        calibrator.record_value(12.5).unwrap();
        store.save_calibrator(&calibrator).unwrap();

        let reopened = JsonFileStore::open(dir.path().join("state")).unwrap();
        assert_eq!(reopened.load_configuration().unwrap(), Some(config));
        assert_eq!(
            reopened.load_calibrator(SignalKind::Load).unwrap(),
            Some(calibrator)
        );

        let leftovers: Vec<_> = fs::read_dir(reopened.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIGURATION_FILE), "{not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load_configuration(),
            Err(EngineError::JsonError(_))
        ));
    }

    #[test]
    fn test_mismatched_calibrator_kind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store
            .save_calibrator(&BaselineCalibrator::new(SignalKind::Hrv))
            .unwrap();
        fs::rename(
            dir.path().join("baseline_hrv.json"),
            dir.path().join("baseline_sleep_hours.json"),
        )
        .unwrap();
        assert!(matches!(
            store.load_calibrator(SignalKind::SleepHours),
            Err(EngineError::Storage(_))
        ));
    }
}

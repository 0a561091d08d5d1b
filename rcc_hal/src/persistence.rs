//! Encoder home reference persistence.
//!
//! The home reference is the only value that survives restarts. It is
//! stored with bincode in a small versioned record.

use rcc_common::hal::driver::HalError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk home record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedHome {
    /// Format version (for migration).
    pub version: u32,
    /// Home reference [ticks].
    pub encoder_home_position: i64,
    /// Timestamp of last save (Unix epoch seconds).
    pub saved_at: u64,
}

impl PersistedHome {
    /// Current format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Record for `home`, unsaved.
    pub fn new(home: i64) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            encoder_home_position: home,
            saved_at: 0,
        }
    }
}

/// Home reference state file.
#[derive(Debug, Clone)]
pub struct HomePersistence {
    path: PathBuf,
}

impl HomePersistence {
    /// Persistence backed by `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// State file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save `home`. Writes a temporary file and renames it over the old one.
    pub fn save(&self, home: i64) -> Result<(), HalError> {
        debug!("Saving home position {home} to {:?}", self.path);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HalError::PersistenceError(format!("Failed to create directory: {e}"))
            })?;
        }

        let mut record = PersistedHome::new(home);
        record.saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp).map_err(|e| {
            HalError::PersistenceError(format!("Failed to create state file: {e}"))
        })?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &record).map_err(|e| {
            HalError::PersistenceError(format!("Failed to serialize home position: {e}"))
        })?;
        writer
            .flush()
            .map_err(|e| HalError::PersistenceError(format!("Failed to flush state file: {e}")))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            HalError::PersistenceError(format!("Failed to replace state file: {e}"))
        })?;

        info!("Saved home position {home} to {:?}", self.path);
        Ok(())
    }

    /// Load the home reference. `Ok(None)` when no file exists yet.
    pub fn load(&self) -> Result<Option<i64>, HalError> {
        debug!("Loading home position from {:?}", self.path);

        if !self.path.exists() {
            debug!("State file does not exist, starting from home 0");
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| {
            HalError::PersistenceError(format!("Failed to open state file: {e}"))
        })?;
        let record: PersistedHome =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
                warn!("Failed to deserialize state file: {e}");
                HalError::PersistenceError(format!("Failed to deserialize home position: {e}"))
            })?;

        if record.version != PersistedHome::CURRENT_VERSION {
            return Err(HalError::PersistenceError(format!(
                "State file version {} differs from current {}",
                record.version,
                PersistedHome::CURRENT_VERSION
            )));
        }

        info!(
            "Loaded home position {} from {:?} (saved at {})",
            record.encoder_home_position, self.path, record.saved_at
        );
        Ok(Some(record.encoder_home_position))
    }
}

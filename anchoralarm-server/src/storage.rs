//! Anchor state file.
//!
//! The anchor state is written as pretty JSON after every change so a
//! restart resumes watching the same anchor.
//!
//! Default path: `~/.local/share/anchoralarm/state.json`

use anchoralarm_core::AnchorState;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        StateFile { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted state, `None` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<AnchorState>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No anchor state at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let state: AnchorState = serde_json::from_reader(BufReader::new(file))?;
        info!(
            "Loaded anchor state from {} (anchor {})",
            self.path.display(),
            if state.active { "down" } else { "up" }
        );
        Ok(Some(state))
    }

    pub fn save(&self, state: &AnchorState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        debug!("Saved anchor state to {}", self.path.display());
        Ok(())
    }
}

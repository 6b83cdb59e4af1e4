//! Configuration file and data directory lookup.

use anchoralarm_core::AnchorConfig;
use directories::ProjectDirs;
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

const STATE_FILE_NAME: &str = "state.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "signalk", "anchoralarm")
}

/// `<data_dir>/state.json`, or a file in the working directory when the
/// platform has no home directory.
pub fn default_state_file() -> PathBuf {
    get_project_dirs()
        .map(|dirs| dirs.data_dir().join(STATE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from("anchoralarm-state.json"))
}

/// Read the configuration from `path`.
pub fn read_config(path: &Path) -> Result<AnchorConfig, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Json {
        path: path.to_owned(),
        source,
    })
}

/// Configuration for the server. Without a file, or with a file that
/// cannot be used, the defaults apply.
pub fn load_config(path: Option<&Path>) -> AnchorConfig {
    let Some(path) = path else {
        debug!("No configuration file given, using defaults");
        return AnchorConfig::default();
    };
    match read_config(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            AnchorConfig::default()
        }
    }
}

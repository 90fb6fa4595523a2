use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::PitviewError;

const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_YEAR: &str = "2025";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub preferred_year: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            preferred_year: DEFAULT_YEAR.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("pitview").join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            serde_json::from_reader(file).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), PitviewError> {
        let config_path = dirs::config_dir()
            .ok_or(PitviewError::NoConfigDir)?
            .join("pitview")
            .join(CONFIG_FILE_NAME);

        if !config_path.exists()
            && let Some(parent) = config_path.parent()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PitviewError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PitviewError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| PitviewError::ConfigSerializeError { source: e })
    }
}

use serde::Deserialize;
use std::path::PathBuf;

use crate::storage::FileStorage;

/// Client settings, read from `TASKLY_*` environment variables.
#[derive(Deserialize, Debug, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub storage_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("TASKLY"))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// Where the session is stored: the configured path, or the platform data dir.
    pub fn storage_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => FileStorage::default_path().ok_or_else(|| {
                anyhow::anyhow!("No data directory on this platform; set TASKLY_STORAGE_PATH")
            }),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

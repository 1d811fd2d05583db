use std::path::{Path, PathBuf};

use egui::Pos2;
use log::warn;
use serde::{Deserialize, Serialize};

use pitwall::DashboardError;
use pitwall::provider::{MIN_SEASON, SessionKind, cache::DEFAULT_SESSION_TTL, openf1};

const CONFIG_DIR_NAME: &str = "pitwall";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct WindowPosition {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Default for WindowPosition {
    fn default() -> Self {
        Self { x: 0., y: 0. }
    }
}

impl From<WindowPosition> for Pos2 {
    fn from(value: WindowPosition) -> Self {
        Pos2::new(value.x, value.y)
    }
}

impl From<Pos2> for WindowPosition {
    fn from(value: Pos2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) provider_base_url: String,
    pub(crate) session_cache_ttl_s: u64,
    pub(crate) window_position: WindowPosition,
    // last selection, restored at startup
    pub(crate) year: u16,
    pub(crate) event: Option<String>,
    pub(crate) session_code: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider_base_url: openf1::DEFAULT_BASE_URL.to_string(),
            session_cache_ttl_s: DEFAULT_SESSION_TTL.as_secs(),
            window_position: WindowPosition::default(),
            year: MIN_SEASON,
            event: None,
            session_code: SessionKind::Race.code().to_string(),
        }
    }
}

impl AppConfig {
    pub(crate) fn from_local_file() -> Option<Self> {
        let config_path = config_file_path()?;
        if !config_path.exists() {
            return None;
        }
        match Self::load_from(&config_path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring unreadable config file: {}", e);
                None
            }
        }
    }

    pub(crate) fn save(&self) -> Result<(), DashboardError> {
        let config_path = config_file_path().ok_or(DashboardError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    fn load_from(path: &Path) -> Result<Self, DashboardError> {
        let file =
            std::fs::File::open(path).map_err(|e| DashboardError::ConfigIOError { source: e })?;
        serde_json::from_reader(file).map_err(|e| DashboardError::ConfigSerializeError { source: e })
    }

    fn save_to(&self, path: &Path) -> Result<(), DashboardError> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| DashboardError::ConfigIOError { source: e })?;
        }
        let file =
            std::fs::File::create(path).map_err(|e| DashboardError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| DashboardError::ConfigSerializeError { source: e })
    }
}

fn config_file_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = AppConfig {
            year: 2023,
            event: Some("Monaco Grand Prix".to_string()),
            session_code: "Q".to_string(),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.year, 2023);
        assert_eq!(loaded.event.as_deref(), Some("Monaco Grand Prix"));
        assert_eq!(loaded.session_code, "Q");
        assert_eq!(loaded.provider_base_url, openf1::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"year": 2022}"#).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.year, 2022);
        assert_eq!(loaded.session_cache_ttl_s, DEFAULT_SESSION_TTL.as_secs());
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Offset from logical camera index to physical device index. Virtual
    /// camera drivers shift the real devices up by this many slots.
    pub vcam_offset: usize,
    /// File written by the external camera enumeration step, one name per line.
    pub camera_list_path: String,
    /// Optional enumeration executable to run at startup.
    pub camera_enum_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub mirror: bool,
    pub hide_preview: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub pose: String,
    pub face_mesh: String,
    pub hand: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 5005,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            vcam_offset: 0,
            camera_list_path: "camera_list.txt".to_string(),
            camera_enum_path: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            mirror: true,
            hide_preview: false,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            pose: "models/pose_landmark.onnx".to_string(),
            face_mesh: "models/face_mesh.onnx".to_string(),
            hand: "models/hand_landmark.onnx".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            capture: CaptureConfig::default(),
            display: DisplayConfig::default(),
            models: ModelsConfig::default(),
        }
    }
}

impl AppConfig {
    pub const PATH: &'static str = "config.json";

    /// Load from `path` (or the default location). Missing file or a parse
    /// error falls back to defaults; the effective config is saved back so
    /// newly added fields materialize in the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(Self::PATH));

        let config = if path.exists() {
            let content = fs::read_to_string(path)?;
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    log::info!("loaded configuration from {}", path.display());
                    c
                }
                Err(e) => {
                    log::warn!("could not parse {}: {}. using defaults", path.display(), e);
                    Self::default()
                }
            }
        } else {
            log::info!(
                "configuration file not found, creating default at {}",
                path.display()
            );
            Self::default()
        };

        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let json = r#"{"network": {"ip": "10.0.0.2"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.network.ip, "10.0.0.2");
        assert_eq!(config.network.port, NetworkConfig::default().port);
        assert_eq!(config.capture.vcam_offset, 0);
        assert!(config.display.mirror);
        assert_eq!(config.models.face_mesh, "models/face_mesh.onnx");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.network.ip, config.network.ip);
        assert_eq!(back.display.width, config.display.width);
    }
}

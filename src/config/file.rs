use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DEVICE: &str = "/dev/input/event0";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "default_device")]
    pub device: PathBuf,
    pub update_rate_hz: Option<u32>,
    pub deadzone: Option<f32>,
    pub power: Option<f32>,
    pub speed: Option<f32>,
    pub fade_secs: Option<u64>,
    pub axis_min: Option<i32>,
    pub axis_max: Option<i32>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            update_rate_hz: None,
            deadzone: None,
            power: None,
            speed: None,
            fade_secs: None,
            axis_min: None,
            axis_max: None,
        }
    }
}

fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE)
}

pub fn parse(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse(&content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    for path in default_config_paths() {
        if path.exists() {
            if let Some(config) = load_from_path(&path) {
                return Some(config);
            }
        }
    }
    None
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("stick-mouse.toml")];

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join("stick-mouse.toml"));
    }

    paths
}

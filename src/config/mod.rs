mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;
use std::time::Duration;

use crate::cursor::CursorSettings;

use file::FileConfig;

const DEFAULT_AXIS_MIN: i32 = -32768;
const DEFAULT_AXIS_MAX: i32 = 32767;

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub device: PathBuf,
    pub cursor: CursorSettings,
    pub axis_min: i32,
    pub axis_max: i32,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file_config: FileConfig) -> Self {
        let defaults = CursorSettings::default();

        Self {
            device: cli.device.clone().unwrap_or(file_config.device),
            cursor: CursorSettings {
                update_rate_hz: cli
                    .update_rate_hz
                    .or(file_config.update_rate_hz)
                    .unwrap_or(defaults.update_rate_hz),
                deadzone: cli.deadzone.or(file_config.deadzone).unwrap_or(defaults.deadzone),
                power: cli.power.or(file_config.power).unwrap_or(defaults.power),
                speed: cli.speed.or(file_config.speed).unwrap_or(defaults.speed),
                fade: cli
                    .fade_secs
                    .or(file_config.fade_secs)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.fade),
            },
            axis_min: cli.axis_min.or(file_config.axis_min).unwrap_or(DEFAULT_AXIS_MIN),
            axis_max: cli.axis_max.or(file_config.axis_max).unwrap_or(DEFAULT_AXIS_MAX),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0.0..1.0).contains(&self.cursor.deadzone) {
            return Err("deadzone must be in [0, 1)");
        }
        if self.cursor.update_rate_hz == 0 {
            return Err("update_rate_hz must be positive");
        }
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.cursor.speed) || !positive(self.cursor.power) {
            return Err("speed and power must be positive");
        }
        if self.axis_min >= self.axis_max {
            return Err("axis_min must be below axis_max");
        }
        Ok(())
    }

    /// Map a raw stick axis value onto [-1, 1].
    pub fn normalize_axis(&self, raw: i32) -> f32 {
        let span = f64::from(self.axis_max) - f64::from(self.axis_min);
        let unit = (f64::from(raw) - f64::from(self.axis_min)) / span;
        ((unit * 2.0 - 1.0) as f32).clamp(-1.0, 1.0)
    }
}

//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::{Color, parse_color};
use crate::rate::{BlinkRate, DEFAULT_RATE_HZ, MAX_RATE_HZ, MIN_RATE_HZ};
use crate::sysfs::DEFAULT_LEDS_ROOT;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# BlinkTorch configuration. Changes made outside the app may be overwritten.\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Blink rate in Hz, 0.5–5.0. Default: 1.0.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Torch intensity when on, in (0.0, 1.0]. Default: 1.0 (full).
    #[serde(default = "default_torch_level")]
    pub torch_level: f32,

    /// LED class device used as torch. Empty = first flash/torch LED found.
    #[serde(default)]
    pub led: String,

    /// Directory holding LED class devices. Default: "/sys/class/leds".
    #[serde(default = "default_leds_root")]
    pub leds_root: String,

    /// Screen color during the "on" phase (hex or name). Default: "#FFFFFF".
    #[serde(default = "default_screen_on_color")]
    pub screen_on_color: String,

    /// Screen color during the "off" phase (hex or name). Default: "#000000".
    #[serde(default = "default_screen_off_color")]
    pub screen_off_color: String,

    /// Background-execution budget for the torch in seconds. 0 = unlimited.
    #[serde(default)]
    pub lease_budget_secs: u64,
}

fn default_rate_hz() -> f64 {
    DEFAULT_RATE_HZ
}
fn default_torch_level() -> f32 {
    1.0
}
fn default_leds_root() -> String {
    DEFAULT_LEDS_ROOT.into()
}
fn default_screen_on_color() -> String {
    "#FFFFFF".into()
}
fn default_screen_off_color() -> String {
    "#000000".into()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rate_hz: default_rate_hz(),
            torch_level: default_torch_level(),
            led: String::new(),
            leds_root: default_leds_root(),
            screen_on_color: default_screen_on_color(),
            screen_off_color: default_screen_off_color(),
            lease_budget_secs: 0,
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `rate_hz` is outside the supported range.
    InvalidRate(String),
    /// `torch_level` is not in (0.0, 1.0].
    InvalidTorchLevel(f32),
    /// A screen color could not be parsed (`field` names which one).
    InvalidColor { field: &'static str, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidRate(e) => write!(f, "Invalid rate_hz: {e}"),
            ValidationError::InvalidTorchLevel(level) => {
                write!(f, "Invalid torch_level: {level} (must be > 0 and <= 1)")
            }
            ValidationError::InvalidColor { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("blinktorch"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Configured rate, clamped into the supported range.
    pub fn rate(&self) -> BlinkRate {
        BlinkRate::clamped(self.rate_hz)
    }

    /// Background budget, `None` when unlimited.
    pub fn lease_budget(&self) -> Option<Duration> {
        (self.lease_budget_secs > 0).then(|| Duration::from_secs(self.lease_budget_secs))
    }

    pub fn leds_root(&self) -> &Path {
        Path::new(&self.leds_root)
    }

    /// Resolve `(on, off)` screen colors, falling back to white/black per field.
    pub fn screen_colors(&self) -> (Color, Color) {
        let on = parse_color(&self.screen_on_color).unwrap_or_else(|e| {
            log::warn!("[config] {e}, using {}", Color::WHITE);
            Color::WHITE
        });
        let off = parse_color(&self.screen_off_color).unwrap_or_else(|e| {
            log::warn!("[config] {e}, using {}", Color::BLACK);
            Color::BLACK
        });
        (on, off)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = BlinkRate::new(self.rate_hz) {
            errors.push(ValidationError::InvalidRate(e.to_string()));
        }

        if !(self.torch_level > 0.0 && self.torch_level <= 1.0) {
            errors.push(ValidationError::InvalidTorchLevel(self.torch_level));
        }

        for (field, value) in [
            ("screen_on_color", &self.screen_on_color),
            ("screen_off_color", &self.screen_off_color),
        ] {
            if let Err(e) = parse_color(value) {
                errors.push(ValidationError::InvalidColor {
                    field,
                    reason: e.to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Human-readable rate bounds, e.g. for CLI help.
pub fn rate_bounds() -> String {
    format!("{MIN_RATE_HZ:.1}-{MAX_RATE_HZ:.1} Hz")
}

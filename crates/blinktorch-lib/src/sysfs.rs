//! Linux LED class backend (`/sys/class/leds/<name>`).
//!
//! Phone and laptop flash LEDs are exposed by the kernel as LED class
//! devices. Writing `brightness` lights the LED continuously, which is the
//! torch mode this crate needs.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::torch::{LightSource, Result, TorchError};

/// Where the kernel exposes LED class devices.
pub const DEFAULT_LEDS_ROOT: &str = "/sys/class/leds";

/// Name fragments that identify a camera flash / torch LED.
const TORCH_HINTS: &[&str] = &["flash", "torch"];

/// A discovered LED class device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedInfo {
    pub name: String,
    pub path: PathBuf,
    /// `None` if `max_brightness` is missing or unreadable.
    pub max_brightness: Option<u32>,
    /// Name suggests a camera flash.
    pub torch: bool,
}

fn read_max_brightness(dir: &Path) -> Option<u32> {
    std::fs::read_to_string(dir.join("max_brightness"))
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

fn looks_like_torch(name: &str) -> bool {
    let lower = name.to_lowercase();
    TORCH_HINTS.iter().any(|hint| lower.contains(hint))
}

/// List LED class devices under `root`, torch-like names first, then by name.
pub fn discover_leds(root: &Path) -> std::io::Result<Vec<LedInfo>> {
    let mut leds = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.join("brightness").exists() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        leds.push(LedInfo {
            torch: looks_like_torch(&name),
            max_brightness: read_max_brightness(&path),
            name,
            path,
        });
    }
    leds.sort_by(|a, b| b.torch.cmp(&a.torch).then_with(|| a.name.cmp(&b.name)));
    Ok(leds)
}

/// First torch-like LED under `root`, if any.
pub fn find_torch_led(root: &Path) -> Option<LedInfo> {
    discover_leds(root)
        .ok()?
        .into_iter()
        .find(|led| led.torch && led.max_brightness.is_some_and(|m| m > 0))
}

/// A single LED class device used as the torch.
///
/// The configuration lock is the open `brightness` file: it is opened on
/// lock, written while held, and closed on unlock. Continuous-mode support
/// is decided once in [`SysfsLight::open`]; an LED that vanishes later makes
/// locking fail instead of silently turning the torch inert.
#[derive(Debug)]
pub struct SysfsLight {
    dir: PathBuf,
    max_brightness: Option<u32>,
    continuous: bool,
    writer: Option<File>,
}

impl SysfsLight {
    /// Bind to an LED directory. A missing or unreadable LED yields an inert light.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let max_brightness = read_max_brightness(&dir);
        if max_brightness.is_none() {
            log::debug!("[torch] {} has no readable max_brightness", dir.display());
        }
        let continuous =
            max_brightness.is_some_and(|m| m > 0) && dir.join("brightness").exists();
        Self {
            dir,
            max_brightness,
            continuous,
            writer: None,
        }
    }

    /// Bind to `root/name`.
    pub fn by_name(root: &Path, name: &str) -> Self {
        Self::open(root.join(name))
    }

    /// A light with no backing device.
    pub fn none() -> Self {
        Self {
            dir: PathBuf::new(),
            max_brightness: None,
            continuous: false,
            writer: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_brightness(&self) -> Option<u32> {
        self.max_brightness
    }

    fn brightness_path(&self) -> PathBuf {
        self.dir.join("brightness")
    }

    /// Raw brightness value for an intensity in `0.0..=1.0`; never 0 when on.
    fn raw_level(&self, on: bool, level: f32) -> u32 {
        match (on, self.max_brightness) {
            (true, Some(max)) => {
                let scaled = (level.clamp(0.0, 1.0) as f64 * max as f64).round() as u32;
                scaled.clamp(1, max)
            }
            _ => 0,
        }
    }
}

impl LightSource for SysfsLight {
    fn has_continuous_mode(&self) -> bool {
        self.continuous
    }

    fn lock_for_configuration(&mut self) -> Result<()> {
        let path = self.brightness_path();
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| TorchError::LockFailed(format!("{}: {e}", path.display())))?;
        self.writer = Some(file);
        Ok(())
    }

    fn set_on(&mut self, on: bool, level: f32) -> Result<()> {
        if !self.has_continuous_mode() {
            return Err(TorchError::Unavailable);
        }
        let raw = self.raw_level(on, level);
        let path = self.brightness_path();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| TorchError::ModeFailed(format!("{}: not locked", path.display())))?;
        writer
            .write_all(format!("{raw}\n").as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| TorchError::ModeFailed(format!("{}: {e}", path.display())))
    }

    fn unlock_for_configuration(&mut self) {
        self.writer = None;
    }
}

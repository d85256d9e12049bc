//! CLI subcommands: strobe, rate preview, LED discovery, configuration.

mod config_cmd;
mod leds;
mod rate_cmd;
mod run;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use blinktorch_lib::config::Config;
pub(super) use blinktorch_lib::error::Result;
pub(super) use blinktorch_lib::rate::BlinkRate;
pub(super) use blinktorch_lib::sysfs::LedInfo;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Pretty-print `value` as JSON on stdout.
pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{text}");
    Ok(())
}

/// Load the config from `custom_path` or the platform default, logging parse warnings.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(path) => Config::load_from(path),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

/// Resolved config file path: `--config` if given, else the platform default.
pub(super) fn config_path(custom_path: Option<&Path>) -> Option<PathBuf> {
    custom_path.map(Path::to_path_buf).or_else(Config::path)
}

pub(super) fn millis(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}

/// Parse a non-negative number of seconds, e.g. `2.5`.
fn parse_seconds(s: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{s}' is not a valid duration"))
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct RateOutput {
    pub rate_hz: f64,
    pub half_period_ms: u64,
    pub toggles_per_second: f64,
    pub min_hz: f64,
    pub max_hz: f64,
}

#[derive(Serialize)]
pub(super) struct LedsOutput {
    pub root: String,
    pub count: usize,
    pub leds: Vec<LedInfo>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct RunOutput {
    pub rate_hz: f64,
    pub half_period_ms: u64,
    pub elapsed_ms: u64,
    pub interrupted: bool,
    pub torch: Option<OutputSummaryJson>,
    pub screen: Option<OutputSummaryJson>,
    /// Colour left on screen after stopping.
    pub screen_color: Option<String>,
}

#[derive(Serialize)]
pub(super) struct OutputSummaryJson {
    pub toggles: u64,
    pub stop_reason: Option<String>,
    /// LED directory for the torch, on/off colors for the screen.
    pub target: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Blink the torch and/or the screen until Ctrl+C
    Run {
        /// Blink the torch LED
        #[arg(long)]
        torch: bool,
        /// Blink the screen (rendered as colour lines on stdout)
        #[arg(long)]
        screen: bool,
        /// Blink rate in Hz, 0.5-5.0 in 0.1 steps (default: from config)
        #[arg(long, value_name = "HZ")]
        rate: Option<BlinkRate>,
        /// LED class device to use as torch (default: auto-detect)
        #[arg(long, value_name = "NAME")]
        led: Option<String>,
        /// Directory holding LED class devices (default: from config)
        #[arg(long, value_name = "PATH")]
        leds_root: Option<PathBuf>,
        /// Stop after this many seconds
        #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
        duration: Option<Duration>,
    },

    /// Show a blink rate and its half-period
    Rate {
        /// Rate in Hz, rounded to 0.1 (default: from config)
        hz: Option<BlinkRate>,
    },

    /// List LED class devices, torch candidates first
    Leds {
        /// Directory holding LED class devices (default: from config)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },

    /// Show current configuration and file path
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

pub fn run(cmd: Command, json: bool, config_file: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Run {
            torch,
            screen,
            rate,
            led,
            leds_root,
            duration,
        } => {
            let config = load_config(config_file);
            let opts = run::RunOptions {
                torch,
                screen,
                rate: rate.map_or_else(|| config.rate(), BlinkRate::snapped),
                led: led.or_else(|| (!config.led.is_empty()).then(|| config.led.clone())),
                leds_root: leds_root.unwrap_or_else(|| config.leds_root().to_path_buf()),
                duration,
            };
            run::cmd_run(opts, &config, json)
        }
        Command::Rate { hz } => {
            let rate = hz.map_or_else(|| load_config(config_file).rate(), BlinkRate::snapped);
            rate_cmd::cmd_rate(rate, json)
        }
        Command::Leds { root } => {
            let root = root.unwrap_or_else(|| load_config(config_file).leds_root().to_path_buf());
            leds::cmd_leds(&root, json)
        }
        Command::Config { init } => config_cmd::cmd_config(json, config_file, init),
    }
}


#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn seconds_accept_fractions() {
        assert_eq!(parse_seconds("0.25").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_seconds(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn seconds_reject_negative_and_garbage() {
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("NaN").is_err());
    }

    #[test]
    fn millis_rounds_down() {
        assert_eq!(millis(Duration::from_micros(714_285)), 714);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(Some(&tmp.path().join("absent.toml")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_path_prefers_override() {
        let p = Path::new("/tmp/custom.toml");
        assert_eq!(config_path(Some(p)).as_deref(), Some(p));
    }
}

//! `config` subcommand: show the effective configuration and its file path.

use std::path::Path;

use blinktorch_lib::BlinkError;
use blinktorch_lib::color::parse_color;

use super::{
    Config, ConfigOutput, Result, config_path, kv, kv_indent, kv_width, load_config, print_json,
};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>, init: bool) -> Result<()> {
    let path = config_path(custom_path);

    if init {
        let Some(p) = &path else {
            return Err(BlinkError::Config("no config directory".into()));
        };
        if p.exists() {
            log::info!("{} already exists, leaving it untouched", p.display());
        } else {
            Config::default().save_to(p)?;
            if !json {
                println!("Wrote default config to {}", p.display());
            }
        }
    }

    let config = load_config(custom_path);
    let exists = path.as_ref().is_some_and(|p| p.exists());
    let problems: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };

    if json {
        return print_json(&ConfigOutput {
            config_file: path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: exists,
            settings: config,
            problems,
        });
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "rate_hz:",
            "torch_level:",
            "led:",
            "leds_root:",
            "screen_on_color:",
            "screen_off_color:",
            "lease_budget_secs:",
        ],
    );

    match &path {
        Some(p) if exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("rate_hz:", format_args!("{} -> {}", config.rate_hz, config.rate()), w);
    kv_indent("torch_level:", config.torch_level, w);
    let led = if config.led.is_empty() {
        "(auto-detect)"
    } else {
        config.led.as_str()
    };
    kv_indent("led:", led, w);
    kv_indent("leds_root:", &config.leds_root, w);
    let color_display = |s: &str| match parse_color(s) {
        Ok(c) => format!("{s} -> {c}"),
        Err(_) => format!("{s} (invalid)"),
    };
    kv_indent("screen_on_color:", color_display(&config.screen_on_color), w);
    kv_indent("screen_off_color:", color_display(&config.screen_off_color), w);
    match config.lease_budget() {
        Some(b) => kv_indent("lease_budget_secs:", format_args!("{}", b.as_secs()), w),
        None => kv_indent("lease_budget_secs:", "0 (unlimited)", w),
    }

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    Ok(())
}

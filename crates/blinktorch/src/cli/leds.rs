//! `leds` subcommand: list LED class devices that could serve as a torch.

use std::path::Path;

use blinktorch_lib::sysfs::discover_leds;

use super::{LedsOutput, Result, print_json};

pub(super) fn cmd_leds(root: &Path, json: bool) -> Result<()> {
    let leds = match discover_leds(root) {
        Ok(leds) => leds,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} does not exist", root.display());
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&LedsOutput {
            root: root.display().to_string(),
            count: leds.len(),
            leds,
        });
    }

    if leds.is_empty() {
        println!("No LEDs found under {}.", root.display());
        return Ok(());
    }

    let name_w = leds.iter().map(|l| l.name.len()).max().unwrap_or(0) + 2;
    for led in &leds {
        let max = led
            .max_brightness
            .map_or_else(|| "max=?".to_string(), |m| format!("max={m}"));
        let tag = if led.torch { "  (torch)" } else { "" };
        println!("{:<name_w$}{max}{tag}", led.name);
    }
    Ok(())
}

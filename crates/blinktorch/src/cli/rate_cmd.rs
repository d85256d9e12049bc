//! `rate` subcommand: show a blink rate and its timing.

use blinktorch_lib::config::rate_bounds;
use blinktorch_lib::rate::{MAX_RATE_HZ, MIN_RATE_HZ};

use super::{BlinkRate, RateOutput, Result, kv, kv_width, millis, print_json};

pub(super) fn cmd_rate(rate: BlinkRate, json: bool) -> Result<()> {
    let half_period = rate.half_period();
    // One on and one off transition per cycle
    let toggles_per_second = rate.hz() * 2.0;

    if json {
        return print_json(&RateOutput {
            rate_hz: rate.hz(),
            half_period_ms: millis(half_period),
            toggles_per_second,
            min_hz: MIN_RATE_HZ,
            max_hz: MAX_RATE_HZ,
        });
    }

    let w = kv_width(&["Rate:", "Half-period:", "Toggles/s:", "Range:"], &[]);
    kv("Rate:", rate, w);
    kv("Half-period:", format_args!("{} ms", millis(half_period)), w);
    kv("Toggles/s:", format_args!("{toggles_per_second:.1}"), w);
    kv("Range:", rate_bounds(), w);
    Ok(())
}

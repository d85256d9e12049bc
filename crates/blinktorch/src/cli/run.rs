//! `run` subcommand: blink the torch and/or the screen on a real-time loop.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use blinktorch_lib::BlinkError;
use blinktorch_lib::controller::BlinkController;
use blinktorch_lib::event_loop::EventLoop;
use blinktorch_lib::lease::{BudgetLease, ExecutionLease, UnboundedLease};
use blinktorch_lib::output::BlinkOutput;
use blinktorch_lib::scheduler::Scheduler;
use blinktorch_lib::screen::ScreenOutput;
use blinktorch_lib::session::BlinkSession;
use blinktorch_lib::sysfs::{self, SysfsLight};
use blinktorch_lib::torch::TorchOutput;

use super::{
    BlinkRate, Config, OutputSummaryJson, RUNNING, Result, RunOutput, kv, kv_width, millis,
    print_json,
};

/// Longest stretch the loop runs before re-checking for idle outputs.
const SLICE: Duration = Duration::from_millis(250);

pub(super) struct RunOptions {
    pub torch: bool,
    pub screen: bool,
    pub rate: BlinkRate,
    pub led: Option<String>,
    pub leds_root: PathBuf,
    pub duration: Option<Duration>,
}

/// Pick the torch LED: an explicit name, else the first flash/torch LED.
fn resolve_light(led: Option<&str>, root: &std::path::Path) -> SysfsLight {
    if let Some(name) = led {
        return SysfsLight::by_name(root, name);
    }
    match sysfs::find_torch_led(root) {
        Some(info) => {
            log::info!("[torch] using {}", info.path.display());
            SysfsLight::open(info.path)
        }
        None => SysfsLight::none(),
    }
}

fn summary<O>(ctl: &BlinkController<O>, target: String) -> OutputSummaryJson
where
    O: BlinkOutput + 'static,
{
    OutputSummaryJson {
        toggles: ctl.toggle_count(),
        stop_reason: ctl.last_stop_reason().map(|r| r.to_string()),
        target,
    }
}

pub(super) fn cmd_run(opts: RunOptions, config: &Config, json: bool) -> Result<()> {
    if !opts.torch && !opts.screen {
        return Err(BlinkError::Config(
            "nothing to blink: pass --torch and/or --screen".into(),
        ));
    }

    let lp = Rc::new(EventLoop::new());
    let scheduler: Rc<dyn Scheduler> = lp.clone();
    let lease: Rc<dyn ExecutionLease> = match config.lease_budget() {
        Some(budget) => Rc::new(BudgetLease::new(scheduler.clone(), budget)),
        None => Rc::new(UnboundedLease::new()),
    };

    // A screen-only run must never touch an LED
    let light = if opts.torch {
        resolve_light(opts.led.as_deref(), &opts.leds_root)
    } else {
        SysfsLight::none()
    };
    let torch = TorchOutput::with_level(light, config.torch_level);
    if opts.torch && !torch.is_available() {
        log::warn!("[torch] no usable torch LED found, torch output will stay dark");
    }
    let torch_target = torch.light().dir().display().to_string();

    let (on_color, off_color) = config.screen_colors();
    let screen = ScreenOutput::new(on_color, off_color).with_observer(Box::new(move |color| {
        // JSON mode keeps stdout for the summary
        if !json {
            println!("[screen] {color}");
        }
    }));
    let screen_target = format!("{on_color}/{off_color}");
    let screen_handle = screen.handle();

    let mut session = BlinkSession::new(torch, screen, scheduler, lease, opts.rate);
    session.set_torch_enabled(opts.torch)?;
    session.set_screen_enabled(opts.screen)?;

    if !json {
        println!(
            "Blinking at {} (half-period {} ms). Press Ctrl+C to stop.",
            opts.rate,
            millis(opts.rate.half_period())
        );
    }

    let start = lp.now();
    while RUNNING.load(Ordering::SeqCst) && (session.torch_active() || session.screen_active()) {
        let elapsed = lp.now() - start;
        let slice = match opts.duration {
            Some(limit) if elapsed >= limit => break,
            Some(limit) => SLICE.min(limit - elapsed),
            None => SLICE,
        };
        lp.run(&RUNNING, Some(slice));
    }
    let interrupted = !RUNNING.load(Ordering::SeqCst);
    let elapsed = lp.now() - start;
    session.stop_all();

    let output = RunOutput {
        rate_hz: opts.rate.hz(),
        half_period_ms: millis(opts.rate.half_period()),
        elapsed_ms: millis(elapsed),
        interrupted,
        torch: opts.torch.then(|| summary(session.torch(), torch_target)),
        screen: opts.screen.then(|| summary(session.screen(), screen_target)),
        screen_color: opts.screen.then(|| screen_handle.color().to_string()),
    };

    if json {
        return print_json(&output);
    }

    let w = kv_width(&["Elapsed:", "Torch:", "Screen:", "Showing:"], &[]);
    println!();
    kv("Elapsed:", format_args!("{:.1} s", elapsed.as_secs_f64()), w);
    for (label, out) in [("Torch:", &output.torch), ("Screen:", &output.screen)] {
        if let Some(out) = out {
            let reason = out.stop_reason.as_deref().unwrap_or("requested");
            kv(
                label,
                format_args!("{} toggles, stopped: {reason}", out.toggles),
                w,
            );
        }
    }
    if let Some(color) = &output.screen_color {
        kv("Showing:", color, w);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led_dir(root: &std::path::Path, name: &str, max: u32) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("brightness"), "0\n").unwrap();
        std::fs::write(dir.join("max_brightness"), format!("{max}\n")).unwrap();
        dir
    }

    #[test]
    fn explicit_led_wins_over_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        led_dir(tmp.path(), "white:flash", 255);
        let chosen = led_dir(tmp.path(), "status", 1);
        let light = resolve_light(Some("status"), tmp.path());
        assert_eq!(light.dir(), chosen);
    }

    #[test]
    fn discovery_picks_flash_led() {
        let tmp = tempfile::tempdir().unwrap();
        led_dir(tmp.path(), "input0::capslock", 1);
        let flash = led_dir(tmp.path(), "white:flash", 255);
        let light = resolve_light(None, tmp.path());
        assert_eq!(light.dir(), flash);
    }

    #[test]
    fn no_torch_led_yields_inert_light() {
        let tmp = tempfile::tempdir().unwrap();
        led_dir(tmp.path(), "input0::capslock", 1);
        let light = resolve_light(None, tmp.path());
        assert!(light.max_brightness().is_none());
    }

    #[test]
    fn nothing_to_blink_is_an_error() {
        let opts = RunOptions {
            torch: false,
            screen: false,
            rate: BlinkRate::default(),
            led: None,
            leds_root: PathBuf::from("/nonexistent"),
            duration: None,
        };
        let err = cmd_run(opts, &Config::default(), true).unwrap_err();
        assert!(err.to_string().contains("--torch"));
    }
}

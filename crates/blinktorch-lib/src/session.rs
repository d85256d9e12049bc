//! Blink session: the shared rate plus one controller per output.
//!
//! The surface (CLI, app UI) holds a single rate and two independent
//! enable switches. Each switch starts or stops its own controller; a rate
//! change restarts only the controllers that are currently running, each
//! with a fresh interval.

use std::rc::Rc;

use crate::controller::BlinkController;
use crate::error::Result;
use crate::lease::ExecutionLease;
use crate::rate::BlinkRate;
use crate::scheduler::Scheduler;
use crate::screen::ScreenOutput;
use crate::torch::{LightSource, TorchOutput};

pub struct BlinkSession<L: LightSource + 'static> {
    rate: BlinkRate,
    torch: BlinkController<TorchOutput<L>>,
    screen: BlinkController<ScreenOutput>,
}

impl<L: LightSource + 'static> BlinkSession<L> {
    pub fn new(
        torch: TorchOutput<L>,
        screen: ScreenOutput,
        scheduler: Rc<dyn Scheduler>,
        lease: Rc<dyn ExecutionLease>,
        rate: BlinkRate,
    ) -> Self {
        Self {
            rate,
            torch: BlinkController::with_lease(torch, scheduler.clone(), lease),
            screen: BlinkController::new(screen, scheduler),
        }
    }

    pub fn rate(&self) -> BlinkRate {
        self.rate
    }

    /// Change the rate. Running outputs restart with the new interval.
    pub fn set_rate(&mut self, rate: BlinkRate) -> Result<()> {
        self.rate = rate;
        let half_period = rate.half_period();
        if self.torch.is_running() {
            self.torch.start(half_period)?;
        }
        if self.screen.is_running() {
            self.screen.start(half_period)?;
        }
        log::info!("[session] rate set to {rate}");
        Ok(())
    }

    pub fn set_torch_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.torch.start(self.rate.half_period())
        } else {
            self.torch.stop();
            Ok(())
        }
    }

    pub fn set_screen_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.screen.start(self.rate.half_period())
        } else {
            self.screen.stop();
            Ok(())
        }
    }

    /// False after a fail-stop even if the torch was never switched off.
    pub fn torch_active(&self) -> bool {
        self.torch.is_running()
    }

    pub fn screen_active(&self) -> bool {
        self.screen.is_running()
    }

    pub fn torch(&self) -> &BlinkController<TorchOutput<L>> {
        &self.torch
    }

    pub fn screen(&self) -> &BlinkController<ScreenOutput> {
        &self.screen
    }

    pub fn stop_all(&mut self) {
        self.torch.stop();
        self.screen.stop();
    }
}

//! Torch output: drives a camera flash LED through the [`LightSource`] trait.

use std::fmt;

use crate::output::{BlinkOutput, OutputError};

// ── Error type ──

/// Light source errors.
///
/// String payloads follow the convention **"context: details"**, e.g.
/// `"/sys/class/leds/flash/brightness: Permission denied"`.
#[derive(Debug)]
pub enum TorchError {
    /// No controllable light, or it cannot stay on continuously.
    Unavailable,
    /// Exclusive configuration access could not be acquired.
    LockFailed(String),
    /// The light rejected the requested mode.
    ModeFailed(String),
}

impl fmt::Display for TorchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorchError::Unavailable => write!(f, "No torch available"),
            TorchError::LockFailed(e) => write!(f, "Could not lock torch for configuration: {e}"),
            TorchError::ModeFailed(e) => write!(f, "Torch mode change failed: {e}"),
        }
    }
}

impl std::error::Error for TorchError {}

pub type Result<T> = std::result::Result<T, TorchError>;

/// Intensity used when none is configured.
pub const FULL_LEVEL: f32 = 1.0;

// ── Trait ──

/// Host flash hardware, injected instead of looked up globally.
pub trait LightSource {
    /// A controllable light exists and supports continuous-on illumination.
    fn has_continuous_mode(&self) -> bool;

    /// Acquire exclusive configuration access.
    fn lock_for_configuration(&mut self) -> Result<()>;

    /// Turn the light on at `level` (`0.0..=1.0`) or off. Requires the lock.
    fn set_on(&mut self, on: bool, level: f32) -> Result<()>;

    fn unlock_for_configuration(&mut self);
}

/// Holds the configuration lock and releases it on drop, including on error paths.
struct ConfigurationLock<'a, L: LightSource> {
    light: &'a mut L,
}

impl<'a, L: LightSource> ConfigurationLock<'a, L> {
    fn acquire(light: &'a mut L) -> Result<Self> {
        light.lock_for_configuration()?;
        Ok(Self { light })
    }

    fn set_on(&mut self, on: bool, level: f32) -> Result<()> {
        self.light.set_on(on, level)
    }
}

impl<L: LightSource> Drop for ConfigurationLock<'_, L> {
    fn drop(&mut self) {
        self.light.unlock_for_configuration();
    }
}

// ── Output ──

/// Applies on/off states to a [`LightSource`].
///
/// Missing hardware is not an error: `apply` becomes a no-op so the rest of
/// the app keeps working on devices without a flash.
pub struct TorchOutput<L: LightSource> {
    light: L,
    level: f32,
    reported_unavailable: bool,
}

impl<L: LightSource> TorchOutput<L> {
    pub fn new(light: L) -> Self {
        Self::with_level(light, FULL_LEVEL)
    }

    /// Use a custom "on" intensity. Values are clamped into `(0.0, 1.0]`.
    pub fn with_level(light: L, level: f32) -> Self {
        let level = if level.is_finite() && level > 0.0 {
            level.min(FULL_LEVEL)
        } else {
            FULL_LEVEL
        };
        Self {
            light,
            level,
            reported_unavailable: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.light.has_continuous_mode()
    }

    pub fn light(&self) -> &L {
        &self.light
    }
}

impl<L: LightSource> BlinkOutput for TorchOutput<L> {
    fn name(&self) -> &'static str {
        "torch"
    }

    fn apply(&mut self, on: bool) -> std::result::Result<(), OutputError> {
        if !self.light.has_continuous_mode() {
            if !self.reported_unavailable {
                log::debug!("[torch] no continuous-mode light available, output is inert");
                self.reported_unavailable = true;
            }
            return Ok(());
        }
        let mut lock = ConfigurationLock::acquire(&mut self.light)?;
        lock.set_on(on, self.level)?;
        Ok(())
    }

    fn wants_lease(&self) -> bool {
        true
    }
}

// ── Mock light ──

pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Observable state shared between a [`MockLight`] and its clones.
    #[derive(Debug, Default)]
    pub struct MockLightState {
        /// If false, the mock behaves like a device without a flash.
        pub present: bool,
        /// Whether the light is currently lit.
        pub lit: bool,
        pub locked: bool,
        /// Every successfully applied `(on, level)`, in order.
        pub applied: Vec<(bool, f32)>,
        pub lock_count: u32,
        pub unlock_count: u32,
        /// If true, `lock_for_configuration` fails.
        pub fail_lock: bool,
        /// If true, `set_on(true, _)` fails.
        pub fail_turn_on: bool,
        /// If true, `set_on(false, _)` fails.
        pub fail_turn_off: bool,
    }

    /// In-memory light for tests. Clones share state, so a test can keep a
    /// clone to inspect what the output did.
    #[derive(Debug, Clone)]
    pub struct MockLight {
        pub state: Rc<RefCell<MockLightState>>,
    }

    impl Default for MockLight {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockLight {
        pub fn new() -> Self {
            MockLight {
                state: Rc::new(RefCell::new(MockLightState {
                    present: true,
                    ..Default::default()
                })),
            }
        }

        /// A device without a usable flash.
        pub fn absent() -> Self {
            let light = Self::new();
            light.state.borrow_mut().present = false;
            light
        }

        pub fn is_lit(&self) -> bool {
            self.state.borrow().lit
        }

        /// Just the on/off part of every applied state.
        pub fn applied_states(&self) -> Vec<bool> {
            self.state.borrow().applied.iter().map(|(on, _)| *on).collect()
        }
    }

    impl LightSource for MockLight {
        fn has_continuous_mode(&self) -> bool {
            self.state.borrow().present
        }

        fn lock_for_configuration(&mut self) -> Result<()> {
            let mut s = self.state.borrow_mut();
            if s.fail_lock {
                return Err(TorchError::LockFailed("mock: device busy".into()));
            }
            s.locked = true;
            s.lock_count += 1;
            Ok(())
        }

        fn set_on(&mut self, on: bool, level: f32) -> Result<()> {
            let mut s = self.state.borrow_mut();
            if !s.locked {
                return Err(TorchError::ModeFailed("mock: not locked".into()));
            }
            if (on && s.fail_turn_on) || (!on && s.fail_turn_off) {
                return Err(TorchError::ModeFailed("mock: mode rejected".into()));
            }
            s.lit = on;
            s.applied.push((on, level));
            Ok(())
        }

        fn unlock_for_configuration(&mut self) {
            let mut s = self.state.borrow_mut();
            s.locked = false;
            s.unlock_count += 1;
        }
    }
}

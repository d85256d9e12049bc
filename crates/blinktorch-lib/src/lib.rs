//! BlinkTorch: strobe a torch LED and/or the screen at a configurable rate.

pub mod color;
pub mod config;
pub mod controller;
pub mod error;
pub mod event_loop;
pub mod lease;
pub mod output;
pub mod rate;
pub mod scheduler;
pub mod screen;
pub mod session;
pub mod sysfs;
pub mod torch;

pub use error::BlinkError;

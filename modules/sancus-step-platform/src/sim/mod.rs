//! Host simulation of the stepping hardware
//!
//! A virtual cycle clock replaces the master clock. Nothing advances on its
//! own: the test harness moves time forward with [`SimTimer::advance`] and
//! delivers interrupts with [`SimTimer::fire`], which makes interrupt timing
//! scenarios fully deterministic.

mod platform;
mod timer_driver;

pub use platform::SimPlatform;
pub use timer_driver::SimTimer;

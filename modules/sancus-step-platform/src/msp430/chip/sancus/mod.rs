//! Sancus: openMSP430 core with protected-module extensions

mod platform;
pub mod timer_driver;

// single-core critical-section implementation
use msp430 as _;

pub use platform::PlatformImpl;

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "msp430", feature(asm_experimental_arch))]

//! Platform abstraction layer for sancus-step
//!
//! The stepping state machine is written against two small traits so it can
//! run on the real core and inside a host simulation:
//!
//! - [`traits::timer::StepTimer`]: the countdown timer that paces the steps
//! - [`traits::platform::Platform`]: the timer instance plus the scoped
//!   "run on another stack" primitive the ISR needs
//!
//! ## Platform Implementations
//!
//! - [`msp430`]: Sancus (openMSP430) with Timer_A, compiled for `target_arch = "msp430"`
//! - [`sim`]: cycle-counting simulation for host tests, behind the `sim` feature

#[macro_use]
extern crate sancus_step_log;

pub mod traits;

pub use traits::platform::Platform;
pub use traits::timer::StepTimer;

#[cfg(target_arch = "msp430")]
pub mod msp430;

#[cfg(target_arch = "msp430")]
pub use msp430 as arch;

#[cfg(target_arch = "msp430")]
pub use arch::chip::sancus as chip;

#[cfg(target_arch = "msp430")]
pub use chip::PlatformImpl;

#[cfg(target_arch = "msp430")]
pub use chip::timer_driver;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

// ===== PLATFORM INSTANCE =====

#[cfg(target_arch = "msp430")]
static __PLATFORM: chip::PlatformImpl = chip::PlatformImpl::new();

/// The platform of the chip this crate was built for.
#[cfg(target_arch = "msp430")]
#[inline(always)]
pub fn get_platform() -> &'static chip::PlatformImpl {
    &__PLATFORM
}

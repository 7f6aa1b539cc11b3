#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! Calibration constants of the sancus-step engine
//!
//! Every latency below is the cycle cost of one specific code path on one
//! specific core, measured against the real interrupt pipeline. They are not
//! portable values: re-measure them for a new target and override them at
//! build time through the `SANCUS_STEP_*` environment variables read by the
//! build script, or inject a [`Calibration`] at runtime.

mod calibration;

pub use calibration::{Calibration, CalibrationError};

include!(concat!(env!("OUT_DIR"), "/calibration.rs"));

/// A machine word of the target (16 bits on MSP430).
pub type Word = u16;

/// Steady-state cycle cost of one stepped instruction as seen from the
/// interrupt entry (the "HW IRQ latency").
pub const HW_IRQ_LATENCY: u16 = MEASURED_HW_IRQ_LATENCY;

/// Words reserved for the dedicated ISR stack.
pub const ISR_STACK_SIZE: usize = MEASURED_ISR_STACK_SIZE;

/// Cycles until the first, discardable interrupt after initialization.
pub const INIT_LATENCY: u16 = MEASURED_INIT_LATENCY;

/// Timer period written after every module step: the cost of the
/// return-from-callback and resume path up to the next module instruction.
pub const RESUME_LATENCY: u16 = MEASURED_RESUME_LATENCY;

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! Hardware single-stepping of Sancus protected modules
//!
//! A timer is programmed to interrupt the core after every instruction a
//! protected module retires. Each interrupt that lands inside the module runs
//! a client callback on a dedicated stack, between two module instructions;
//! the first interrupt that lands outside stops the timer again.
//!
//! ## Organization
//!
//! - [`StepperContext`]: the single process-wide state block ([`CONTEXT`])
//! - [`IsrStack`]: the dedicated ISR stack and its resume frame
//! - [`Stepper`]: the portable state machine over a [`platform::Platform`]
//! - [`port`]: the Sancus assembly handler (`sancus_step_isr!`) and timer
//!   arming (`sancus_step_init!`)
//!
//! Latencies come from [`cfg`] as a [`Calibration`]; they must be measured
//! for the target core.

#[macro_use]
extern crate sancus_step_log;

mod context;
mod isr_stack;
mod stepper;

pub mod port;

pub use sancus_step_cfg as cfg;
pub use sancus_step_platform as platform;

pub use cfg::{
    Calibration, CalibrationError, Word, HW_IRQ_LATENCY, INIT_LATENCY, ISR_STACK_SIZE,
    RESUME_LATENCY,
};
pub use context::{ModuleMarker, StepState, StepperContext};
pub use isr_stack::{
    IsrStack, IsrStackFrame, ResumeContext, CALLBACK_STACK_WORDS, CALL_FRAME_WORDS, PAINT,
    RESUME_FRAME_WORDS,
};
pub use stepper::{IsrReturn, Step, Stepper};

/// The stepper context used by the installed ISR.
pub static CONTEXT: StepperContext = StepperContext::new();

/// Report the latency captured by the installed ISR at its last entry.
///
/// Logs through `defmt` when built with `log-base`, does nothing otherwise.
pub fn print_latency() {
    stepper::report_latency(CONTEXT.latency(), HW_IRQ_LATENCY);
}

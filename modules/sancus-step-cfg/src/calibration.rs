//! Injectable calibration

use core::fmt;

use crate::{HW_IRQ_LATENCY, INIT_LATENCY, RESUME_LATENCY};

/// The three latencies the stepping engine is tuned with.
///
/// A `Calibration` is handed to the stepper instead of having the numbers
/// hardcoded in the interrupt path, so a port can carry its own measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Period programmed by initialization; the first firing lands after it.
    pub init_latency: u16,
    /// Steady-state per-instruction latency, the reference for the latency
    /// captured at ISR entry.
    pub step_latency: u16,
    /// Period programmed after each callback returns.
    pub resume_latency: u16,
}

/// Reasons a set of latencies cannot drive the stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The initial period is zero, so the timer would never count.
    ZeroInitLatency,
    /// The per-instruction latency is zero.
    ZeroStepLatency,
    /// The resume period is zero.
    ZeroResumeLatency,
    /// The resume period is shorter than a single stepped instruction, the
    /// timer would fire again before the module is back.
    ResumeBelowStep {
        /// offending resume latency
        resume_latency: u16,
        /// step latency it must not undercut
        step_latency: u16,
    },
}

impl Calibration {
    /// Values measured on the Sancus openMSP430 core.
    ///
    /// Goes through [`Calibration::new`], so overridden build-time values
    /// that break its rules fail to compile.
    pub const SANCUS: Calibration =
        match Calibration::new(INIT_LATENCY, HW_IRQ_LATENCY, RESUME_LATENCY) {
            Ok(calibration) => calibration,
            Err(_) => panic!("invalid build-time calibration"),
        };

    /// Build a calibration, rejecting values the stepper cannot run with.
    pub const fn new(
        init_latency: u16,
        step_latency: u16,
        resume_latency: u16,
    ) -> Result<Self, CalibrationError> {
        if init_latency == 0 {
            return Err(CalibrationError::ZeroInitLatency);
        }
        if step_latency == 0 {
            return Err(CalibrationError::ZeroStepLatency);
        }
        if resume_latency == 0 {
            return Err(CalibrationError::ZeroResumeLatency);
        }
        if resume_latency < step_latency {
            return Err(CalibrationError::ResumeBelowStep {
                resume_latency,
                step_latency,
            });
        }
        Ok(Calibration {
            init_latency,
            step_latency,
            resume_latency,
        })
    }

    /// Cycles of the resume period left for the module once `overhead`
    /// cycles of interrupt-return path have been paid.
    pub const fn module_window(&self, overhead: u16) -> u16 {
        self.resume_latency.saturating_sub(overhead)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration::SANCUS
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::ZeroInitLatency => f.write_str("initial latency must be non-zero"),
            CalibrationError::ZeroStepLatency => f.write_str("step latency must be non-zero"),
            CalibrationError::ZeroResumeLatency => f.write_str("resume latency must be non-zero"),
            CalibrationError::ResumeBelowStep {
                resume_latency,
                step_latency,
            } => write!(
                f,
                "resume latency {} is below the step latency {}",
                resume_latency, step_latency
            ),
        }
    }
}

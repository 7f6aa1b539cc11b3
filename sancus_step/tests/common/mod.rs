//! Simulated board for driving the stepping ISR with exact cycle timing.
//!
//! Time only moves when the board says so: the module runs until the timer
//! deadline, the interrupt entry costs [`IRQ_ENTRY_CYCLES`], and returning
//! from the ISR into the module costs `resume_overhead` more before the next
//! module instruction starts.

#![allow(dead_code)]

use std::cell::Cell;
use std::num::NonZeroU16;

use sancus_step::platform::sim::{SimPlatform, SimTimer};
use sancus_step::platform::StepTimer;
use sancus_step::{
    Calibration, IsrReturn, Step, Stepper, StepperContext, Word, HW_IRQ_LATENCY, RESUME_LATENCY,
};

/// Cycles from the counter wrapping to the first ISR instruction.
pub const IRQ_ENTRY_CYCLES: u64 = 6;

/// Return path cost under which the resume latency leaves exactly one
/// `HW_IRQ_LATENCY` window to the module.
pub const CALIBRATED_OVERHEAD: u64 = (RESUME_LATENCY - HW_IRQ_LATENCY) as u64;

/// Register value the interrupted module resumes at.
pub const RESUME_PC: Word = 0xE0A4;

pub const MODULE_ID: u16 = 0x0001;

pub struct Board {
    pub ctx: StepperContext,
    pub platform: SimPlatform,
    pub resume_overhead: u64,
    module_cycles: Cell<u64>,
    /// cycle the module last started running, while it runs
    running_since: Cell<Option<u64>>,
}

impl Board {
    pub fn new() -> Self {
        Self::with_overhead(CALIBRATED_OVERHEAD)
    }

    pub fn with_overhead(resume_overhead: u64) -> Self {
        Board {
            ctx: StepperContext::new(),
            platform: SimPlatform::new(),
            resume_overhead,
            module_cycles: Cell::new(0),
            running_since: Cell::new(None),
        }
    }

    pub fn stepper(&self) -> Stepper<'_, SimPlatform> {
        self.stepper_with(Calibration::SANCUS)
    }

    pub fn stepper_with(&self, calibration: Calibration) -> Stepper<'_, SimPlatform> {
        Stepper::new(&self.ctx, &self.platform, calibration)
    }

    pub fn timer(&self) -> &SimTimer {
        &self.platform.timer
    }

    pub fn now(&self) -> u64 {
        self.timer().now()
    }

    pub fn timer_enabled(&self) -> bool {
        self.timer().is_enabled()
    }

    /// The isolation mechanism entered the module.
    pub fn enter_module(&self) {
        if self.ctx.marker.is_active() {
            return;
        }
        self.ctx.marker.enter(NonZeroU16::new(MODULE_ID).unwrap());
        self.running_since.set(Some(self.now()));
    }

    /// The module runs `cycles` more cycles, then returns to the caller.
    ///
    /// No interrupt is delivered in between; a deadline that passes is taken
    /// by the next [`Board::fire`].
    pub fn exit_module_after(&self, cycles: u64) {
        if !self.ctx.marker.is_active() {
            return;
        }
        self.timer().advance(cycles);
        self.pause_module(self.now());
        self.ctx.marker.exit();
    }

    /// Unprotected code runs for `cycles`.
    pub fn run_outside(&self, cycles: u64) {
        assert!(!self.ctx.marker.is_active(), "module is running");
        self.timer().advance(cycles);
    }

    /// Cycles spent executing module code so far.
    pub fn module_cycles(&self) -> u64 {
        match self.running_since.get() {
            Some(since) => self.module_cycles.get() + self.now() - since,
            None => self.module_cycles.get(),
        }
    }

    fn pause_module(&self, at: u64) {
        if let Some(since) = self.running_since.take() {
            self.module_cycles.set(self.module_cycles.get() + at - since);
        }
    }

    /// Run to the next timer deadline and take the interrupt.
    ///
    /// Returns `None` when the timer is stopped and nothing will fire.
    pub fn fire<F>(&self, stepper: &Stepper<'_, SimPlatform>, fct: F) -> Option<IsrReturn>
    where
        F: FnOnce(&Step<'_>),
    {
        let at = self.timer().fire()?;
        // module time is frozen while the ISR runs
        self.pause_module(at);
        self.timer().advance(IRQ_ENTRY_CYCLES);

        let ret = stepper.on_interrupt(RESUME_PC, fct);

        self.timer().advance(self.resume_overhead);
        if self.ctx.marker.is_active() {
            self.running_since.set(Some(self.now()));
        }
        Some(ret)
    }
}

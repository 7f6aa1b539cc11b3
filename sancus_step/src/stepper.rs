//! The stepping state machine
//!
//! [`Stepper`] implements the timer interrupt protocol against the
//! [`Platform`] traits, so the same logic runs on the chip and in the host
//! simulation:
//!
//! ```text
//!   initialize() ──► Armed ──firing, module active──► Stepping ◄─┐
//!                      │                                  │      │ firing, module active
//!                      │                                  └──────┘
//!                      └──firing, module inactive──► Idle ◄── firing, module inactive
//! ```
//!
//! Two imprecisions of the calibrated protocol are kept on purpose, because
//! consumers of the step stream depend on the exact timing:
//!
//! - the first firing after initialization lands after the initial latency,
//!   not after one module instruction; it is delivered flagged as warm-up
//!   and not counted as a step
//! - if the module's last instruction is interrupted after the isolation
//!   mechanism already cleared the marker, the timer is disabled one step
//!   early and that instruction is never seen

use sancus_step_cfg::{Calibration, Word};
use sancus_step_platform::{Platform, StepTimer};

use crate::context::{StepState, StepperContext};
use crate::isr_stack::{IsrStack, ResumeContext};

/// How the ISR leaves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "log-base", derive(defmt::Format))]
pub enum IsrReturn {
    /// The module was interrupted: return from interrupt through the resume
    /// frame on the ISR stack.
    Resume(ResumeContext),
    /// Ordinary code was interrupted and the timer is now off: return from
    /// interrupt through the frame the hardware pushed on entry.
    Passthrough,
}

/// What the step callback gets to see
pub struct Step<'a> {
    index: u32,
    warmup: bool,
    latency: u16,
    resume: ResumeContext,
    stack: &'a IsrStack,
}

impl<'a> Step<'a> {
    /// Counted steps completed before this one.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether this is the meaningless first firing after initialization.
    pub fn is_warmup(&self) -> bool {
        self.warmup
    }

    /// Timer counter captured at ISR entry.
    pub fn latency(&self) -> u16 {
        self.latency
    }

    /// Where the interrupted module continues.
    pub fn resume(&self) -> ResumeContext {
        self.resume
    }

    /// The ISR stack the callback runs on.
    pub fn stack(&self) -> &'a IsrStack {
        self.stack
    }
}

/// Single-stepping engine over a platform
pub struct Stepper<'a, P: Platform> {
    ctx: &'a StepperContext,
    platform: &'a P,
    calibration: Calibration,
}

impl<'a, P: Platform> Stepper<'a, P> {
    /// Bind the engine to its shared context, its platform and the
    /// calibration measured for that platform.
    pub const fn new(
        ctx: &'a StepperContext,
        platform: &'a P,
        calibration: Calibration,
    ) -> Self {
        Stepper {
            ctx,
            platform,
            calibration,
        }
    }

    /// Shared context.
    pub fn context(&self) -> &'a StepperContext {
        self.ctx
    }

    /// Platform the engine drives.
    pub fn platform(&self) -> &'a P {
        self.platform
    }

    /// Latencies in use.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Current state of the state machine.
    pub fn state(&self) -> StepState {
        self.ctx.state()
    }

    /// Arm the step timer and reset the state machine.
    ///
    /// Stops the timer, programs the initial latency and starts it in up
    /// mode from the master clock, all with interrupts masked so no firing
    /// can see a half-programmed timer. The context becomes
    /// [`StepState::Armed`] with cleared counters. Call once, right before
    /// the protected module is entered, when firings are handled by
    /// [`Stepper::on_interrupt`].
    pub fn initialize(&self) {
        self.program_timer(|| self.ctx.reset());
    }

    /// Arm the step timer only.
    ///
    /// Same timer programming as [`Stepper::initialize`], but the state and
    /// the counters are left alone; only the captured latency is cleared.
    /// This is the arming used with the assembly handler of
    /// [`sancus_step_isr!`](crate::sancus_step_isr), which does not advance
    /// the state machine.
    pub fn arm_timer(&self) {
        self.program_timer(|| self.ctx.clear_latency());
    }

    fn program_timer(&self, reset: impl FnOnce()) {
        let timer = self.platform.timer();
        critical_section::with(|_| {
            timer.disable();
            reset();
            timer.set_period(self.calibration.init_latency);
            timer.enable();
        });
        timer_log!(
            debug,
            "step timer armed, first firing in {} cycles",
            self.calibration.init_latency
        );
    }

    /// Handle one step timer interrupt.
    ///
    /// `saved` is the register holding the address the interrupted module
    /// resumes at. When the module is active, `fct` runs exactly once on the
    /// ISR stack, and only after it returns is the timer re-armed with the
    /// resume latency, so step N's callback always completes before step
    /// N+1 can fire. Otherwise the timer is stopped and `fct` is dropped
    /// without being called.
    pub fn on_interrupt<F>(&self, saved: Word, fct: F) -> IsrReturn
    where
        F: FnOnce(&Step<'_>),
    {
        let timer = self.platform.timer();
        // first thing: the counter tells how late this interrupt was taken
        let latency = timer.counter();
        self.ctx.record_entry(latency);

        if !self.ctx.marker.is_active() {
            timer.disable();
            self.ctx.set_state(StepState::Idle);
            step_log!(debug, "no module interrupted, step timer stopped");
            return IsrReturn::Passthrough;
        }

        let warmup = self.ctx.state() == StepState::Armed;
        self.ctx.set_state(StepState::Stepping);

        let frame = self.ctx.stack.activate();
        frame.push_resume(ResumeContext::from_saved(saved));
        let top = frame.callback_top();
        frame.reserve_return_address();

        let step = Step {
            index: self.ctx.steps(),
            warmup,
            latency,
            resume: frame.resume(),
            stack: frame.stack(),
        };
        let mut fct = Some(fct);
        let mut call = || {
            if let Some(fct) = fct.take() {
                fct(&step);
            }
        };
        // SAFETY: the frame holds the only activation of the ISR stack, and
        // the callback top leaves the resume frame above it untouched. The
        // call's return address lands in the word reserved for it.
        unsafe { self.platform.run_on_stack(top, &mut call) };

        let resume = frame.resume();
        stack_log!(trace, "isr stack high-water mark: {} words", frame.stack().high_water_mark());
        drop(frame);

        timer.set_period(self.calibration.resume_latency);
        timer.enable();
        if !warmup {
            self.ctx.count_step();
        }
        step_log!(trace, "step {} latency {}", step.index, latency);

        IsrReturn::Resume(resume)
    }

    /// Timer counter captured at the last ISR entry.
    pub fn latency(&self) -> u16 {
        self.ctx.latency()
    }

    /// Captured latency minus the steady-state per-instruction latency.
    ///
    /// The extra cycles are what the interrupted instruction itself cost the
    /// interrupt path.
    pub fn latency_deviation(&self) -> i32 {
        deviation(self.ctx.latency(), self.calibration.step_latency)
    }

    /// Report the last captured latency through the log.
    pub fn print_latency(&self) {
        report_latency(self.ctx.latency(), self.calibration.step_latency);
    }
}

pub(crate) fn deviation(latency: u16, step_latency: u16) -> i32 {
    latency as i32 - step_latency as i32
}

pub(crate) fn report_latency(latency: u16, step_latency: u16) {
    info!(
        "isr entry latency: {} cycles ({} against the {}-cycle irq latency)",
        latency,
        deviation(latency, step_latency),
        step_latency
    );
}

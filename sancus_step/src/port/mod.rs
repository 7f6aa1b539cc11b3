//! Hardware port of the stepping ISR
//!
//! On Sancus the handler cannot be ordinary Rust: the calibrated latencies
//! are the cycle counts of one exact instruction sequence. The macros here
//! expand to that sequence, which mirrors [`Stepper::on_interrupt`]
//! step for step:
//!
//! 1. copy `TAR` into the context's entry latency
//! 2. test the marker; the Sancus hardware clears SP when it interrupts a
//!    protected module, so a zero `r1` means "module interrupted"
//! 3. module interrupted: load SP with the top of the ISR stack, push the
//!    resume address (`r15`) and a zero status word, call the callback, then
//!    write the resume latency to `TACCR0` and re-enable Timer_A
//! 4. otherwise: stop Timer_A
//! 5. `reti`, through the resume frame or the original one
//!
//! The assembly path keeps only the entry latency up to date; state and step
//! counters of [`CONTEXT`](crate::CONTEXT) are maintained by the portable
//! [`Stepper`] alone, since every extra instruction would shift the
//! calibration.
//!
//! [`Stepper`]: crate::Stepper
//! [`Stepper::on_interrupt`]: crate::Stepper::on_interrupt

#[doc(hidden)]
pub use crate::context::{STACK_TOP_OFFSET, TAR_ENTRY_OFFSET};

/// Arm the step timer for the installed assembly handler.
///
/// `sancus_step_init!()` uses the Sancus calibration,
/// `sancus_step_init!(calibration)` any other [`Calibration`](crate::Calibration).
/// Interrupts are masked while Timer_A is programmed. Invoke it once, before
/// the protected module is first entered.
///
/// Only the timer is armed and the captured latency cleared, see
/// [`Stepper::arm_timer`](crate::Stepper::arm_timer): the assembly handler
/// keeps no state or step counters, so [`CONTEXT`](crate::CONTEXT) reports
/// [`StepState::Idle`](crate::StepState::Idle) and zero counts throughout.
/// The warm-up firing reaches `fct` unflagged, as on the original handler.
#[macro_export]
macro_rules! sancus_step_init {
    () => {
        $crate::sancus_step_init!($crate::cfg::Calibration::SANCUS)
    };
    ($calibration:expr) => {
        $crate::Stepper::new(&$crate::CONTEXT, $crate::platform::get_platform(), $calibration)
            .arm_timer()
    };
}

/// Install the stepping ISR.
///
/// Expands to a naked interrupt handler that calls `fct` after every
/// instruction of the protected module. `fct` must be an
/// `extern "C" fn()` that returns normally, stays within
/// [`ISR_STACK_SIZE`](crate::ISR_STACK_SIZE) words of stack and leaves the
/// timer alone.
///
/// ```ignore
/// extern "C" fn on_step() { /* inspect state */ }
///
/// // handler named `__sancus_step_isr`
/// sancus_step_isr!(on_step);
/// // or a chosen handler name and calibration
/// sancus_step_isr!(TIMERA0, on_step, MY_CALIBRATION);
/// ```
///
/// The handler symbol has to be routed to the Timer_A vector by the
/// application's vector table or linker script. The using crate needs
/// `#![feature(asm_experimental_arch)]`.
#[macro_export]
macro_rules! sancus_step_isr {
    ($fct:path) => {
        $crate::sancus_step_isr!(__sancus_step_isr, $fct);
    };
    ($handler:ident, $fct:path) => {
        $crate::sancus_step_isr!($handler, $fct, $crate::cfg::Calibration::SANCUS);
    };
    ($handler:ident, $fct:path, $calibration:expr) => {
        const _: extern "C" fn() = $fct;

        #[unsafe(naked)]
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $handler() {
            core::arch::naked_asm!(
                "mov &{tar}, &{ctx}+{tar_entry}",
                "cmp #0x0, r1",
                "jne 1f",
                // module interrupted
                "mov #{ctx}+{stack_top}, r1",
                "push r15",
                "push #0x0",
                "call #{fct}",
                "mov #{resume}, &{taccr0}",
                "mov #{enable}, &{tactl}",
                "jmp 2f",
                // ordinary code interrupted
                "1:",
                "mov #{disable}, &{tactl}",
                "2:",
                "reti",
                tar = const $crate::platform::timer_driver::TAR,
                taccr0 = const $crate::platform::timer_driver::TACCR0,
                tactl = const $crate::platform::timer_driver::TACTL,
                enable = const $crate::platform::timer_driver::ctl::ENABLE,
                disable = const $crate::platform::timer_driver::ctl::DISABLE,
                resume = const ($calibration).resume_latency,
                tar_entry = const $crate::port::TAR_ENTRY_OFFSET,
                stack_top = const $crate::port::STACK_TOP_OFFSET,
                ctx = sym $crate::CONTEXT,
                fct = sym $fct,
            )
        }
    };
}

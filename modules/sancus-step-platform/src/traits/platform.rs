//! Core platform functionality trait definition

use sancus_step_cfg::Word;

use crate::traits::timer::StepTimer;

/// What the stepping engine needs from the chip it runs on
pub trait Platform {
    /// Timer driving the steps.
    type Timer: StepTimer;

    /// The step timer of this platform.
    fn timer(&self) -> &Self::Timer;

    /// Run `f` with the stack pointer moved to `top`, and restore the
    /// original stack pointer once `f` returns.
    ///
    /// `top` is the first word past the free region: the stack grows down
    /// from it. Everything `f` pushes lands below `top`, nothing touches the
    /// stack that was active on entry.
    ///
    /// # Safety
    /// - `top` must point one past a writable region large enough for `f`
    ///   and everything it calls
    /// - nothing else may use that region while `f` runs
    /// - `f` must return normally; unwinding across the switched stack is
    ///   not supported
    unsafe fn run_on_stack(&self, top: *mut Word, f: &mut dyn FnMut());
}

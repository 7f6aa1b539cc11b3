use core::arch::asm;

use sancus_step_cfg::Word;

use super::timer_driver::TimerA;
use crate::traits::Platform;

/// Sancus platform implementation
///
/// Holds the Timer_A step timer and implements the stack switch with a
/// small assembly sequence around a trampoline call.
pub struct PlatformImpl {
    /// Step timer
    pub timer: TimerA,
}

impl PlatformImpl {
    pub(crate) const fn new() -> Self {
        PlatformImpl { timer: TimerA::new() }
    }
}

// Entered on the alternate stack with the closure reference in r12
// (first argument register of the MSP430 EABI).
extern "C" fn run_on_stack_trampoline(data: *mut ()) {
    // SAFETY: `data` is the `&mut &mut dyn FnMut()` built by `run_on_stack`,
    // which stays borrowed for the whole call.
    let f = unsafe { &mut *(data as *mut &mut dyn FnMut()) };
    f();
}

impl Platform for PlatformImpl {
    type Timer = TimerA;

    fn timer(&self) -> &TimerA {
        &self.timer
    }

    /// Switch SP to `top`, call `f`, switch back
    ///
    /// The interrupted SP is parked in r10, which the callee preserves by
    /// the calling convention.
    #[inline(never)]
    unsafe fn run_on_stack(&self, top: *mut Word, f: &mut dyn FnMut()) {
        let mut f = f;
        let data = &mut f as *mut &mut dyn FnMut() as *mut ();
        unsafe {
            asm!(
                "mov r1, r10",
                "mov {top}, r1",
                "call #{tramp}",
                "mov r10, r1",
                top = in(reg) top,
                tramp = sym run_on_stack_trampoline,
                inout("r12") data => _,
                out("r10") _,
                out("r11") _,
                out("r13") _,
                out("r14") _,
                out("r15") _,
            );
        }
    }
}

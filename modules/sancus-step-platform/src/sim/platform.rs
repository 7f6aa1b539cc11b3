use core::cell::Cell;

use sancus_step_cfg::Word;

use super::timer_driver::SimTimer;
use crate::traits::Platform;

/// Simulated platform
///
/// `run_on_stack` cannot move the host stack pointer, so it only records the
/// switch: the requested stack top, whether a closure is currently "on" the
/// alternate stack, and how many switches happened.
pub struct SimPlatform {
    /// Step timer on the virtual clock
    pub timer: SimTimer,
    switches: Cell<u32>,
    on_alternate_stack: Cell<bool>,
    last_stack_top: Cell<usize>,
}

impl SimPlatform {
    /// A platform with a stopped timer at cycle zero
    pub const fn new() -> Self {
        SimPlatform {
            timer: SimTimer::new(),
            switches: Cell::new(0),
            on_alternate_stack: Cell::new(false),
            last_stack_top: Cell::new(0),
        }
    }

    /// Number of completed stack switches.
    pub fn switches(&self) -> u32 {
        self.switches.get()
    }

    /// Whether code is currently running on a switched stack.
    pub fn on_alternate_stack(&self) -> bool {
        self.on_alternate_stack.get()
    }

    /// Address of the stack top used by the last switch.
    pub fn last_stack_top(&self) -> usize {
        self.last_stack_top.get()
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

// clears the flag even if the closure panics
struct SwitchGuard<'a> {
    platform: &'a SimPlatform,
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.platform.on_alternate_stack.set(false);
        self.platform.switches.set(self.platform.switches.get() + 1);
    }
}

impl Platform for SimPlatform {
    type Timer = SimTimer;

    fn timer(&self) -> &SimTimer {
        &self.timer
    }

    unsafe fn run_on_stack(&self, top: *mut Word, f: &mut dyn FnMut()) {
        assert!(!self.on_alternate_stack.get(), "nested stack switch");
        self.last_stack_top.set(top as usize);
        self.on_alternate_stack.set(true);
        let _guard = SwitchGuard { platform: self };
        f();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_the_switch() {
        let platform = SimPlatform::new();
        let mut stack = [0 as Word; 8];
        let top = unsafe { stack.as_mut_ptr().add(stack.len()) };
        let mut seen_on_stack = false;
        unsafe {
            platform.run_on_stack(top, &mut || seen_on_stack = platform.on_alternate_stack());
        }
        assert!(seen_on_stack);
        assert!(!platform.on_alternate_stack());
        assert_eq!(platform.switches(), 1);
        assert_eq!(platform.last_stack_top(), top as usize);
    }

    #[test]
    fn restores_after_panic() {
        let platform = SimPlatform::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            platform.run_on_stack(core::ptr::null_mut(), &mut || panic!("callback failed"));
        }));
        assert!(result.is_err());
        assert!(!platform.on_alternate_stack());
    }
}

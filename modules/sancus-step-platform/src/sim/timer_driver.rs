use core::cell::Cell;

use crate::traits::timer::StepTimer;

/// Simulated up-mode step timer
///
/// The counter is derived from the virtual clock: it reads the cycles since
/// the timer was last started or last wrapped. [`StepTimer::enable`]
/// (re)starts the count from the current cycle, so a period programmed by the
/// ISR is measured from the moment the ISR re-arms the timer.
pub struct SimTimer {
    /// virtual master clock, in cycles
    now: Cell<u64>,
    period: Cell<u16>,
    enabled: Cell<bool>,
    /// cycle at which the counter was last zero
    started_at: Cell<u64>,
    period_writes: Cell<u32>,
    firings: Cell<u32>,
}

impl SimTimer {
    /// A stopped timer at cycle zero
    pub const fn new() -> Self {
        SimTimer {
            now: Cell::new(0),
            period: Cell::new(0),
            enabled: Cell::new(false),
            started_at: Cell::new(0),
            period_writes: Cell::new(0),
            firings: Cell::new(0),
        }
    }

    /// Current cycle of the virtual clock.
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Let `cycles` cycles elapse without delivering any interrupt.
    pub fn advance(&self, cycles: u64) {
        self.now.set(self.now.get() + cycles);
    }

    /// Last programmed period.
    pub fn period(&self) -> u16 {
        self.period.get()
    }

    /// How many times a period was written.
    pub fn period_writes(&self) -> u32 {
        self.period_writes.get()
    }

    /// How many interrupts were delivered.
    pub fn firings(&self) -> u32 {
        self.firings.get()
    }

    /// Cycle at which the next interrupt is due, if the timer runs.
    pub fn deadline(&self) -> Option<u64> {
        if self.enabled.get() {
            Some(self.started_at.get() + self.period.get() as u64)
        } else {
            None
        }
    }

    /// Run the clock to the next deadline and raise the interrupt.
    ///
    /// The counter wraps to zero at the deadline and keeps counting, as up
    /// mode does. Returns the cycle of the firing, or `None` if the timer is
    /// stopped and no interrupt will ever come. A deadline already in the
    /// past fires at the current cycle.
    pub fn fire(&self) -> Option<u64> {
        let deadline = self.deadline()?;
        let at = deadline.max(self.now.get());
        self.now.set(at);
        self.started_at.set(at);
        self.firings.set(self.firings.get() + 1);
        timer_log!(trace, "sim timer fired at cycle {}", at);
        Some(at)
    }
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTimer for SimTimer {
    fn set_period(&self, cycles: u16) {
        self.period.set(cycles);
        self.period_writes.set(self.period_writes.get() + 1);
    }

    fn enable(&self) {
        self.started_at.set(self.now.get());
        self.enabled.set(true);
    }

    fn disable(&self) {
        self.enabled.set(false);
        self.started_at.set(self.now.get());
    }

    fn counter(&self) -> u16 {
        if self.enabled.get() {
            (self.now.get() - self.started_at.get()) as u16
        } else {
            0
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_timer_never_fires() {
        let timer = SimTimer::new();
        timer.set_period(10);
        assert_eq!(timer.deadline(), None);
        assert_eq!(timer.fire(), None);
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn fires_one_period_after_enable() {
        let timer = SimTimer::new();
        timer.advance(5);
        timer.set_period(42);
        timer.enable();
        assert_eq!(timer.deadline(), Some(47));
        assert_eq!(timer.fire(), Some(47));
        assert_eq!(timer.now(), 47);
        assert_eq!(timer.firings(), 1);
    }

    #[test]
    fn counter_wraps_at_firing_and_keeps_counting() {
        let timer = SimTimer::new();
        timer.set_period(20);
        timer.enable();
        timer.fire();
        timer.advance(6);
        assert_eq!(timer.counter(), 6);
        // still running in up mode
        assert_eq!(timer.deadline(), Some(40));
    }

    #[test]
    fn enable_restarts_the_count() {
        let timer = SimTimer::new();
        timer.set_period(20);
        timer.enable();
        timer.advance(15);
        timer.set_period(65);
        timer.enable();
        assert_eq!(timer.counter(), 0);
        assert_eq!(timer.deadline(), Some(80));
        assert_eq!(timer.period_writes(), 2);
    }

    #[test]
    fn late_deadline_fires_now() {
        let timer = SimTimer::new();
        timer.set_period(3);
        timer.enable();
        timer.advance(10);
        assert_eq!(timer.fire(), Some(10));
    }

    #[test]
    fn disable_clears_the_counter() {
        let timer = SimTimer::new();
        timer.set_period(100);
        timer.enable();
        timer.advance(30);
        timer.disable();
        assert!(!timer.is_enabled());
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn reenable_after_long_handler_gives_a_full_period() {
        let timer = SimTimer::new();
        timer.set_period(42);
        timer.enable();
        assert_eq!(timer.fire(), Some(42));
        // handler ran past the new period before re-arming
        timer.advance(500);
        timer.set_period(0x41);
        timer.enable();
        assert_eq!(timer.counter(), 0);
        assert_eq!(timer.fire(), Some(542 + 0x41));
    }
}

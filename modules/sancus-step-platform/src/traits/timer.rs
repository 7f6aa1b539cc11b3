//! Step timer trait
//!
//! The stepper needs far less than a general timer driver: one countdown
//! that raises an interrupt every `period` cycles, counting up from the
//! master clock, that can be switched on and off, and whose counter can be
//! read on ISR entry to learn how late the interrupt was taken.

/// Hardware countdown timer pacing the single steps.
///
/// Implementations are plain register programming and cannot fail. All
/// methods take `&self`: the timer is owned by the platform and only ever
/// touched from the initialization critical section or from the stepping ISR,
/// which never run concurrently on the single core.
pub trait StepTimer {
    /// Set the number of cycles between two interrupts.
    ///
    /// Takes effect for the next count; on up-mode hardware this is the
    /// compare register the counter wraps at.
    fn set_period(&self, cycles: u16);

    /// Start counting in steady-state mode (master clock, up mode,
    /// interrupt enabled).
    ///
    /// The next interrupt is due one full period after this call when the
    /// cycles since the last firing already exceed the period, which is the
    /// case after any real step callback. The stepper relies on this to give
    /// the module the same window after every callback, however long the
    /// callback ran. The simulated timer always restarts the count here.
    fn enable(&self);

    /// Stop counting and clear the counter.
    fn disable(&self);

    /// Current counter value, in cycles since the counter last wrapped or
    /// was started.
    fn counter(&self) -> u16;

    /// Whether the timer is currently counting.
    fn is_enabled(&self) -> bool;
}

/*
*********************************************************************************************************
*                                 Step Timer Driver - Sancus Timer_A
*********************************************************************************************************
*/

//! Sancus Timer_A step timer
//!
//! Timer_A runs in up mode from the master clock: `TAR` counts from zero to
//! `TACCR0`, wraps, and raises the Timer_A interrupt. `TACCR0` is therefore
//! the step period. Writing `TACTL` without `TACLR` leaves the counter
//! running. When the ISR writes a `TACCR0` below the current `TAR`, the
//! counter rolls over to zero and the next interrupt comes one full period
//! later. A callback longer than the resume latency always gets there, so
//! for stepping the count effectively restarts at re-enable, the contract
//! of [`StepTimer::enable`].
//!
//! The register addresses and control words below are also consumed by the
//! assembly stepping handler, which is why they are plain constants.

use core::ptr::{read_volatile, write_volatile};

use crate::traits::timer::StepTimer;

/*
*********************************************************************************************************
*                                           register map
*********************************************************************************************************
*/

/// Timer_A control register
pub const TACTL: usize = 0x0160;
/// Timer_A counter
pub const TAR: usize = 0x0170;
/// Capture/compare register 0, the up-mode period
pub const TACCR0: usize = 0x0172;

/// `TACTL` bits
pub mod ctl {
    /// Clock source select: master clock
    pub const TASSEL_MCLK: u16 = 0x0200;
    /// Mode control: up mode (count to `TACCR0`)
    pub const MC_UP: u16 = 0x0010;
    /// Counter clear, also leaves MC at zero (stopped)
    pub const TACLR: u16 = 0x0004;
    /// Interrupt enable
    pub const TAIE: u16 = 0x0002;

    /// Steady-state stepping mode (0x212)
    pub const ENABLE: u16 = TASSEL_MCLK | MC_UP | TAIE;
    /// Stopped with a cleared counter
    pub const DISABLE: u16 = TACLR;
    /// Mode-control field mask
    pub const MC_MASK: u16 = 0x0030;
}

/*
*********************************************************************************************************
*                                              implementations
*********************************************************************************************************
*/

/// Timer_A of the Sancus core
pub struct TimerA {
    _private: (),
}

impl TimerA {
    pub(crate) const fn new() -> Self {
        TimerA { _private: () }
    }

    #[inline(always)]
    fn write(addr: usize, value: u16) {
        // SAFETY: fixed, always-mapped peripheral register
        unsafe { write_volatile(addr as *mut u16, value) }
    }

    #[inline(always)]
    fn read(addr: usize) -> u16 {
        // SAFETY: fixed, always-mapped peripheral register
        unsafe { read_volatile(addr as *const u16) }
    }
}

impl StepTimer for TimerA {
    #[inline(always)]
    fn set_period(&self, cycles: u16) {
        Self::write(TACCR0, cycles);
    }

    #[inline(always)]
    fn enable(&self) {
        Self::write(TACTL, ctl::ENABLE);
    }

    #[inline(always)]
    fn disable(&self) {
        Self::write(TACTL, ctl::DISABLE);
    }

    #[inline(always)]
    fn counter(&self) -> u16 {
        Self::read(TAR)
    }

    fn is_enabled(&self) -> bool {
        Self::read(TACTL) & ctl::MC_MASK != 0
    }
}

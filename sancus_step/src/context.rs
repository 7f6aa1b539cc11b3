//! The process-wide stepper context
//!
//! Everything the stepping ISR shares with the rest of the system lives in
//! one `#[repr(C)]` struct. Each field documents who writes it and who reads
//! it. There is no locking: the core is single, the ISR is not reentrant, and
//! the isolation mechanism only writes the marker on module entry and exit,
//! which cannot overlap with the ISR.

use core::mem::offset_of;
use core::num::NonZeroU16;

use portable_atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::isr_stack::IsrStack;

/// Module-Interrupted Marker
///
/// Zero means no protected module is executing; any other value is an opaque
/// token of the module that is. Only the isolation mechanism writes it; the
/// stepping ISR only reads it.
#[repr(transparent)]
pub struct ModuleMarker(AtomicU16);

impl ModuleMarker {
    /// Value of the marker while no module executes.
    pub const INACTIVE: u16 = 0;

    /// An inactive marker
    pub const fn new() -> Self {
        ModuleMarker(AtomicU16::new(Self::INACTIVE))
    }

    /// Record that `module` has been entered.
    pub fn enter(&self, module: NonZeroU16) {
        self.0.store(module.get(), Ordering::Release);
    }

    /// Record that the active module has returned.
    pub fn exit(&self) {
        self.0.store(Self::INACTIVE, Ordering::Release);
    }

    /// Raw marker value.
    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }

    /// Whether a protected module is the code being interrupted.
    pub fn is_active(&self) -> bool {
        self.get() != Self::INACTIVE
    }
}

impl Default for ModuleMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// State of the stepping state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "log-base", derive(defmt::Format))]
#[repr(u8)]
pub enum StepState {
    /// NOT-STEPPING: the timer is stopped.
    Idle = 0,
    /// Initialized; the timer runs at the initial latency and the first
    /// (warm-up) firing is still pending.
    Armed = 1,
    /// STEPPING: the module is active and every firing calls the callback.
    Stepping = 2,
}

impl StepState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => StepState::Armed,
            2 => StepState::Stepping,
            _ => StepState::Idle,
        }
    }
}

/// Shared state of the stepping engine
#[repr(C)]
pub struct StepperContext {
    /// Dedicated ISR stack. Touched only by the stepping ISR.
    pub stack: IsrStack,
    /// Written by the isolation mechanism, read by the ISR.
    pub marker: ModuleMarker,
    /// Timer counter captured as the first action of the ISR. Written by the
    /// ISR (also by the assembly handler), read by latency reporting.
    tar_entry: AtomicU16,
    /// Written by `Stepper::initialize` and the portable ISR only.
    state: AtomicU8,
    /// Every ISR entry since initialization.
    firings: AtomicU32,
    /// Callback invocations since initialization, without the warm-up step.
    steps: AtomicU32,
}

/// Byte offset of the captured entry latency, for the assembly handler.
#[doc(hidden)]
pub const TAR_ENTRY_OFFSET: usize = offset_of!(StepperContext, tar_entry);

/// Byte offset of the first word past the ISR stack, for the assembly handler.
#[doc(hidden)]
pub const STACK_TOP_OFFSET: usize = offset_of!(StepperContext, stack) + IsrStack::TOP_OFFSET;

impl StepperContext {
    /// A context with an inactive marker, an idle state and a freshly
    /// painted stack
    pub const fn new() -> Self {
        StepperContext {
            stack: IsrStack::new(),
            marker: ModuleMarker::new(),
            tar_entry: AtomicU16::new(0),
            state: AtomicU8::new(StepState::Idle as u8),
            firings: AtomicU32::new(0),
            steps: AtomicU32::new(0),
        }
    }

    /// Current state of the state machine.
    ///
    /// Like [`firings`](Self::firings) and [`steps`](Self::steps), only the
    /// portable [`Stepper`](crate::Stepper) maintains it. The assembly
    /// handler of `sancus_step_isr!` updates the captured latency and nothing
    /// else, so with that handler this stays [`StepState::Idle`].
    pub fn state(&self) -> StepState {
        StepState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Timer counter captured at the last ISR entry.
    pub fn latency(&self) -> u16 {
        self.tar_entry.load(Ordering::Relaxed)
    }

    /// ISR entries since initialization, the warm-up one included.
    ///
    /// Counted by [`Stepper::on_interrupt`](crate::Stepper::on_interrupt)
    /// only; stays zero with the assembly handler.
    pub fn firings(&self) -> u32 {
        self.firings.load(Ordering::Relaxed)
    }

    /// Counted steps since initialization; the warm-up step is not one.
    ///
    /// Counted by [`Stepper::on_interrupt`](crate::Stepper::on_interrupt)
    /// only; stays zero with the assembly handler.
    pub fn steps(&self) -> u32 {
        self.steps.load(Ordering::Relaxed)
    }

    pub(crate) fn set_state(&self, state: StepState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn record_entry(&self, tar: u16) {
        self.tar_entry.store(tar, Ordering::Relaxed);
        self.firings.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear_latency(&self) {
        self.tar_entry.store(0, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.clear_latency();
        self.firings.store(0, Ordering::Relaxed);
        self.steps.store(0, Ordering::Relaxed);
        self.set_state(StepState::Armed);
    }
}

impl Default for StepperContext {
    fn default() -> Self {
        Self::new()
    }
}

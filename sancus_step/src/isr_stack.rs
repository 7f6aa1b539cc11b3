//! Dedicated ISR stack
//!
//! A fixed buffer of [`ISR_STACK_SIZE`] words reserved for the stepping ISR,
//! so the handler and the step callback never run on the interrupted code's
//! stack (a protected module may have no usable stack at all). The stack
//! pointer is reset to the top on every activation; there is no growth and
//! overflow is fatal.
//!
//! The buffer starts out painted with [`PAINT`], which lets
//! [`IsrStack::high_water_mark`] estimate how deep the callback ever went.

use core::cell::UnsafeCell;
use core::mem::{offset_of, size_of};

use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use sancus_step_cfg::{Word, ISR_STACK_SIZE};

/// Fill pattern of never-used stack words.
pub const PAINT: Word = 0x5A5A;

/// Words the resume frame occupies at the top of the stack.
pub const RESUME_FRAME_WORDS: usize = 2;

/// Words the call into the callback pushes: its return address.
pub const CALL_FRAME_WORDS: usize = 1;

/// Words left to the callback itself.
pub const CALLBACK_STACK_WORDS: usize = ISR_STACK_SIZE - RESUME_FRAME_WORDS - CALL_FRAME_WORDS;

/// Stand-in for the callback's return address on the portable path.
const RETURN_ADDRESS_PLACEHOLDER: Word = 0;

/// Where and how the interrupted instruction stream continues
///
/// Laid out on the ISR stack the way return-from-interrupt consumes it: the
/// status word on top, the return address below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "log-base", derive(defmt::Format))]
pub struct ResumeContext {
    /// Address execution resumes at
    pub pc: Word,
    /// Status register restored on return
    pub sr: Word,
}

impl ResumeContext {
    /// Status word pushed in front of the callback call.
    pub const STATUS_PLACEHOLDER: Word = 0;

    /// Resume at the address held in the saved register.
    pub const fn from_saved(register: Word) -> Self {
        ResumeContext {
            pc: register,
            sr: Self::STATUS_PLACEHOLDER,
        }
    }
}

/// The dedicated stack of the stepping ISR
#[repr(C)]
pub struct IsrStack {
    words: UnsafeCell<[Word; ISR_STACK_SIZE]>,
    /// index of the last pushed word, `ISR_STACK_SIZE` when empty
    sp: AtomicUsize,
    active: AtomicBool,
}

// SAFETY: the buffer is only written while `active` is held, and only one
// activation can exist at a time.
unsafe impl Sync for IsrStack {}

impl IsrStack {
    /// Capacity in words.
    pub const CAPACITY: usize = ISR_STACK_SIZE;

    pub(crate) const TOP_OFFSET: usize =
        offset_of!(IsrStack, words) + ISR_STACK_SIZE * size_of::<Word>();

    /// A painted, inactive stack
    pub const fn new() -> Self {
        IsrStack {
            words: UnsafeCell::new([PAINT; ISR_STACK_SIZE]),
            sp: AtomicUsize::new(ISR_STACK_SIZE),
            active: AtomicBool::new(false),
        }
    }

    /// Start an ISR activation: reset the stack pointer to the top.
    ///
    /// The returned frame restores the stack pointer and ends the activation
    /// when dropped, whichever way the ISR leaves.
    ///
    /// # Panics
    /// If an activation is already outstanding; the stepping ISR is not
    /// reentrant.
    pub fn activate(&self) -> IsrStackFrame<'_> {
        if self.active.swap(true, Ordering::Acquire) {
            panic!("isr stack activated twice");
        }
        self.sp.store(Self::CAPACITY, Ordering::Relaxed);
        stack_log!(trace, "isr stack activated");
        IsrStackFrame { stack: self }
    }

    /// Whether an activation is outstanding.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Words currently in use.
    pub fn depth(&self) -> usize {
        Self::CAPACITY - self.sp.load(Ordering::Relaxed)
    }

    /// Words still free below the stack pointer.
    pub fn remaining(&self) -> usize {
        self.sp.load(Ordering::Relaxed)
    }

    /// Push one word.
    ///
    /// # Panics
    /// Outside an activation, or when the stack is full. Overflowing the ISR
    /// stack is fatal.
    pub fn push(&self, word: Word) {
        assert!(self.is_active(), "isr stack used outside an activation");
        let sp = self.sp.load(Ordering::Relaxed);
        if sp == 0 {
            panic!("isr stack overflow");
        }
        // SAFETY: in bounds, and the active activation is the only writer
        unsafe { self.base().add(sp - 1).write_volatile(word) };
        self.sp.store(sp - 1, Ordering::Relaxed);
    }

    /// Pop one word.
    ///
    /// # Panics
    /// Outside an activation, or when the stack is empty.
    pub fn pop(&self) -> Word {
        assert!(self.is_active(), "isr stack used outside an activation");
        let sp = self.sp.load(Ordering::Relaxed);
        if sp == Self::CAPACITY {
            panic!("isr stack underflow");
        }
        self.sp.store(sp + 1, Ordering::Relaxed);
        // SAFETY: in bounds
        unsafe { self.base().add(sp).read_volatile() }
    }

    /// First word past the buffer, where an empty stack pointer points.
    pub fn top_ptr(&self) -> *mut Word {
        self.base().wrapping_add(Self::CAPACITY)
    }

    /// Address of the current stack pointer.
    pub fn sp_ptr(&self) -> *mut Word {
        self.base().wrapping_add(self.sp.load(Ordering::Relaxed))
    }

    /// Estimated deepest use of the stack since the last paint, in words.
    ///
    /// Counts from the bottom up to the first word that no longer holds
    /// [`PAINT`]; a pushed word that happens to equal the pattern makes the
    /// estimate low.
    pub fn high_water_mark(&self) -> usize {
        // SAFETY: plain reads; the single core cannot be writing concurrently
        let words = unsafe { &*self.words.get() };
        match words.iter().position(|w| *w != PAINT) {
            Some(lowest) => Self::CAPACITY - lowest,
            None => 0,
        }
    }

    /// Paint the whole buffer again, resetting the high-water mark.
    ///
    /// # Panics
    /// While an activation is outstanding.
    pub fn repaint(&self) {
        assert!(!self.is_active(), "isr stack repainted while in use");
        for i in 0..Self::CAPACITY {
            // SAFETY: in bounds, no activation can write concurrently
            unsafe { self.base().add(i).write_volatile(PAINT) };
        }
    }

    fn base(&self) -> *mut Word {
        self.words.get() as *mut Word
    }

    // the two words right below the top
    fn frame_word(&self, depth: usize) -> Word {
        // SAFETY: depth is 1 or 2, always in bounds
        unsafe { self.base().add(Self::CAPACITY - depth).read_volatile() }
    }
}

impl Default for IsrStack {
    fn default() -> Self {
        Self::new()
    }
}

/// One activation of the ISR stack
pub struct IsrStackFrame<'a> {
    stack: &'a IsrStack,
}

impl<'a> IsrStackFrame<'a> {
    /// Lay the resume context out at the top of the stack: return address
    /// first, status word on top of it.
    pub fn push_resume(&self, resume: ResumeContext) {
        debug_assert_eq!(self.stack.depth(), 0, "resume frame must sit at the top");
        self.stack.push(resume.pc);
        self.stack.push(resume.sr);
    }

    /// The resume context as return-from-interrupt would read it.
    ///
    /// Read from its fixed slots at the top, so it is what actually gets
    /// consumed no matter what the callback left below it.
    pub fn resume(&self) -> ResumeContext {
        ResumeContext {
            pc: self.stack.frame_word(1),
            sr: self.stack.frame_word(2),
        }
    }

    /// Account for the return address the call into the callback pushes.
    ///
    /// On the chip the `call` instruction writes that word itself, right
    /// below [`callback_top`](Self::callback_top); reserving it here keeps
    /// the callback's budget at [`CALLBACK_STACK_WORDS`] on every platform.
    pub fn reserve_return_address(&self) {
        debug_assert_eq!(
            self.stack.depth(),
            RESUME_FRAME_WORDS,
            "call frame goes below the resume frame"
        );
        self.stack.push(RETURN_ADDRESS_PLACEHOLDER);
    }

    /// Stack top the callback is called with: right below the resume frame.
    pub fn callback_top(&self) -> *mut Word {
        self.stack.top_ptr().wrapping_sub(RESUME_FRAME_WORDS)
    }

    /// The stack this frame lives on.
    pub fn stack(&self) -> &'a IsrStack {
        self.stack
    }
}

impl Drop for IsrStackFrame<'_> {
    fn drop(&mut self) {
        self.stack.sp.store(IsrStack::CAPACITY, Ordering::Relaxed);
        self.stack.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_resets_to_the_top() {
        let stack = IsrStack::new();
        {
            let _frame = stack.activate();
            stack.push(1);
            stack.push(2);
            assert_eq!(stack.depth(), 2);
        }
        assert!(!stack.is_active());
        let _frame = stack.activate();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.sp_ptr(), stack.top_ptr());
    }

    #[test]
    fn resume_frame_layout_matches_reti() {
        let stack = IsrStack::new();
        let frame = stack.activate();
        frame.push_resume(ResumeContext::from_saved(0xE010));
        assert_eq!(stack.depth(), RESUME_FRAME_WORDS);
        // status word is popped first, then the return address
        assert_eq!(stack.pop(), ResumeContext::STATUS_PLACEHOLDER);
        assert_eq!(stack.pop(), 0xE010);
    }

    #[test]
    fn callback_top_is_below_the_frame() {
        let stack = IsrStack::new();
        let frame = stack.activate();
        frame.push_resume(ResumeContext::from_saved(0x1234));
        let expected = stack.top_ptr().wrapping_sub(RESUME_FRAME_WORDS);
        assert_eq!(frame.callback_top(), expected);
    }

    #[test]
    fn return_address_comes_out_of_the_callback_budget() {
        let stack = IsrStack::new();
        let frame = stack.activate();
        frame.push_resume(ResumeContext::from_saved(0x1234));
        let top = frame.callback_top();
        frame.reserve_return_address();
        assert_eq!(frame.callback_top(), top);
        assert_eq!(stack.depth(), RESUME_FRAME_WORDS + CALL_FRAME_WORDS);
        assert_eq!(stack.remaining(), CALLBACK_STACK_WORDS);
        assert_eq!(frame.resume(), ResumeContext::from_saved(0x1234));
    }

    #[test]
    #[should_panic(expected = "isr stack activated twice")]
    fn not_reentrant() {
        let stack = IsrStack::new();
        let _outer = stack.activate();
        let _inner = stack.activate();
    }

    #[test]
    #[should_panic(expected = "isr stack overflow")]
    fn overflow_is_fatal() {
        let stack = IsrStack::new();
        let _frame = stack.activate();
        for i in 0..=IsrStack::CAPACITY {
            stack.push(i as Word);
        }
    }

    #[test]
    #[should_panic(expected = "isr stack underflow")]
    fn underflow_is_fatal() {
        let stack = IsrStack::new();
        let _frame = stack.activate();
        stack.pop();
    }

    #[test]
    #[should_panic(expected = "outside an activation")]
    fn push_requires_activation() {
        IsrStack::new().push(1);
    }

    #[test]
    fn high_water_mark_survives_activation() {
        let stack = IsrStack::new();
        assert_eq!(stack.high_water_mark(), 0);
        {
            let _frame = stack.activate();
            for _ in 0..10 {
                stack.push(0x0101);
            }
            for _ in 0..10 {
                stack.pop();
            }
        }
        assert_eq!(stack.high_water_mark(), 10);
        stack.repaint();
        assert_eq!(stack.high_water_mark(), 0);
    }
}

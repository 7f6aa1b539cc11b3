//! Platform trait definitions

pub mod platform;
pub mod timer;

pub use platform::Platform;
pub use timer::StepTimer;

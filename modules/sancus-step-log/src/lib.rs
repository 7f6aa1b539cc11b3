//! Logging macros for sancus-step
//!
//! The macros forward to `defmt` when the `log-base` feature is enabled and
//! expand to nothing otherwise. Anything logged from the stepping ISR costs
//! cycles that the calibrated latencies do not account for, so the category
//! macros stay off unless a build is explicitly made for diagnosis.

#![no_std]

#[cfg(feature = "log-base")]
use defmt_rtt as _;

#[cfg(feature = "log-base")]
#[doc(hidden)]
pub use defmt as __defmt;

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__log!(debug, $($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__log!(error, $($arg)*) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__log!(info, $($arg)*) };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__log!(trace, $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__log!(warn, $($arg)*) };
}

#[cfg(feature = "log-base")]
#[macro_export]
macro_rules! __log {
    ($level:ident, $($arg:tt)*) => {
        $crate::__defmt::$level!($($arg)*)
    };
}

// evaluate nothing, but keep the arguments "used" so disabled builds stay warning free
#[cfg(not(feature = "log-base"))]
#[macro_export]
macro_rules! __log {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        if false {
            $( let _ = &$arg; )*
        }
    }};
}

// Stepping state machine
#[cfg(feature = "log-step")]
#[macro_export]
macro_rules! step_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-step"))]
#[macro_export]
macro_rules! step_log {
    ($level:ident, $($args:tt)*) => {};
}

// Timer programming
#[cfg(feature = "log-timer")]
#[macro_export]
macro_rules! timer_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-timer"))]
#[macro_export]
macro_rules! timer_log {
    ($level:ident, $($args:tt)*) => {};
}

// ISR stack
#[cfg(feature = "log-stack")]
#[macro_export]
macro_rules! stack_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-stack"))]
#[macro_export]
macro_rules! stack_log {
    ($level:ident, $($args:tt)*) => {};
}

//! MSP430 architecture support

pub mod chip;

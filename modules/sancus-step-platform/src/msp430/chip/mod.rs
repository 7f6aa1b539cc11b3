//! Supported MSP430 chips

pub mod sancus;

//! CLI command implementations.

mod display;
mod session;

pub mod build;
pub mod cycles;
pub mod impact;
pub mod usage;

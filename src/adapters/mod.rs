//! Adapters - implementations of the ports.

pub mod broadcast;
pub mod memory;
pub mod postgres;
pub mod retry;

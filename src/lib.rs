//! Planning Poker - session coordination core for shared estimation.
//!
//! Participants join a session identified by a short code, submit hidden
//! estimates against work items, reveal them simultaneously, and agree a
//! final value. Every mutation is persisted and re-broadcast as a full
//! session snapshot so all observers converge on the same state.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;

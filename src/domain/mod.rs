//! Domain layer - entities, value objects, and the session aggregate.

pub mod foundation;
pub mod session;

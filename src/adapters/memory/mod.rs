//! In-memory (volatile) persistence adapter.

mod session_repository;

pub use session_repository::InMemorySessionRepository;

//! PostgreSQL (durable) persistence adapter.

mod rows;
mod session_repository;

pub use session_repository::PostgresSessionRepository;

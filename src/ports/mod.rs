//! Ports - interfaces between the domain and the outside world.
//!
//! Following hexagonal architecture, ports define the contracts the
//! application layer depends on; adapters implement them.

mod change_notifier;
mod session_repository;

pub use change_notifier::ChangeNotifier;
pub use session_repository::SessionRepository;

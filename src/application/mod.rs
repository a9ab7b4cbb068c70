//! Application layer - orchestration over the domain and ports.

mod coordinator;
mod notifier;

pub use coordinator::SessionCoordinator;
pub use notifier::SessionChangeNotifier;

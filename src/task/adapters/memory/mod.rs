//! In-memory adapters for task lifecycle ports.

mod session;
mod task;

pub use session::StaticSession;
pub use task::InMemoryTaskStore;

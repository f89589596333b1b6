//! Task tracking for long-running downloads and separations.
//!
//! Every background operation is represented by a `Task` whose status moves
//! `pending -> running -> completed | failed` (or straight from `pending` to
//! `failed`). Terminal tasks never change again and are evicted after the
//! configured retention period.

mod memory;
mod store;
mod types;

pub use memory::InMemoryTaskStore;
pub use store::{TaskError, TaskPatch, TaskStore};
pub use types::{Task, TaskKind, TaskStatus};

//! HTTP API and command-line shell for stemyard.

pub mod api;
pub mod cli;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::{Adapters, AppState};

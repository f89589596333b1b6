pub mod error;
pub mod handlers;
pub mod library;
pub mod media;
pub mod middleware;
pub mod routes;
pub mod tasks;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;

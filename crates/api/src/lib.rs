#![forbid(unsafe_code)]

pub mod errors;
pub mod identity;
pub mod models;
pub mod routes;
pub mod state;

pub use errors::AppError;
pub use identity::{Identity, Role};
pub use routes::create_router;
pub use state::AppState;

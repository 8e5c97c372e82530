pub mod account;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod validation;

pub use routes::{create_api_router, ApiContext};

pub mod dto;
pub mod extractors;
pub mod handlers;
mod openapi;
pub mod response;
mod router;
mod routes;
mod state;

pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;

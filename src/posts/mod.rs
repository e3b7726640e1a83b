mod dto;
pub mod filename;
pub mod handlers;
pub mod registry;

use crate::state::AppState;
use axum::Router;

pub use registry::PostRegistry;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}

pub mod aggregator;
mod handlers;
pub mod period;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::read_routes()
}

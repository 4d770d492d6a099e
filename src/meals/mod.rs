mod dto;
pub mod file_repo;
mod handlers;
pub mod pg_repo;
pub mod repo;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub use file_repo::FileMealStore;
pub use pg_repo::PgMealStore;
pub use repo::MealStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}

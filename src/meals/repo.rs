use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use super::repo_types::MealRecord;
use crate::error::AppError;

/// Append-only meal record storage.
///
/// Every backend must write each record as one atomic unit so that
/// concurrent uploads never interleave partial writes. Reads may lag behind
/// concurrent appends.
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn append(&self, record: &MealRecord) -> Result<(), AppError>;

    /// All records of `user_id`, optionally restricted to one date, in no
    /// particular order.
    async fn list_by_user(
        &self,
        user_id: &str,
        date: Option<Date>,
    ) -> Result<Vec<MealRecord>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MealRecord>, AppError>;
}

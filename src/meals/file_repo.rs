use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use time::Date;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;
use uuid::Uuid;

use super::{repo::MealStore, repo_types::MealRecord};
use crate::error::AppError;

/// Flat-file store: one JSON document per line.
///
/// Appends hold a process-wide lock and go out as a single append-mode write
/// of a complete line, so a reader never sees half a record.
pub struct FileMealStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMealStore {
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<MealRecord>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read {}", self.path.display()))
                    .into())
            }
        };

        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<MealRecord>(line)
                    .with_context(|| format!("{}:{}", self.path.display(), n + 1))
                    .map_err(AppError::from)
            })
            .collect()
    }
}

#[async_trait]
impl MealStore for FileMealStore {
    async fn append(&self, record: &MealRecord) -> Result<(), AppError> {
        let mut line = serde_json::to_vec(record).context("serialize meal record")?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(&line)
            .await
            .with_context(|| format!("append to {}", self.path.display()))?;
        file.flush().await?;
        debug!(meal_id = %record.id, path = %self.path.display(), "meal appended");
        Ok(())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        date: Option<Date>,
    ) -> Result<Vec<MealRecord>, AppError> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id && date.map_or(true, |d| r.date == d))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MealRecord>, AppError> {
        Ok(self.read_all().await?.into_iter().find(|r| r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::meals::repo_types::ImageRef;
    use crate::nutrition::{Nutrient, NutritionInfo};
    use serde_json::json;
    use time::macros::date;

    fn record(user: &str, day: Date, calories: f64) -> MealRecord {
        let mut nutrition = NutritionInfo {
            food_name: "Bowl".into(),
            calories,
            ..Default::default()
        };
        nutrition
            .micronutrients
            .vitamins
            .push(Nutrient::new("Vitamin C", 12.0, "mg"));
        nutrition.extra.insert("notes".into(), json!({"portion": "large"}));
        MealRecord::new(Uuid::new_v4(), user.into(), day, "12:00".into(), nutrition, None)
    }

    #[tokio::test]
    async fn written_record_reads_back_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMealStore::open(dir.path().join("meals.jsonl")).await.unwrap();

        let mut rec = record("alice", date!(2024 - 03 - 01), 450.0);
        rec.image = Some(ImageRef {
            key: "meals/alice/x.jpg".into(),
            content_type: "image/jpeg".into(),
            size: 1234,
        });
        store.append(&rec).await.unwrap();

        let back = store.list_by_user("alice", None).await.unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].user_id, rec.user_id);
        assert_eq!(back[0].date, rec.date);
        assert_eq!(back[0].calories, 450);
        assert_eq!(back[0].nutrition, rec.nutrition);
        assert_eq!(back[0], rec);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMealStore::open(dir.path().join("nested/meals.jsonl")).await.unwrap();
        assert!(store.list_by_user("anyone", None).await.unwrap().is_empty());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_by_user_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMealStore::open(dir.path().join("meals.jsonl")).await.unwrap();
        store.append(&record("alice", date!(2024 - 03 - 01), 100.0)).await.unwrap();
        store.append(&record("alice", date!(2024 - 03 - 02), 200.0)).await.unwrap();
        store.append(&record("bob", date!(2024 - 03 - 01), 300.0)).await.unwrap();

        assert_eq!(store.list_by_user("alice", None).await.unwrap().len(), 2);
        let day = store
            .list_by_user("alice", Some(date!(2024 - 03 - 02)))
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].calories, 200);
        assert!(store.list_by_user("carol", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_never_clobber_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meals.jsonl");
        let first = record("alice", date!(2024 - 03 - 01), 100.0);
        FileMealStore::open(&path).await.unwrap().append(&first).await.unwrap();

        // a second handle on the same file, as after a restart
        let store = FileMealStore::open(&path).await.unwrap();
        store.append(&record("alice", date!(2024 - 03 - 01), 200.0)).await.unwrap();

        assert_eq!(store.list_by_user("alice", None).await.unwrap().len(), 2);
        assert_eq!(store.find_by_id(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn concurrent_appends_produce_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileMealStore::open(dir.path().join("meals.jsonl")).await.unwrap());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append(&record("alice", date!(2024 - 03 - 01), i as f64))
                        .await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let all = store.list_by_user("alice", None).await.unwrap();
        assert_eq!(all.len(), 32);
        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(raw.lines().count(), 32);
    }

    #[tokio::test]
    async fn blank_lines_skipped_and_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meals.jsonl");
        let store = FileMealStore::open(&path).await.unwrap();
        store.append(&record("alice", date!(2024 - 03 - 01), 100.0)).await.unwrap();

        let mut raw = tokio::fs::read_to_string(&path).await.unwrap();
        raw.push_str("\n\n");
        tokio::fs::write(&path, &raw).await.unwrap();
        assert_eq!(store.list_by_user("alice", None).await.unwrap().len(), 1);

        raw.push_str("not json\n");
        tokio::fs::write(&path, &raw).await.unwrap();
        let err = store.list_by_user("alice", None).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}

use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, ImageStoreConfig, MealStoreConfig};
use crate::meals::{FileMealStore, MealStore, PgMealStore};
use crate::nutrition::{GeminiVision, VisionModel};
use crate::storage::{LocalStorage, S3Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub meals: Arc<dyn MealStore>,
    pub storage: Arc<dyn StorageClient>,
    pub vision: Arc<dyn VisionModel>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let meals: Arc<dyn MealStore> = match &config.meal_store {
            MealStoreConfig::File { path } => {
                let store = FileMealStore::open(path.clone()).await?;
                info!(path = %store.path().display(), "using flat-file meal store");
                Arc::new(store)
            }
            MealStoreConfig::Postgres { database_url } => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await?;
                sqlx::migrate!("./migrations").run(&db).await?;
                info!("using postgres meal store");
                Arc::new(PgMealStore::new(db))
            }
        };

        let storage: Arc<dyn StorageClient> = match &config.image_store {
            ImageStoreConfig::Local { dir } => {
                info!(dir = %dir.display(), "using local image store");
                Arc::new(LocalStorage::new(dir.clone()).await?)
            }
            ImageStoreConfig::S3(s3) => {
                info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "using s3 image store");
                Arc::new(S3Storage::new(s3).await?)
            }
        };

        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; every upload gets fallback nutrition");
        }
        let vision = Arc::new(GeminiVision::new(&config.gemini)?) as Arc<dyn VisionModel>;

        Ok(Self {
            config,
            meals,
            storage,
            vision,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        meals: Arc<dyn MealStore>,
        storage: Arc<dyn StorageClient>,
        vision: Arc<dyn VisionModel>,
    ) -> Self {
        Self {
            config,
            meals,
            storage,
            vision,
        }
    }
}

#[cfg(test)]
impl AppState {
    pub const FAKE_REPLY: &'static str = r#"Here you go:
{"food_name": "Grilled Salmon", "serving_size": "1 fillet", "calories": 450,
 "macronutrients": {"protein": 40, "carbs": 0, "fat": 30, "fiber": 0, "sugar": 0}}"#;

    /// In-memory backends and a model that answers [`Self::FAKE_REPLY`].
    pub fn fake() -> Self {
        Self::fake_with_reply(Some(Self::FAKE_REPLY.to_string()))
    }

    /// `None` makes every model call fail.
    pub fn fake_with_reply(reply: Option<String>) -> Self {
        use crate::config::{GeminiConfig, JwtConfig};
        use crate::meals::repo::testing::MemoryMealStore;
        use crate::nutrition::analyzer::testing::CannedVision;
        use crate::storage::testing::MemoryStorage;

        let config = Arc::new(AppConfig {
            meal_store: MealStoreConfig::File {
                path: "unused.jsonl".into(),
            },
            image_store: ImageStoreConfig::Local {
                dir: "unused".into(),
            },
            gemini: GeminiConfig {
                api_key: None,
                model: "fake".into(),
                timeout_secs: 1,
            },
            upload_password: "secret".into(),
            jwt: Some(JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
            }),
        });

        Self::from_parts(
            config,
            Arc::new(MemoryMealStore::default()),
            Arc::new(MemoryStorage::default()),
            Arc::new(CannedVision(reply)),
        )
    }
}

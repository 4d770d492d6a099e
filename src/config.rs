use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Where meal records live.
#[derive(Debug, Clone, Deserialize)]
pub enum MealStoreConfig {
    File { path: PathBuf },
    Postgres { database_url: String },
}

/// Where uploaded images live.
#[derive(Debug, Clone, Deserialize)]
pub enum ImageStoreConfig {
    Local { dir: PathBuf },
    S3(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub meal_store: MealStoreConfig,
    pub image_store: ImageStoreConfig,
    pub gemini: GeminiConfig,
    pub upload_password: String,
    /// Bearer auth is only accepted when a secret is configured.
    pub jwt: Option<JwtConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let meal_store = match env_or("MEAL_STORE", "file").as_str() {
            "file" => MealStoreConfig::File {
                path: env_or("MEALS_FILE", "data/meals.jsonl").into(),
            },
            "postgres" => MealStoreConfig::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL is required when MEAL_STORE=postgres")?,
            },
            other => anyhow::bail!("unknown MEAL_STORE {other:?}, expected file or postgres"),
        };

        let image_store = match env_or("IMAGE_STORE", "local").as_str() {
            "local" => ImageStoreConfig::Local {
                dir: env_or("IMAGE_DIR", "data/images").into(),
            },
            "s3" => ImageStoreConfig::S3(S3Config {
                endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
                bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
                access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
                region: env_or("MINIO_REGION", "us-east-1"),
            }),
            other => anyhow::bail!("unknown IMAGE_STORE {other:?}, expected local or s3"),
        };

        let gemini = GeminiConfig {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
            timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };

        let jwt = std::env::var("JWT_SECRET").ok().map(|secret| JwtConfig {
            secret,
            issuer: env_or("JWT_ISSUER", "nutrisnap"),
            audience: env_or("JWT_AUDIENCE", "nutrisnap-users"),
        });

        Ok(Self {
            meal_store,
            image_store,
            gemini,
            upload_password: std::env::var("UPLOAD_PASSWORD")
                .context("UPLOAD_PASSWORD must be set")?,
            jwt,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

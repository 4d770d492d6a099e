use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::meals::repo_types::ImageRef;
use crate::storage::{StorageClient, StoredObject};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Guesses a content type from the file name when the client sent none.
pub fn mime_from_filename(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

pub fn image_key(user_id: &str, meal_id: Uuid, ext: &str) -> String {
    // user ids come from form input; keep them to one safe path segment
    let user: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("meals/{}/{}.{}", user, meal_id, ext)
}

pub async fn store_meal_image(
    storage: &dyn StorageClient,
    user_id: &str,
    meal_id: Uuid,
    image: UploadItem,
) -> anyhow::Result<ImageRef> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = image_key(user_id, meal_id, ext);
    let size = image.body.len() as u64;
    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(ImageRef {
        key,
        content_type: image.content_type,
        size,
    })
}

/// Loads the bytes behind `image`. The content type recorded at upload time
/// wins over whatever the backend reports.
pub async fn load_meal_image(
    storage: &dyn StorageClient,
    image: &ImageRef,
) -> anyhow::Result<Option<StoredObject>> {
    let obj = storage
        .get_object(&image.key)
        .await
        .with_context(|| format!("get_object {}", image.key))?;
    Ok(obj.map(|o| StoredObject {
        body: o.body,
        content_type: image.content_type.clone(),
    }))
}

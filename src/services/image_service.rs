use base64::{Engine, engine::general_purpose::STANDARD};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::web::error::AppError;

const RECIPE_IMAGE_DIR: &str = "recipes";

/// Decodes a `data:image/<type>;base64,<payload>` URI into a file extension
/// and the raw bytes.
pub fn decode_data_uri(data_uri: &str) -> Result<(&'static str, Vec<u8>), AppError> {
    let invalid = || AppError::validation("image", t!("validation.invalid_image"));

    let rest = data_uri.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    if !mime.starts_with("image/") {
        return Err(invalid());
    }

    let extension = match mime {
        "image/jpeg" => "jpg",
        _ => mime_guess::get_mime_extensions_str(mime)
            .and_then(|exts| exts.first().copied())
            .ok_or_else(invalid)?,
    };

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }
    Ok((extension, bytes))
}

/// Stores the decoded image under `<media_dir>/recipes/` and returns its
/// path relative to the media directory.
pub async fn save_image(media_dir: &str, data_uri: &str) -> Result<String, AppError> {
    let (extension, bytes) = decode_data_uri(data_uri)?;

    let dir = Path::new(media_dir).join(RECIPE_IMAGE_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to create media directory: {e}")))?;

    let file_name = format!("{}.{extension}", Uuid::new_v4());
    tokio::fs::write(dir.join(&file_name), &bytes)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to store image: {e}")))?;

    debug!(file = %file_name, size = bytes.len(), "Stored recipe image.");
    Ok(format!("{RECIPE_IMAGE_DIR}/{file_name}"))
}

/// Removes a stored image. A missing file is only logged.
pub async fn delete_image(media_dir: &str, relative_path: &str) {
    if relative_path.is_empty() {
        return;
    }
    let path = Path::new(media_dir).join(relative_path);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove recipe image.");
    }
}

pub fn image_url(base_url: &str, relative_path: &str) -> String {
    format!("{}/media/{}", base_url.trim_end_matches('/'), relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_decode_png_data_uri() {
        let (ext, bytes) = decode_data_uri(PNG).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_rejects_non_image_and_garbage() {
        assert!(decode_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_data_uri("iVBORw0KGgo=").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
    }

    #[tokio::test]
    async fn test_save_and_delete_image() {
        let media = tempfile::tempdir().unwrap();
        let media_dir = media.path().to_str().unwrap();

        let relative = save_image(media_dir, PNG).await.unwrap();
        assert!(relative.starts_with("recipes/"));
        assert!(relative.ends_with(".png"));
        assert!(media.path().join(&relative).exists());

        delete_image(media_dir, &relative).await;
        assert!(!media.path().join(&relative).exists());
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("http://localhost:8000/", "recipes/a.png"),
            "http://localhost:8000/media/recipes/a.png"
        );
    }
}

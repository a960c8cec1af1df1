//! Multipart image upload shared by the profile and catalog routes.

use axum::extract::Multipart;
use salon_common::error::{SalonError, SalonResult};
use salon_db::storage::{ImageKind, image_content_type};
use uuid::Uuid;

use crate::AppState;

/// Request body cap for upload routes; the image itself is checked against
/// `limits.max_image_bytes`.
pub const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// A validated image read from the `image` form field.
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

/// Read the `image` field of a multipart form, enforcing type and size limits.
pub async fn read_image(mut multipart: Multipart, max_bytes: usize) -> SalonResult<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SalonError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = image_content_type(field.file_name(), field.content_type())
            .ok_or_else(|| SalonError::validation("Image must be JPEG, PNG, WebP or GIF"))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| SalonError::validation(format!("Failed to read image: {e}")))?;

        if bytes.is_empty() {
            return Err(SalonError::validation("Image is empty"));
        }
        if bytes.len() > max_bytes {
            return Err(SalonError::validation(format!(
                "Image too large: {} bytes (max {max_bytes} bytes)",
                bytes.len()
            )));
        }

        return Ok(ImageUpload {
            data: bytes.to_vec(),
            content_type,
        });
    }

    Err(SalonError::validation("No image field in request"))
}

/// Upload a replacement image and drop the previous one.
pub async fn replace_image(
    state: &AppState,
    kind: ImageKind,
    owner_id: Uuid,
    upload: ImageUpload,
    previous: Option<&str>,
) -> SalonResult<String> {
    let url = state
        .images
        .put_image(kind, owner_id, upload.data, upload.content_type)
        .await?;

    if let Some(old) = previous {
        if let Err(e) = state.images.delete_by_url(old).await {
            tracing::warn!(owner_id = %owner_id, "Failed to delete replaced image: {e:#}");
        }
    }

    Ok(url)
}

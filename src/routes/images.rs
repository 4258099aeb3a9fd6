use axum::{
    body::Bytes,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::{
        validation::{sanitize_for_logging, validate_upload},
        Caller, Role,
    },
    models::{ImageUpload, RequestOrigin},
    state::AppState,
    types::ImageDto,
};

struct UploadForm {
    original_name: String,
    content_type: Option<String>,
    data: Bytes,
    file_name: String,
    file_description: Option<String>,
}

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("{}: {}", context, e.body_text()))
    }
}

async fn text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(|e| multipart_error("Invalid multipart field", e))
}

async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut file_name = None;
    let mut file_description = None;

    while let Some(field) =
        multipart.next_field().await.map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data =
                    field.bytes().await.map_err(|e| multipart_error("Failed to read file", e))?;
                file = Some((original, content_type, data));
            }
            Some("fileName") => file_name = Some(text(field).await?),
            Some("fileDescription") => file_description = Some(text(field).await?).filter(|d| !d.trim().is_empty()),
            _ => {}
        }
    }

    let (original_name, content_type, data) =
        file.ok_or_else(|| AppError::ValidationError { field: "file".into(), message: "File is required".into() })?;
    Ok(UploadForm {
        original_name,
        content_type,
        data,
        file_name: file_name.unwrap_or_default(),
        file_description,
    })
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// `POST /api/images/upload`, multipart with `file`, `fileName` and optional `fileDescription`.
pub async fn upload_image(
    State(state): State<AppState>,
    caller: Caller,
    origin: RequestOrigin,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ImageDto>)> {
    caller.require(Role::Writer)?;

    let form = read_form(multipart).await?;
    let size = form.data.len();
    let extension = validate_upload(&state.config.images, &form.original_name, &form.file_name, size)?;
    let content_type = form
        .content_type
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| content_type_for(&extension).to_string());

    let upload = ImageUpload {
        file_name: form.file_name.trim().to_string(),
        file_extension: extension,
        content_type,
        file_description: form.file_description,
        body: Box::new(std::io::Cursor::new(form.data)),
    };
    tracing::info!(name = %sanitize_for_logging(&upload.stored_name()), size, "Uploading image");

    let image = state.images.upload(upload, &origin).await?;
    state.metrics.record_upload(size as u64);
    tracing::info!(id = %image.id, url = %image.file_path, "Image stored");
    Ok((StatusCode::CREATED, Json(image.into())))
}

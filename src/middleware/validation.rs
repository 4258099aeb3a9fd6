use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{AppConfig, ImagesConfig};
use crate::error::{AppError, AppResult};
use crate::types::{AddRegionRequest, AddWalkRequest, UpdateRegionRequest, UpdateWalkRequest};

pub const REGION_CODE_LEN: usize = 3;
pub const REGION_NAME_MAX: usize = 100;
pub const WALK_NAME_MAX: usize = 100;
pub const WALK_DESCRIPTION_MAX: usize = 1000;
pub const WALK_LENGTH_MAX_KM: f64 = 50.0;
/// Bytes of UTF-8, leaving room for the extension under the usual 255-byte file name limit.
pub const FILE_NAME_MAX_BYTES: usize = 200;

/// Rejects traversal attempts in the URI and oversized declared bodies before routing.
///
/// The body limit is the upload limit plus headroom for multipart framing;
/// `DefaultBodyLimit` still enforces it on streamed bodies.
pub async fn validate_request_middleware(State(cfg): State<Arc<AppConfig>>, req: Request, next: Next) -> Response {
    if contains_path_traversal(req.uri().path()) {
        tracing::warn!(path = %req.uri().path(), "Rejected request with path traversal");
        return AppError::BadRequest("Path traversal detected in request".to_string()).into_response();
    }

    if matches!(*req.method(), Method::POST | Method::PUT) {
        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        let limit = max_body_bytes(&cfg.images);
        if let Some(length) = declared.filter(|&l| l > limit) {
            tracing::warn!(length, limit, "Rejected oversized request body");
            return AppError::PayloadTooLarge(format!("Request body exceeds maximum size of {} bytes", limit))
                .into_response();
        }
    }

    next.run(req).await
}

pub fn max_body_bytes(images: &ImagesConfig) -> usize {
    images.max_upload_bytes.saturating_add(64 * 1024)
}

fn contains_path_traversal(path: &str) -> bool {
    if path.contains("/..") || path.contains("\\..") || path.starts_with("..") {
        return true;
    }
    if path.contains("/./") || path.contains('\0') {
        return true;
    }
    let lower = path.to_lowercase();
    ["%2e%2e", "%252e%252e", "%2e/", "/%2e", "%2f%2e", "%5c%2e", "%00"].iter().any(|p| lower.contains(p))
}

/// Field-level checks a request body must pass before it reaches a repository.
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

fn invalid(field: &str, message: impl Into<String>) -> AppError {
    AppError::ValidationError { field: field.to_string(), message: message.into() }
}

fn check_region(code: &str, name: &str, image_url: Option<&str>) -> AppResult<()> {
    if code.chars().count() != REGION_CODE_LEN {
        return Err(invalid("code", format!("Code has to be exactly {} characters", REGION_CODE_LEN)));
    }
    if name.trim().is_empty() {
        return Err(invalid("name", "Name is required"));
    }
    if name.chars().count() > REGION_NAME_MAX {
        return Err(invalid("name", format!("Name has a maximum of {} characters", REGION_NAME_MAX)));
    }
    check_url("regionImageUrl", image_url)
}

fn check_walk(name: &str, description: &str, length_in_km: f64, image_url: Option<&str>) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(invalid("name", "Name is required"));
    }
    if name.chars().count() > WALK_NAME_MAX {
        return Err(invalid("name", format!("Name has a maximum of {} characters", WALK_NAME_MAX)));
    }
    if description.trim().is_empty() {
        return Err(invalid("description", "Description is required"));
    }
    if description.chars().count() > WALK_DESCRIPTION_MAX {
        return Err(invalid(
            "description",
            format!("Description has a maximum of {} characters", WALK_DESCRIPTION_MAX),
        ));
    }
    // NaN fails both comparisons
    if !(length_in_km > 0.0 && length_in_km <= WALK_LENGTH_MAX_KM) {
        return Err(invalid("lengthInKm", format!("Length must be greater than 0 and at most {}", WALK_LENGTH_MAX_KM)));
    }
    check_url("walkImageUrl", image_url)
}

fn check_url(field: &str, url: Option<&str>) -> AppResult<()> {
    match url {
        Some(u) if u.chars().any(char::is_control) => Err(invalid(field, "URL contains control characters")),
        Some(u) if u.len() > 2048 => Err(invalid(field, "URL exceeds 2048 characters")),
        _ => Ok(()),
    }
}

impl Validate for AddRegionRequest {
    fn validate(&self) -> AppResult<()> {
        check_region(&self.code, &self.name, self.region_image_url.as_deref())
    }
}

impl Validate for UpdateRegionRequest {
    fn validate(&self) -> AppResult<()> {
        check_region(&self.code, &self.name, self.region_image_url.as_deref())
    }
}

impl Validate for AddWalkRequest {
    fn validate(&self) -> AppResult<()> {
        check_walk(&self.name, &self.description, self.length_in_km, self.walk_image_url.as_deref())
    }
}

impl Validate for UpdateWalkRequest {
    fn validate(&self) -> AppResult<()> {
        check_walk(&self.name, &self.description, self.length_in_km, self.walk_image_url.as_deref())
    }
}

/// Checks an upload before anything touches the disk. Returns the lower-cased extension.
pub fn validate_upload(cfg: &ImagesConfig, original_name: &str, file_name: &str, size: usize) -> AppResult<String> {
    let extension = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    if !cfg.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(invalid("file", format!("Unsupported file extension '{}'", extension)));
    }
    if size == 0 {
        return Err(invalid("file", "File is empty"));
    }
    if size > cfg.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds the limit of {} bytes",
            cfg.max_upload_bytes
        )));
    }
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        return Err(invalid("fileName", "File name is required"));
    }
    if trimmed.starts_with('.') || trimmed.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(invalid("fileName", "File name must not contain path separators"));
    }
    if trimmed.len() > FILE_NAME_MAX_BYTES {
        return Err(invalid("fileName", format!("File name has a maximum of {} bytes", FILE_NAME_MAX_BYTES)));
    }
    Ok(extension)
}

/// Strips control characters and caps length so user input is safe to log.
pub fn sanitize_for_logging(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).take(200).collect()
}

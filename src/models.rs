//! Domain values handed between the repositories and the HTTP layer.
//!
//! These are plain data: repositories return fresh values and updates are
//! expressed as "fetch, build a new value, persist it" rather than by mutating
//! a tracked entity.

use tokio::io::AsyncRead;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub region_image_url: Option<String>,
}

/// Caller-supplied, mutable attributes of a region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFields {
    pub code: String,
    pub name: String,
    pub region_image_url: Option<String>,
}

impl Region {
    /// Full replace of the mutable attributes; the id is kept.
    pub fn with_fields(&self, fields: RegionFields) -> Region {
        Region {
            id: self.id,
            code: fields.code,
            name: fields.name,
            region_image_url: fields.region_image_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Difficulty {
    pub id: Uuid,
    pub name: String,
}

/// A walk joined with the difficulty and region it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Walk {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
    pub difficulty: Difficulty,
    pub region: Region,
}

/// Caller-supplied attributes of a walk, foreign keys included.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkFields {
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
}

/// Stored image metadata. `file_path` is the externally resolvable URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: Uuid,
    pub file_name: String,
    pub file_extension: String,
    pub content_type: String,
    pub file_description: Option<String>,
    pub file_size_in_bytes: i64,
    pub file_path: String,
}

/// An image on its way in. The byte source is consumed by the upload.
pub struct ImageUpload {
    pub file_name: String,
    pub file_extension: String,
    pub content_type: String,
    pub file_description: Option<String>,
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

impl ImageUpload {
    /// `{file_name}{file_extension}`, the name used on disk and in the URL.
    pub fn stored_name(&self) -> String {
        format!("{}{}", self.file_name, self.file_extension)
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("file_extension", &self.file_extension)
            .field("content_type", &self.content_type)
            .field("file_description", &self.file_description)
            .finish_non_exhaustive()
    }
}

/// Scheme, host and path base of the request that triggered an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
    pub path_base: String,
}

impl RequestOrigin {
    /// `{scheme}://{host}{path_base}/images/{stored_name}`, with the name percent-encoded.
    pub fn image_url(&self, stored_name: &str) -> String {
        format!("{}://{}{}/images/{}", self.scheme, self.host, self.path_base, urlencoding::encode(stored_name))
    }
}

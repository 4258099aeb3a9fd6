use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Difficulty, Image, Region, RegionFields, Walk, WalkFields};
use crate::repositories::query::{WalkQuery, DEFAULT_PAGE};

// Request bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRegionRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub region_image_url: Option<String>,
}

/// Same shape as [`AddRegionRequest`]; kept separate because the two evolve independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegionRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub region_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWalkRequest {
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    #[serde(default)]
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWalkRequest {
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    #[serde(default)]
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
}

impl From<AddRegionRequest> for RegionFields {
    fn from(req: AddRegionRequest) -> Self {
        RegionFields { code: req.code, name: req.name, region_image_url: req.region_image_url }
    }
}

impl From<UpdateRegionRequest> for RegionFields {
    fn from(req: UpdateRegionRequest) -> Self {
        RegionFields { code: req.code, name: req.name, region_image_url: req.region_image_url }
    }
}

impl From<AddWalkRequest> for WalkFields {
    fn from(req: AddWalkRequest) -> Self {
        WalkFields {
            name: req.name,
            description: req.description,
            length_in_km: req.length_in_km,
            walk_image_url: req.walk_image_url,
            difficulty_id: req.difficulty_id,
            region_id: req.region_id,
        }
    }
}

impl From<UpdateWalkRequest> for WalkFields {
    fn from(req: UpdateWalkRequest) -> Self {
        WalkFields {
            name: req.name,
            description: req.description,
            length_in_km: req.length_in_km,
            walk_image_url: req.walk_image_url,
            difficulty_id: req.difficulty_id,
            region_id: req.region_id,
        }
    }
}

/// Query string of `GET /api/walks`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkListParams {
    pub filter_on: Option<String>,
    pub filter_query: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "bool_ignoring_case")]
    pub is_ascending: Option<bool>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

/// `true`/`false` in any letter case; an empty value counts as absent.
fn bool_ignoring_case<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(v) => Err(serde::de::Error::custom(format!("invalid boolean {:?}", v))),
    }
}

impl WalkListParams {
    pub fn into_query(self, default_page_size: i64, max_page_size: Option<i64>) -> WalkQuery {
        WalkQuery {
            filter_on: self.filter_on,
            filter_query: self.filter_query,
            sort_by: self.sort_by,
            is_ascending: self.is_ascending.unwrap_or(true),
            page: self.page_number.unwrap_or(DEFAULT_PAGE),
            page_size: self.page_size.unwrap_or(default_page_size),
            max_page_size,
        }
    }
}

// Response bodies

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDto {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub region_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyDto {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
    pub difficulty: DifficultyDto,
    pub region: RegionDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    pub id: Uuid,
    pub file_name: String,
    pub file_extension: String,
    pub content_type: String,
    pub file_description: Option<String>,
    pub file_size_in_bytes: i64,
    pub file_path: String,
}

impl From<Region> for RegionDto {
    fn from(r: Region) -> Self {
        RegionDto { id: r.id, code: r.code, name: r.name, region_image_url: r.region_image_url }
    }
}

impl From<Difficulty> for DifficultyDto {
    fn from(d: Difficulty) -> Self {
        DifficultyDto { id: d.id, name: d.name }
    }
}

impl From<Walk> for WalkDto {
    fn from(w: Walk) -> Self {
        WalkDto {
            id: w.id,
            name: w.name,
            description: w.description,
            length_in_km: w.length_in_km,
            walk_image_url: w.walk_image_url,
            difficulty_id: w.difficulty_id,
            region_id: w.region_id,
            difficulty: w.difficulty.into(),
            region: w.region.into(),
        }
    }
}

impl From<Image> for ImageDto {
    fn from(i: Image) -> Self {
        ImageDto {
            id: i.id,
            file_name: i.file_name,
            file_extension: i.file_extension,
            content_type: i.content_type,
            file_description: i.file_description,
            file_size_in_bytes: i.file_size_in_bytes,
            file_path: i.file_path,
        }
    }
}

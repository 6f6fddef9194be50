//! Media records attached to resources through named slots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An uploaded media file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_specific_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_global_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Media of one resource, keyed by slot name.
pub type MediaData = BTreeMap<String, Vec<Media>>;

/// Body of `POST /{route}/{uuid}/media/replace/{slot}`.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaceMediaRequest {
    pub new_id: String,
}

/// Body of `POST /media/{id}/sort`.
#[derive(Debug, Clone, Serialize)]
pub struct MediaSortRequest {
    pub sort: i64,
}

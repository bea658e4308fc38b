//! Media item types, both as returned by the Graph API and normalized.

use serde::{Deserialize, Serialize};

/// Kind of Instagram post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Image,
    Video,
    CarouselAlbum,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One post, reduced to what the grid needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// CDN URL of the still image (video thumbnail for videos).
    pub image_url: String,
    pub permalink: String,
    /// Plain-text caption, tags stripped.
    pub caption: String,
    pub timestamp: String,
    pub media_type: MediaType,
}

/// Raw `/{ig-user-id}/media` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphMedia {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Graph API list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// `/me/accounts` page entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphPage {
    #[serde(default)]
    pub instagram_business_account: Option<GraphAccountRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphAccountRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Graph API error body: `{"error": {"message": …}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    pub error: GraphErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

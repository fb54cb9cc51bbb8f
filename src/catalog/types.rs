//! YouTube Data API response shapes and their mapping onto `MediaItem`

use serde::Deserialize;

use crate::model::MediaItem;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchId,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
pub struct SearchId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub snippet: Snippet,
    pub statistics: Option<Statistics>,
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snippet {
    pub title: String,
    pub channel_title: String,
    pub published_at: Option<String>,
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Thumbnails {
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    #[serde(rename = "default")]
    pub fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentDetails {
    pub duration: Option<String>,
}

impl Thumbnails {
    fn best_url(&self) -> String {
        self.medium
            .as_ref()
            .or(self.high.as_ref())
            .or(self.fallback.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_default()
    }
}

impl Snippet {
    fn into_media_item(self, id: String) -> MediaItem {
        MediaItem {
            id,
            title: decode_entities(&self.title),
            channel_title: decode_entities(&self.channel_title),
            thumbnail: self.thumbnails.best_url(),
            duration: None,
            published_at: self.published_at,
            view_count: None,
        }
    }
}

impl SearchItem {
    /// Search hits without a video id (channels, playlists) are dropped.
    pub fn into_media_item(self) -> Option<MediaItem> {
        let id = self.id.video_id?;
        Some(self.snippet.into_media_item(id))
    }
}

impl VideoItem {
    pub fn into_media_item(self) -> MediaItem {
        let mut item = self.snippet.into_media_item(self.id);
        item.view_count = self.statistics.and_then(|s| s.view_count);
        item.duration = self.content_details.and_then(|c| c.duration);
        item
    }
}

/// The API HTML-escapes titles; undo the handful of entities it emits.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

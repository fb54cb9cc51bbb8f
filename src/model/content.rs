//! Content lists fetched from the catalog

use super::types::MediaItem;

#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub search_results: Vec<MediaItem>,
    pub last_query: String,
    pub trending: Vec<MediaItem>,
    pub language_suggestions: Vec<MediaItem>,
    pub is_loading: bool,
}

use futures::future::BoxFuture;
use reqwest::Client;

use super::error::CatalogError;
use super::keys::ApiKeyRing;
use super::types::{SearchItem, SearchResponse, VideoItem, VideosResponse};
use super::CatalogClient;
use crate::model::{Language, MediaItem};

/// YouTube's "Music" video category, used for the trending chart.
const MUSIC_CATEGORY_ID: &str = "10";

/// YouTube Data API v3 client.
pub struct YouTubeCatalog {
    http: Client,
    base_url: String,
    keys: ApiKeyRing,
}

impl YouTubeCatalog {
    pub fn new(base_url: impl Into<String>, api_keys: Vec<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keys: ApiKeyRing::new(api_keys),
        }
    }

    pub fn key_index(&self) -> usize {
        self.keys.current_index()
    }

    /// Check the HTTP response, classifying quota exhaustion separately.
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        if status == 403 && body.contains("quotaExceeded") {
            return Err(CatalogError::QuotaExceeded);
        }
        tracing::warn!(status, "Catalog API error");
        Err(CatalogError::Api { status, message: body })
    }

    async fn search_with_key(
        &self,
        key: &str,
        query: &str,
        limit: u32,
        language: Language,
    ) -> Result<Vec<MediaItem>, CatalogError> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("maxResults", limit.to_string()),
            ("q", query.to_string()),
            ("key", key.to_string()),
        ];
        if let Some(code) = language.code() {
            params.push(("relevanceLanguage", code.to_string()));
        }

        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        let page: SearchResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(page
            .items
            .into_iter()
            .filter_map(SearchItem::into_media_item)
            .collect())
    }

    async fn trending_with_key(
        &self,
        key: &str,
        region: &str,
        limit: u32,
    ) -> Result<Vec<MediaItem>, CatalogError> {
        let limit = limit.to_string();
        let resp = self
            .http
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("chart", "mostPopular"),
                ("regionCode", region),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", limit.as_str()),
                ("key", key),
            ])
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        let page: VideosResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(page.items.into_iter().map(VideoItem::into_media_item).collect())
    }
}

impl CatalogClient for YouTubeCatalog {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: u32,
        language: Language,
    ) -> BoxFuture<'a, Result<Vec<MediaItem>, CatalogError>> {
        Box::pin(async move {
            tracing::debug!(query, limit, language = language.as_str(), "Catalog search");
            let items = self
                .keys
                .with_rotation("search", |key| async move {
                    self.search_with_key(&key, query, limit, language).await
                })
                .await?;
            let items = items.unwrap_or_default();
            tracing::debug!(query, count = items.len(), "Catalog search finished");
            Ok(items)
        })
    }

    fn trending<'a>(
        &'a self,
        region: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<MediaItem>, CatalogError>> {
        Box::pin(async move {
            tracing::debug!(region, limit, "Catalog trending");
            let items = self
                .keys
                .with_rotation("trending", |key| async move {
                    self.trending_with_key(&key, region, limit).await
                })
                .await?;
            Ok(items.unwrap_or_default())
        })
    }
}

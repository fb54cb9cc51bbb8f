//! Catalog module - Video catalog search and charts
//!
//! - `youtube`: HTTP client for the YouTube Data API
//! - `keys`: API key ring with quota rotation
//! - `types`: API response shapes
//! - `error`: catalog errors

mod error;
mod keys;
mod types;
mod youtube;

use futures::future::BoxFuture;

use crate::model::{Language, MediaItem};

pub use error::CatalogError;
pub use youtube::YouTubeCatalog;

/// Source of playable media items.
///
/// Running out of quota on every key is not an error: both calls resolve
/// to an empty list in that case.
pub trait CatalogClient: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: u32,
        language: Language,
    ) -> BoxFuture<'a, Result<Vec<MediaItem>, CatalogError>>;

    fn trending<'a>(
        &'a self,
        region: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<MediaItem>, CatalogError>>;
}

//! Ports and shared state the services run against.

use std::sync::Arc;

use gb_core::traits::{
    AttachmentRepo, CommentRepo, ConfigurationStore, LanguageRegistry, PostRepo, ThumbnailStore,
    WebsiteRegistry,
};

use crate::cache::SlugLangsCache;

/// Everything a service needs, injected once at startup.
pub struct BlogState {
    pub posts: Arc<dyn PostRepo>,
    pub comments: Arc<dyn CommentRepo>,
    pub attachments: Arc<dyn AttachmentRepo>,
    pub languages: Arc<dyn LanguageRegistry>,
    pub websites: Arc<dyn WebsiteRegistry>,
    pub configuration: Arc<dyn ConfigurationStore>,
    pub thumbnails: Arc<dyn ThumbnailStore>,
    pub slug_cache: SlugLangsCache,
    /// Language whose values are stored as the base values
    pub default_language: String,
}

impl BlogState {
    /// Wires a store that implements every persistence port at once, as both
    /// database plugins do.
    pub fn from_store<S>(
        store: Arc<S>,
        thumbnails: Arc<dyn ThumbnailStore>,
        default_language: impl Into<String>,
    ) -> Self
    where
        S: PostRepo
            + CommentRepo
            + AttachmentRepo
            + LanguageRegistry
            + WebsiteRegistry
            + ConfigurationStore
            + 'static,
    {
        Self {
            posts: store.clone(),
            comments: store.clone(),
            attachments: store.clone(),
            languages: store.clone(),
            websites: store.clone(),
            configuration: store,
            thumbnails,
            slug_cache: SlugLangsCache::new(),
            default_language: default_language.into(),
        }
    }
}

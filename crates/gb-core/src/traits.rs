//! # Core Traits (Ports)
//!
//! Persistence, registries and thumbnail storage live behind these traits.
//! Any plugin must implement them to be wired into the services.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::Result;
use crate::models::{
    Attachment, Comment, Language, Post, PostTranslation, SiteConfiguration, Website,
};

/// Post persistence. There is no delete operation.
///
/// Writes that carry translations apply the post row and the translation
/// rows together or not at all.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Inserts the post with its base values and one translation per entry
    /// of `translations`.
    async fn create_post(
        &self,
        post: Post,
        translations: BTreeMap<String, PostTranslation>,
    ) -> anyhow::Result<()>;

    /// Reads a post with translatable fields resolved for `language`
    /// (base values when `None` or untranslated).
    async fn get_post(&self, id: Uuid, language: Option<String>) -> anyhow::Result<Option<Post>>;

    /// Stores non-translatable fields and the base translatable values, and
    /// merges `translation` (language, values) into that language's row.
    async fn update_post(
        &self,
        post: Post,
        translation: Option<(String, PostTranslation)>,
    ) -> anyhow::Result<()>;

    /// Every stored translation of a post, by language.
    async fn read_translations(&self, id: Uuid) -> anyhow::Result<BTreeMap<String, PostTranslation>>;

    /// The slug of one post under each of `languages`, in one call.
    async fn read_slugs(
        &self,
        id: Uuid,
        languages: Vec<String>,
    ) -> anyhow::Result<BTreeMap<String, String>>;

    /// Posts of a website in listing order.
    async fn list_posts(
        &self,
        website_id: Uuid,
        language: Option<String>,
    ) -> anyhow::Result<Vec<Post>>;
}

/// Comment persistence.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;
    async fn update_comment(&self, comment: Comment) -> anyhow::Result<()>;
    /// Comments of a post in listing order.
    async fn list_comments(&self, post_id: Uuid, include_hidden: bool) -> anyhow::Result<Vec<Comment>>;
}

/// Gallery attachments of posts.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait AttachmentRepo: Send + Sync {
    async fn create_attachment(&self, attachment: Attachment) -> anyhow::Result<()>;
    /// Attachments of a post in gallery order.
    async fn list_attachments(&self, post_id: Uuid) -> anyhow::Result<Vec<Attachment>>;
}

/// Languages known to the platform.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait LanguageRegistry: Send + Sync {
    /// Only languages that are both active and translatable.
    async fn translatable_languages(&self) -> anyhow::Result<Vec<Language>>;
}

/// Websites known to the platform.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait WebsiteRegistry: Send + Sync {
    async fn get_website(&self, id: Uuid) -> anyhow::Result<Option<Website>>;
    async fn active_websites(&self) -> anyhow::Result<Vec<Website>>;
}

/// The site-wide configuration singleton.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn site_configuration(&self) -> anyhow::Result<SiteConfiguration>;
}

/// Durable, content-addressed thumbnail storage.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    /// Validates, hashes, resizes and stores an upload; returns the stored
    /// file name (`<hash>.<ext>`).
    async fn save_thumbnail(
        &self,
        file_name: String,
        data: Vec<u8>,
        config: SiteConfiguration,
    ) -> Result<String>;

    /// Thumbnail bytes, or `None` if the file is gone.
    async fn load_thumbnail(&self, stored_name: String) -> Option<Vec<u8>>;
}

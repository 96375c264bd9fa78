//! # gb-db-memory
//!
//! In-process implementation of every persistence port. Nothing survives a
//! restart; used for tests and for running without a database.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gb_core::models::{
    attachment_listing_order, comment_listing_order, post_listing_order, Attachment, Comment,
    Language, Post, PostTranslation, SiteConfiguration, Website,
};
use gb_core::traits::{
    AttachmentRepo, CommentRepo, ConfigurationStore, LanguageRegistry, PostRepo, WebsiteRegistry,
};
use tracing::debug;
use uuid::Uuid;

struct StoredPost {
    /// Values in the default language
    base: Post,
    translations: BTreeMap<String, PostTranslation>,
}

impl StoredPost {
    fn read(&self, language: Option<&str>) -> Post {
        let mut post = self.base.clone();
        if let Some(translation) = language.and_then(|code| self.translations.get(code)) {
            translation.apply(&mut post);
        }
        post
    }
}

#[derive(Default)]
pub struct InMemoryBlogStore {
    posts: DashMap<Uuid, StoredPost>,
    comments: DashMap<Uuid, Comment>,
    attachments: DashMap<Uuid, Attachment>,
    websites: DashMap<Uuid, Website>,
    languages: RwLock<Vec<Language>>,
    configuration: RwLock<SiteConfiguration>,
}

impl InMemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a language by code.
    pub fn add_language(&self, language: Language) {
        let mut languages = self.languages.write().unwrap_or_else(|e| e.into_inner());
        languages.retain(|l| l.code != language.code);
        languages.push(language);
    }

    pub fn save_website(&self, website: Website) -> gb_core::Result<()> {
        website.validate()?;
        self.websites.insert(website.id, website);
        Ok(())
    }

    pub fn set_configuration(&self, configuration: SiteConfiguration) {
        *self.configuration.write().unwrap_or_else(|e| e.into_inner()) = configuration;
    }
}

#[async_trait]
impl PostRepo for InMemoryBlogStore {
    async fn create_post(
        &self,
        post: Post,
        translations: BTreeMap<String, PostTranslation>,
    ) -> anyhow::Result<()> {
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => Err(anyhow!("post {} already exists", post.id)),
            Entry::Vacant(slot) => {
                slot.insert(StoredPost {
                    base: post,
                    translations,
                });
                Ok(())
            }
        }
    }

    async fn get_post(&self, id: Uuid, language: Option<String>) -> anyhow::Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|stored| stored.read(language.as_deref())))
    }

    async fn update_post(
        &self,
        post: Post,
        translation: Option<(String, PostTranslation)>,
    ) -> anyhow::Result<()> {
        let mut stored = self
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| anyhow!("post {} does not exist", post.id))?;
        stored.base = post;
        if let Some((language, values)) = translation {
            stored.translations.entry(language).or_default().merge(&values);
        }
        Ok(())
    }

    async fn read_translations(&self, id: Uuid) -> anyhow::Result<BTreeMap<String, PostTranslation>> {
        let stored = self
            .posts
            .get(&id)
            .ok_or_else(|| anyhow!("post {} does not exist", id))?;
        Ok(stored.translations.clone())
    }

    async fn read_slugs(
        &self,
        id: Uuid,
        languages: Vec<String>,
    ) -> anyhow::Result<BTreeMap<String, String>> {
        let stored = self
            .posts
            .get(&id)
            .ok_or_else(|| anyhow!("post {} does not exist", id))?;
        Ok(languages
            .into_iter()
            .map(|code| {
                let slug = stored.read(Some(&code)).slug;
                (code, slug)
            })
            .collect())
    }

    async fn list_posts(
        &self,
        website_id: Uuid,
        language: Option<String>,
    ) -> anyhow::Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| entry.base.website_id == website_id)
            .map(|entry| entry.read(language.as_deref()))
            .collect();
        posts.sort_by(post_listing_order);
        debug!(%website_id, count = posts.len(), "listed posts");
        Ok(posts)
    }
}

#[async_trait]
impl CommentRepo for InMemoryBlogStore {
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        if !self.posts.contains_key(&comment.post_id) {
            return Err(anyhow!("post {} does not exist", comment.post_id));
        }
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn update_comment(&self, comment: Comment) -> anyhow::Result<()> {
        let mut stored = self
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| anyhow!("comment {} does not exist", comment.id))?;
        *stored = comment;
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid, include_hidden: bool) -> anyhow::Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && (include_hidden || c.active))
            .map(|c| c.clone())
            .collect();
        comments.sort_by(comment_listing_order);
        Ok(comments)
    }
}

#[async_trait]
impl AttachmentRepo for InMemoryBlogStore {
    async fn create_attachment(&self, attachment: Attachment) -> anyhow::Result<()> {
        if !self.posts.contains_key(&attachment.post_id) {
            return Err(anyhow!("post {} does not exist", attachment.post_id));
        }
        self.attachments.insert(attachment.id, attachment);
        Ok(())
    }

    async fn list_attachments(&self, post_id: Uuid) -> anyhow::Result<Vec<Attachment>> {
        let mut attachments: Vec<Attachment> = self
            .attachments
            .iter()
            .filter(|a| a.post_id == post_id)
            .map(|a| a.clone())
            .collect();
        attachments.sort_by(attachment_listing_order);
        Ok(attachments)
    }
}

#[async_trait]
impl LanguageRegistry for InMemoryBlogStore {
    async fn translatable_languages(&self) -> anyhow::Result<Vec<Language>> {
        let languages = self.languages.read().unwrap_or_else(|e| e.into_inner());
        Ok(languages
            .iter()
            .filter(|l| l.active && l.translatable)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WebsiteRegistry for InMemoryBlogStore {
    async fn get_website(&self, id: Uuid) -> anyhow::Result<Option<Website>> {
        Ok(self.websites.get(&id).map(|w| w.clone()))
    }

    async fn active_websites(&self) -> anyhow::Result<Vec<Website>> {
        let mut websites: Vec<Website> = self
            .websites
            .iter()
            .filter(|w| w.active)
            .map(|w| w.clone())
            .collect();
        websites.sort_by_key(|w| w.id);
        Ok(websites)
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryBlogStore {
    async fn site_configuration(&self) -> anyhow::Result<SiteConfiguration> {
        Ok(*self.configuration.read().unwrap_or_else(|e| e.into_inner()))
    }
}

//! # PostService
//!
//! Defaults, lifecycle hooks (create, write, copy, delete), the computed
//! getters (`slug_langs`, `uri`, `total_comments`, `thumb`) and the gallery
//! for blog posts.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use gb_core::context::RequestContext;
use gb_core::error::{BlogError, Result};
use gb_core::models::{
    Attachment, NewAttachment, NewPost, Post, PostTranslation, PostUpdate, ViewerTier, Website,
    DEFAULT_TEMPLATE,
};
use gb_core::slug;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::BlogState;

pub struct PostService {
    state: Arc<BlogState>,
}

impl PostService {
    pub fn new(state: Arc<BlogState>) -> Self {
        Self { state }
    }

    /// The website a new post lands on when none is given: the only active
    /// one, if there is exactly one.
    async fn sole_active_website(&self) -> Result<Option<Website>> {
        let mut websites = self.state.websites.active_websites().await?;
        if websites.len() == 1 {
            Ok(websites.pop())
        } else {
            Ok(None)
        }
    }

    async fn active_website(&self, id: Uuid) -> Result<Website> {
        match self.state.websites.get_website(id).await? {
            Some(website) if website.active => Ok(website),
            Some(website) => Err(BlogError::ValidationError(format!(
                "website \"{}\" is not active",
                website.name
            ))),
            None => Err(BlogError::NotFound("Website".into(), id.to_string())),
        }
    }

    /// Values an empty post form starts with.
    pub async fn default_post(&self) -> Result<NewPost> {
        let website = self.sole_active_website().await?;
        Ok(NewPost {
            template: Some(DEFAULT_TEMPLATE.to_string()),
            active: Some(true),
            visibility: Some(Default::default()),
            website_id: website.as_ref().map(|w| w.id),
            user_id: website.as_ref().and_then(|w| w.anonymous_user_id),
            published_date: Some(Utc::now()),
            gallery: Some(true),
            comment: Some(true),
            ..Default::default()
        })
    }

    pub async fn get(&self, id: Uuid, ctx: &RequestContext) -> Result<Post> {
        self.state
            .posts
            .get_post(id, ctx.language.clone())
            .await?
            .ok_or_else(|| BlogError::NotFound("Post".into(), id.to_string()))
    }

    pub async fn create(&self, values: NewPost, ctx: &RequestContext) -> Result<Post> {
        let defaults = self.default_post().await?;

        let name = values.name.trim().to_string();
        if name.is_empty() {
            return Err(BlogError::ValidationError("a post needs a title".into()));
        }
        if values.description.trim().is_empty() {
            return Err(BlogError::ValidationError("a post needs a description".into()));
        }

        let slug = match values.slug.as_deref() {
            Some(given) if !given.is_empty() => slug::normalize(given),
            _ => slug::normalize(&name),
        };
        if slug.is_empty() {
            return Err(BlogError::ValidationError(format!(
                "\"{}\" does not produce a usable slug",
                name
            )));
        }

        let website_id = values
            .website_id
            .or(defaults.website_id)
            .ok_or_else(|| BlogError::ValidationError("a post needs a website".into()))?;
        self.active_website(website_id).await?;

        let user_id = values
            .user_id
            .or(defaults.user_id)
            .ok_or_else(|| BlogError::ValidationError("a post needs a user".into()))?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            name,
            slug,
            description: values.description,
            long_description: values.long_description,
            metadescription: values.metadescription,
            metakeywords: values.metakeywords,
            metatitle: values.metatitle,
            template: values
                .template
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            active: values.active.unwrap_or(true),
            visibility: values.visibility.unwrap_or_default(),
            website_id,
            published_date: values.published_date.unwrap_or(now),
            create_date: Some(now),
            write_date: None,
            user_id,
            gallery: values.gallery.unwrap_or(true),
            comment: values.comment.unwrap_or(true),
            thumb_filename: None,
        };

        let translations: BTreeMap<String, PostTranslation> = ctx
            .translation_language(&self.state.default_language)
            .map(|language| (language.to_string(), post.translation()))
            .into_iter()
            .collect();
        self.state.posts.create_post(post.clone(), translations).await?;

        info!(post_id = %post.id, slug = %post.slug, "blog post created");
        Ok(post)
    }

    /// Applies `update` under the context language. `write_date` is always
    /// the server's clock, whatever the caller sent.
    pub async fn write(&self, id: Uuid, update: PostUpdate, ctx: &RequestContext) -> Result<Post> {
        self.write_values(id, update, None, ctx).await
    }

    /// `write` plus the thumbnail name, which only `set_thumb` may change.
    async fn write_values(
        &self,
        id: Uuid,
        update: PostUpdate,
        thumb_filename: Option<String>,
        ctx: &RequestContext,
    ) -> Result<Post> {
        let mut post = self
            .state
            .posts
            .get_post(id, None)
            .await?
            .ok_or_else(|| BlogError::NotFound("Post".into(), id.to_string()))?;

        let mut translatable = update.translatable();
        if let Some(given) = translatable.slug.take() {
            let normalized = slug::normalize(&given);
            if normalized.is_empty() {
                return Err(BlogError::ValidationError(format!(
                    "\"{}\" does not produce a usable slug",
                    given
                )));
            }
            translatable.slug = Some(normalized);
        }
        if matches!(translatable.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(BlogError::ValidationError("a post needs a title".into()));
        }
        if matches!(translatable.description.as_deref(), Some(d) if d.trim().is_empty()) {
            return Err(BlogError::ValidationError("a post needs a description".into()));
        }

        if let Some(website_id) = update.website_id {
            self.active_website(website_id).await?;
            post.website_id = website_id;
        }
        if let Some(template) = update.template {
            post.template = template;
        }
        if let Some(active) = update.active {
            post.active = active;
        }
        if let Some(visibility) = update.visibility {
            post.visibility = visibility;
        }
        if let Some(published_date) = update.published_date {
            post.published_date = published_date;
        }
        if let Some(user_id) = update.user_id {
            post.user_id = user_id;
        }
        if let Some(gallery) = update.gallery {
            post.gallery = gallery;
        }
        if let Some(comment) = update.comment {
            post.comment = comment;
        }
        if thumb_filename.is_some() {
            post.thumb_filename = thumb_filename;
        }
        post.write_date = Some(Utc::now());

        let translation_language = ctx.translation_language(&self.state.default_language);
        if translation_language.is_none() {
            translatable.apply(&mut post);
        }

        let translation = translation_language
            .filter(|_| translatable != PostTranslation::default())
            .map(|language| (language.to_string(), translatable));
        self.state.posts.update_post(post, translation).await?;
        self.state.slug_cache.invalidate(id);

        debug!(post_id = %id, language = ctx.locale(), "blog post written");
        self.get(id, ctx).await
    }

    /// Soft delete.
    pub async fn deactivate(&self, id: Uuid, ctx: &RequestContext) -> Result<Post> {
        let update = PostUpdate {
            active: Some(false),
            ..Default::default()
        };
        self.write(id, update, ctx).await
    }

    /// Posts are never removed; callers must deactivate them instead.
    pub async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        warn!(count = ids.len(), "refused to delete blog posts");
        Err(BlogError::DeletionForbidden)
    }

    /// Duplicates a post under a `-copy` slug. Every translation comes along,
    /// its own slug suffixed the same way. Timestamps are stamped again as for
    /// a fresh post; comments and attachments stay with the original.
    pub async fn copy(&self, id: Uuid) -> Result<Post> {
        let original = self
            .state
            .posts
            .get_post(id, None)
            .await?
            .ok_or_else(|| BlogError::NotFound("Post".into(), id.to_string()))?;
        let mut translations = self.state.posts.read_translations(id).await?;
        for translation in translations.values_mut() {
            translation.slug = translation.slug.as_deref().map(slug::copy_of);
        }

        let mut copy = original.clone();
        copy.id = Uuid::now_v7();
        copy.slug = slug::copy_of(&original.slug);
        copy.create_date = Some(Utc::now());
        copy.write_date = None;
        self.state
            .posts
            .create_post(copy.clone(), translations)
            .await?;

        info!(from = %original.id, post_id = %copy.id, slug = %copy.slug, "blog post copied");
        Ok(copy)
    }

    /// Active posts of a website the viewer is allowed to see.
    pub async fn list_visible(
        &self,
        website_id: Uuid,
        viewer: ViewerTier,
        ctx: &RequestContext,
    ) -> Result<Vec<Post>> {
        let posts = self
            .state
            .posts
            .list_posts(website_id, ctx.language.clone())
            .await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.is_visible_to(viewer))
            .collect())
    }

    /// Slug of the post in every active, translatable language.
    pub async fn slug_langs(&self, id: Uuid) -> Result<BTreeMap<String, String>> {
        if let Some(cached) = self.state.slug_cache.get(id) {
            debug!(post_id = %id, "slug_langs cache hit");
            return Ok(cached);
        }
        let ticket = self.state.slug_cache.ticket(id);

        let codes: Vec<String> = self
            .state
            .languages
            .translatable_languages()
            .await?
            .into_iter()
            .filter(|lang| lang.active && lang.translatable)
            .map(|lang| lang.code)
            .collect();

        let slugs = if codes.is_empty() {
            BTreeMap::new()
        } else {
            self.state.posts.read_slugs(id, codes).await?
        };

        self.state.slug_cache.fill(id, ticket, slugs.clone());
        Ok(slugs)
    }

    /// `<website uri><lang>/blog/<slug>`, or an empty string when the post's
    /// website is unknown.
    pub async fn uri(&self, post: &Post, ctx: &RequestContext) -> Result<String> {
        let Some(website) = self.state.websites.get_website(post.website_id).await? else {
            return Ok(String::new());
        };
        Ok(format!(
            "{}{}/blog/{}",
            website.uri,
            ctx.lang_prefix(),
            post.slug
        ))
    }

    /// Number of visible comments.
    pub async fn total_comments(&self, id: Uuid) -> Result<usize> {
        Ok(self.state.comments.list_comments(id, false).await?.len())
    }

    /// Thumbnail bytes; a missing file reads as no thumbnail.
    pub async fn thumb(&self, post: &Post) -> Option<Vec<u8>> {
        let name = post.thumb_filename.clone()?;
        self.state.thumbnails.load_thumbnail(name).await
    }

    /// Stores an uploaded thumbnail and records its file name on the post.
    /// Without data nothing changes.
    pub async fn set_thumb(
        &self,
        id: Uuid,
        file_name: &str,
        data: Option<Vec<u8>>,
    ) -> Result<Post> {
        let ctx = RequestContext::default();
        let Some(data) = data else {
            return self.get(id, &ctx).await;
        };

        let config = self.state.configuration.site_configuration().await?;
        let stored = self
            .state
            .thumbnails
            .save_thumbnail(file_name.to_string(), data, config)
            .await?;

        info!(post_id = %id, thumb = %stored, "blog post thumbnail stored");
        self.write_values(id, PostUpdate::default(), Some(stored), &ctx)
            .await
    }

    /// Attaches a file to the post's gallery.
    pub async fn attach(&self, values: NewAttachment) -> Result<Attachment> {
        if values.name.trim().is_empty() || values.link.trim().is_empty() {
            return Err(BlogError::ValidationError(
                "an attachment needs a name and a link".into(),
            ));
        }
        let post = self.get(values.post_id, &RequestContext::default()).await?;

        let attachment = Attachment {
            id: Uuid::now_v7(),
            post_id: post.id,
            name: values.name,
            link: values.link,
            create_date: Some(Utc::now()),
        };
        self.state
            .attachments
            .create_attachment(attachment.clone())
            .await?;
        debug!(post_id = %post.id, attachment_id = %attachment.id, "attachment added");
        Ok(attachment)
    }

    /// Attachments shown in the post's gallery; none while the gallery is
    /// switched off.
    pub async fn gallery(&self, post: &Post) -> Result<Vec<Attachment>> {
        if !post.gallery {
            return Ok(Vec::new());
        }
        Ok(self.state.attachments.list_attachments(post.id).await?)
    }
}

//! # Domain Models
//!
//! These structs represent the blog entities and the website/configuration
//! records they hang off. Translatable text on `Post` holds the value for the
//! language the record was read under; storage of the other languages is the
//! repository's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BlogError, Result};
use crate::media::ImageKind;

pub const DEFAULT_TEMPLATE: &str = "blog-post.html";
pub const DEFAULT_THUMB_SIZE: u32 = 300;

/// Which viewer tier may see a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Register,
    Manager,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Register => "register",
            Visibility::Manager => "manager",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "public" => Ok(Visibility::Public),
            "register" => Ok(Visibility::Register),
            "manager" => Ok(Visibility::Manager),
            other => Err(BlogError::ValidationError(format!(
                "unknown visibility \"{}\"",
                other
            ))),
        }
    }
}

/// The tier of whoever is looking at the website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerTier {
    Anonymous,
    Registered,
    Manager,
}

impl ViewerTier {
    pub fn can_see(&self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Register => *self >= ViewerTier::Registered,
            Visibility::Manager => *self == ViewerTier::Manager,
        }
    }
}

/// A blog post, as read under one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Title (translatable)
    pub name: String,
    /// Canonical URL segment (translatable), always normalized
    pub slug: String,
    /// Body, wiki markup (translatable)
    pub description: String,
    pub long_description: Option<String>,
    /// Search engines want this under 155 characters of plain text
    pub metadescription: Option<String>,
    /// Comma separated
    pub metakeywords: Option<String>,
    pub metatitle: Option<String>,
    pub template: String,
    /// Soft-delete flag. Posts are never removed.
    pub active: bool,
    pub visibility: Visibility,
    pub website_id: Uuid,
    pub published_date: DateTime<Utc>,
    /// Server-set on create
    pub create_date: Option<DateTime<Utc>>,
    /// Server-set on every write
    pub write_date: Option<DateTime<Utc>>,
    pub user_id: Uuid,
    /// Gallery attachments enabled
    pub gallery: bool,
    /// Comments enabled
    pub comment: bool,
    /// `<hash>.<ext>` of the stored thumbnail
    pub thumb_filename: Option<String>,
}

impl Post {
    /// Whether the post shows up for the given viewer at all.
    pub fn is_visible_to(&self, viewer: ViewerTier) -> bool {
        self.active && viewer.can_see(self.visibility)
    }

    /// Sharded location of the thumbnail relative to the store root.
    pub fn thumb_path(&self) -> Option<String> {
        self.thumb_filename.as_deref().and_then(sharded_path)
    }

    pub fn translation(&self) -> PostTranslation {
        PostTranslation {
            name: Some(self.name.clone()),
            slug: Some(self.slug.clone()),
            description: Some(self.description.clone()),
            long_description: self.long_description.clone(),
            metadescription: self.metadescription.clone(),
            metakeywords: self.metakeywords.clone(),
            metatitle: self.metatitle.clone(),
        }
    }
}

/// Listing order: newest publication first, then title.
pub fn post_listing_order(a: &Post, b: &Post) -> std::cmp::Ordering {
    b.published_date
        .cmp(&a.published_date)
        .then_with(|| a.name.cmp(&b.name))
}

/// Length of a stored thumbnail's hash part: hex SHA-256.
pub const THUMB_HASH_LEN: usize = 64;

/// `ab/cd/abcd....ext` for a content-addressed file name. Only names of the
/// form `<64 lowercase hex>.<jpeg|png|gif>` have one; anything else, such as
/// a path or a non-ASCII name, yields `None`.
pub fn sharded_path(file_name: &str) -> Option<String> {
    let (hash, extension) = file_name.split_once('.')?;
    let is_hash = hash.len() == THUMB_HASH_LEN
        && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !is_hash || ImageKind::from_extension(extension).is_none() {
        return None;
    }
    Some(format!("{}/{}/{}", &hash[0..2], &hash[2..4], file_name))
}

/// The translatable part of a post for one language. `None` means "not
/// translated", which reads back as the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostTranslation {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub metadescription: Option<String>,
    pub metakeywords: Option<String>,
    pub metatitle: Option<String>,
}

impl PostTranslation {
    /// Overlay translated values onto a post read in the base language.
    pub fn apply(&self, post: &mut Post) {
        if let Some(name) = &self.name {
            post.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            post.description = description.clone();
        }
        if self.long_description.is_some() {
            post.long_description = self.long_description.clone();
        }
        if self.metadescription.is_some() {
            post.metadescription = self.metadescription.clone();
        }
        if self.metakeywords.is_some() {
            post.metakeywords = self.metakeywords.clone();
        }
        if self.metatitle.is_some() {
            post.metatitle = self.metatitle.clone();
        }
    }

    /// Later values win.
    pub fn merge(&mut self, other: &PostTranslation) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(name, slug, description, long_description, metadescription, metakeywords, metatitle);
    }
}

/// Values submitted when creating a post. Anything left `None` gets its
/// default; timestamps other than `published_date` are never taken from here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
    pub long_description: Option<String>,
    pub metadescription: Option<String>,
    pub metakeywords: Option<String>,
    pub metatitle: Option<String>,
    pub template: Option<String>,
    pub active: Option<bool>,
    pub visibility: Option<Visibility>,
    pub website_id: Option<Uuid>,
    pub published_date: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub gallery: Option<bool>,
    pub comment: Option<bool>,
}

/// A partial write. `write_date` is accepted only to be overwritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub metadescription: Option<String>,
    pub metakeywords: Option<String>,
    pub metatitle: Option<String>,
    pub template: Option<String>,
    pub active: Option<bool>,
    pub visibility: Option<Visibility>,
    pub website_id: Option<Uuid>,
    pub published_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub gallery: Option<bool>,
    pub comment: Option<bool>,
}

impl PostUpdate {
    pub fn translatable(&self) -> PostTranslation {
        PostTranslation {
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            long_description: self.long_description.clone(),
            metadescription: self.metadescription.clone(),
            metakeywords: self.metakeywords.clone(),
            metatitle: self.metatitle.clone(),
        }
    }
}

/// A moderated reply to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    /// Hidden comments stay stored
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
}

/// Listing order: newest first, ties broken by id descending.
pub fn comment_listing_order(a: &Comment, b: &Comment) -> std::cmp::Ordering {
    b.create_date
        .cmp(&a.create_date)
        .then_with(|| b.id.cmp(&a.id))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Option<Uuid>,
    pub description: String,
    pub active: Option<bool>,
}

/// A file attached to a post. The post's gallery shows these while its
/// `gallery` flag is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub name: String,
    /// Where the file is served from
    pub link: String,
    pub create_date: Option<DateTime<Utc>>,
}

/// Gallery order: by name, ties broken by id.
pub fn attachment_listing_order(a: &Attachment, b: &Attachment) -> std::cmp::Ordering {
    a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAttachment {
    pub post_id: Uuid,
    pub name: String,
    pub link: String,
}

/// A site the blog is published on, with its blog-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    pub id: Uuid,
    pub name: String,
    /// Base URI, including the trailing slash
    pub uri: String,
    pub active: bool,
    pub comment_enabled: bool,
    pub anonymous_comments_enabled: bool,
    pub anonymous_user_id: Option<Uuid>,
}

impl Website {
    pub fn validate(&self) -> Result<()> {
        if self.anonymous_comments_enabled && self.anonymous_user_id.is_none() {
            return Err(BlogError::ValidationError(format!(
                "website \"{}\" enables anonymous comments without an anonymous user",
                self.name
            )));
        }
        Ok(())
    }
}

/// The blog's slice of the site-wide configuration singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfiguration {
    /// Width and height of thumbnails, in pixels
    pub thumb_size: u32,
    pub thumb_crop: bool,
}

impl Default for SiteConfiguration {
    fn default() -> Self {
        Self {
            thumb_size: DEFAULT_THUMB_SIZE,
            thumb_crop: false,
        }
    }
}

impl SiteConfiguration {
    /// A stored zero means the size was never set.
    pub fn effective_thumb_size(&self) -> u32 {
        if self.thumb_size == 0 {
            DEFAULT_THUMB_SIZE
        } else {
            self.thumb_size
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Locale code, e.g. `es_ES`
    pub code: String,
    pub name: String,
    pub active: bool,
    pub translatable: bool,
}

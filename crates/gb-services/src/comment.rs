//! # CommentService
//!
//! Moderated replies to blog posts.

use std::sync::Arc;

use chrono::Utc;
use gb_core::error::{BlogError, Result};
use gb_core::models::{Comment, NewComment, Post, Website};
use tracing::info;
use uuid::Uuid;

use crate::state::BlogState;

pub struct CommentService {
    state: Arc<BlogState>,
}

impl CommentService {
    pub fn new(state: Arc<BlogState>) -> Self {
        Self { state }
    }

    async fn post_and_website(&self, post_id: Uuid) -> Result<(Post, Option<Website>)> {
        let post = self
            .state
            .posts
            .get_post(post_id, None)
            .await?
            .ok_or_else(|| BlogError::NotFound("Post".into(), post_id.to_string()))?;
        let website = self.state.websites.get_website(post.website_id).await?;
        Ok((post, website))
    }

    fn anonymous_user(website: Option<&Website>) -> Option<Uuid> {
        website
            .filter(|w| w.anonymous_comments_enabled)
            .and_then(|w| w.anonymous_user_id)
    }

    /// Values an empty comment form on `post_id` starts with.
    pub async fn default_comment(&self, post_id: Uuid) -> Result<NewComment> {
        let (_, website) = self.post_and_website(post_id).await?;
        Ok(NewComment {
            post_id,
            user_id: Self::anonymous_user(website.as_ref()),
            description: String::new(),
            active: Some(true),
        })
    }

    pub async fn create(&self, values: NewComment) -> Result<Comment> {
        let (post, website) = self.post_and_website(values.post_id).await?;

        if !post.comment {
            return Err(BlogError::ValidationError(
                "comments are disabled for this post".into(),
            ));
        }
        if !website.as_ref().map(|w| w.comment_enabled).unwrap_or(false) {
            return Err(BlogError::ValidationError(
                "comments are disabled on this website".into(),
            ));
        }
        if values.description.trim().is_empty() {
            return Err(BlogError::ValidationError("a comment needs a text".into()));
        }

        let user_id = values
            .user_id
            .or_else(|| Self::anonymous_user(website.as_ref()))
            .ok_or_else(|| BlogError::ValidationError("a user is required to comment".into()))?;

        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: post.id,
            user_id,
            description: values.description,
            active: values.active.unwrap_or(true),
            create_date: Some(Utc::now()),
        };
        self.state.comments.create_comment(comment.clone()).await?;

        info!(comment_id = %comment.id, post_id = %post.id, "blog comment created");
        Ok(comment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Comment> {
        self.state
            .comments
            .get_comment(id)
            .await?
            .ok_or_else(|| BlogError::NotFound("Comment".into(), id.to_string()))
    }

    /// Show or hide a comment. Hidden comments are kept.
    pub async fn moderate(&self, id: Uuid, active: bool) -> Result<Comment> {
        let mut comment = self.get(id).await?;
        comment.active = active;
        self.state.comments.update_comment(comment.clone()).await?;
        info!(comment_id = %id, active, "blog comment moderated");
        Ok(comment)
    }

    pub async fn list(&self, post_id: Uuid, include_hidden: bool) -> Result<Vec<Comment>> {
        Ok(self
            .state
            .comments
            .list_comments(post_id, include_hidden)
            .await?)
    }

    /// Duplicate with a fresh creation date.
    pub async fn copy(&self, id: Uuid) -> Result<Comment> {
        let mut comment = self.get(id).await?;
        comment.id = Uuid::now_v7();
        comment.create_date = Some(Utc::now());
        self.state.comments.create_comment(comment.clone()).await?;
        Ok(comment)
    }
}

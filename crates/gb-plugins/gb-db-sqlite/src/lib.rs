//! # gb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `gb-core` domain models. Translatable post fields live in
//! `post_translations`, one row per (post, language), and fall back to the
//! base columns of `posts` when a language has no value.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use gb_core::models::{
    Attachment, Comment, Language, Post, PostTranslation, SiteConfiguration, Visibility, Website,
};
use gb_core::traits::{
    AttachmentRepo, CommentRepo, ConfigurationStore, LanguageRegistry, PostRepo, WebsiteRegistry,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS websites (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL,
    uri TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    comment_enabled INTEGER NOT NULL DEFAULT 0,
    anonymous_comments_enabled INTEGER NOT NULL DEFAULT 0,
    anonymous_user_id BLOB
);
CREATE TABLE IF NOT EXISTS languages (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    translatable INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS site_configuration (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    thumb_size INTEGER NOT NULL DEFAULT 300,
    thumb_crop INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS posts (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT NOT NULL,
    long_description TEXT,
    metadescription TEXT,
    metakeywords TEXT,
    metatitle TEXT,
    template TEXT NOT NULL,
    active INTEGER NOT NULL,
    visibility TEXT NOT NULL,
    website_id BLOB NOT NULL REFERENCES websites(id),
    published_date TEXT NOT NULL,
    create_date TEXT,
    write_date TEXT,
    user_id BLOB NOT NULL,
    gallery INTEGER NOT NULL,
    comment INTEGER NOT NULL,
    thumb_filename TEXT
);
CREATE INDEX IF NOT EXISTS posts_website ON posts (website_id, published_date);
CREATE TABLE IF NOT EXISTS post_translations (
    post_id BLOB NOT NULL REFERENCES posts(id),
    language TEXT NOT NULL,
    name TEXT,
    slug TEXT,
    description TEXT,
    long_description TEXT,
    metadescription TEXT,
    metakeywords TEXT,
    metatitle TEXT,
    PRIMARY KEY (post_id, language)
);
CREATE TABLE IF NOT EXISTS comments (
    id BLOB PRIMARY KEY,
    post_id BLOB NOT NULL REFERENCES posts(id),
    user_id BLOB NOT NULL,
    description TEXT NOT NULL,
    active INTEGER NOT NULL,
    create_date TEXT
);
CREATE INDEX IF NOT EXISTS comments_post ON comments (post_id);
CREATE TABLE IF NOT EXISTS attachments (
    id BLOB PRIMARY KEY,
    post_id BLOB NOT NULL REFERENCES posts(id),
    name TEXT NOT NULL,
    link TEXT NOT NULL,
    create_date TEXT
);
CREATE INDEX IF NOT EXISTS attachments_post ON attachments (post_id);
"#;

/// Post columns with translatable ones resolved against `t`.
const POST_SELECT: &str = r#"
SELECT p.id, p.template, p.active, p.visibility, p.website_id, p.published_date,
       p.create_date, p.write_date, p.user_id, p.gallery, p.comment, p.thumb_filename,
       COALESCE(t.name, p.name) AS name,
       COALESCE(t.slug, p.slug) AS slug,
       COALESCE(t.description, p.description) AS description,
       COALESCE(t.long_description, p.long_description) AS long_description,
       COALESCE(t.metadescription, p.metadescription) AS metadescription,
       COALESCE(t.metakeywords, p.metakeywords) AS metakeywords,
       COALESCE(t.metatitle, p.metatitle) AS metatitle
FROM posts p
LEFT JOIN post_translations t ON t.post_id = p.id AND t.language = ?
"#;

pub struct SqliteBlogRepo {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

fn post_from_row(row: &SqliteRow) -> anyhow::Result<Post> {
    Ok(Post {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice())?,
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        long_description: row.get("long_description"),
        metadescription: row.get("metadescription"),
        metakeywords: row.get("metakeywords"),
        metatitle: row.get("metatitle"),
        template: row.get("template"),
        active: row.get("active"),
        visibility: Visibility::parse(&row.get::<String, _>("visibility"))?,
        website_id: blob_to_uuid(row.get::<Vec<u8>, _>("website_id").as_slice())?,
        published_date: row.get("published_date"),
        create_date: row.get("create_date"),
        write_date: row.get("write_date"),
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice())?,
        gallery: row.get("gallery"),
        comment: row.get("comment"),
        thumb_filename: row.get("thumb_filename"),
    })
}

fn comment_from_row(row: &SqliteRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice())?,
        post_id: blob_to_uuid(row.get::<Vec<u8>, _>("post_id").as_slice())?,
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice())?,
        description: row.get("description"),
        active: row.get("active"),
        create_date: row.get("create_date"),
    })
}

fn website_from_row(row: &SqliteRow) -> anyhow::Result<Website> {
    Ok(Website {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice())?,
        name: row.get("name"),
        uri: row.get("uri"),
        active: row.get("active"),
        comment_enabled: row.get("comment_enabled"),
        anonymous_comments_enabled: row.get("anonymous_comments_enabled"),
        anonymous_user_id: row
            .get::<Option<Vec<u8>>, _>("anonymous_user_id")
            .map(|blob| blob_to_uuid(&blob))
            .transpose()?,
    })
}

fn attachment_from_row(row: &SqliteRow) -> anyhow::Result<Attachment> {
    Ok(Attachment {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice())?,
        post_id: blob_to_uuid(row.get::<Vec<u8>, _>("post_id").as_slice())?,
        name: row.get("name"),
        link: row.get("link"),
        create_date: row.get("create_date"),
    })
}

fn translation_from_row(row: &SqliteRow) -> PostTranslation {
    PostTranslation {
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        long_description: row.get("long_description"),
        metadescription: row.get("metadescription"),
        metakeywords: row.get("metakeywords"),
        metatitle: row.get("metatitle"),
    }
}

/// Merges `translation` into the (post, language) row; `NULL` keeps what is
/// stored.
async fn upsert_translation(
    conn: &mut SqliteConnection,
    id: Uuid,
    language: String,
    translation: PostTranslation,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO post_translations (post_id, language, name, slug, description, long_description,
            metadescription, metakeywords, metatitle)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(post_id, language) DO UPDATE SET
            name = COALESCE(excluded.name, post_translations.name),
            slug = COALESCE(excluded.slug, post_translations.slug),
            description = COALESCE(excluded.description, post_translations.description),
            long_description = COALESCE(excluded.long_description, post_translations.long_description),
            metadescription = COALESCE(excluded.metadescription, post_translations.metadescription),
            metakeywords = COALESCE(excluded.metakeywords, post_translations.metakeywords),
            metatitle = COALESCE(excluded.metatitle, post_translations.metatitle)",
    )
    .bind(uuid_to_blob(id))
    .bind(language)
    .bind(translation.name)
    .bind(translation.slug)
    .bind(translation.description)
    .bind(translation.long_description)
    .bind(translation.metadescription)
    .bind(translation.metakeywords)
    .bind(translation.metatitle)
    .execute(conn)
    .await?;
    Ok(())
}

impl SqliteBlogRepo {
    /// Connects and creates the schema if needed. `sqlite::memory:` gives a
    /// private database that lives as long as the repo.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") {
            // Every connection would get its own empty database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("blog schema ready");
        Ok(())
    }

    pub async fn save_website(&self, website: Website) -> anyhow::Result<()> {
        website.validate()?;
        sqlx::query(
            "INSERT INTO websites (id, name, uri, active, comment_enabled, anonymous_comments_enabled, anonymous_user_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, uri = excluded.uri, active = excluded.active,
                comment_enabled = excluded.comment_enabled,
                anonymous_comments_enabled = excluded.anonymous_comments_enabled,
                anonymous_user_id = excluded.anonymous_user_id",
        )
        .bind(uuid_to_blob(website.id))
        .bind(website.name)
        .bind(website.uri)
        .bind(website.active)
        .bind(website.comment_enabled)
        .bind(website.anonymous_comments_enabled)
        .bind(website.anonymous_user_id.map(uuid_to_blob))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_language(&self, language: Language) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO languages (code, name, active, translatable) VALUES (?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET name = excluded.name, active = excluded.active,
                translatable = excluded.translatable",
        )
        .bind(language.code)
        .bind(language.name)
        .bind(language.active)
        .bind(language.translatable)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_configuration(&self, configuration: SiteConfiguration) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO site_configuration (id, thumb_size, thumb_crop) VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET thumb_size = excluded.thumb_size, thumb_crop = excluded.thumb_crop",
        )
        .bind(configuration.thumb_size as i64)
        .bind(configuration.thumb_crop)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PostRepo for SqliteBlogRepo {
    /// Post row and translation rows share one transaction.
    async fn create_post(
        &self,
        post: Post,
        translations: BTreeMap<String, PostTranslation>,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let id = post.id;

        // 1. Insert the post with its base values
        sqlx::query(
            "INSERT INTO posts (id, name, slug, description, long_description, metadescription, metakeywords,
                metatitle, template, active, visibility, website_id, published_date, create_date, write_date,
                user_id, gallery, comment, thumb_filename)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(post.id))
        .bind(post.name)
        .bind(post.slug)
        .bind(post.description)
        .bind(post.long_description)
        .bind(post.metadescription)
        .bind(post.metakeywords)
        .bind(post.metatitle)
        .bind(post.template)
        .bind(post.active)
        .bind(post.visibility.as_str())
        .bind(uuid_to_blob(post.website_id))
        .bind(post.published_date)
        .bind(post.create_date)
        .bind(post.write_date)
        .bind(uuid_to_blob(post.user_id))
        .bind(post.gallery)
        .bind(post.comment)
        .bind(post.thumb_filename)
        .execute(&mut *tx)
        .await?;

        // 2. Insert its translations
        for (language, translation) in translations {
            upsert_translation(&mut *tx, id, language, translation).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid, language: Option<String>) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_SELECT))
            .bind(language)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn update_post(
        &self,
        post: Post,
        translation: Option<(String, PostTranslation)>,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let id = post.id;

        let result = sqlx::query(
            "UPDATE posts SET name = ?, slug = ?, description = ?, long_description = ?, metadescription = ?,
                metakeywords = ?, metatitle = ?, template = ?, active = ?, visibility = ?, website_id = ?,
                published_date = ?, create_date = ?, write_date = ?, user_id = ?, gallery = ?, comment = ?,
                thumb_filename = ?
             WHERE id = ?",
        )
        .bind(post.name)
        .bind(post.slug)
        .bind(post.description)
        .bind(post.long_description)
        .bind(post.metadescription)
        .bind(post.metakeywords)
        .bind(post.metatitle)
        .bind(post.template)
        .bind(post.active)
        .bind(post.visibility.as_str())
        .bind(uuid_to_blob(post.website_id))
        .bind(post.published_date)
        .bind(post.create_date)
        .bind(post.write_date)
        .bind(uuid_to_blob(post.user_id))
        .bind(post.gallery)
        .bind(post.comment)
        .bind(post.thumb_filename)
        .bind(uuid_to_blob(id))
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("post {} does not exist", id);
        }

        if let Some((language, values)) = translation {
            upsert_translation(&mut *tx, id, language, values).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn read_translations(&self, id: Uuid) -> anyhow::Result<BTreeMap<String, PostTranslation>> {
        let exists = sqlx::query("SELECT 1 FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            anyhow::bail!("post {} does not exist", id);
        }

        let rows = sqlx::query("SELECT * FROM post_translations WHERE post_id = ? ORDER BY language")
            .bind(uuid_to_blob(id))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("language"), translation_from_row(row)))
            .collect())
    }

    /// Two queries whatever the number of languages: the base slug and every
    /// translated slug of the post.
    async fn read_slugs(
        &self,
        id: Uuid,
        languages: Vec<String>,
    ) -> anyhow::Result<BTreeMap<String, String>> {
        let base: String = sqlx::query("SELECT slug FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post {} does not exist", id))?
            .get("slug");

        let translated: BTreeMap<String, String> = sqlx::query(
            "SELECT language, slug FROM post_translations WHERE post_id = ? AND slug IS NOT NULL",
        )
        .bind(uuid_to_blob(id))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| (row.get("language"), row.get("slug")))
        .collect();

        Ok(languages
            .into_iter()
            .map(|code| {
                let slug = translated.get(&code).cloned().unwrap_or_else(|| base.clone());
                (code, slug)
            })
            .collect())
    }

    async fn list_posts(
        &self,
        website_id: Uuid,
        language: Option<String>,
    ) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "{} WHERE p.website_id = ? ORDER BY p.published_date DESC, name ASC",
            POST_SELECT
        ))
        .bind(language)
        .bind(uuid_to_blob(website_id))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(post_from_row).collect()
    }
}

#[async_trait]
impl CommentRepo for SqliteBlogRepo {
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO comments (id, post_id, user_id, description, active, create_date) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(comment.id))
            .bind(uuid_to_blob(comment.post_id))
            .bind(uuid_to_blob(comment.user_id))
            .bind(comment.description)
            .bind(comment.active)
            .bind(comment.create_date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn update_comment(&self, comment: Comment) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE comments SET user_id = ?, description = ?, active = ?, create_date = ? WHERE id = ?")
            .bind(uuid_to_blob(comment.user_id))
            .bind(comment.description)
            .bind(comment.active)
            .bind(comment.create_date)
            .bind(uuid_to_blob(comment.id))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("comment {} does not exist", comment.id);
        }
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid, include_hidden: bool) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT * FROM comments WHERE post_id = ? AND (active = 1 OR ?) ORDER BY create_date DESC, id DESC",
        )
        .bind(uuid_to_blob(post_id))
        .bind(include_hidden)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }
}

#[async_trait]
impl AttachmentRepo for SqliteBlogRepo {
    async fn create_attachment(&self, attachment: Attachment) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO attachments (id, post_id, name, link, create_date) VALUES (?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(attachment.id))
            .bind(uuid_to_blob(attachment.post_id))
            .bind(attachment.name)
            .bind(attachment.link)
            .bind(attachment.create_date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_attachments(&self, post_id: Uuid) -> anyhow::Result<Vec<Attachment>> {
        let rows = sqlx::query("SELECT * FROM attachments WHERE post_id = ? ORDER BY name, id")
            .bind(uuid_to_blob(post_id))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(attachment_from_row).collect()
    }
}

#[async_trait]
impl LanguageRegistry for SqliteBlogRepo {
    async fn translatable_languages(&self) -> anyhow::Result<Vec<Language>> {
        let rows = sqlx::query("SELECT * FROM languages WHERE active = 1 AND translatable = 1 ORDER BY code")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Language {
                code: row.get("code"),
                name: row.get("name"),
                active: row.get("active"),
                translatable: row.get("translatable"),
            })
            .collect())
    }
}

#[async_trait]
impl WebsiteRegistry for SqliteBlogRepo {
    async fn get_website(&self, id: Uuid) -> anyhow::Result<Option<Website>> {
        let row = sqlx::query("SELECT * FROM websites WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(website_from_row).transpose()
    }

    async fn active_websites(&self) -> anyhow::Result<Vec<Website>> {
        let rows = sqlx::query("SELECT * FROM websites WHERE active = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(website_from_row).collect()
    }
}

#[async_trait]
impl ConfigurationStore for SqliteBlogRepo {
    /// Falls back to the defaults until the singleton row is written.
    async fn site_configuration(&self) -> anyhow::Result<SiteConfiguration> {
        let row = sqlx::query("SELECT thumb_size, thumb_crop FROM site_configuration WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => SiteConfiguration {
                thumb_size: u32::try_from(row.get::<i64, _>("thumb_size")).unwrap_or(0),
                thumb_crop: row.get("thumb_crop"),
            },
            None => SiteConfiguration::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gb_core::models::DEFAULT_TEMPLATE;

    async fn repo_with_site() -> (SqliteBlogRepo, Website) {
        let repo = SqliteBlogRepo::new("sqlite::memory:").await.unwrap();
        let website = Website {
            id: Uuid::now_v7(),
            name: "main".into(),
            uri: "https://example.com/".into(),
            active: true,
            comment_enabled: true,
            anonymous_comments_enabled: true,
            anonymous_user_id: Some(Uuid::now_v7()),
        };
        repo.save_website(website.clone()).await.unwrap();
        (repo, website)
    }

    fn post(website_id: Uuid, name: &str, slug: &str) -> Post {
        Post {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            description: "OP".into(),
            long_description: None,
            metadescription: Some("meta".into()),
            metakeywords: None,
            metatitle: None,
            template: DEFAULT_TEMPLATE.into(),
            active: true,
            visibility: Visibility::Register,
            website_id,
            published_date: Utc::now(),
            create_date: Some(Utc::now()),
            write_date: None,
            user_id: Uuid::now_v7(),
            gallery: true,
            comment: true,
            thumb_filename: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (repo, website) = repo_with_site().await;
        let p = post(website.id, "Hello", "hello");
        repo.create_post(p.clone(), BTreeMap::new())
            .await
            .expect("Failed to create post");

        let stored = repo.get_post(p.id, None).await.unwrap().unwrap();
        assert_eq!(stored.slug, "hello");
        assert_eq!(stored.visibility, Visibility::Register);
        assert_eq!(stored.metadescription.as_deref(), Some("meta"));
        assert_eq!(stored.website_id, website.id);
        assert!(repo.get_post(Uuid::now_v7(), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_translations_fall_back_to_base() {
        let (repo, website) = repo_with_site().await;
        let p = post(website.id, "Hello", "foo");
        let fu = PostTranslation {
            slug: Some("fu".into()),
            ..Default::default()
        };
        repo.create_post(p.clone(), BTreeMap::from([("es".to_string(), fu)]))
            .await
            .unwrap();
        let hola = PostTranslation {
            name: Some("Hola".into()),
            ..Default::default()
        };
        repo.update_post(p.clone(), Some(("es".into(), hola)))
            .await
            .unwrap();

        let es = repo.get_post(p.id, Some("es".into())).await.unwrap().unwrap();
        assert_eq!((es.name.as_str(), es.slug.as_str()), ("Hola", "fu"));
        assert_eq!(es.metadescription.as_deref(), Some("meta"));

        let slugs = repo
            .read_slugs(p.id, vec!["en".into(), "es".into()])
            .await
            .unwrap();
        assert_eq!(slugs["en"], "foo");
        assert_eq!(slugs["es"], "fu");

        let stored = repo.read_translations(p.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored["es"].name.as_deref(), Some("Hola"));
        assert_eq!(stored["es"].slug.as_deref(), Some("fu"));
        assert_eq!(stored["es"].description, None);
        assert!(repo.read_translations(Uuid::now_v7()).await.is_err());
    }

    async fn count(repo: &SqliteBlogRepo, sql: &str) -> i64 {
        sqlx::query(sql).fetch_one(&repo.pool).await.unwrap().get(0)
    }

    #[tokio::test]
    async fn test_create_is_all_or_nothing() {
        let (repo, website) = repo_with_site().await;
        sqlx::query("DROP TABLE post_translations")
            .execute(&repo.pool)
            .await
            .unwrap();

        let p = post(website.id, "Hello", "hello");
        let es = PostTranslation {
            name: Some("Hola".into()),
            ..Default::default()
        };
        let result = repo
            .create_post(p.clone(), BTreeMap::from([("es".to_string(), es)]))
            .await;
        assert!(result.is_err());
        assert_eq!(count(&repo, "SELECT COUNT(*) FROM posts").await, 0);
    }

    #[tokio::test]
    async fn test_update_is_all_or_nothing() {
        let (repo, website) = repo_with_site().await;
        let mut p = post(website.id, "Hello", "hello");
        repo.create_post(p.clone(), BTreeMap::new()).await.unwrap();
        sqlx::query("DROP TABLE post_translations")
            .execute(&repo.pool)
            .await
            .unwrap();

        p.active = false;
        p.write_date = Some(Utc::now());
        let es = PostTranslation {
            name: Some("Hola".into()),
            ..Default::default()
        };
        assert!(repo.update_post(p.clone(), Some(("es".into(), es))).await.is_err());
        assert_eq!(
            count(&repo, "SELECT COUNT(*) FROM posts WHERE active = 1 AND write_date IS NULL").await,
            1
        );
    }

    #[tokio::test]
    async fn test_update_and_listing_order() {
        let (repo, website) = repo_with_site().await;
        let mut old = post(website.id, "Old", "old");
        old.published_date = Utc::now() - Duration::days(3);
        let new = post(website.id, "New", "new");
        repo.create_post(old.clone(), BTreeMap::new()).await.unwrap();
        repo.create_post(new.clone(), BTreeMap::new()).await.unwrap();

        old.active = false;
        old.write_date = Some(Utc::now());
        repo.update_post(old.clone(), None).await.unwrap();

        let listed = repo.list_posts(website.id, None).await.unwrap();
        assert_eq!(listed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![new.id, old.id]);
        assert!(!listed[1].active);
        assert!(listed[1].write_date.is_some());

        assert!(repo
            .update_post(post(website.id, "Ghost", "ghost"), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_comments_and_registries() {
        let (repo, website) = repo_with_site().await;
        let p = post(website.id, "Hello", "hello");
        repo.create_post(p.clone(), BTreeMap::new()).await.unwrap();

        let mut comment = Comment {
            id: Uuid::now_v7(),
            post_id: p.id,
            user_id: website.anonymous_user_id.unwrap(),
            description: "nice".into(),
            active: true,
            create_date: Some(Utc::now()),
        };
        repo.create_comment(comment.clone()).await.unwrap();
        comment.active = false;
        repo.update_comment(comment.clone()).await.unwrap();

        assert!(repo.list_comments(p.id, false).await.unwrap().is_empty());
        assert_eq!(repo.list_comments(p.id, true).await.unwrap(), vec![comment.clone()]);
        assert_eq!(repo.get_comment(comment.id).await.unwrap(), Some(comment.clone()));

        let mut ghost = comment;
        ghost.id = Uuid::now_v7();
        assert!(repo.update_comment(ghost).await.is_err());

        repo.save_language(Language {
            code: "es_ES".into(),
            name: "Spanish".into(),
            active: true,
            translatable: true,
        })
        .await
        .unwrap();
        repo.save_language(Language {
            code: "fr_FR".into(),
            name: "French".into(),
            active: false,
            translatable: true,
        })
        .await
        .unwrap();
        let codes: Vec<_> = repo
            .translatable_languages()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(codes, vec!["es_ES".to_string()]);

        assert_eq!(repo.active_websites().await.unwrap(), vec![website.clone()]);
        assert_eq!(repo.get_website(website.id).await.unwrap(), Some(website));
    }

    #[tokio::test]
    async fn test_configuration_defaults_then_stored() {
        let repo = SqliteBlogRepo::new("sqlite::memory:").await.unwrap();
        assert_eq!(repo.site_configuration().await.unwrap(), SiteConfiguration::default());

        let config = SiteConfiguration {
            thumb_size: 128,
            thumb_crop: true,
        };
        repo.set_configuration(config).await.unwrap();
        assert_eq!(repo.site_configuration().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_invalid_website_is_rejected() {
        let repo = SqliteBlogRepo::new("sqlite::memory:").await.unwrap();
        let website = Website {
            id: Uuid::now_v7(),
            name: "anon".into(),
            uri: "https://example.com/".into(),
            active: true,
            comment_enabled: true,
            anonymous_comments_enabled: true,
            anonymous_user_id: None,
        };
        assert!(repo.save_website(website).await.is_err());
    }

    #[tokio::test]
    async fn test_attachments_by_post() {
        let (repo, website) = repo_with_site().await;
        let p = post(website.id, "Hello", "hello");
        repo.create_post(p.clone(), BTreeMap::new()).await.unwrap();

        let attachment = |name: &str, post_id: Uuid| Attachment {
            id: Uuid::now_v7(),
            post_id,
            name: name.into(),
            link: format!("/files/{}", name),
            create_date: Some(Utc::now()),
        };
        repo.create_attachment(attachment("z.jpg", p.id)).await.unwrap();
        repo.create_attachment(attachment("a.jpg", p.id)).await.unwrap();
        assert!(repo
            .create_attachment(attachment("orphan.jpg", Uuid::now_v7()))
            .await
            .is_err());

        let names: Vec<_> = repo
            .list_attachments(p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["a.jpg".to_string(), "z.jpg".to_string()]);
    }
}

//! # galatea-blog binary
//!
//! Assembles settings, the SQLite store and the local thumbnail store, then
//! runs one maintenance command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gb_configs::{LogFormat, LogSettings, Settings};
use gb_core::context::RequestContext;
use gb_core::models::{Language, NewPost, Website};
use gb_core::slug;
use gb_core::traits::{PostRepo, WebsiteRegistry};
use gb_db_sqlite::SqliteBlogRepo;
use gb_services::{BlogState, PostService};
use gb_storage_local::LocalThumbnailStore;
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const SEED_TITLE: &str = "Hello World";

/// galatea-blog - blog maintenance commands
#[derive(Debug, Parser)]
#[command(name = "galatea-blog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Defaults to `migrate`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema
    Migrate,

    /// Add a website, two languages and a first post, unless present
    Seed,

    /// Ingest an image as the thumbnail of a post
    Thumb {
        /// Id of the post
        post_id: Uuid,
        /// Image file (jpg, png or gif)
        file: PathBuf,
    },
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn seed(store: &SqliteBlogRepo, posts: &PostService) -> anyhow::Result<()> {
    let website = match store.active_websites().await?.into_iter().next() {
        Some(website) => website,
        None => {
            let website = Website {
                id: Uuid::now_v7(),
                name: "localhost".into(),
                uri: "http://localhost:8000/".into(),
                active: true,
                comment_enabled: true,
                anonymous_comments_enabled: true,
                anonymous_user_id: Some(Uuid::now_v7()),
            };
            store.save_website(website.clone()).await?;
            website
        }
    };
    for (code, name) in [("en", "English"), ("es_ES", "Spanish")] {
        store
            .save_language(Language {
                code: code.into(),
                name: name.into(),
                active: true,
                translatable: true,
            })
            .await?;
    }

    let seed_slug = slug::normalize(SEED_TITLE);
    let existing = store
        .list_posts(website.id, None)
        .await?
        .into_iter()
        .find(|post| post.slug == seed_slug);
    let ctx = RequestContext::default();
    let post = match existing {
        Some(post) => {
            tracing::info!(post_id = %post.id, "seed post already present");
            post
        }
        None => {
            posts
                .create(
                    NewPost {
                        name: SEED_TITLE.into(),
                        description: "The first post of this blog.".into(),
                        website_id: Some(website.id),
                        ..Default::default()
                    },
                    &ctx,
                )
                .await?
        }
    };

    let uri = posts.uri(&post, &ctx).await?;
    let slugs = posts.slug_langs(post.id).await?;
    tracing::info!(post_id = %post.id, %uri, ?slugs, "seeded");
    Ok(())
}

async fn ingest_thumb(posts: &PostService, post_id: Uuid, file: PathBuf) -> anyhow::Result<()> {
    let data = tokio::fs::read(&file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", file.display()))?;

    let post = posts.set_thumb(post_id, file_name, Some(data)).await?;
    tracing::info!(
        post_id = %post.id,
        thumb_path = %post.thumb_path().unwrap_or_default(),
        "thumbnail attached"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    // 1. Initialize Database Implementation
    let store = Arc::new(SqliteBlogRepo::new(settings.database.url.expose_secret()).await?);

    // 2. Initialize Storage Implementation
    let thumbnails = Arc::new(LocalThumbnailStore::for_database(
        &settings.storage.root,
        &settings.storage.database_name,
    ));

    // 3. Wire the services
    let state = Arc::new(BlogState::from_store(
        store.clone(),
        thumbnails,
        settings.i18n.default_language.clone(),
    ));
    let posts = PostService::new(state);

    match cli.command.unwrap_or(Command::Migrate) {
        Command::Migrate => tracing::info!("schema is up to date"),
        Command::Seed => seed(&store, &posts).await?,
        Command::Thumb { post_id, file } => ingest_thumb(&posts, post_id, file).await?,
    }
    Ok(())
}

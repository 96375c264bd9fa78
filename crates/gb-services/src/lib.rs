//! # gb-services
//!
//! Blog behaviour on top of the gb-core ports: defaults, lifecycle hooks,
//! computed getters and the slug_langs cache.

pub mod cache;
pub mod comment;
pub mod post;
pub mod state;

pub use cache::SlugLangsCache;
pub use comment::CommentService;
pub use post::PostService;
pub use state::BlogState;

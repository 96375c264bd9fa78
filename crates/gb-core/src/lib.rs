//! galatea-blog/crates/gb-core/src/lib.rs
//!
//! The blog domain model and interface definitions.

pub mod context;
pub mod error;
pub mod media;
pub mod models;
pub mod slug;
pub mod traits;

// Re-exporting for easier access in other crates
pub use context::*;
pub use error::*;
pub use media::*;
pub use models::*;
pub use traits::*;

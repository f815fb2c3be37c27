//! SQLite knowledge store for sitemind.
//!
//! Provides persistent storage of cached page models, selector statistics,
//! site profiles and saved sessions.

mod schema;
mod store;

pub use store::SqliteKnowledgeStore;

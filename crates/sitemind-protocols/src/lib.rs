//! # sitemind protocols
//!
//! Core protocol definitions for the sitemind learning executor.
//! Holds the page data model, error types and the traits implemented by
//! collaborators; implementations live in other crates.
//!
//! ## Core Traits
//!
//! - [`KnowledgeStore`] - Durable memory of page models, selectors, site profiles and sessions
//! - [`PageDriver`] - Narrow capability set over a live browser session
//! - [`Translator`] - Turns raw page content into a [`PageModel`]
//! - [`Clock`] - Time source, swappable in tests

pub mod driver;
pub mod error;
pub mod knowledge;
pub mod page;
pub mod session;
pub mod translator;
pub mod types;

pub use driver::PageDriver;
pub use error::{DriverError, StoreError, TranslatorError};
pub use knowledge::{KnowledgeStore, SelectorRecord, SiteProfile, StoreStats};
pub use page::{
    ActionDefinition, ActionParam, ExecutionHint, FormDescriptor, FormField, NavLink, PageModel,
    PageType, PageView, ParamType,
};
pub use session::{HistoryEntry, Session};
pub use translator::{Translator, parse_page_model};
pub use types::*;

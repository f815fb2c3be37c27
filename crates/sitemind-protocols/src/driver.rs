//! Page driver protocol.
//!
//! The driver performs navigation, clicking, field filling and content
//! retrieval against live browser contexts. Each driver operation is expected
//! to enforce its own timeout.

use async_trait::async_trait;

use crate::error::DriverError;

/// Narrow capability set over isolated browser sessions.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Create an isolated browser context, optionally restoring exported state.
    async fn create_session(
        &self,
        restore_state: Option<serde_json::Value>,
    ) -> Result<String, DriverError>;

    /// Tear down a browser context.
    async fn destroy_session(&self, session: &str) -> Result<(), DriverError>;

    async fn navigate(&self, session: &str, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self, session: &str) -> Result<String, DriverError>;

    /// Raw page content (text or markup) for the translator.
    async fn page_content(&self, session: &str) -> Result<String, DriverError>;

    async fn accessibility_summary(&self, session: &str) -> Result<String, DriverError>;

    async fn click(&self, session: &str, selector: &str) -> Result<(), DriverError>;

    async fn fill(&self, session: &str, selector: &str, value: &str) -> Result<(), DriverError>;

    /// Whether the page currently shows a CAPTCHA or anti-bot interstitial.
    async fn captcha_detected(&self, session: &str) -> Result<bool, DriverError>;

    /// Export cookies and origin storage as an opaque blob.
    async fn export_state(&self, session: &str) -> Result<serde_json::Value, DriverError>;
}

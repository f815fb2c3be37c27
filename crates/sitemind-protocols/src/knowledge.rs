//! Knowledge store protocol definitions.
//!
//! The knowledge store remembers four independent things: cached page
//! models, selector outcome statistics, per-site profiles and saved sessions.
//! Operations are independent; no cross-entity transaction is required, but
//! selector counters must accumulate atomically under concurrent writers.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::page::{PageModel, PageType};
use crate::session::Session;

/// Cached models expire this long after their last write.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Attempts needed before a selector's ratio is trusted.
pub const MIN_SELECTOR_ATTEMPTS: u32 = 2;

/// Lowest success ratio at which a learned selector is used.
pub const MIN_SELECTOR_CONFIDENCE: f64 = 0.5;

/// Transition notes kept per site.
pub const MAX_PROFILE_NOTES: usize = 20;

/// Core trait for knowledge stores.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Returns the store ID.
    fn id(&self) -> &str;

    /// Fresh cached model for the URL's normalized pattern. Counts a hit.
    async fn get_cached_model(&self, url: &str) -> Result<Option<PageModel>, StoreError>;

    /// Upsert the cached model for the URL, resetting its age.
    async fn cache_model(&self, url: &str, model: &PageModel) -> Result<(), StoreError>;

    /// Drop every cached model of a domain. Returns the number removed.
    async fn invalidate(&self, domain: &str) -> Result<usize, StoreError>;

    /// Accumulate one success or failure. Empty selectors are ignored.
    async fn record_selector_outcome(
        &self,
        domain: &str,
        action: &str,
        selector: &str,
        success: bool,
    ) -> Result<(), StoreError>;

    /// Most reliable proven selector for the action, if it is trusted.
    async fn best_selector(&self, domain: &str, action: &str) -> Result<Option<String>, StoreError>;

    /// Best trusted selector per action qualifier for a domain.
    async fn known_selectors(&self, domain: &str) -> Result<BTreeMap<String, String>, StoreError>;

    /// Count a visit to the domain.
    async fn record_visit(&self, domain: &str) -> Result<(), StoreError>;

    /// Add an observed page type and optionally a transition note.
    async fn update_site_profile(
        &self,
        domain: &str,
        page_type: PageType,
        note: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn site_profile(&self, domain: &str) -> Result<Option<SiteProfile>, StoreError>;

    /// Human-readable digest for the translator; `None` when nothing is known.
    async fn build_context(&self, domain: &str) -> Result<Option<String>, StoreError>;

    /// Save a session snapshot. Last write wins.
    async fn save_session(&self, session: &Session) -> Result<(), StoreError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// All saved sessions, most recently active first.
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;

    /// Delete a saved session. Returns whether it existed.
    async fn delete_session(&self, id: &str) -> Result<bool, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Outcome statistics of one selector for one action on one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorRecord {
    pub domain: String,
    /// Action name, optionally suffixed with a sub-key (`authenticate.email`).
    pub action: String,
    pub selector: String,
    pub success_count: u32,
    pub failure_count: u32,
    pub last_used: DateTime<Utc>,
}

impl SelectorRecord {
    pub fn attempts(&self) -> u32 {
        self.success_count + self.failure_count
    }

    /// Success ratio; zero when never attempted.
    pub fn confidence(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => f64::from(self.success_count) / f64::from(n),
        }
    }

    /// Enough attempts for the ratio to count.
    pub fn is_proven(&self) -> bool {
        self.attempts() >= MIN_SELECTOR_ATTEMPTS
    }

    pub fn is_trusted(&self) -> bool {
        self.is_proven() && self.confidence() >= MIN_SELECTOR_CONFIDENCE
    }
}

/// Pick the proven record with the highest ratio, ties going to more
/// attempts. Returns `None` unless the winner is trusted.
pub fn pick_best<'a, I>(records: I) -> Option<&'a SelectorRecord>
where
    I: IntoIterator<Item = &'a SelectorRecord>,
{
    let best = records
        .into_iter()
        .filter(|r| r.is_proven())
        .max_by(|a, b| {
            a.confidence()
                .total_cmp(&b.confidence())
                .then(a.attempts().cmp(&b.attempts()))
        })?;
    best.is_trusted().then_some(best)
}

/// Best trusted record per action qualifier.
pub fn best_per_action(records: &[SelectorRecord]) -> BTreeMap<String, &SelectorRecord> {
    let mut grouped: BTreeMap<&str, Vec<&SelectorRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.action.as_str()).or_default().push(record);
    }

    grouped
        .into_iter()
        .filter_map(|(action, group)| pick_best(group).map(|r| (action.to_string(), r)))
        .collect()
}

/// Accumulated knowledge about one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub domain: String,
    pub visit_count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Page types observed, in order of first observation.
    pub page_types: Vec<PageType>,
    /// Transition notes, oldest first.
    pub notes: Vec<String>,
}

/// Compose the translator digest for a domain.
///
/// `None` means nothing at all is known; a profile without notes still
/// produces a digest.
pub fn compose_context(
    domain: &str,
    profile: Option<&SiteProfile>,
    selectors: &BTreeMap<String, &SelectorRecord>,
) -> Option<String> {
    if profile.is_none() && selectors.is_empty() {
        return None;
    }

    let mut lines = vec![format!("Site knowledge for {}:", domain)];

    if let Some(profile) = profile {
        lines.push(format!("- Visited {} time(s)", profile.visit_count));
        if !profile.page_types.is_empty() {
            let types: Vec<&str> = profile.page_types.iter().map(PageType::as_str).collect();
            lines.push(format!("- Known page types: {}", types.join(", ")));
        }
        if !profile.notes.is_empty() {
            lines.push("- Observed transitions:".to_string());
            lines.extend(profile.notes.iter().map(|n| format!("  - {}", n)));
        }
    }

    if !selectors.is_empty() {
        lines.push("- Proven selectors:".to_string());
        for (action, record) in selectors {
            lines.push(format!(
                "  - {}: {} ({:.0}% over {} attempts)",
                action,
                record.selector,
                record.confidence() * 100.0,
                record.attempts()
            ));
        }
    }

    Some(lines.join("\n"))
}

/// Aggregate counts for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub domains: u64,
    pub sessions: u64,
    /// Selector records with at least [`MIN_SELECTOR_ATTEMPTS`] attempts.
    pub proven_selectors: u64,
    pub cached_pages: u64,
}

#[cfg(test)]
#[path = "knowledge_tests.rs"]
mod tests;

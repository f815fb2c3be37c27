//! SQLite knowledge store implementation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use sitemind_protocols::knowledge::{DEFAULT_CACHE_TTL, best_per_action, compose_context, pick_best};
use sitemind_protocols::{
    Clock, KnowledgeStore, PageModel, PageType, Session, SiteProfile, StoreError, StoreStats,
    SystemClock, domain_of, normalize_url,
};

use crate::schema::init_schema;

#[path = "store_rows.rs"]
mod rows;
use rows::{SessionRow, fmt_ts, parse_ts};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// SQLite-based knowledge store.
///
/// All statements run on one connection thread, and every counter update is a
/// single upsert statement, so concurrent callers never lose increments.
pub struct SqliteKnowledgeStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
    cache_ttl: chrono::Duration,
}

fn query_err(e: tokio_rusqlite::Error) -> StoreError {
    StoreError::QueryError(e.to_string())
}

impl SqliteKnowledgeStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::init(conn).await
    }

    /// Create a new file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::StorageError(e.to_string()))?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(query_err)?;

        Ok(Self {
            conn,
            clock: Arc::new(SystemClock),
            cache_ttl: ttl_from_std(DEFAULT_CACHE_TTL),
        })
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override how long cached models stay fresh.
    pub fn with_cache_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.cache_ttl = ttl_from_std(ttl);
        self
    }
}

fn ttl_from_std(ttl: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(30))
}

fn session_from_row(row: SessionRow) -> Result<Session, StoreError> {
    Ok(Session {
        id: row.id,
        created_at: parse_ts(&row.created_at),
        last_active: parse_ts(&row.last_active),
        auth_domains: serde_json::from_str(&row.auth_domains)?,
        storage_state: serde_json::from_str(&row.storage_state)?,
        history: serde_json::from_str(&row.history)?,
    })
}

fn row_from_session(session: &Session) -> Result<SessionRow, StoreError> {
    Ok(SessionRow {
        id: session.id.clone(),
        created_at: fmt_ts(session.created_at),
        last_active: fmt_ts(session.last_active),
        auth_domains: serde_json::to_string(&session.auth_domains)?,
        storage_state: serde_json::to_string(&session.storage_state)?,
        history: serde_json::to_string(&session.history)?,
    })
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    fn id(&self) -> &str {
        "sqlite"
    }

    async fn get_cached_model(&self, url: &str) -> Result<Option<PageModel>, StoreError> {
        let pattern = normalize_url(url);
        let now = self.clock.now();
        let ttl = self.cache_ttl;

        let key = pattern.clone();
        let raw = self
            .conn
            .call(move |conn| Ok(rows::cache_lookup(conn, &key, now, ttl)?))
            .await
            .map_err(query_err)?;

        let Some(raw) = raw else {
            debug!("Cache miss for {}", pattern);
            return Ok(None);
        };

        match serde_json::from_str::<PageModel>(&raw) {
            Ok(model) => {
                debug!("Cache hit for {}", pattern);
                Ok(Some(model))
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", pattern, e);
                let key = pattern.clone();
                self.conn
                    .call(move |conn| Ok(rows::cache_remove(conn, &key)?))
                    .await
                    .map_err(query_err)?;
                Ok(None)
            }
        }
    }

    async fn cache_model(&self, url: &str, model: &PageModel) -> Result<(), StoreError> {
        let pattern = normalize_url(url);
        let domain = domain_of(url);
        let json = serde_json::to_string(model)?;
        let now = self.clock.now();

        self.conn
            .call(move |conn| Ok(rows::cache_upsert(conn, &pattern, &domain, &json, now)?))
            .await
            .map_err(query_err)
    }

    async fn invalidate(&self, domain: &str) -> Result<usize, StoreError> {
        let domain = domain.to_string();
        let removed = self
            .conn
            .call(move |conn| Ok(rows::cache_invalidate(conn, &domain)?))
            .await
            .map_err(query_err)?;
        Ok(removed)
    }

    async fn record_selector_outcome(
        &self,
        domain: &str,
        action: &str,
        selector: &str,
        success: bool,
    ) -> Result<(), StoreError> {
        if selector.trim().is_empty() {
            return Ok(());
        }

        let (domain, action, selector) = (domain.to_string(), action.to_string(), selector.to_string());
        let now = self.clock.now();
        debug!(
            "Selector outcome {}/{} {} -> {}",
            domain,
            action,
            selector,
            if success { "ok" } else { "failed" }
        );

        self.conn
            .call(move |conn| {
                Ok(rows::selector_upsert(conn, &domain, &action, &selector, success, now)?)
            })
            .await
            .map_err(query_err)
    }

    async fn best_selector(&self, domain: &str, action: &str) -> Result<Option<String>, StoreError> {
        let (domain, action) = (domain.to_string(), action.to_string());
        let records = self
            .conn
            .call(move |conn| Ok(rows::proven_selectors(conn, &domain, Some(&action))?))
            .await
            .map_err(query_err)?;

        Ok(pick_best(&records).map(|r| r.selector.clone()))
    }

    async fn known_selectors(&self, domain: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let domain = domain.to_string();
        let records = self
            .conn
            .call(move |conn| Ok(rows::proven_selectors(conn, &domain, None)?))
            .await
            .map_err(query_err)?;

        Ok(best_per_action(&records)
            .into_iter()
            .map(|(action, record)| (action, record.selector.clone()))
            .collect())
    }

    async fn record_visit(&self, domain: &str) -> Result<(), StoreError> {
        let domain = domain.to_string();
        let now = self.clock.now();
        self.conn
            .call(move |conn| Ok(rows::profile_visit(conn, &domain, now)?))
            .await
            .map_err(query_err)
    }

    async fn update_site_profile(
        &self,
        domain: &str,
        page_type: PageType,
        note: Option<&str>,
    ) -> Result<(), StoreError> {
        let domain = domain.to_string();
        let note = note.map(str::to_string);
        let now = self.clock.now();
        self.conn
            .call(move |conn| {
                Ok(rows::profile_update(conn, &domain, page_type, note.as_deref(), now)?)
            })
            .await
            .map_err(query_err)
    }

    async fn site_profile(&self, domain: &str) -> Result<Option<SiteProfile>, StoreError> {
        let domain = domain.to_string();
        self.conn
            .call(move |conn| Ok(rows::profile_load(conn, &domain)?))
            .await
            .map_err(query_err)
    }

    async fn build_context(&self, domain: &str) -> Result<Option<String>, StoreError> {
        let key = domain.to_string();
        let (profile, records) = self
            .conn
            .call(move |conn| {
                let profile = rows::profile_load(conn, &key)?;
                let records = rows::proven_selectors(conn, &key, None)?;
                Ok((profile, records))
            })
            .await
            .map_err(query_err)?;

        let selectors = best_per_action(&records);
        Ok(compose_context(domain, profile.as_ref(), &selectors))
    }

    async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let row = row_from_session(session)?;
        debug!("Saving session {}", row.id);
        self.conn
            .call(move |conn| Ok(rows::session_upsert(conn, &row)?))
            .await
            .map_err(query_err)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| Ok(rows::session_load(conn, &id)?))
            .await
            .map_err(query_err)?;

        row.map(session_from_row).transpose()
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let rows = self
            .conn
            .call(|conn| Ok(rows::session_list(conn)?))
            .await
            .map_err(query_err)?;

        rows.into_iter().map(session_from_row).collect()
    }

    async fn delete_session(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| Ok(rows::session_delete(conn, &id)?))
            .await
            .map_err(query_err)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.conn
            .call(|conn| Ok(rows::stats(conn)?))
            .await
            .map_err(query_err)
    }
}

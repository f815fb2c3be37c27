//! Task executor: session arena and the page refresh pipeline.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use sitemind_protocols::{
    Clock, KnowledgeStore, PageDriver, PageModel, PageView, Session, StoreStats, SystemClock,
    Translator, domain_of,
};

use crate::change::StateChange;
use crate::error::ExecutorError;

/// Configuration for the task executor.
#[derive(Debug, Clone)]
pub struct TaskExecutorConfig {
    /// Pause after an action before the page is re-read.
    pub settle_delay: Duration,

    /// Maximum parallel tasks in flight.
    pub max_parallel_tasks: usize,
}

impl Default for TaskExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1000),
            max_parallel_tasks: 5,
        }
    }
}

/// Outcome of an action or form fill. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    /// Action or form name.
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<StateChange>,
    /// Actions offered by the page after the attempt.
    pub available_actions: Vec<String>,
    /// Per-field problems from a partial form fill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Data produced by the action itself, e.g. extracted page text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl ActionResult {
    pub(crate) fn failed(action: &str, error: String, available_actions: Vec<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            error: Some(error),
            changes: None,
            available_actions,
            errors: Vec::new(),
            output: None,
        }
    }
}

/// Per-session state. Lives exactly as long as the session is open.
pub(crate) struct SessionSlot {
    pub(crate) session: Session,
    pub(crate) current: Option<PageModel>,
}

/// Orchestrates navigation, refresh, actions and parallel tasks over a
/// page driver, learning from every outcome.
///
/// Each open session owns a slot guarded by an async mutex that is held for
/// the whole of an operation, so operations on one session run in sequence
/// while distinct sessions proceed concurrently.
pub struct TaskExecutor {
    pub(crate) driver: Arc<dyn PageDriver>,
    pub(crate) translator: Arc<dyn Translator>,
    pub(crate) store: Arc<dyn KnowledgeStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) sessions: DashMap<String, Arc<Mutex<SessionSlot>>>,
    pub(crate) parallel_permits: Arc<Semaphore>,
    pub(crate) config: TaskExecutorConfig,
}

impl TaskExecutor {
    /// Create a new executor.
    pub fn new(
        driver: Arc<dyn PageDriver>,
        translator: Arc<dyn Translator>,
        store: Arc<dyn KnowledgeStore>,
        config: TaskExecutorConfig,
    ) -> Self {
        Self {
            driver,
            translator,
            store,
            clock: Arc::new(SystemClock),
            sessions: DashMap::new(),
            parallel_permits: Arc::new(Semaphore::new(config.max_parallel_tasks.max(1))),
            config,
        }
    }

    /// Use a different time source for session timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TaskExecutorConfig {
        &self.config
    }

    pub(crate) fn slot(&self, session: &str) -> Result<Arc<Mutex<SessionSlot>>, ExecutorError> {
        self.sessions
            .get(session)
            .map(|slot| slot.value().clone())
            .ok_or_else(|| ExecutorError::SessionNotFound(session.to_string()))
    }

    /// Open a driver session, optionally restoring a saved one.
    pub async fn open_session(&self, restore_from: Option<&str>) -> Result<String, ExecutorError> {
        let saved = match restore_from {
            Some(id) => Some(
                self.store
                    .get_session(id)
                    .await?
                    .ok_or_else(|| ExecutorError::SessionNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let restore_state = saved
            .as_ref()
            .map(|s| s.storage_state.clone())
            .filter(|state| !state.is_null());
        let id = self.driver.create_session(restore_state).await?;

        let mut session = Session::new(&id, self.clock.now());
        if let Some(saved) = saved {
            info!("Restored session {} from {}", id, saved.id);
            session.auth_domains = saved.auth_domains;
            session.storage_state = saved.storage_state;
            session.history = saved.history;
        } else {
            info!("Opened session {}", id);
        }

        self.sessions.insert(
            id.clone(),
            Arc::new(Mutex::new(SessionSlot {
                session,
                current: None,
            })),
        );
        Ok(id)
    }

    /// Export the driver state and persist a snapshot of the session.
    pub async fn save_session(&self, session: &str) -> Result<Session, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;

        slot.session.storage_state = self.driver.export_state(session).await?;
        slot.session.last_active = self.clock.now();
        self.store.save_session(&slot.session).await?;

        debug!("Saved session {}", session);
        Ok(slot.session.clone())
    }

    /// Destroy the driver session and drop its slot.
    pub async fn close_session(&self, session: &str) -> Result<(), ExecutorError> {
        let (_, slot) = self
            .sessions
            .remove(session)
            .ok_or_else(|| ExecutorError::SessionNotFound(session.to_string()))?;

        // Wait for any in-flight operation on the session.
        let _guard = slot.lock().await;
        self.driver.destroy_session(session).await?;
        info!("Closed session {}", session);
        Ok(())
    }

    /// Ids of the open sessions.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }

    /// Snapshot of an open session's record (auth domains, history).
    pub async fn session_info(&self, session: &str) -> Result<Session, ExecutorError> {
        let slot = self.slot(session)?;
        let slot = slot.lock().await;
        Ok(slot.session.clone())
    }

    /// Re-derive the page model for the session's current page.
    pub async fn refresh(&self, session: &str) -> Result<PageView, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;
        let model = self.refresh_slot(session, &mut slot).await?;
        Ok(model.view())
    }

    /// Navigate and return the new page model.
    pub async fn navigate(&self, session: &str, url: &str) -> Result<PageView, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;

        if let Err(e) = self.driver.navigate(session, url).await {
            let now = self.clock.now();
            slot.session.record(now, "navigate", url, false);
            return Err(e.into());
        }

        let model = self.refresh_slot(session, &mut slot).await?;
        let now = self.clock.now();
        slot.session.record(now, "navigate", &model.url, true);
        Ok(model.view())
    }

    /// The current model, refreshing only when none is held.
    pub async fn get_page_state(&self, session: &str) -> Result<PageView, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;
        let model = self.current_or_refresh(session, &mut slot).await?;
        Ok(model.view())
    }

    pub async fn knowledge_stats(&self) -> Result<StoreStats, ExecutorError> {
        Ok(self.store.stats().await?)
    }

    pub(crate) async fn current_or_refresh(
        &self,
        session: &str,
        slot: &mut SessionSlot,
    ) -> Result<PageModel, ExecutorError> {
        match &slot.current {
            Some(model) => Ok(model.clone()),
            None => self.refresh_slot(session, slot).await,
        }
    }

    /// The refresh pipeline: challenge check, cache, translation with
    /// fallback, then learning writes. Adopts the result as current.
    pub(crate) async fn refresh_slot(
        &self,
        session: &str,
        slot: &mut SessionSlot,
    ) -> Result<PageModel, ExecutorError> {
        let url = self.driver.current_url(session).await?;

        if self.driver.captcha_detected(session).await? {
            warn!("Challenge page at {}, not interacting", url);
            let model = PageModel::captcha(&url);
            slot.current = Some(model.clone());
            return Ok(model);
        }

        if let Some(model) = self.store.get_cached_model(&url).await? {
            slot.current = Some(model.clone());
            return Ok(model);
        }

        let domain = domain_of(&url);
        let context = self.store.build_context(&domain).await?;
        let content = self.driver.page_content(session).await?;
        let accessibility = self.driver.accessibility_summary(session).await?;

        let model = match self
            .translator
            .translate(&url, &content, &accessibility, context.as_deref())
            .await
        {
            Ok(model) => {
                let mut model = model.sanitize();
                if model.url.is_empty() {
                    model.url = url.clone();
                }
                model
            }
            Err(e) => {
                warn!("Translation failed for {}, using fallback model: {}", url, e);
                PageModel::fallback(&url, &e.to_string())
            }
        };

        self.store.record_visit(&domain).await?;
        self.store
            .update_site_profile(&domain, model.page_type, None)
            .await?;
        if model.is_degraded() {
            debug!("Not caching degraded model for {}", url);
        } else {
            self.store.cache_model(&url, &model).await?;
        }

        slot.current = Some(model.clone());
        Ok(model)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

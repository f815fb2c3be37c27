//! Action execution, form filling and extraction.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use sitemind_protocols::page::FALLBACK_ACTION;
use sitemind_protocols::{ActionDefinition, ExecutionHint, PageModel, domain_of, is_absolute_url};

use crate::change::StateChange;
use crate::error::ExecutorError;
use crate::executor::{ActionResult, SessionSlot, TaskExecutor};
use crate::extract::extract_by_schema;

/// How an action was resolved to driver calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Hinted,
    Learned,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Hinted => write!(f, "hint"),
            Tier::Learned => write!(f, "learned selector"),
        }
    }
}

/// Selectors touched while performing an action, keyed by qualifier.
type Touched = Vec<(String, String)>;

/// Parameter values are filled as text; strings go in without quotes.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl TaskExecutor {
    /// Perform a named action on the current page.
    ///
    /// Unknown actions and sessions are errors. Everything that goes wrong
    /// while acting (no way to resolve it, a driver failure, a challenge
    /// page) comes back as a failed [`ActionResult`].
    pub async fn execute_action(
        &self,
        session: &str,
        action_name: &str,
        params: &BTreeMap<String, Value>,
    ) -> Result<ActionResult, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;

        let before = self.current_or_refresh(session, &mut slot).await?;
        let action = before
            .action(action_name)
            .cloned()
            .ok_or_else(|| ExecutorError::ActionNotFound {
                name: action_name.to_string(),
                available: before.action_names(),
            })?;

        let before_url = self.driver.current_url(session).await?;
        let domain = domain_of(&before_url);
        let event = format!("action:{}", action.name);

        if action.name == FALLBACK_ACTION && action.hint.is_none() {
            return self
                .extract_content(session, &mut slot, &before, &before_url, &event)
                .await;
        }

        let mut touched = Touched::new();
        let attempt = self
            .attempt(session, &domain, &action, params, &mut touched)
            .await;

        let tier = match attempt {
            Ok(tier) => tier,
            Err(ExecutorError::ChallengeDetected(at)) => {
                warn!("Challenge appeared after '{}' on {}", action.name, at);
                return self
                    .challenged(session, &mut slot, &action.name, &before, &before_url, &event)
                    .await;
            }
            Err(e) => {
                warn!("Action '{}' failed on {}: {}", action.name, domain, e);
                self.record_outcomes(&domain, &touched, false).await;
                let now = self.clock.now();
                slot.session.record(now, event, &before_url, false);
                return Ok(ActionResult::failed(
                    &action.name,
                    e.to_string(),
                    before.action_names(),
                ));
            }
        };
        debug!("Action '{}' performed via {}", action.name, tier);
        self.record_outcomes(&domain, &touched, true).await;

        let (after_url, after) = match self.observe(session, &mut slot, &domain, &before_url).await {
            Ok(observed) => observed,
            Err(e) => {
                warn!("Could not observe the page after '{}': {}", action.name, e);
                slot.current = None;
                let now = self.clock.now();
                slot.session.record(now, event, &before_url, false);
                return Ok(ActionResult::failed(
                    &action.name,
                    format!("Action performed but the resulting page could not be read: {}", e),
                    before.action_names(),
                ));
            }
        };

        let note = format!(
            "action '{}' on {} page leads to {} page",
            action.name, before.page_type, after.page_type
        );
        self.store
            .update_site_profile(&domain, before.page_type, Some(&note))
            .await?;

        let changes = StateChange::compute(&before, &after, &before_url, &after_url);
        if changes.auth_changed {
            slot.session.add_auth_domain(&domain);
            slot.session.add_auth_domain(&domain_of(&after_url));
        }

        let now = self.clock.now();
        slot.session.record(now, event, &after_url, true);
        info!("Action '{}' on {}: {}", action.name, domain, changes.summary);

        Ok(ActionResult {
            success: true,
            action: action.name,
            error: None,
            changes: Some(changes),
            available_actions: after.action_names(),
            errors: Vec::new(),
            output: None,
        })
    }

    /// Resolve and perform the action, then let the page settle and check
    /// for a challenge. Selectors are pushed to `touched` before use.
    async fn attempt(
        &self,
        session: &str,
        domain: &str,
        action: &ActionDefinition,
        params: &BTreeMap<String, Value>,
        touched: &mut Touched,
    ) -> Result<Tier, ExecutorError> {
        let tier = match &action.hint {
            Some(ExecutionHint::Click { selector }) => {
                touched.push((action.name.clone(), selector.clone()));
                self.click(session, selector).await?;
                Tier::Hinted
            }
            Some(ExecutionHint::Fill { fields, submit }) => {
                for (param, selector) in fields {
                    let Some(value) = params.get(param) else {
                        continue;
                    };
                    touched.push((format!("{}.{}", action.name, param), selector.clone()));
                    self.driver
                        .fill(session, selector, &param_text(value))
                        .await
                        .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?;
                }
                if let Some(submit) = submit {
                    touched.push((format!("{}.submit", action.name), submit.clone()));
                    self.click(session, submit).await?;
                }
                Tier::Hinted
            }
            Some(ExecutionHint::Navigate { target }) if is_absolute_url(target) => {
                self.driver
                    .navigate(session, target)
                    .await
                    .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?;
                Tier::Hinted
            }
            Some(ExecutionHint::Navigate { target }) => {
                touched.push((action.name.clone(), target.clone()));
                self.click(session, target).await?;
                Tier::Hinted
            }
            Some(ExecutionHint::Unknown) | None => {
                let selector = self
                    .store
                    .best_selector(domain, &action.name)
                    .await?
                    .ok_or_else(|| ExecutorError::Unresolvable(action.name.clone()))?;
                touched.push((action.name.clone(), selector.clone()));
                self.click(session, &selector).await?;
                Tier::Learned
            }
        };

        tokio::time::sleep(self.config.settle_delay).await;

        if self.driver.captcha_detected(session).await? {
            let at = self.driver.current_url(session).await.unwrap_or_default();
            return Err(ExecutorError::ChallengeDetected(at));
        }
        Ok(tier)
    }

    /// Post-action observation: invalidate on a URL change, then refresh.
    async fn observe(
        &self,
        session: &str,
        slot: &mut SessionSlot,
        domain: &str,
        before_url: &str,
    ) -> Result<(String, PageModel), ExecutorError> {
        let after_url = self.driver.current_url(session).await?;
        if after_url != before_url {
            let removed = self.store.invalidate(domain).await?;
            debug!("URL changed, invalidated {} cached page(s) for {}", removed, domain);
        }
        let after = self.refresh_slot(session, slot).await?;
        Ok((after_url, after))
    }

    /// The generic extraction offered by degraded models: the raw page
    /// text, with no selector involved.
    async fn extract_content(
        &self,
        session: &str,
        slot: &mut SessionSlot,
        before: &PageModel,
        url: &str,
        event: &str,
    ) -> Result<ActionResult, ExecutorError> {
        let now = self.clock.now();
        match self.driver.page_content(session).await {
            Ok(content) => {
                slot.session.record(now, event, url, true);
                Ok(ActionResult {
                    success: true,
                    action: FALLBACK_ACTION.to_string(),
                    error: None,
                    changes: None,
                    available_actions: before.action_names(),
                    errors: Vec::new(),
                    output: Some(Value::String(content)),
                })
            }
            Err(e) => {
                slot.session.record(now, event, url, false);
                Ok(ActionResult::failed(
                    FALLBACK_ACTION,
                    ExecutorError::ExecutionFailed(e.to_string()).to_string(),
                    before.action_names(),
                ))
            }
        }
    }

    async fn click(&self, session: &str, selector: &str) -> Result<(), ExecutorError> {
        self.driver
            .click(session, selector)
            .await
            .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))
    }

    /// A challenge after acting: adopt the challenge model, learn nothing.
    async fn challenged(
        &self,
        session: &str,
        slot: &mut SessionSlot,
        action: &str,
        before: &PageModel,
        before_url: &str,
        event: &str,
    ) -> Result<ActionResult, ExecutorError> {
        let after_url = self.driver.current_url(session).await?;
        if after_url != before_url {
            self.store.invalidate(&domain_of(before_url)).await?;
        }

        let after = self.refresh_slot(session, slot).await?;
        let now = self.clock.now();
        slot.session.record(now, event, &after_url, false);

        let mut result = ActionResult::failed(
            action,
            ExecutorError::ChallengeDetected(after_url.clone()).to_string(),
            after.action_names(),
        );
        result.changes = Some(StateChange::compute(before, &after, before_url, &after_url));
        Ok(result)
    }

    /// Store writes here are best effort; a failed write is logged.
    async fn record_outcomes(&self, domain: &str, touched: &[(String, String)], success: bool) {
        for (qualifier, selector) in touched {
            if let Err(e) = self
                .store
                .record_selector_outcome(domain, qualifier, selector, success)
                .await
            {
                warn!("Failed to record outcome for {} {}: {}", qualifier, selector, e);
            }
        }
    }

    /// Fill fields of a named form. Each field is handled on its own;
    /// problems are collected and the fill continues.
    pub async fn fill_form(
        &self,
        session: &str,
        form_name: &str,
        values: &BTreeMap<String, Value>,
    ) -> Result<ActionResult, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;

        let before = self.current_or_refresh(session, &mut slot).await?;
        let form = before
            .form(form_name)
            .cloned()
            .ok_or_else(|| ExecutorError::FormNotFound {
                name: form_name.to_string(),
                available: before.form_names(),
            })?;

        let before_url = self.driver.current_url(session).await?;
        let domain = domain_of(&before_url);
        let mut errors = Vec::new();

        for (key, value) in values {
            let Some(field) = form.field(key) else {
                errors.push(format!("Field '{}' not found in form '{}'", key, form.name));
                continue;
            };

            let qualifier = format!("fill_{}", field.name);
            let selector = match field.selector.as_deref().filter(|s| !s.trim().is_empty()) {
                Some(selector) => Some(selector.to_string()),
                None => match self.store.best_selector(&domain, &qualifier).await {
                    Ok(selector) => selector,
                    Err(e) => {
                        errors.push(format!("Selector lookup for '{}' failed: {}", field.name, e));
                        continue;
                    }
                },
            };
            let Some(selector) = selector else {
                errors.push(format!("No selector known for field '{}'", field.name));
                continue;
            };

            let filled = self.driver.fill(session, &selector, &param_text(value)).await;
            if let Err(e) = &filled {
                errors.push(format!("Failed to fill '{}': {}", field.name, e));
            }
            self.record_outcomes(&domain, &[(qualifier, selector)], filled.is_ok())
                .await;
        }

        let after = self.refresh_slot(session, &mut slot).await?;
        let after_url = self.driver.current_url(session).await?;
        let success = errors.is_empty();

        let now = self.clock.now();
        slot.session
            .record(now, format!("fill_form:{}", form.name), &after_url, success);
        if !success {
            debug!("Form '{}' filled with {} problem(s)", form.name, errors.len());
        }

        Ok(ActionResult {
            success,
            action: form.name,
            error: (!success).then(|| format!("{} field(s) could not be filled", errors.len())),
            changes: Some(StateChange::compute(&before, &after, &before_url, &after_url)),
            available_actions: after.action_names(),
            errors,
            output: None,
        })
    }

    /// Approximate lookup of key facts on the current page.
    pub async fn extract(
        &self,
        session: &str,
        schema: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, Value>, ExecutorError> {
        let slot = self.slot(session)?;
        let mut slot = slot.lock().await;
        let model = self.current_or_refresh(session, &mut slot).await?;
        Ok(extract_by_schema(&model, schema))
    }
}

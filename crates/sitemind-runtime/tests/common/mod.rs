//! Hand-written fakes for driving the executor end to end.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{Value, json};

use sitemind_knowledge_sqlite::SqliteKnowledgeStore;
use sitemind_protocols::{
    ActionDefinition, DriverError, ExecutionHint, FormDescriptor, FormField, ManualClock, PageDriver,
    PageModel, PageType, ParamType, Translator, TranslatorError, parse_page_model,
};
use sitemind_runtime::{TaskExecutor, TaskExecutorConfig};

pub const LOGIN: &str = "https://shop.example.com/login";
pub const DASHBOARD: &str = "https://shop.example.com/dashboard";
pub const ORDERS: &str = "https://shop.example.com/orders";
pub const HELP: &str = "https://help.example.com/";
pub const DOMAIN: &str = "shop.example.com";

#[derive(Default)]
struct DriverState {
    next_id: usize,
    /// Session id -> current URL.
    sessions: HashMap<String, String>,
    destroyed: Vec<String>,
    restored: Vec<Value>,
    /// Selector -> URL the click leads to.
    links: HashMap<String, String>,
    broken: HashSet<String>,
    unreachable: HashSet<String>,
    panics: HashSet<String>,
    captcha: HashSet<String>,
    /// URLs whose content cannot be read.
    unreadable: HashSet<String>,
    calls: Vec<String>,
    open: usize,
    max_open: usize,
}

/// Scripted in-memory browser.
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<DriverState>,
    delay: Option<Duration>,
}

impl FakeDriver {
    pub fn new() -> Self {
        let driver = Self::default();
        driver.link("#signin", DASHBOARD);
        driver.link("#orders", ORDERS);
        driver.link("#logout", LOGIN);
        driver
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn link(&self, selector: &str, target: &str) {
        self.state.lock().links.insert(selector.to_string(), target.to_string());
    }

    pub fn break_selector(&self, selector: &str) {
        self.state.lock().broken.insert(selector.to_string());
    }

    pub fn make_unreachable(&self, url: &str) {
        self.state.lock().unreachable.insert(url.to_string());
    }

    pub fn panic_on(&self, url: &str) {
        self.state.lock().panics.insert(url.to_string());
    }

    pub fn challenge_on(&self, url: &str) {
        self.state.lock().captcha.insert(url.to_string());
    }

    pub fn unreadable_on(&self, url: &str) {
        self.state.lock().unreadable.insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.state.lock().destroyed.clone()
    }

    pub fn restored(&self) -> Vec<Value> {
        self.state.lock().restored.clone()
    }

    pub fn max_open(&self) -> usize {
        self.state.lock().max_open
    }

    fn url_of(&self, session: &str) -> Result<String, DriverError> {
        self.state
            .lock()
            .sessions
            .get(session)
            .cloned()
            .ok_or_else(|| DriverError::SessionNotFound(session.to_string()))
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn create_session(&self, restore_state: Option<Value>) -> Result<String, DriverError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("fake-{}", state.next_id);
        state.sessions.insert(id.clone(), "about:blank".to_string());
        if let Some(restore) = restore_state {
            state.restored.push(restore);
        }
        state.open += 1;
        state.max_open = state.max_open.max(state.open);
        Ok(id)
    }

    async fn destroy_session(&self, session: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state
            .sessions
            .remove(session)
            .ok_or_else(|| DriverError::SessionNotFound(session.to_string()))?;
        state.destroyed.push(session.to_string());
        state.open -= 1;
        Ok(())
    }

    async fn navigate(&self, session: &str, url: &str) -> Result<(), DriverError> {
        let crashes = self.state.lock().panics.contains(url);
        if crashes {
            panic!("renderer crashed on {}", url);
        }
        self.pause().await;

        let mut state = self.state.lock();
        state.calls.push(format!("navigate {}", url));
        if state.unreachable.contains(url) {
            return Err(DriverError::NavigationFailed(format!("{} is unreachable", url)));
        }
        let current = state
            .sessions
            .get_mut(session)
            .ok_or_else(|| DriverError::SessionNotFound(session.to_string()))?;
        *current = url.to_string();
        Ok(())
    }

    async fn current_url(&self, session: &str) -> Result<String, DriverError> {
        self.url_of(session)
    }

    async fn page_content(&self, session: &str) -> Result<String, DriverError> {
        let url = self.url_of(session)?;
        let unreadable = self.state.lock().unreadable.contains(&url);
        if unreadable {
            return Err(DriverError::Timeout(format!("reading {}", url)));
        }
        Ok(format!("<html>content of {}</html>", url))
    }

    async fn accessibility_summary(&self, session: &str) -> Result<String, DriverError> {
        Ok(format!("document {}", self.url_of(session)?))
    }

    async fn click(&self, session: &str, selector: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.calls.push(format!("click {}", selector));
        if state.broken.contains(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        if let Some(target) = state.links.get(selector).cloned() {
            let current = state
                .sessions
                .get_mut(session)
                .ok_or_else(|| DriverError::SessionNotFound(session.to_string()))?;
            *current = target;
        }
        Ok(())
    }

    async fn fill(&self, _session: &str, selector: &str, value: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.calls.push(format!("fill {}={}", selector, value));
        if state.broken.contains(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn captcha_detected(&self, session: &str) -> Result<bool, DriverError> {
        let url = self.url_of(session)?;
        Ok(self.state.lock().captcha.contains(&url))
    }

    async fn export_state(&self, session: &str) -> Result<Value, DriverError> {
        Ok(json!({ "cookies": [{ "name": "sid", "value": session }] }))
    }
}

/// Translator backed by a fixed URL -> model table. Unknown URLs fail.
#[derive(Default)]
pub struct FakeTranslator {
    models: Mutex<HashMap<String, PageModel>>,
    raw: Mutex<HashMap<String, String>>,
    contexts: Mutex<Vec<(String, Option<String>)>>,
    calls: AtomicUsize,
}

impl FakeTranslator {
    pub fn new() -> Self {
        let translator = Self::default();
        for model in shop_models() {
            translator.insert(model);
        }
        translator
    }

    pub fn insert(&self, model: PageModel) {
        self.models.lock().insert(model.url.clone(), model);
    }

    /// Answer with raw text, parsed the way a model-backed translator would.
    pub fn insert_raw(&self, url: &str, raw: &str) {
        self.raw.lock().insert(url.to_string(), raw.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Context digests received, in call order.
    pub fn contexts(&self) -> Vec<(String, Option<String>)> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        url: &str,
        _content: &str,
        _accessibility: &str,
        context: Option<&str>,
    ) -> Result<PageModel, TranslatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts
            .lock()
            .push((url.to_string(), context.map(str::to_string)));

        if let Some(raw) = self.raw.lock().get(url).cloned() {
            return parse_page_model(url, &raw);
        }
        self.models
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| TranslatorError::Failed(format!("model unavailable for {}", url)))
    }
}

pub fn shop_models() -> Vec<PageModel> {
    let login = PageModel::new(LOGIN, PageType::Login, "Sign in to your account")
        .with_action(
            ActionDefinition::new("authenticate", "Sign in with email and password")
                .with_param("email", ParamType::String, true)
                .with_param("password", ParamType::String, true)
                .with_hint(ExecutionHint::Fill {
                    fields: BTreeMap::from([
                        ("email".to_string(), "#email".to_string()),
                        ("password".to_string(), "#password".to_string()),
                    ]),
                    submit: Some("#signin".to_string()),
                }),
        )
        .with_form(
            FormDescriptor::new("login")
                .with_field(FormField::new("email").with_selector("#email"))
                .with_field(FormField::new("password"))
                .with_field(FormField::new("remember").with_label("Remember me")),
        );

    let dashboard = PageModel::new(DASHBOARD, PageType::Dashboard, "Account overview")
        .with_key_data("account_name", "Ada")
        .with_action(ActionDefinition::new("view_orders", "Open order history").with_hint(
            ExecutionHint::Click {
                selector: "#orders".to_string(),
            },
        ))
        .with_action(ActionDefinition::new("logout", "Sign out"))
        .with_action(ActionDefinition::new("search", "Search the shop").with_hint(ExecutionHint::Unknown))
        .with_action(ActionDefinition::new("open_help", "Open the help center").with_hint(
            ExecutionHint::Navigate {
                target: HELP.to_string(),
            },
        ));

    let orders = PageModel::new(ORDERS, PageType::Listing, "Order history")
        .with_key_data("order_count", 3)
        .with_key_data("latest_order", "A-100");

    let help = PageModel::new(HELP, PageType::Article, "Help center").with_key_data("topic", "returns");

    vec![login, dashboard, orders, help]
}

pub struct Harness {
    pub driver: Arc<FakeDriver>,
    pub translator: Arc<FakeTranslator>,
    pub store: Arc<SqliteKnowledgeStore>,
    pub executor: Arc<TaskExecutor>,
}

pub async fn harness() -> Harness {
    harness_with(FakeDriver::new(), TaskExecutorConfig {
        settle_delay: Duration::ZERO,
        ..Default::default()
    })
    .await
}

pub async fn harness_with(driver: FakeDriver, config: TaskExecutorConfig) -> Harness {
    let driver = Arc::new(driver);
    let translator = Arc::new(FakeTranslator::new());
    let store = Arc::new(SqliteKnowledgeStore::in_memory().await.unwrap());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()));
    let executor = Arc::new(
        TaskExecutor::new(driver.clone(), translator.clone(), store.clone(), config).with_clock(clock),
    );
    Harness {
        driver,
        translator,
        store,
        executor,
    }
}

pub fn params(entries: &[(&str, &str)]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

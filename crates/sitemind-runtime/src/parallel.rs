//! Parallel tasks over isolated sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use sitemind_protocols::PageView;

use crate::error::ExecutorError;
use crate::executor::TaskExecutor;

/// One independent visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelTask {
    pub url: String,
    /// Keys to extract, each with a description. Without a schema the
    /// task's output is the page's key facts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<BTreeMap<String, String>>,
}

impl ParallelTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: BTreeMap<String, String>) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Outcome of one parallel task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageView>,
    /// Extraction result, or the key facts when no schema was given.
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    fn failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            page: None,
            output: Value::Null,
            error: Some(error),
        }
    }
}

impl TaskExecutor {
    /// Run tasks concurrently, each in its own session.
    ///
    /// At most `max_parallel_tasks` run at once. A failing or panicking task
    /// only fails its own result; results keep the input order.
    pub async fn run_parallel(self: &Arc<Self>, tasks: Vec<ParallelTask>) -> Vec<TaskResult> {
        info!("Running {} parallel task(s)", tasks.len());
        join_all(tasks.into_iter().map(|task| Arc::clone(self).run_task(task))).await
    }

    async fn run_task(self: Arc<Self>, task: ParallelTask) -> TaskResult {
        let _permit = match Arc::clone(&self.parallel_permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return TaskResult::failed(&task.url, e.to_string()),
        };

        let session = match self.open_session(None).await {
            Ok(session) => session,
            Err(e) => return TaskResult::failed(&task.url, e.to_string()),
        };
        debug!("Task {} started in session {}", task.url, session);

        let worker = {
            let executor = Arc::clone(&self);
            let session = session.clone();
            let task = task.clone();
            tokio::spawn(async move { executor.visit(&session, &task).await })
        };

        let result = match worker.await {
            Ok(Ok((page, output))) => TaskResult {
                url: task.url.clone(),
                success: true,
                page: Some(page),
                output,
                error: None,
            },
            Ok(Err(e)) => TaskResult::failed(&task.url, e.to_string()),
            Err(e) => TaskResult::failed(&task.url, format!("Task aborted: {}", e)),
        };

        if let Err(e) = self.close_session(&session).await {
            warn!("Failed to close task session {}: {}", session, e);
        }
        debug!("Task {} finished, success={}", task.url, result.success);
        result
    }

    async fn visit(&self, session: &str, task: &ParallelTask) -> Result<(PageView, Value), ExecutorError> {
        let page = self.navigate(session, &task.url).await?;
        let output = match &task.schema {
            Some(schema) => serde_json::to_value(self.extract(session, schema).await?),
            None => serde_json::to_value(&page.key_data),
        }
        .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?;
        Ok((page, output))
    }
}

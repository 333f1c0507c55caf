//! Named-step runner with memoized outputs.
//!
//! A [`WorkflowRun`] keeps the serialized output of every step that
//! completed. Running the same workflow again with the same run replays
//! those outputs instead of executing the steps, so a retried run only
//! executes what did not finish. Failed steps are not memoized.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};

use crate::conversation::ConversationResult;

/// Outcome of one step execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Executed and memoized.
    Completed,
    /// Served from the memo without executing.
    Replayed,
    /// Executed and returned an error.
    Failed,
}

/// Log entry for one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// What happened.
    pub status: StepStatus,
    /// Wall time spent in the step.
    pub duration_ms: u64,
}

/// State of one workflow run.
#[derive(Debug)]
pub struct WorkflowRun {
    id: String,
    memo: HashMap<String, Value>,
    log: Vec<StepRecord>,
}

impl WorkflowRun {
    /// Fresh run with no completed steps.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            memo: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Steps recorded by the current attempt.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.log
    }

    /// Whether `name` already completed.
    #[must_use]
    pub fn is_completed(&self, name: &str) -> bool {
        self.memo.contains_key(name)
    }

    /// Start a new attempt: the step log is cleared, memoized outputs are kept.
    pub fn begin_attempt(&mut self) {
        self.log.clear();
    }

    /// Run `f` as step `name` unless it already completed.
    ///
    /// # Errors
    /// Returns the step's error, or a serialization error for the memo.
    pub async fn step<T, F, Fut>(&mut self, name: &str, f: F) -> ConversationResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConversationResult<T>>,
    {
        if let Some(saved) = self.memo.get(name) {
            let output = serde_json::from_value(saved.clone())?;
            debug!("Workflow {} replayed step {name}", self.id);
            self.record(name, StepStatus::Replayed, Duration::ZERO);
            return Ok(output);
        }

        let span = info_span!("workflow_step", workflow = %self.id, step = name);
        let started = Instant::now();
        match f().instrument(span).await {
            Ok(output) => {
                self.memo.insert(name.to_string(), serde_json::to_value(&output)?);
                self.record(name, StepStatus::Completed, started.elapsed());
                Ok(output)
            }
            Err(err) => {
                warn!("Workflow {} step {name} failed: {err}", self.id);
                self.record(name, StepStatus::Failed, started.elapsed());
                Err(err)
            }
        }
    }

    /// Pause for `duration` as step `name`; skipped on replay.
    pub async fn sleep(&mut self, name: &str, duration: Duration) {
        if self.memo.contains_key(name) {
            self.record(name, StepStatus::Replayed, Duration::ZERO);
            return;
        }

        let started = Instant::now();
        if !duration.is_zero() {
            tokio::time::sleep(duration)
                .instrument(info_span!("workflow_step", workflow = %self.id, step = name))
                .await;
        }
        self.memo.insert(name.to_string(), Value::Null);
        self.record(name, StepStatus::Completed, started.elapsed());
    }

    fn record(&mut self, name: &str, status: StepStatus, elapsed: Duration) {
        self.log.push(StepRecord {
            name: name.to_string(),
            status,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::conversation::ConversationError;

    #[tokio::test]
    async fn completed_steps_are_replayed() -> ConversationResult<()> {
        let executions = AtomicUsize::new(0);
        let counter = &executions;
        let mut run = WorkflowRun::new("wf-1");

        for _ in 0..3 {
            run.begin_attempt();
            let value: u32 = run
                .step("compute", || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ConversationError>(42)
                })
                .await?;
            assert_eq!(value, 42);
        }

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(run.steps().len(), 1);
        assert_eq!(run.steps()[0].status, StepStatus::Replayed);
        assert!(run.is_completed("compute"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_steps_run_again() -> ConversationResult<()> {
        let executions = AtomicUsize::new(0);
        let counter = &executions;
        let mut run = WorkflowRun::new("wf-2");

        let first: ConversationResult<String> = run
            .step("flaky", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ConversationError::StorageUnavailable("disk".to_string()))
            })
            .await;
        assert!(first.is_err());
        assert!(!run.is_completed("flaky"));

        let second: String = run
            .step("flaky", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ConversationError>("done".to_string())
            })
            .await?;
        assert_eq!(second, "done");
        assert_eq!(executions.load(Ordering::SeqCst), 2);

        let statuses: Vec<StepStatus> = run.steps().iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![StepStatus::Failed, StepStatus::Completed]);
        Ok(())
    }

    #[tokio::test]
    async fn sleep_is_skipped_on_replay() {
        let mut run = WorkflowRun::new("wf-3");
        run.sleep("pause", Duration::from_millis(30)).await;
        assert!(run.steps()[0].duration_ms >= 30);

        run.begin_attempt();
        let started = Instant::now();
        run.sleep("pause", Duration::from_millis(30)).await;
        assert!(started.elapsed() < Duration::from_millis(30));
        assert_eq!(run.steps()[0].status, StepStatus::Replayed);
    }

    #[test]
    fn step_records_serialize_camel_case() -> Result<(), serde_json::Error> {
        let record = StepRecord {
            name: "store-user-message".to_string(),
            status: StepStatus::Completed,
            duration_ms: 3,
        };
        let value = serde_json::to_value(&record)?;
        assert_eq!(value["durationMs"], 3);
        assert_eq!(value["status"], "completed");
        Ok(())
    }
}

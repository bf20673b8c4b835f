//! Scriptable in-memory service implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use studybench_core::models::{
    CreditBalance, HistoryRecord, InvocationOutput, SourceFile, ToolKind, ToolOutput, ToolParams,
};
use studybench_core::{
    BalanceError, BalanceService, HistoryCommitter, InvokeError, MeteredInvoker, TextExtractor,
};

/// [`TextExtractor`] whose per-file outcomes are scripted by name.
///
/// Unscripted files echo their bytes back as UTF-8, so simple tests need no
/// setup at all. An optional delay makes in-flight extraction observable
/// under a paused clock.
#[derive(Default)]
pub struct MockExtractor {
    outcomes: Mutex<HashMap<String, Result<String, String>>>,
    delay: Option<Duration>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            delay: Some(delay),
        }
    }

    /// Script the outcome for a file name.
    pub fn script(&self, name: &str, outcome: Result<String, String>) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(name.to_string(), outcome);
    }

    async fn extract(&self, file: &SourceFile) -> anyhow::Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.outcomes.lock().unwrap().get(&file.name).cloned();
        match scripted {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(String::from_utf8_lossy(&file.data).into_owned()),
        }
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract_from_image(&self, file: &SourceFile) -> anyhow::Result<String> {
        self.extract(file).await
    }

    async fn extract_from_document(&self, file: &SourceFile) -> anyhow::Result<String> {
        self.extract(file).await
    }
}

/// [`MeteredInvoker`] with a queue of scripted responses.
///
/// Responses are consumed in push order; once the queue is empty every call
/// returns `Ok` with a plain `"ok"` text output and no reported cost.
#[derive(Default)]
pub struct MockInvoker {
    responses: Mutex<Vec<Result<InvocationOutput, InvokeError>>>,
    calls: AtomicUsize,
    last_text: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_response(&self, response: Result<InvocationOutput, InvokeError>) {
        self.responses.lock().unwrap().push(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text sent with the most recent invocation.
    pub fn last_text(&self) -> Option<String> {
        self.last_text.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeteredInvoker for MockInvoker {
    async fn invoke(
        &self,
        _tool: ToolKind,
        text: &str,
        _params: &ToolParams,
    ) -> Result<InvocationOutput, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock().unwrap() = Some(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };
        next.unwrap_or_else(|| {
            Ok(InvocationOutput {
                output: ToolOutput::Text("ok".to_string()),
                credits_used: None,
            })
        })
    }
}

/// [`BalanceService`] backed by a settable total, with one-shot failure
/// injection.
pub struct MockBalance {
    total: AtomicI64,
    fail_next: Mutex<Option<BalanceError>>,
    calls: AtomicUsize,
}

impl MockBalance {
    pub fn new(total: i64) -> Self {
        Self {
            total: AtomicI64::new(total),
            fail_next: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_total(&self, total: i64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn fail_next(&self, err: BalanceError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceService for MockBalance {
    async fn get_balance(&self) -> Result<CreditBalance, BalanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        Ok(CreditBalance {
            total_credits: self.total.load(Ordering::SeqCst),
            plan: None,
            renews_at: None,
        })
    }
}

/// [`HistoryCommitter`] that records saved entries, with one-shot failure
/// injection.
#[derive(Default)]
pub struct MockCommitter {
    saved: Mutex<Vec<HistoryRecord>>,
    fail_next: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockCommitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<HistoryRecord> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryCommitter for MockCommitter {
    async fn save(&self, record: &HistoryRecord) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            anyhow::bail!(message);
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

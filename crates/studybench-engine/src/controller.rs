//! The tool invocation state machine.
//!
//! One controller instance per tool. A submission is validated, gated on
//! cooldown and credits, sent exactly once, and reconciled against the
//! server's response; a successful result can later be committed to
//! permanent history as a separate, idempotent action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use studybench_core::constants::{GENERIC_FAILURE_MESSAGE, PARAGRAPH_SEPARATOR};
use studybench_core::models::{
    HistoryRecord, InvocationResult, ToolParams, ToolProfile,
};
use studybench_core::{HistoryCommitter, InvokeError, MeteredInvoker, ToolError};

use crate::attachments::AttachmentSet;
use crate::cooldown::CooldownTimer;
use crate::credits::CreditLedgerView;

/// Observable controller state.
///
/// Validation, the cooldown gate, and the credit pre-check run
/// synchronously inside [`ToolInvocationController::submit`]; their
/// refusals surface as typed errors without touching the stored state,
/// except the credit pre-check, which lands in `InsufficientCredits`
/// exactly like the server-reported case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Submitting,
    Succeeded,
    RateLimited,
    InsufficientCredits { required: i64, available: i64 },
    Failed { message: String },
    Committing,
    Committed,
}

/// Outcome of a `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The invocation ran and its result is stored.
    Completed,
    /// Another submission was already in flight; this call did nothing.
    Ignored,
}

/// Outcome of a `commit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The result was already committed; no history call was made.
    AlreadyCommitted,
}

/// A successful run plus the inputs needed for a later history commit.
struct StoredRun {
    result: InvocationResult,
    input_text: String,
    parameters: ToolParams,
}

/// Clears the in-flight flag when the submission future completes or is
/// dropped at an await point.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Pre-flight validation over a snapshot of the inputs.
///
/// Pure so the refusal rules are testable without any service or runtime.
fn validate_submission(
    profile: &ToolProfile,
    params: &ToolParams,
    combined: &str,
    typed_is_empty: bool,
    any_pending: bool,
    failed_names: &[String],
) -> Result<(), ToolError> {
    if params.kind() != profile.kind {
        return Err(ToolError::InvalidParams(format!(
            "expected {} parameters, got {}",
            profile.kind,
            params.kind()
        )));
    }
    if any_pending {
        return Err(ToolError::AttachmentsPending);
    }
    if combined.is_empty() {
        if typed_is_empty && !failed_names.is_empty() {
            return Err(ToolError::ExtractionFailed {
                files: failed_names.to_vec(),
            });
        }
        return Err(ToolError::EmptyInput);
    }
    let len = combined.chars().count();
    if len > profile.max_input_chars {
        return Err(ToolError::InputTooLong {
            len,
            max: profile.max_input_chars,
        });
    }
    Ok(())
}

/// One metered tool run: input assembly, gating, single-flight submission,
/// and credit/cooldown reconciliation.
pub struct ToolInvocationController {
    profile: ToolProfile,
    invoker: Arc<dyn MeteredInvoker>,
    committer: Arc<dyn HistoryCommitter>,
    ledger: CreditLedgerView,
    attachments: AttachmentSet,
    cooldown: CooldownTimer,
    input_text: Mutex<String>,
    state: Mutex<ControllerState>,
    stored: Mutex<Option<StoredRun>>,
    in_flight: AtomicBool,
}

impl ToolInvocationController {
    pub fn new(
        profile: ToolProfile,
        invoker: Arc<dyn MeteredInvoker>,
        committer: Arc<dyn HistoryCommitter>,
        ledger: CreditLedgerView,
        attachments: AttachmentSet,
    ) -> Self {
        Self {
            profile,
            invoker,
            committer,
            ledger,
            attachments,
            cooldown: CooldownTimer::new(),
            input_text: Mutex::new(String::new()),
            state: Mutex::new(ControllerState::Idle),
            stored: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn profile(&self) -> &ToolProfile {
        &self.profile
    }

    pub fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    pub fn credits(&self) -> &CreditLedgerView {
        &self.ledger
    }

    pub fn set_input_text(&self, text: impl Into<String>) {
        *self.input_text.lock().unwrap() = text.into();
    }

    pub fn input_text(&self) -> String {
        self.input_text.lock().unwrap().clone()
    }

    pub fn cooldown_seconds(&self) -> u64 {
        self.cooldown.remaining_seconds()
    }

    /// Observable state. A rate-limited state clears itself once the
    /// cooldown elapses.
    pub fn state(&self) -> ControllerState {
        let mut state = self.state.lock().unwrap();
        if *state == ControllerState::RateLimited && !self.cooldown.is_blocking() {
            *state = ControllerState::Idle;
        }
        state.clone()
    }

    /// Current user-facing error message, if any. The rate-limit message
    /// carries the live countdown and disappears with it.
    pub fn current_error(&self) -> Option<String> {
        match self.state() {
            ControllerState::RateLimited => Some(
                ToolError::RateLimited {
                    remaining_seconds: self.cooldown.remaining_seconds(),
                }
                .to_string(),
            ),
            ControllerState::InsufficientCredits {
                required,
                available,
            } => Some(
                ToolError::InsufficientCredits {
                    required,
                    available,
                }
                .to_string(),
            ),
            ControllerState::Failed { message } => Some(message),
            _ => None,
        }
    }

    /// The stored result of the last successful run, if any.
    pub fn result(&self) -> Option<InvocationResult> {
        self.stored
            .lock()
            .unwrap()
            .as_ref()
            .map(|run| run.result.clone())
    }

    fn combined_text(&self) -> String {
        let typed = self.input_text.lock().unwrap().trim().to_string();
        let extracted = self.attachments.combined_extracted_text();
        match (typed.is_empty(), extracted.is_empty()) {
            (false, false) => format!("{typed}{PARAGRAPH_SEPARATOR}{extracted}"),
            (false, true) => typed,
            (true, _) => extracted,
        }
    }

    /// Run one submission attempt end to end.
    ///
    /// At most one outbound invocation per accepted attempt. A re-entrant
    /// call while one is in flight returns [`SubmitOutcome::Ignored`]
    /// instead of queueing a retry, so one user action can never be billed
    /// twice.
    pub async fn submit(&self, params: ToolParams) -> Result<SubmitOutcome, ToolError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!(tool = %self.profile.kind, "Submission already in flight, ignoring");
            return Ok(SubmitOutcome::Ignored);
        }
        // An abandoned submission (caller timeout dropping this future)
        // must not leave the controller refusing every later submit.
        let _guard = FlightGuard(&self.in_flight);
        let outcome = self.submit_inner(params).await;
        outcome.map(|_| SubmitOutcome::Completed)
    }

    async fn submit_inner(&self, params: ToolParams) -> Result<(), ToolError> {
        let typed_is_empty = self.input_text.lock().unwrap().trim().is_empty();
        let combined = self.combined_text();
        validate_submission(
            &self.profile,
            &params,
            &combined,
            typed_is_empty,
            self.attachments.any_pending(),
            &self.attachments.failed_names(),
        )?;

        if self.cooldown.is_blocking() {
            return Err(ToolError::CooldownActive {
                remaining_seconds: self.cooldown.remaining_seconds(),
            });
        }

        // Client-side pre-check to avoid a wasted round trip; the server
        // remains authoritative and its own rejection is handled below.
        let nominal = self.profile.nominal_cost;
        if !self.ledger.has_enough_for(nominal) {
            let available = self.ledger.current();
            *self.state.lock().unwrap() = ControllerState::InsufficientCredits {
                required: nominal,
                available,
            };
            tracing::debug!(
                tool = %self.profile.kind,
                required = nominal,
                available,
                "Refusing submission: insufficient credits"
            );
            return Err(ToolError::InsufficientCredits {
                required: nominal,
                available,
            });
        }

        *self.state.lock().unwrap() = ControllerState::Submitting;
        tracing::info!(
            tool = %self.profile.kind,
            chars = combined.chars().count(),
            "Submitting tool invocation"
        );

        match self
            .invoker
            .invoke(self.profile.kind, &combined, &params)
            .await
        {
            Ok(output) => {
                let credits_used = output.credits_used.unwrap_or(nominal);
                *self.stored.lock().unwrap() = Some(StoredRun {
                    result: InvocationResult {
                        output: output.output,
                        credits_used,
                        committed: false,
                    },
                    input_text: combined,
                    parameters: params,
                });
                *self.state.lock().unwrap() = ControllerState::Succeeded;
                // Attachments are not retained across runs.
                self.attachments.clear();
                // The result is shown immediately; balance sync is
                // eventually consistent.
                let ledger = self.ledger.clone();
                tokio::spawn(async move {
                    let _ = ledger.refresh().await;
                });
                tracing::info!(tool = %self.profile.kind, credits_used, "Invocation succeeded");
                Ok(())
            }
            Err(InvokeError::RateLimited { remaining_seconds }) => {
                self.cooldown.arm(remaining_seconds);
                *self.state.lock().unwrap() = ControllerState::RateLimited;
                tracing::warn!(
                    tool = %self.profile.kind,
                    remaining_seconds,
                    "Invocation rate limited"
                );
                Err(ToolError::RateLimited { remaining_seconds })
            }
            Err(InvokeError::InsufficientCredits {
                required,
                available,
            }) => {
                // The balance may have moved between the pre-check and the
                // server processing the request; resynchronize the mirror.
                *self.state.lock().unwrap() = ControllerState::InsufficientCredits {
                    required,
                    available,
                };
                let ledger = self.ledger.clone();
                tokio::spawn(async move {
                    let _ = ledger.refresh().await;
                });
                tracing::warn!(
                    tool = %self.profile.kind,
                    required,
                    available,
                    "Server reported insufficient credits"
                );
                Err(ToolError::InsufficientCredits {
                    required,
                    available,
                })
            }
            Err(InvokeError::Other(message)) => {
                let message = if message.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message
                };
                *self.state.lock().unwrap() = ControllerState::Failed {
                    message: message.clone(),
                };
                tracing::error!(tool = %self.profile.kind, error = %message, "Invocation failed");
                Err(ToolError::Service(message))
            }
        }
    }

    /// Persist the stored result to permanent history.
    ///
    /// Idempotent: a second call after success performs no history call and
    /// reports [`CommitOutcome::AlreadyCommitted`]. A failed commit leaves
    /// the stored result untouched and retryable.
    pub async fn commit(&self) -> Result<CommitOutcome, ToolError> {
        let record = {
            let stored = self.stored.lock().unwrap();
            let Some(run) = stored.as_ref() else {
                return Err(ToolError::NothingToCommit);
            };
            if run.result.committed {
                return Ok(CommitOutcome::AlreadyCommitted);
            }
            let state = self.state.lock().unwrap().clone();
            if state != ControllerState::Succeeded {
                return Err(ToolError::NothingToCommit);
            }
            HistoryRecord {
                tool: self.profile.kind,
                input_text: run.input_text.clone(),
                output: run.result.output.clone(),
                parameters: run.parameters.clone(),
                credits_used: run.result.credits_used,
                requested_at: Utc::now(),
            }
        };

        *self.state.lock().unwrap() = ControllerState::Committing;
        match self.committer.save(&record).await {
            Ok(()) => {
                if let Some(run) = self.stored.lock().unwrap().as_mut() {
                    run.result.committed = true;
                }
                *self.state.lock().unwrap() = ControllerState::Committed;
                tracing::info!(tool = %self.profile.kind, "Result saved to history");
                Ok(CommitOutcome::Committed)
            }
            Err(err) => {
                // A failed commit never invalidates the displayed result.
                *self.state.lock().unwrap() = ControllerState::Succeeded;
                tracing::warn!(tool = %self.profile.kind, error = %err, "History commit failed");
                Err(ToolError::Service(err.to_string()))
            }
        }
    }

    /// Clear text, attachments, result, and error, returning to idle.
    ///
    /// The cooldown is deliberately untouched: it mirrors a server-enforced
    /// rate limit that outlives local edits.
    pub fn reset(&self) {
        self.input_text.lock().unwrap().clear();
        self.attachments.clear();
        *self.stored.lock().unwrap() = None;
        *self.state.lock().unwrap() = ControllerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use studybench_core::models::{SummaryMode, ToolKind};

    use super::*;

    fn profile() -> ToolProfile {
        ToolProfile {
            kind: ToolKind::Summarize,
            max_input_chars: 10,
            nominal_cost: 1,
        }
    }

    fn params() -> ToolParams {
        ToolParams::Summarize {
            mode: SummaryMode::Concise,
        }
    }

    #[test]
    fn validate_refuses_empty_input() {
        let err =
            validate_submission(&profile(), &params(), "", true, false, &[]).unwrap_err();
        assert_eq!(err, ToolError::EmptyInput);
    }

    #[test]
    fn validate_names_failed_files_when_nothing_else_to_send() {
        let failed = vec!["scan.png".to_string()];
        let err =
            validate_submission(&profile(), &params(), "", true, false, &failed).unwrap_err();
        assert_eq!(err, ToolError::ExtractionFailed { files: failed });

        // Typed text present: the empty-combined branch is unreachable and
        // failed files do not block submission.
        assert!(validate_submission(
            &profile(),
            &params(),
            "hi",
            false,
            false,
            &["scan.png".to_string()]
        )
        .is_ok());
    }

    #[test]
    fn validate_refuses_pending_extraction_first() {
        let err =
            validate_submission(&profile(), &params(), "hello", false, true, &[]).unwrap_err();
        assert_eq!(err, ToolError::AttachmentsPending);
    }

    #[test]
    fn validate_enforces_length_in_chars() {
        let err = validate_submission(&profile(), &params(), "0123456789a", false, false, &[])
            .unwrap_err();
        assert_eq!(err, ToolError::InputTooLong { len: 11, max: 10 });

        // Multi-byte characters count once each.
        assert!(
            validate_submission(&profile(), &params(), "éééééééééé", false, false, &[]).is_ok()
        );
    }

    #[test]
    fn validate_rejects_mismatched_params() {
        let err = validate_submission(
            &profile(),
            &ToolParams::Rewrite {
                style: studybench_core::models::RewriteStyle::Formal,
            },
            "hello",
            false,
            false,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}

//! Studybench Engine
//!
//! Client-side orchestration for metered tool invocations: attachment
//! extraction, credit gating, cooldown handling, and the submit/commit
//! state machine. Front ends (CLI, web, mobile) drive one
//! [`ToolInvocationController`] per tool; all controllers share one
//! [`CreditLedgerView`].

pub mod attachments;
pub mod controller;
pub mod cooldown;
pub mod credits;
pub mod testing;

pub use attachments::{AttachmentSet, PreviewHandle};
pub use controller::{
    CommitOutcome, ControllerState, SubmitOutcome, ToolInvocationController,
};
pub use cooldown::CooldownTimer;
pub use credits::CreditLedgerView;
pub use studybench_core::models::SourceFile;

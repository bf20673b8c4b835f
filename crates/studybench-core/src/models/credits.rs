use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative credit balance as reported by the balance service.
///
/// The engine only mirrors this value; it never decrements it locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditBalance {
    pub total_credits: i64,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub renews_at: Option<DateTime<Utc>>,
}

//! Read-only local mirror of the authoritative credit balance.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use studybench_core::{BalanceError, BalanceService};

/// Shared, refreshable view of the user's credit balance.
///
/// All tool controllers read the same view. The balance is never decremented
/// locally; it is only replaced wholesale from the authoritative source by
/// [`refresh`](CreditLedgerView::refresh), which keeps cross-tool
/// read-modify-write races structurally impossible.
#[derive(Clone)]
pub struct CreditLedgerView {
    service: Arc<dyn BalanceService>,
    balance: Arc<AtomicI64>,
}

impl CreditLedgerView {
    pub fn new(service: Arc<dyn BalanceService>) -> Self {
        Self {
            service,
            balance: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Last-known balance; may be stale until the next refresh.
    pub fn current(&self) -> i64 {
        self.balance.load(Ordering::SeqCst)
    }

    pub fn has_enough_for(&self, cost: i64) -> bool {
        self.current() >= cost
    }

    /// Re-fetch the balance from the authoritative source.
    ///
    /// Transient failures leave the previous value in place. A hard
    /// authentication failure forces the value to 0 so a stale positive
    /// balance is never shown across a broken session.
    pub async fn refresh(&self) -> Result<i64, BalanceError> {
        match self.service.get_balance().await {
            Ok(balance) => {
                let total = balance.total_credits.max(0);
                self.balance.store(total, Ordering::SeqCst);
                tracing::debug!(total_credits = total, "Credit balance refreshed");
                Ok(total)
            }
            Err(BalanceError::Unauthorized) => {
                self.balance.store(0, Ordering::SeqCst);
                tracing::warn!("Balance refresh unauthorized, clearing local balance");
                Err(BalanceError::Unauthorized)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Balance refresh failed, keeping previous value");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBalance;

    #[tokio::test]
    async fn refresh_updates_current() {
        let service = Arc::new(MockBalance::new(12));
        let ledger = CreditLedgerView::new(service.clone());
        assert_eq!(ledger.current(), 0);

        assert_eq!(ledger.refresh().await.unwrap(), 12);
        assert_eq!(ledger.current(), 12);
        assert!(ledger.has_enough_for(12));
        assert!(!ledger.has_enough_for(13));
    }

    #[tokio::test]
    async fn transient_failure_keeps_previous_value() {
        let service = Arc::new(MockBalance::new(8));
        let ledger = CreditLedgerView::new(service.clone());
        ledger.refresh().await.unwrap();

        service.fail_next(BalanceError::Other("timeout".to_string()));
        assert!(ledger.refresh().await.is_err());
        assert_eq!(ledger.current(), 8);
    }

    #[tokio::test]
    async fn unauthorized_forces_zero() {
        let service = Arc::new(MockBalance::new(8));
        let ledger = CreditLedgerView::new(service.clone());
        ledger.refresh().await.unwrap();
        assert_eq!(ledger.current(), 8);

        service.fail_next(BalanceError::Unauthorized);
        assert_eq!(ledger.refresh().await, Err(BalanceError::Unauthorized));
        assert_eq!(ledger.current(), 0);
    }

    #[tokio::test]
    async fn negative_server_balance_clamps_to_zero() {
        let service = Arc::new(MockBalance::new(-3));
        let ledger = CreditLedgerView::new(service);
        assert_eq!(ledger.refresh().await.unwrap(), 0);
        assert_eq!(ledger.current(), 0);
    }
}

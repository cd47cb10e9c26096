use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::models::{FinanceStats, Transaction, TransactionStatus};

/// Body of `PUT /api/finance/update-status/:id`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// The finance REST collaborator
///
/// The backend is the only source of truth for transactions. The view-model reads
/// snapshots through it and asks it to perform mutations; it never creates records.
///
/// Implementations:
/// - [`crate::http_backend::HttpBackend`] talks to the real service
/// - [`StubBackend`] keeps records in memory, for tests and offline use
#[async_trait]
pub trait FinanceBackend: Send + Sync {
    /// `GET /api/finance/transactions`
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>>;

    /// `PUT /api/finance/update-status/:id`
    async fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<()>;

    /// `DELETE /api/finance/delete-transaction/:id`
    async fn delete_transaction(&self, id: &str) -> Result<()>;

    /// `GET /api/finance/stats`
    async fn fetch_stats(&self) -> Result<FinanceStats>;
}

/// Failure the stub should report instead of serving a request
#[derive(Debug, Clone, PartialEq)]
pub enum StubFailure {
    Transport,
    Rejected(String),
    NotFound,
    PermissionDenied,
}

impl StubFailure {
    fn into_error(self, subject: &str) -> LedgerError {
        match self {
            StubFailure::Transport => LedgerError::Transport("connection reset".to_string()),
            StubFailure::Rejected(message) => LedgerError::Rejected(message),
            StubFailure::NotFound => LedgerError::NotFound(subject.to_string()),
            StubFailure::PermissionDenied => {
                LedgerError::PermissionDenied("finance role required".to_string())
            }
        }
    }
}

/// In-memory backend
///
/// Behaves like the finance service: status updates to `completed` stamp a
/// `paid_date`, unknown ids answer with not-found. Failures and response
/// latency can be scripted per request.
///
/// # Example
///
/// ```
/// use finance_ledger::backend::{FinanceBackend, StubBackend, StubFailure};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = StubBackend::new(Vec::new());
/// backend.fail_next(StubFailure::Transport);
///
/// assert!(backend.fetch_transactions().await.is_err());
/// assert!(backend.fetch_transactions().await.unwrap().is_empty());
/// assert_eq!(backend.request_count(), 2);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StubBackend {
    records: Mutex<Vec<Transaction>>,
    stats: Mutex<FinanceStats>,
    failures: Mutex<VecDeque<StubFailure>>,
    delays: Mutex<VecDeque<Duration>>,
    request_count: AtomicUsize,
}

impl StubBackend {
    pub fn new(records: Vec<Transaction>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn with_stats(self, stats: FinanceStats) -> Self {
        *lock(&self.stats) = stats;
        self
    }

    /// Make the next request (of any kind) fail
    pub fn fail_next(&self, failure: StubFailure) {
        lock(&self.failures).push_back(failure);
    }

    /// Hold the next request (of any kind) for `delay` before answering
    ///
    /// A delayed fetch returns the records as they were when the request arrived.
    pub fn delay_next(&self, delay: Duration) {
        lock(&self.delays).push_back(delay);
    }

    /// Replace the server-side records, as if another client changed them
    pub fn set_records(&self, records: Vec<Transaction>) {
        *lock(&self.records) = records;
    }

    pub fn records(&self) -> Vec<Transaction> {
        lock(&self.records).clone()
    }

    /// Number of requests received, failed ones included
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Claim this request's scripted failure and delay, then wait out the delay
    async fn begin_request(&self, subject: &str) -> Result<()> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let failure = lock(&self.failures).pop_front();
        let delay = lock(&self.delays).pop_front();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match failure {
            Some(failure) => Err(failure.into_error(subject)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FinanceBackend for StubBackend {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
        let snapshot = self.records();
        self.begin_request("transactions").await?;
        Ok(snapshot)
    }

    async fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<()> {
        self.begin_request(id).await?;

        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        record.status = update.status;
        if let Some(method) = &update.payment_method {
            record.payment_method = method.clone();
        }
        if update.status == TransactionStatus::Completed && record.paid_date.is_none() {
            record.paid_date = Some(Utc::now());
        }

        Ok(())
    }

    async fn delete_transaction(&self, id: &str) -> Result<()> {
        self.begin_request(id).await?;

        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|tx| tx.id != id);
        if records.len() == before {
            return Err(LedgerError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn fetch_stats(&self) -> Result<FinanceStats> {
        self.begin_request("stats").await?;
        Ok(lock(&self.stats).clone())
    }
}

// Poisoning only happens when a test panics while holding the lock
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

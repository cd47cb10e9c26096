use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{FinanceBackend, StatusUpdate};
use crate::error::{LedgerError, Result};
use crate::export::export_rows;
use crate::filter::{self, FilterCriteria, Page};
use crate::models::{ExportRow, FinanceStats, LedgerSummary, Transaction, TransactionStatus};

/// Client-side ledger of payment transactions
///
/// Owns the list last fetched from the backend (`all_transactions`) and derives
/// the filtered projection the user sees from it. Mutations follow a single
/// discipline:
///
/// 1. **Apply locally** so the change shows immediately
/// 2. **Send** the request to the backend
/// 3. **Success**: reload, so server-side effects (e.g. `paid_date`) come back
/// 4. **Failure**: roll back to the pre-mutation snapshot and return the error
///
/// A record may have at most one mutation outstanding at a time.
///
/// # Concurrency
///
/// The list sits behind an async `RwLock` and is swapped as a whole
/// (`Arc<Vec<_>>`). Network calls never hold the lock, so reads are not blocked
/// by in-flight requests. Every load takes a ticket from a monotonic counter; a
/// response older than the newest load already applied is discarded.
///
/// A mutation whose future is dropped before the backend answers (a timeout,
/// `select!` or an aborted task) is rolled back as if it had failed.
///
/// # Example
///
/// ```no_run
/// use finance_ledger::backend::StubBackend;
/// use finance_ledger::filter::FilterCriteria;
/// use finance_ledger::models::TransactionStatus;
/// use finance_ledger::view_model::TransactionViewModel;
///
/// # #[tokio::main]
/// # async fn main() -> finance_ledger::error::Result<()> {
/// let ledger = TransactionViewModel::new(StubBackend::new(Vec::new()));
/// ledger.load().await?;
///
/// let pending = ledger
///     .visible(&FilterCriteria::new().with_status(TransactionStatus::Pending))
///     .await;
/// for tx in pending {
///     ledger.set_status(&tx.id, TransactionStatus::Completed).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct TransactionViewModel<B: FinanceBackend> {
    backend: Arc<B>,
    state: Arc<RwLock<LedgerState>>,
    /// Ticket of the most recently issued load
    issued: Arc<AtomicU64>,
}

#[derive(Debug, Default)]
struct LedgerState {
    transactions: Arc<Vec<Transaction>>,
    /// Bumped on every change to `transactions`
    generation: u64,
    /// Bumped whenever a server response replaces `transactions`
    load_epoch: u64,
    /// Ticket of the newest load that replaced `transactions`
    applied_ticket: u64,
    in_flight: HashSet<String>,
}

impl LedgerState {
    fn replace(&mut self, transactions: Vec<Transaction>) {
        self.transactions = Arc::new(transactions);
        self.generation += 1;
    }
}

/// What a failed mutation needs in order to undo itself
struct PendingMutation {
    id: String,
    /// The record as it was before the local edit
    original: Transaction,
    index: usize,
    snapshot: Arc<Vec<Transaction>>,
    generation: u64,
    load_epoch: u64,
}

impl<B: FinanceBackend> TransactionViewModel<B> {
    /// Create an empty ledger; call [`load`](Self::load) to populate it
    pub fn new(backend: B) -> Self {
        Self::with_shared_backend(Arc::new(backend))
    }

    pub fn with_shared_backend(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(LedgerState::default())),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Another handle onto the same ledger, for use from a different task
    pub fn clone_handle(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            issued: Arc::clone(&self.issued),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch the full transaction list and make it the ledger's contents
    ///
    /// Records without a resolvable student are dropped as corrupt. On error
    /// the previous list is kept. A response older than one already applied is
    /// discarded and the current list returned instead; a newer load that
    /// failed does not hold back an older one that succeeded.
    pub async fn load(&self) -> Result<Arc<Vec<Transaction>>> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = match self.backend.fetch_transactions().await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "failed to load transactions");
                return Err(e);
            }
        };

        let received = fetched.len();
        let transactions: Vec<Transaction> =
            fetched.into_iter().filter(Transaction::has_student).collect();
        if transactions.len() < received {
            warn!(
                dropped = received - transactions.len(),
                "excluding transactions without a student reference"
            );
        }

        let mut state = self.state.write().await;
        if ticket < state.applied_ticket {
            debug!(
                ticket,
                applied = state.applied_ticket,
                "discarding superseded transaction load"
            );
            return Ok(Arc::clone(&state.transactions));
        }

        state.replace(transactions);
        state.load_epoch += 1;
        state.applied_ticket = ticket;
        info!(count = state.transactions.len(), "transactions loaded");

        Ok(Arc::clone(&state.transactions))
    }

    /// The authoritative list as of the last successful load (plus any
    /// optimistic edits still in flight)
    pub async fn all_transactions(&self) -> Arc<Vec<Transaction>> {
        Arc::clone(&self.state.read().await.transactions)
    }

    pub async fn get(&self, id: &str) -> Option<Transaction> {
        self.state
            .read()
            .await
            .transactions
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
    }

    /// Whether a mutation for `id` is waiting on the backend
    pub async fn is_in_flight(&self, id: &str) -> bool {
        self.state.read().await.in_flight.contains(id)
    }

    /// Filter the current list, keeping its order
    pub async fn apply_filters(&self, criteria: &FilterCriteria) -> Vec<Transaction> {
        let transactions = self.all_transactions().await;
        filter::apply_filters(&transactions, criteria)
    }

    /// Filtered and sorted newest first: what the ledger table shows
    pub async fn visible(&self, criteria: &FilterCriteria) -> Vec<Transaction> {
        let mut visible = self.apply_filters(criteria).await;
        filter::sort_newest_first(&mut visible);
        visible
    }

    pub async fn visible_page(
        &self,
        criteria: &FilterCriteria,
        page: usize,
        page_size: usize,
    ) -> Page<Transaction> {
        filter::paginate(self.visible(criteria).await, page, page_size)
    }

    /// Totals over the visible transactions
    pub async fn summary(&self, criteria: &FilterCriteria) -> LedgerSummary {
        LedgerSummary::from_transactions(&self.visible(criteria).await)
    }

    /// Export rows for the visible transactions
    pub async fn export(&self, criteria: &FilterCriteria) -> Vec<ExportRow> {
        export_rows(&self.visible(criteria).await)
    }

    /// Server-side aggregate figures, passed through untouched
    pub async fn stats(&self) -> Result<FinanceStats> {
        self.backend.fetch_stats().await
    }

    /// Reload the list and fetch stats concurrently
    pub async fn refresh(&self) -> Result<(Arc<Vec<Transaction>>, FinanceStats)> {
        let (transactions, stats) = futures::future::join(self.load(), self.stats()).await;
        Ok((transactions?, stats?))
    }

    /// Change a transaction's status
    pub async fn set_status(&self, id: &str, status: TransactionStatus) -> Result<()> {
        let (guard, _) = self
            .begin_mutation(id, |list, index| list[index].status = status)
            .await?;

        let update = StatusUpdate {
            status,
            payment_method: None,
        };
        let outcome = self.backend.update_status(id, &update).await;

        self.finish_mutation(id, guard, outcome, "status update").await
    }

    /// Change how a transaction was paid; amount and status are left alone
    pub async fn set_payment_method(&self, id: &str, method: &str) -> Result<()> {
        let method = method.trim().to_string();
        let local_method = method.clone();
        let (guard, original) = self
            .begin_mutation(id, move |list, index| list[index].payment_method = local_method)
            .await?;

        // The endpoint expects the status alongside the method
        let update = StatusUpdate {
            status: original.status,
            payment_method: Some(method),
        };
        let outcome = self.backend.update_status(id, &update).await;

        self.finish_mutation(id, guard, outcome, "payment method update")
            .await
    }

    /// Delete a transaction; it disappears from the list until the backend answers
    ///
    /// Confirming with the user is the caller's job.
    pub async fn delete_transaction(&self, id: &str) -> Result<()> {
        let (guard, _) = self
            .begin_mutation(id, |list, index| {
                list.remove(index);
            })
            .await?;

        let outcome = self.backend.delete_transaction(id).await;

        self.finish_mutation(id, guard, outcome, "delete").await
    }

    /// Apply `edit` locally and mark `id` in flight
    ///
    /// Returns the guard that undoes the edit if the mutation is abandoned, and
    /// the record as it was before the edit.
    async fn begin_mutation<F>(&self, id: &str, edit: F) -> Result<(MutationGuard, Transaction)>
    where
        F: FnOnce(&mut Vec<Transaction>, usize),
    {
        let mut state = self.state.write().await;

        if state.in_flight.contains(id) {
            return Err(LedgerError::MutationInFlight(id.to_string()));
        }
        let index = state
            .transactions
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| LedgerError::UnknownTransaction(id.to_string()))?;

        let snapshot = Arc::clone(&state.transactions);
        let original = snapshot[index].clone();

        let mut edited = snapshot.as_ref().clone();
        edit(&mut edited, index);
        state.replace(edited);
        state.in_flight.insert(id.to_string());

        let pending = PendingMutation {
            id: id.to_string(),
            original: original.clone(),
            index,
            snapshot,
            generation: state.generation,
            load_epoch: state.load_epoch,
        };
        let guard = MutationGuard {
            state: Arc::clone(&self.state),
            pending: Some(pending),
        };

        Ok((guard, original))
    }

    async fn finish_mutation(
        &self,
        id: &str,
        guard: MutationGuard,
        outcome: Result<()>,
        action: &str,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if let Some(pending) = guard.disarm() {
                state.in_flight.remove(&pending.id);
                if outcome.is_err() {
                    roll_back(&mut state, pending);
                }
            }
        }

        match outcome {
            Ok(()) => {
                info!(id = %id, action, "transaction updated");
                if let Err(e) = self.load().await {
                    warn!(id = %id, error = %e, "reload after {} failed", action);
                }
                Ok(())
            }
            Err(e) => {
                warn!(id = %id, error = %e, "{} failed", action);
                if e.is_record_gone() {
                    // Deleted elsewhere: show the server's view rather than a stale row
                    if let Err(reload) = self.load().await {
                        warn!(id = %id, error = %reload, "reload after missing record failed");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Owns an outstanding optimistic edit until the backend has answered
///
/// Dropped while still armed, it clears the in-flight mark and rolls the edit
/// back, so an abandoned mutation leaves neither a stale lock nor an
/// unconfirmed change behind.
struct MutationGuard {
    state: Arc<RwLock<LedgerState>>,
    pending: Option<PendingMutation>,
}

impl MutationGuard {
    /// Take the edit back for normal completion
    fn disarm(mut self) -> Option<PendingMutation> {
        self.pending.take()
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        warn!(id = %pending.id, "mutation abandoned before the backend answered; rolling back");

        if let Ok(mut state) = self.state.try_write() {
            abandon(&mut state, pending);
            return;
        }

        // Lock is busy; finish the cleanup once it frees up
        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut state = state.write().await;
                    abandon(&mut state, pending);
                });
            }
            Err(_) => warn!(id = %pending.id, "no runtime left to roll back abandoned mutation"),
        }
    }
}

fn abandon(state: &mut LedgerState, pending: PendingMutation) {
    state.in_flight.remove(&pending.id);
    roll_back(state, pending);
}

/// Undo a failed optimistic edit
///
/// If nothing else touched the list, the saved snapshot goes back verbatim. If
/// other local edits landed in between, only this record is restored. If a load
/// replaced the list, it already reflects the server and is left as is.
fn roll_back(state: &mut LedgerState, pending: PendingMutation) {
    if state.load_epoch != pending.load_epoch {
        debug!(id = %pending.id, "list reloaded during mutation; nothing to roll back");
        return;
    }

    if state.generation == pending.generation {
        state.transactions = pending.snapshot;
        state.generation += 1;
        return;
    }

    let mut list = state.transactions.as_ref().clone();
    match list.iter_mut().find(|tx| tx.id == pending.id) {
        Some(tx) => *tx = pending.original,
        None => {
            let index = pending.index.min(list.len());
            list.insert(index, pending.original);
        }
    }
    state.replace(list);
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Transaction, TransactionStatus};

/// Sentinel selector value meaning "do not filter on this field"
pub const ALL: &str = "all";

/// Criteria for narrowing the ledger down to what the user is looking at
///
/// Every populated field must match (AND-combination). `None` and blank text
/// disable their predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub text: String,
    pub status: Option<TransactionStatus>,
    pub payment_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payment_type(mut self, payment_type: impl Into<String>) -> Self {
        self.payment_type = selector(&payment_type.into());
        self
    }

    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Parse a status selector as it comes from a dropdown: `"all"` or blank disables it
    pub fn parse_status(value: &str) -> Result<Option<TransactionStatus>, String> {
        match selector(value) {
            None => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }

    pub fn matches_text(&self, tx: &Transaction) -> bool {
        let needle = self.text.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();

        let student = tx.student.as_ref();
        let haystacks = [
            student.and_then(|s| s.first_name.as_deref()),
            student.and_then(|s| s.last_name.as_deref()),
            student.and_then(|s| s.regd_no.as_deref()),
            tx.transaction_id.as_deref(),
            tx.receipt_number.as_deref(),
        ];

        haystacks
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn matches_status(&self, tx: &Transaction) -> bool {
        self.status.map_or(true, |status| tx.status == status)
    }

    pub fn matches_payment_type(&self, tx: &Transaction) -> bool {
        self.payment_type
            .as_deref()
            .map_or(true, |payment_type| tx.payment_type == payment_type)
    }

    /// Inclusive on whole days; only applies once both bounds are set
    pub fn matches_date_range(&self, tx: &Transaction) -> bool {
        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => {
                let submitted = tx.submitted_date.date_naive();
                from <= submitted && submitted <= to
            }
            _ => true,
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.matches_text(tx)
            && self.matches_status(tx)
            && self.matches_payment_type(tx)
            && self.matches_date_range(tx)
    }
}

fn selector(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Keep the transactions matching `criteria`, preserving input order
///
/// Pure: nothing is cached between calls, so callers decide when to re-run it
/// (e.g. after debouncing search input).
pub fn apply_filters(transactions: &[Transaction], criteria: &FilterCriteria) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| criteria.matches(tx))
        .cloned()
        .collect()
}

/// Most recently submitted first; ties keep their relative order
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.submitted_date.cmp(&a.submitted_date));
}

/// One page of a longer list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slice `items` into a page; out-of-range pages are clamped to the nearest valid one
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

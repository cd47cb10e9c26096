use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transaction::{Transaction, TransactionStatus};

/// Count and amount for one slice of the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub count: usize,
    pub amount: Decimal,
}

impl Totals {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }
}

/// In-memory totals over a set of transactions
///
/// These are computed locally from whatever list is passed in, unlike
/// [`FinanceStats`], which is displayed exactly as the server reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub overall: Totals,
    pub by_status: BTreeMap<TransactionStatus, Totals>,
    pub receipt_eligible: usize,
}

impl LedgerSummary {
    pub fn from_transactions<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut summary = LedgerSummary::default();
        for status in TransactionStatus::ALL {
            summary.by_status.insert(status, Totals::default());
        }

        for tx in transactions {
            summary.overall.add(tx.amount);
            summary.by_status.entry(tx.status).or_default().add(tx.amount);
            if tx.is_receipt_eligible() {
                summary.receipt_eligible += 1;
            }
        }

        summary
    }

    pub fn status(&self, status: TransactionStatus) -> Totals {
        self.by_status.get(&status).copied().unwrap_or_default()
    }
}

/// Aggregate figures from `GET /api/finance/stats`
///
/// Kept as opaque display values; nothing here is recomputed client-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinanceStats(pub BTreeMap<String, Value>);

impl FinanceStats {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

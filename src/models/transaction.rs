use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::payment_mode::PaymentMode;

/// Lifecycle status of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 4] = [
        TransactionStatus::Pending,
        TransactionStatus::Completed,
        TransactionStatus::Failed,
        TransactionStatus::Cancelled,
    ];

    /// Wire representation, as sent to and received from the backend
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// A `{name, code}` pair such as a branch or department
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl NamedRef {
    /// Name if present, otherwise the code
    pub fn display(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or_else(|| non_empty(self.code.as_deref()))
    }
}

/// Snapshot of the student a payment belongs to
///
/// The backend populates this reference, and any part of it may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub regd_no: Option<String>,
    #[serde(default)]
    pub branch: Option<NamedRef>,
    #[serde(default)]
    pub department: Option<NamedRef>,
}

impl StudentRef {
    /// "first last", trimmed; `None` when both parts are missing or blank
    pub fn full_name(&self) -> Option<String> {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    pub fn has_id(&self) -> bool {
        non_empty(self.id.as_deref()).is_some()
    }
}

/// Payment transaction as served by the finance backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub student: Option<StudentRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_method: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    pub submitted_date: DateTime<Utc>,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
}

impl Transaction {
    /// Whether the record references a resolvable student
    ///
    /// Records without one are treated as corrupt and kept out of the ledger.
    pub fn has_student(&self) -> bool {
        self.student.as_ref().is_some_and(StudentRef::has_id)
    }

    /// Receipts may only be downloaded or printed for completed payments
    pub fn is_receipt_eligible(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Whether a payment-gateway order or payment id is attached
    pub fn has_gateway_reference(&self) -> bool {
        non_empty(self.razorpay_order_id.as_deref()).is_some()
            || non_empty(self.razorpay_payment_id.as_deref()).is_some()
    }

    pub fn payment_mode(&self) -> PaymentMode {
        PaymentMode::derive(self)
    }
}

/// Only the transactions a receipt may be issued for
pub fn receipt_eligible(transactions: &[Transaction]) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.is_receipt_eligible())
        .collect()
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Legacy records carry explicit `null`s where newer ones omit the key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use finance_ledger::backend::StubBackend;
use finance_ledger::models::{NamedRef, StudentRef, Transaction, TransactionStatus};
use finance_ledger::TransactionViewModel;
use rust_decimal::Decimal;

/// Noon UTC on the given day
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Helper to create a student reference
pub fn make_student(id: &str, first: &str, last: &str, regd_no: &str) -> StudentRef {
    StudentRef {
        id: Some(id.to_string()),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        regd_no: Some(regd_no.to_string()),
        branch: Some(NamedRef {
            name: Some("Computer Science".to_string()),
            code: Some("CSE".to_string()),
        }),
        department: Some(NamedRef {
            name: Some("Engineering".to_string()),
            code: Some("ENG".to_string()),
        }),
    }
}

/// Helper to create a transaction with all commonly varied fields
pub fn make_transaction(
    id: &str,
    student: Option<StudentRef>,
    amount: Decimal,
    status: TransactionStatus,
    payment_method: &str,
    submitted: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        student,
        amount,
        payment_type: "academic".to_string(),
        payment_method: payment_method.to_string(),
        status,
        transaction_id: Some(format!("TXN-{}", id.to_uppercase())),
        receipt_number: Some(format!("RCPT-{}", id.to_uppercase())),
        submitted_date: submitted,
        paid_date: None,
        notes: None,
        razorpay_order_id: None,
        razorpay_payment_id: None,
    }
}

/// Helper to create a pending cash payment for a named student
pub fn make_pending(id: &str, first: &str, regd_no: &str, amount: Decimal) -> Transaction {
    make_transaction(
        id,
        Some(make_student(&format!("s-{}", id), first, "Kumar", regd_no)),
        amount,
        TransactionStatus::Pending,
        "cash",
        at(2024, 3, 15),
    )
}

/// A ledger over an in-memory backend seeded with `records`, already loaded
pub async fn loaded_ledger(records: Vec<Transaction>) -> TransactionViewModel<StubBackend> {
    let ledger = TransactionViewModel::new(StubBackend::new(records));
    ledger.load().await.unwrap();
    ledger
}

/// The fixture ledger as the finance API would serve it
pub fn fixture_transactions() -> Vec<Transaction> {
    let body = std::fs::read_to_string("tests/fixtures/transactions.json").unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&body).unwrap();
    serde_json::from_value(envelope["transactions"].clone()).unwrap()
}

pub fn ids(transactions: &[Transaction]) -> Vec<&str> {
    transactions.iter().map(|tx| tx.id.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_make_pending() {
        let tx = make_pending("t1", "Asha", "R1", dec!(500));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.amount, dec!(500));
        assert!(tx.has_student());
        assert_eq!(tx.student.unwrap().regd_no.as_deref(), Some("R1"));
    }

    #[test]
    fn test_fixture_loads() {
        let transactions = fixture_transactions();
        assert_eq!(transactions.len(), 6);
    }
}

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::transaction::non_empty;
use crate::models::{ExportRow, NamedRef, Transaction, NOT_AVAILABLE};

/// Day/month/year, no zero padding
const EXPORT_DATE_FORMAT: &str = "%-d/%-m/%Y";

/// Flatten transactions into export rows
///
/// Total over any input: missing student, branch, department or optional
/// fields turn into `N/A` instead of failing.
pub fn export_rows(transactions: &[Transaction]) -> Vec<ExportRow> {
    transactions.iter().map(export_row).collect()
}

fn export_row(tx: &Transaction) -> ExportRow {
    let student = tx.student.as_ref();

    ExportRow {
        transaction_id: or_na(tx.transaction_id.as_deref()),
        receipt_number: or_na(tx.receipt_number.as_deref()),
        student_name: student
            .and_then(|s| s.full_name())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        registration_no: or_na(student.and_then(|s| s.regd_no.as_deref())),
        branch: or_na(student.and_then(|s| s.branch.as_ref()).and_then(NamedRef::display)),
        department: or_na(
            student
                .and_then(|s| s.department.as_ref())
                .and_then(NamedRef::display),
        ),
        amount: tx.amount,
        payment_type: or_na(Some(tx.payment_type.as_str())),
        payment_method: or_na(Some(tx.payment_method.as_str())),
        status: tx.status.to_string(),
        submitted_date: format_date(&tx.submitted_date),
        paid_date: tx
            .paid_date
            .as_ref()
            .map(format_date)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        notes: or_na(tx.notes.as_deref()),
    }
}

fn or_na(value: Option<&str>) -> String {
    non_empty(value).unwrap_or(NOT_AVAILABLE).to_string()
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format(EXPORT_DATE_FORMAT).to_string()
}

/// Write export rows as CSV, header first
pub fn write_export<W: Write>(rows: &[ExportRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    if rows.is_empty() {
        // serialize() emits the header lazily, so an empty export needs it spelled out
        csv_writer.write_record(ExportRow::HEADERS)?;
    }

    for row in rows {
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// File name for an export taken on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("finance_transactions_{}.csv", date.format("%Y-%m-%d"))
}

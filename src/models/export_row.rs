use rust_decimal::Decimal;
use serde::Serialize;

/// Placeholder for values that are missing from the source record
pub const NOT_AVAILABLE: &str = "N/A";

/// One flattened line of the transaction export
///
/// Field order is the column order of the exported file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Transaction ID")]
    pub transaction_id: String,
    #[serde(rename = "Receipt Number")]
    pub receipt_number: String,
    #[serde(rename = "Student Name")]
    pub student_name: String,
    #[serde(rename = "Registration No")]
    pub registration_no: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Amount")]
    pub amount: Decimal,
    #[serde(rename = "Payment Type")]
    pub payment_type: String,
    #[serde(rename = "Payment Method")]
    pub payment_method: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Submitted Date")]
    pub submitted_date: String,
    #[serde(rename = "Paid Date")]
    pub paid_date: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl ExportRow {
    pub const HEADERS: [&'static str; 13] = [
        "Transaction ID",
        "Receipt Number",
        "Student Name",
        "Registration No",
        "Branch",
        "Department",
        "Amount",
        "Payment Type",
        "Payment Method",
        "Status",
        "Submitted Date",
        "Paid Date",
        "Notes",
    ];
}

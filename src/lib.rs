pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod filter;
pub mod http_backend;
pub mod models;
pub mod view_model;

use std::io::Write;

use error::Result;
use filter::FilterCriteria;
use models::Transaction;

pub use view_model::TransactionViewModel;

/// Filter transactions, sort them newest first and write them to `writer` as CSV
///
/// Returns the number of rows written.
pub fn export_transactions<W: Write>(
    transactions: &[Transaction],
    criteria: &FilterCriteria,
    writer: W,
) -> Result<usize> {
    let mut selected = filter::apply_filters(transactions, criteria);
    filter::sort_newest_first(&mut selected);

    let rows = export::export_rows(&selected);
    export::write_export(&rows, writer)?;

    Ok(rows.len())
}

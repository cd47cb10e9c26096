pub mod export_row;
pub mod payment_mode;
pub mod summary;
pub mod transaction;

pub use export_row::{ExportRow, NOT_AVAILABLE};
pub use payment_mode::{derive_payment_mode, PaymentMode};
pub use summary::{FinanceStats, LedgerSummary, Totals};
pub use transaction::{receipt_eligible, NamedRef, StudentRef, Transaction, TransactionStatus};

use thiserror::Error;

/// Errors surfaced by the ledger client and view-model
///
/// None of these are thrown into rendering: every operation returns them to the
/// caller, which turns them into a user-visible message.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transaction {0} no longer exists")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unexpected response ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transaction {0} already has an update in flight")]
    MutationInFlight(String),

    #[error("Unknown transaction {0}")]
    UnknownTransaction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LedgerError {
    /// The record was deleted elsewhere; the caller should reconcile with the server
    pub fn is_record_gone(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LedgerError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => LedgerError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

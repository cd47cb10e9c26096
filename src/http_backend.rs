use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{FinanceBackend, StatusUpdate};
use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::error::{LedgerError, Result};
use crate::models::{FinanceStats, Transaction};

/// Longest slice of a non-JSON error body quoted back to the user
const MAX_ERROR_BODY: usize = 200;

/// [`FinanceBackend`] over the finance REST API
pub struct HttpBackend {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LedgerError::Config(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/finance/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.token() {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<String> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, subject, "finance API responded");

        check_status(status, &body, subject)?;
        Ok(body)
    }
}

#[async_trait]
impl FinanceBackend for HttpBackend {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
        let request = self.client.get(self.url("transactions"));
        let body = self.send(request, "transactions").await?;
        decode_transactions(&body)
    }

    async fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("update-status/{}", id)))
            .json(update);
        let body = self.send(request, id).await?;
        parse_ack(&body)
    }

    async fn delete_transaction(&self, id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("delete-transaction/{}", id)));
        let body = self.send(request, id).await?;
        parse_ack(&body)
    }

    async fn fetch_stats(&self) -> Result<FinanceStats> {
        let request = self.client.get(self.url("stats"));
        let body = self.send(request, "stats").await?;
        decode_stats(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionsEnvelope {
    #[serde(default)]
    transactions: Vec<Value>,
}

/// Map a non-2xx status onto the error taxonomy
fn check_status(status: StatusCode, body: &str, subject: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(match status {
        StatusCode::NOT_FOUND => LedgerError::NotFound(subject.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LedgerError::PermissionDenied(message),
        _ => LedgerError::Http {
            status: status.as_u16(),
            message,
        },
    })
}

/// `message` from a JSON error body, else a prefix of the raw text
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message") {
            return Some(message.clone());
        }
    }

    Some(body.chars().take(MAX_ERROR_BODY).collect())
}

/// `{ success, message? }`; `success: false` is a business rejection
fn parse_ack(body: &str) -> Result<()> {
    let ack: Ack = serde_json::from_str(body)?;
    if ack.success {
        Ok(())
    } else {
        Err(LedgerError::Rejected(
            ack.message
                .unwrap_or_else(|| "the server did not accept the change".to_string()),
        ))
    }
}

/// Decode `{ transactions: [...] }`, skipping records that do not decode
fn decode_transactions(body: &str) -> Result<Vec<Transaction>> {
    let envelope: TransactionsEnvelope = serde_json::from_str(body)?;

    let mut transactions = Vec::with_capacity(envelope.transactions.len());
    for raw in envelope.transactions {
        let id = raw
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("<missing id>")
            .to_string();
        match serde_json::from_value::<Transaction>(raw) {
            Ok(tx) => transactions.push(tx),
            Err(e) => warn!(id = %id, error = %e, "skipping malformed transaction"),
        }
    }

    Ok(transactions)
}

/// Stats are either the body itself or wrapped in a `stats` field
fn decode_stats(body: &str) -> Result<FinanceStats> {
    let value: Value = serde_json::from_str(body)?;
    let stats = match value {
        Value::Object(mut map) => match map.remove("stats") {
            Some(inner @ Value::Object(_)) => serde_json::from_value(inner)?,
            Some(other) => {
                map.insert("stats".to_string(), other);
                FinanceStats(map.into_iter().collect())
            }
            None => FinanceStats(map.into_iter().collect()),
        },
        _ => FinanceStats::default(),
    };

    Ok(stats)
}

use std::fmt;

use serde::{Serialize, Serializer};

use super::transaction::Transaction;

/// Method strings that always classify as an online payment
const ONLINE_METHODS: [&str; 4] = ["online", "razorpay", "custom_upi", "custom_qr"];

/// Display classification of how a payment was made
///
/// Derived from `payment_method` and independent of the payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMode {
    Cash,
    Cheque,
    Online,
    /// Unknown or legacy method with no gateway reference
    CashOrCheque,
}

impl PaymentMode {
    /// Classify a transaction
    ///
    /// An explicit method string wins over inference from gateway ids. Method
    /// strings are compared exactly as stored; `"CASH"` is not `cash`.
    pub fn derive(tx: &Transaction) -> Self {
        match tx.payment_method.as_str() {
            "cash" => PaymentMode::Cash,
            "cheque" => PaymentMode::Cheque,
            m if ONLINE_METHODS.contains(&m) => PaymentMode::Online,
            _ if tx.has_gateway_reference() => PaymentMode::Online,
            _ => PaymentMode::CashOrCheque,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Cheque => "Cheque",
            PaymentMode::Online => "Online",
            PaymentMode::CashOrCheque => "Cash/Cheque",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl Serialize for PaymentMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

/// Free-function form used by callers that only hold a reference
pub fn derive_payment_mode(tx: &Transaction) -> PaymentMode {
    PaymentMode::derive(tx)
}

//! Error types for the ch_ledger library.

use rust_decimal::Decimal;
use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while importing journals or exporting payments.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Structural CSV problem in the Crésus export.
    #[error("CSV file is malformed, please check the separator: {0}")]
    MalformedInput(#[from] csv::Error),

    /// Date token matching none of the accepted formats.
    #[error("Can't parse date '{value}'")]
    InvalidDate { row: usize, value: String },

    /// Invalid amount format.
    #[error("Invalid amount format: '{0}'")]
    InvalidAmount(String),

    /// No account carries the given code.
    #[error("No account with code {0}")]
    UnknownAccount(String),

    /// The store refused a move whose debits and credits differ.
    #[error("Move '{reference}' is unbalanced: debit {debit} != credit {credit}")]
    UnbalancedMove {
        reference: String,
        debit: Decimal,
        credit: Decimal,
    },

    /// Record store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Error reading a JSON chart or payment order.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error writing or reading XML.
    #[error("XML error: {0}")]
    XmlError(String),

    /// Invalid format specified.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Payment order still in draft state.
    #[error("Payment '{0}' is in draft state. Please confirm it first.")]
    PaymentDraft(String),

    /// No bank account selected for a party of the payment.
    #[error("No bank selected for {party}")]
    MissingBank { party: String },

    /// Bank of a party has no BIC.
    #[error("The bank of {party} has no BIC number")]
    MissingBic { party: String },

    /// Bank account of a party has neither IBAN nor account number.
    #[error("The bank account of {party} has no IBAN and no account number")]
    MissingAccountNumber { party: String },

    /// Rendered document does not satisfy the message schema.
    #[error("XML is not valid: {0}")]
    SchemaViolation(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl From<serde_xml_rs::Error> for Error {
    fn from(err: serde_xml_rs::Error) -> Self {
        Error::XmlError(err.to_string())
    }
}

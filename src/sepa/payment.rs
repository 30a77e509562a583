//! Payment order records exported as SEPA messages.

use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Workflow state of a payment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Draft,
    Open,
    Done,
    Cancel,
}

/// Bank holding an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub name: String,
    #[serde(default)]
    pub bic: Option<String>,
}

/// Bank account of the company or of a creditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    #[serde(default)]
    pub iban: Option<String>,

    /// Domestic account number, used when there is no IBAN.
    #[serde(default)]
    pub acc_number: Option<String>,

    #[serde(default)]
    pub owner_name: Option<String>,

    pub bank: Bank,
}

impl BankAccount {
    /// IBAN without blanks, if set.
    pub fn iban(&self) -> Option<String> {
        non_blank(&self.iban).map(|iban| iban.split_whitespace().collect())
    }

    pub fn account_number(&self) -> Option<&str> {
        non_blank(&self.acc_number)
    }

    pub fn bic(&self) -> Option<&str> {
        non_blank(&self.bank.bic)
    }
}

/// How an order is paid, and from which company account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMode {
    pub name: String,
    #[serde(default)]
    pub bank: Option<BankAccount>,
}

/// One transfer of a payment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLine {
    /// Line reference, used as end-to-end id.
    pub name: String,

    pub amount: Decimal,

    /// ISO 4217 currency code.
    pub currency: String,

    pub creditor_name: String,

    #[serde(default)]
    pub bank: Option<BankAccount>,

    /// Unstructured remittance information.
    #[serde(default)]
    pub communication: Option<String>,
}

/// Payment order exported as one SEPA message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub reference: String,
    pub state: PaymentState,

    /// Name of the initiating company.
    pub company_name: String,

    pub mode: PaymentMode,

    pub execution_date: NaiveDate,

    #[serde(default)]
    pub lines: Vec<PaymentLine>,
}

impl PaymentOrder {
    /// Load a payment order from JSON.
    pub fn from_read<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Sum of all line amounts.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount).sum()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

//! SEPA payment messages.
//!
//! Renders payment orders as ISO 20022 XML and validates the result before
//! handing it out.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use ch_ledger::sepa::{MessageFormat, PaymentOrder};
//!
//! let order = PaymentOrder::from_read(File::open("order.json")?)?;
//! let format: MessageFormat = "pain.001".parse()?;
//! let xml = format.compute_export(&order)?;
//! println!("{}", xml);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod pain001;
pub mod payment;
mod schema;

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

pub use payment::{Bank, BankAccount, PaymentLine, PaymentMode, PaymentOrder, PaymentState};

/// Supported SEPA message formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// Customer credit transfer initiation, pain.001.001.03
    #[default]
    Pain001,
}

impl FromStr for MessageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pain.001" | "pain.001.001.03" | "pain001" => Ok(MessageFormat::Pain001),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version())
    }
}

impl MessageFormat {
    /// Full message version identifier.
    pub fn version(&self) -> &'static str {
        match self {
            MessageFormat::Pain001 => "pain.001.001.03",
        }
    }

    /// XML namespace of the message schema.
    pub fn namespace(&self) -> &'static str {
        match self {
            MessageFormat::Pain001 => pain001::NAMESPACE,
        }
    }

    /// Render and validate a payment order, stamped with the local time.
    pub fn compute_export(&self, order: &PaymentOrder) -> Result<String> {
        match self {
            MessageFormat::Pain001 => pain001::compute_export(order),
        }
    }

    /// Render and validate a payment order with a given creation time.
    pub fn render_at(&self, order: &PaymentOrder, created_at: NaiveDateTime) -> Result<String> {
        match self {
            MessageFormat::Pain001 => pain001::render_at(order, created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("pain.001".parse::<MessageFormat>().unwrap(), MessageFormat::Pain001);
        assert_eq!(
            "PAIN.001.001.03".parse::<MessageFormat>().unwrap(),
            MessageFormat::Pain001
        );
        assert!("pain.008".parse::<MessageFormat>().is_err());
    }

    #[test]
    fn test_format_names() {
        assert_eq!(MessageFormat::Pain001.to_string(), "pain.001.001.03");
        assert!(MessageFormat::Pain001.namespace().ends_with("pain.001.001.03"));
    }
}

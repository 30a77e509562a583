//! Common types shared by the journal importer and the record store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a persisted move.
    MoveId
);
record_id!(
    /// Identifier of a general ledger account.
    AccountId
);
record_id!(
    /// Identifier of a tax record.
    TaxId
);
record_id!(
    /// Identifier of an analytic (cost/profit center) account.
    AnalyticAccountId
);
record_id!(
    /// Identifier of an accounting journal.
    JournalId
);
record_id!(
    /// Identifier of a currency.
    CurrencyId
);

/// General ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// Tax record, optionally mapped to a Crésus tax code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    pub id: TaxId,
    pub name: String,

    /// Tax rate in percent.
    #[serde(default)]
    pub amount: Decimal,

    /// Whether the tax is included in the price it applies to.
    #[serde(default)]
    pub price_include: bool,

    /// Crésus tax name this tax stands for.
    #[serde(default)]
    pub cresus_mapping: Option<String>,
}

impl Tax {
    /// Lightweight reference carried by move lines.
    pub fn to_ref(&self) -> TaxRef {
        TaxRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Analytic account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticAccount {
    pub id: AnalyticAccountId,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// Accounting journal moves are posted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: JournalId,
    pub code: String,
    #[serde(default)]
    pub name: String,

    /// Currency of the journal, stamped on every imported line.
    #[serde(default)]
    pub currency: Option<CurrencyId>,
}

/// One decoded line of a Crésus export, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// Booking date, normalized from `DD.MM.YY` or `DD.MM.YYYY`.
    pub date: NaiveDate,

    /// Debit account code, or `...` when the row has no debit side.
    pub debit: String,

    /// Credit account code, or `...` when the row has no credit side.
    pub credit: String,

    /// Piece number shared by all rows of one move.
    pub pce: String,

    /// Free-text label.
    pub label: String,

    /// Signed amount in de_CH notation.
    pub amount: String,

    /// Crésus tax code.
    pub tax_code: String,

    pub currency_amount: String,

    pub analytic_account: String,
}

/// Reference to a tax as stored on a move line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRef {
    pub id: TaxId,
    pub name: String,
}

/// Share of a line's amount assigned to analytic accounts, in percent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticDistribution(pub BTreeMap<AnalyticAccountId, Decimal>);

impl AnalyticDistribution {
    /// Distribution assigning the whole line to one analytic account.
    pub fn full(account: AnalyticAccountId) -> Self {
        let mut shares = BTreeMap::new();
        shares.insert(account, Decimal::ONE_HUNDRED);
        Self(shares)
    }

    /// Sum of all shares.
    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }
}

/// One leg of a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    /// Line label.
    pub name: String,

    pub debit: Decimal,

    pub credit: Decimal,

    pub account_id: AccountId,

    pub account_code: String,

    pub currency: Option<CurrencyId>,

    /// Tax whose computation produced this line.
    pub tax_line: Option<TaxRef>,

    /// Taxes applied to this line.
    pub taxes: Vec<TaxRef>,

    pub analytic_distribution: Option<AnalyticDistribution>,
}

/// Balanced accounting transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub date: NaiveDate,

    /// Crésus piece number.
    pub reference: String,

    pub journal_id: JournalId,

    pub lines: Vec<MoveLine>,
}

impl Move {
    /// Sum of the debit column.
    pub fn total_debit(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    /// Sum of the credit column.
    pub fn total_credit(&self) -> Decimal {
        self.lines.iter().map(|line| line.credit).sum()
    }

    /// Check the double-entry invariant.
    pub fn is_balanced(&self) -> bool {
        self.total_debit() == self.total_credit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(debit: Decimal, credit: Decimal) -> MoveLine {
        MoveLine {
            name: "Sale".into(),
            debit,
            credit,
            account_id: AccountId(1),
            account_code: "1000".into(),
            currency: None,
            tax_line: None,
            taxes: Vec::new(),
            analytic_distribution: None,
        }
    }

    #[test]
    fn test_move_balance() {
        let mut mv = Move {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            reference: "A1".into(),
            journal_id: JournalId(1),
            lines: vec![line(dec!(100.00), dec!(0)), line(dec!(0), dec!(100.00))],
        };
        assert!(mv.is_balanced());
        assert_eq!(mv.total_debit(), dec!(100));

        mv.lines.push(line(dec!(0.05), dec!(0)));
        assert!(!mv.is_balanced());
    }

    #[test]
    fn test_full_distribution() {
        let distribution = AnalyticDistribution::full(AnalyticAccountId(7));
        assert_eq!(distribution.total(), dec!(100));
        assert_eq!(distribution.0.get(&AnalyticAccountId(7)), Some(&dec!(100)));
    }
}

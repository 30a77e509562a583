//! Builders turning reconstructed legs into store records.

use crate::error::{Error, Result};
use crate::store::LedgerLookup;
use crate::types::{AnalyticDistribution, CurrencyId, JournalId, Move, MoveLine, TaxRef};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Everything needed to build one [`MoveLine`].
#[derive(Debug, Clone)]
pub struct LineTemplate<'a> {
    pub name: &'a str,
    pub debit: Decimal,
    pub credit: Decimal,
    pub account_code: &'a str,

    /// Crésus tax code; empty when the row carries none.
    pub tax_code: &'a str,

    /// Analytic account code; empty when the row carries none.
    pub analytic_code: &'a str,

    /// Taxes applied to the line.
    pub taxes: &'a [TaxRef],

    pub currency: Option<CurrencyId>,
}

/// Resolve the codes of a line template and build the line.
///
/// An unknown account aborts with [`Error::UnknownAccount`]. Tax and
/// analytic codes that do not resolve leave the line without them.
pub fn prepare_line<L>(lookup: &L, template: &LineTemplate<'_>) -> Result<MoveLine>
where
    L: LedgerLookup + ?Sized,
{
    let account = lookup
        .find_account_by_code(template.account_code)?
        .ok_or_else(|| Error::UnknownAccount(template.account_code.to_string()))?;

    let tax_line = if template.tax_code.is_empty() {
        None
    } else {
        let tax = lookup.find_tax_by_mapping(template.tax_code)?;
        if tax.is_none() {
            log::warn!("no price-including tax mapped to '{}'", template.tax_code);
        }
        tax.map(|tax| tax.to_ref())
    };

    let analytic_distribution = if template.analytic_code.is_empty() {
        None
    } else {
        let analytic = lookup.find_analytic_account_by_code(template.analytic_code)?;
        if analytic.is_none() {
            log::warn!("no analytic account with code '{}'", template.analytic_code);
        }
        analytic.map(|analytic| AnalyticDistribution::full(analytic.id))
    };

    Ok(MoveLine {
        name: template.name.to_string(),
        debit: template.debit,
        credit: template.credit,
        account_id: account.id,
        account_code: account.code,
        currency: template.currency,
        tax_line,
        taxes: template.taxes.to_vec(),
        analytic_distribution,
    })
}

/// Assemble a move header around its lines.
pub fn prepare_move(
    lines: Vec<MoveLine>,
    date: NaiveDate,
    reference: String,
    journal_id: JournalId,
) -> Move {
    Move {
        date,
        reference,
        journal_id,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Chart, MemoryStore};
    use crate::types::{Account, AccountId, AnalyticAccount, AnalyticAccountId, Tax, TaxId};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn store() -> MemoryStore {
        MemoryStore::new(Chart {
            accounts: vec![Account {
                id: AccountId(1),
                code: "1000".into(),
                name: "Cash".into(),
            }],
            taxes: vec![Tax {
                id: TaxId(4),
                name: "VAT 7.7%".into(),
                amount: dec!(7.7),
                price_include: true,
                cresus_mapping: Some("VAT".into()),
            }],
            analytic_accounts: vec![AnalyticAccount {
                id: AnalyticAccountId(2),
                code: "PRJ".into(),
                name: "Project".into(),
            }],
            journals: Vec::new(),
        })
    }

    fn template<'a>(account_code: &'a str) -> LineTemplate<'a> {
        LineTemplate {
            name: "Sale",
            debit: dec!(10),
            credit: dec!(0),
            account_code,
            tax_code: "",
            analytic_code: "",
            taxes: &[],
            currency: Some(CurrencyId(5)),
        }
    }

    #[test]
    fn test_prepare_plain_line() {
        let line = prepare_line(&store(), &template("1000")).unwrap();
        assert_eq!(line.account_id, AccountId(1));
        assert_eq!(line.account_code, "1000");
        assert_eq!(line.currency, Some(CurrencyId(5)));
        assert_eq!(line.tax_line, None);
        assert_eq!(line.analytic_distribution, None);
    }

    #[test]
    fn test_prepare_line_resolves_tax_and_analytic() {
        let mut template = template("1000");
        template.tax_code = "VAT";
        template.analytic_code = "PRJ";

        let line = prepare_line(&store(), &template).unwrap();
        assert_eq!(line.tax_line.map(|tax| tax.id), Some(TaxId(4)));
        assert_eq!(
            line.analytic_distribution,
            Some(AnalyticDistribution::full(AnalyticAccountId(2)))
        );
    }

    #[test]
    fn test_prepare_line_soft_misses() {
        let mut template = template("1000");
        template.tax_code = "TVA";
        template.analytic_code = "NOPE";

        let line = prepare_line(&store(), &template).unwrap();
        assert_eq!(line.tax_line, None);
        assert_eq!(line.analytic_distribution, None);
    }

    #[test]
    fn test_prepare_line_unknown_account() {
        match prepare_line(&store(), &template("4242")) {
            Err(Error::UnknownAccount(code)) => assert_eq!(code, "4242"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

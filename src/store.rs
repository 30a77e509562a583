//! Record store port used by the importer, and its in-memory implementation.

use crate::error::{Error, Result};
use crate::types::{Account, AnalyticAccount, Journal, Move, MoveId, Tax};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Read side of the record store.
pub trait LedgerLookup {
    /// Find the account carrying `code`.
    fn find_account_by_code(&self, code: &str) -> Result<Option<Account>>;

    /// Find a price-including tax mapped to the Crésus tax name `code`.
    fn find_tax_by_mapping(&self, code: &str) -> Result<Option<Tax>>;

    /// Find the analytic account carrying `code`.
    fn find_analytic_account_by_code(&self, code: &str) -> Result<Option<AnalyticAccount>>;
}

/// Write side of the record store.
///
/// Created moves only become visible after [`commit`](LedgerStore::commit);
/// [`rollback`](LedgerStore::rollback) discards everything created since the
/// last commit.
pub trait LedgerStore: LedgerLookup {
    /// Persist a move and return its id.
    fn create_move(&mut self, mv: &Move) -> Result<MoveId>;

    /// Make all moves created since the last commit permanent.
    fn commit(&mut self) -> Result<()>;

    /// Discard all moves created since the last commit.
    fn rollback(&mut self);
}

/// Chart data used to seed a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(default)]
    pub taxes: Vec<Tax>,

    #[serde(default)]
    pub analytic_accounts: Vec<AnalyticAccount>,

    #[serde(default)]
    pub journals: Vec<Journal>,
}

impl Chart {
    /// Load a chart from JSON.
    pub fn from_read<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Find a journal by its code.
    pub fn journal(&self, code: &str) -> Option<&Journal> {
        self.journals.iter().find(|journal| journal.code == code)
    }
}

/// In-memory record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    chart: Chart,
    committed: BTreeMap<MoveId, Move>,
    staged: Vec<(MoveId, Move)>,
    next_id: u64,
}

impl MemoryStore {
    /// Create a store over the given chart.
    pub fn new(chart: Chart) -> Self {
        Self {
            chart,
            committed: BTreeMap::new(),
            staged: Vec::new(),
            next_id: 1,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Get a committed move.
    pub fn get_move(&self, id: MoveId) -> Option<&Move> {
        self.committed.get(&id)
    }

    /// Committed moves in creation order.
    pub fn moves(&self) -> impl Iterator<Item = (&MoveId, &Move)> {
        self.committed.iter()
    }

    pub fn move_count(&self) -> usize {
        self.committed.len()
    }
}

impl LedgerLookup for MemoryStore {
    fn find_account_by_code(&self, code: &str) -> Result<Option<Account>> {
        Ok(self
            .chart
            .accounts
            .iter()
            .find(|account| account.code == code)
            .cloned())
    }

    fn find_tax_by_mapping(&self, code: &str) -> Result<Option<Tax>> {
        Ok(self
            .chart
            .taxes
            .iter()
            .find(|tax| tax.price_include && tax.cresus_mapping.as_deref() == Some(code))
            .cloned())
    }

    fn find_analytic_account_by_code(&self, code: &str) -> Result<Option<AnalyticAccount>> {
        Ok(self
            .chart
            .analytic_accounts
            .iter()
            .find(|account| account.code == code)
            .cloned())
    }
}

impl LedgerStore for MemoryStore {
    fn create_move(&mut self, mv: &Move) -> Result<MoveId> {
        if !mv.is_balanced() {
            return Err(Error::UnbalancedMove {
                reference: mv.reference.clone(),
                debit: mv.total_debit(),
                credit: mv.total_credit(),
            });
        }

        let id = MoveId(self.next_id);
        self.next_id += 1;
        self.staged.push((id, mv.clone()));
        Ok(id)
    }

    fn commit(&mut self) -> Result<()> {
        self.committed.extend(self.staged.drain(..));
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, JournalId, TaxId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const CHART: &str = r#"{
        "accounts": [{"id": 1, "code": "1000", "name": "Cash"}],
        "taxes": [
            {"id": 1, "name": "VAT excl", "amount": "7.7", "price_include": false, "cresus_mapping": "VAT"},
            {"id": 2, "name": "VAT incl", "amount": "7.7", "price_include": true, "cresus_mapping": "VAT"}
        ],
        "analytic_accounts": [{"id": 3, "code": "PRJ"}],
        "journals": [{"id": 9, "code": "MISC", "currency": 5}]
    }"#;

    fn store() -> MemoryStore {
        MemoryStore::new(Chart::from_read(CHART.as_bytes()).unwrap())
    }

    fn empty_move(reference: &str) -> Move {
        Move {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            reference: reference.into(),
            journal_id: JournalId(9),
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_lookups() {
        let store = store();
        assert_eq!(
            store.find_account_by_code("1000").unwrap().map(|a| a.id),
            Some(AccountId(1))
        );
        assert!(store.find_account_by_code("9999").unwrap().is_none());

        // Only price-including taxes are candidates.
        let tax = store.find_tax_by_mapping("VAT").unwrap().unwrap();
        assert_eq!(tax.id, TaxId(2));
        assert_eq!(tax.amount, dec!(7.7));
        assert!(store.find_tax_by_mapping("TVA").unwrap().is_none());

        assert!(store.find_analytic_account_by_code("PRJ").unwrap().is_some());
        assert_eq!(store.chart().journal("MISC").map(|j| j.id), Some(JournalId(9)));
    }

    #[test]
    fn test_commit_and_rollback() {
        let mut store = store();

        let first = store.create_move(&empty_move("A1")).unwrap();
        store.commit().unwrap();

        let second = store.create_move(&empty_move("A2")).unwrap();
        store.rollback();

        assert_eq!(store.move_count(), 1);
        assert!(store.get_move(first).is_some());
        assert!(store.get_move(second).is_none());
    }

    #[test]
    fn test_rejects_unbalanced_move() {
        use crate::types::MoveLine;

        let mut mv = empty_move("A1");
        mv.lines.push(MoveLine {
            name: "Sale".into(),
            debit: dec!(10),
            credit: dec!(0),
            account_id: AccountId(1),
            account_code: "1000".into(),
            currency: None,
            tax_line: None,
            taxes: Vec::new(),
            analytic_distribution: None,
        });

        let mut store = store();
        assert!(matches!(
            store.create_move(&mv),
            Err(Error::UnbalancedMove { .. })
        ));
    }
}

//! Crésus journal import.
//!
//! Drives the whole pipeline (decode, read, regroup, persist) and turns any
//! failure into a rollback plus a report pointing at the offending row.

use crate::cresus_format::{decode_input, CresusReader};
use crate::error::Result;
use crate::reconstruct::MoveAccumulator;
use crate::store::LedgerStore;
use crate::types::{Journal, Move, MoveId};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// State of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImportState {
    #[default]
    Draft,
    Done,
    Error,
}

/// Outcome of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    /// All moves were persisted.
    Success(Vec<MoveId>),
    /// Nothing was persisted; `row` is the 1-based row being processed.
    Failure { row: usize, message: String },
}

impl ImportResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportResult::Success(_))
    }
}

/// One import of a Crésus export into a journal.
#[derive(Debug, Clone)]
pub struct CresusImport {
    journal: Journal,
    state: ImportState,
    report: Option<String>,
    imported_move_ids: Vec<MoveId>,
    index: usize,
}

impl CresusImport {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: ImportState::Draft,
            report: None,
            imported_move_ids: Vec::new(),
            index: 0,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Error report of a failed run.
    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Moves created by a successful run.
    pub fn imported_move_ids(&self) -> &[MoveId] {
        &self.imported_move_ids
    }

    /// Row being processed, 1-based; 0 before the first row.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Import a raw Crésus export.
    ///
    /// Either every move of the file is committed to `store`, or nothing is.
    ///
    /// # Examples
    ///
    /// ```
    /// use ch_ledger::import::{CresusImport, ImportResult};
    /// use ch_ledger::store::{Chart, MemoryStore};
    /// use ch_ledger::types::{Account, AccountId, Journal, JournalId};
    ///
    /// let chart = Chart {
    ///     accounts: vec![
    ///         Account { id: AccountId(1), code: "1000".into(), name: "Cash".into() },
    ///         Account { id: AccountId(2), code: "2200".into(), name: "VAT due".into() },
    ///     ],
    ///     ..Default::default()
    /// };
    /// let journal = Journal { id: JournalId(1), code: "MISC".into(), name: String::new(), currency: None };
    /// let mut store = MemoryStore::new(chart);
    ///
    /// let mut import = CresusImport::new(journal);
    /// let result = import.import_file(b"01.01.20\t1000\t2200\tA1\tSale\t100.00\n", &mut store);
    /// assert!(matches!(result, ImportResult::Success(ref ids) if ids.len() == 1));
    /// ```
    pub fn import_file<S>(&mut self, input: &[u8], store: &mut S) -> ImportResult
    where
        S: LedgerStore + ?Sized,
    {
        self.index = 0;
        self.imported_move_ids.clear();
        self.report = None;

        if let Err(err) = self.run(input, store).and_then(|()| store.commit()) {
            log::error!("Crésus import failed at row {}: {}", self.index, err);
            store.rollback();
            self.imported_move_ids.clear();

            let message = err.to_string();
            self.state = ImportState::Error;
            self.report = Some(format!("Error (at row {}): {}", self.index, message));
            return ImportResult::Failure {
                row: self.index,
                message,
            };
        }

        log::info!(
            "imported {} moves into journal {}",
            self.imported_move_ids.len(),
            self.journal.code
        );
        self.state = ImportState::Done;
        ImportResult::Success(self.imported_move_ids.clone())
    }

    fn run<S>(&mut self, input: &[u8], store: &mut S) -> Result<()>
    where
        S: LedgerStore + ?Sized,
    {
        let text = decode_input(input);
        let mut accumulator = MoveAccumulator::new(&self.journal);

        for (position, row) in CresusReader::from_read(text.as_bytes()).enumerate() {
            self.index = position + 1;
            let row = row?;

            if let Some(mv) = accumulator.close_if_new(&row) {
                let id = store.create_move(&mv)?;
                self.imported_move_ids.push(id);
            }
            accumulator.push(&row, &*store)?;
        }

        if let Some(mv) = accumulator.finish() {
            let id = store.create_move(&mv)?;
            self.imported_move_ids.push(id);
        }

        Ok(())
    }
}

/// Write moves as a stable, human-readable listing.
pub fn describe_moves<'a, W, I>(writer: &mut W, moves: I, journal: &Journal) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Move>,
{
    for (position, mv) in moves.into_iter().enumerate() {
        if position > 0 {
            writeln!(writer)?;
        }
        describe_move(writer, mv, journal)?;
    }

    Ok(())
}

fn describe_move<W: Write>(writer: &mut W, mv: &Move, journal: &Journal) -> Result<()> {
    writeln!(writer, "move ‘{}’", mv.reference)?;
    writeln!(writer, "  (dated {})", mv.date)?;
    writeln!(writer, "  (in journal {})", journal.code)?;
    writeln!(writer, "  with lines:")?;

    for line in &mv.lines {
        writeln!(writer, "    line “{}”", line.name)?;
        if !line.debit.is_zero() {
            writeln!(writer, "      debit = {}", line.debit)?;
        }
        if !line.credit.is_zero() {
            writeln!(writer, "      credit = {}", line.credit)?;
        }
        writeln!(writer, "      account is ‘{}’", line.account_code)?;
        if let Some(tax) = &line.tax_line {
            writeln!(writer, "      originator tax is ‘{}’", tax.name)?;
        }
        if !line.taxes.is_empty() {
            let names: Vec<&str> = line.taxes.iter().map(|tax| tax.name.as_str()).collect();
            writeln!(writer, "      taxes = (‘{}’)", names.join("’, ‘"))?;
        }
    }

    Ok(())
}

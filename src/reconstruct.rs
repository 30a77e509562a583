//! Regrouping of flat Crésus rows into balanced moves.
//!
//! Crésus writes a plain transfer as a single row carrying both accounts.
//! Moves with more legs are spread over several rows sharing one piece
//! number (`pce`), each row leaving its unused side as [`ELLIPSIS`].
//! Rows of one move are always contiguous.

use crate::builder::{prepare_line, prepare_move, LineTemplate};
use crate::cresus_format::{parse_amount, ELLIPSIS};
use crate::error::Result;
use crate::store::LedgerLookup;
use crate::types::{CurrencyId, Journal, JournalId, Move, MoveLine, RawRow, TaxRef};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Move being accumulated.
#[derive(Debug)]
struct OpenMove {
    reference: String,
    date: NaiveDate,
    lines: Vec<MoveLine>,
}

/// Accumulator state of the reconstruction.
///
/// Feed rows in file order: first [`close_if_new`](MoveAccumulator::close_if_new),
/// which hands back a move each time the piece number changes, then
/// [`push`](MoveAccumulator::push). Call [`finish`](MoveAccumulator::finish)
/// for the last move.
#[derive(Debug)]
pub struct MoveAccumulator {
    journal_id: JournalId,
    currency: Option<CurrencyId>,
    current: Option<OpenMove>,

    // Originating tax of the previous row, applied to the lines of the next one.
    pending_tax: Option<TaxRef>,
}

impl MoveAccumulator {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal_id: journal.id,
            currency: journal.currency,
            current: None,
            pending_tax: None,
        }
    }

    /// Close the open move if `row` carries another piece number.
    ///
    /// Call before [`push`](MoveAccumulator::push) so the previous move is
    /// handed out before anything of the new row is parsed.
    pub fn close_if_new(&mut self, row: &RawRow) -> Option<Move> {
        let starts_new = self
            .current
            .as_ref()
            .is_some_and(|open| open.reference != row.pce);
        if starts_new {
            self.close()
        } else {
            None
        }
    }

    /// Add the lines of one row to the open move.
    ///
    /// The row must already have gone through
    /// [`close_if_new`](MoveAccumulator::close_if_new).
    pub fn push<L>(&mut self, row: &RawRow, lookup: &L) -> Result<()>
    where
        L: LedgerLookup + ?Sized,
    {
        debug_assert!(
            self.current
                .as_ref()
                .map_or(true, |open| open.reference == row.pce),
            "row {} pushed into move {:?}",
            row.pce,
            self.current.as_ref().map(|open| &open.reference)
        );

        let (recto, verso) = split_amount(parse_amount(&row.amount)?);

        let taxes: Vec<TaxRef> = self.pending_tax.take().into_iter().collect();
        let mut lines = Vec::with_capacity(2);

        if row.debit != ELLIPSIS {
            lines.push(self.build_line(lookup, row, &row.debit, recto, verso, &taxes)?);
        }
        if row.credit != ELLIPSIS {
            lines.push(self.build_line(lookup, row, &row.credit, verso, recto, &taxes)?);
        }

        if let Some(tax) = lines.iter().rev().find_map(|line| line.tax_line.clone()) {
            self.pending_tax = Some(tax);
        }

        let open = self.current.get_or_insert_with(|| OpenMove {
            reference: row.pce.clone(),
            date: row.date,
            lines: Vec::new(),
        });
        open.date = row.date;
        open.lines.extend(lines);

        Ok(())
    }

    /// Close the last move, if any row was pushed.
    pub fn finish(mut self) -> Option<Move> {
        self.close()
    }

    fn close(&mut self) -> Option<Move> {
        let open = self.current.take()?;
        log::debug!(
            "closing move '{}' with {} lines",
            open.reference,
            open.lines.len()
        );
        Some(prepare_move(
            open.lines,
            open.date,
            open.reference,
            self.journal_id,
        ))
    }

    fn build_line<L>(
        &self,
        lookup: &L,
        row: &RawRow,
        account_code: &str,
        debit: Decimal,
        credit: Decimal,
        taxes: &[TaxRef],
    ) -> Result<MoveLine>
    where
        L: LedgerLookup + ?Sized,
    {
        prepare_line(
            lookup,
            &LineTemplate {
                name: &row.label,
                debit,
                credit,
                account_code,
                tax_code: &row.tax_code,
                analytic_code: &row.analytic_account,
                taxes,
                currency: self.currency,
            },
        )
    }
}

/// Split a signed amount into its (debit side, credit side) magnitudes.
pub fn split_amount(amount: Decimal) -> (Decimal, Decimal) {
    if amount < Decimal::ZERO {
        (Decimal::ZERO, -amount)
    } else {
        (amount, Decimal::ZERO)
    }
}

/// Regroup a whole row sequence into moves.
pub fn reconstruct<I, L>(rows: I, lookup: &L, journal: &Journal) -> Result<Vec<Move>>
where
    I: IntoIterator<Item = Result<RawRow>>,
    L: LedgerLookup + ?Sized,
{
    let mut accumulator = MoveAccumulator::new(journal);
    let mut moves = Vec::new();

    for row in rows {
        let row = row?;
        moves.extend(accumulator.close_if_new(&row));
        accumulator.push(&row, lookup)?;
    }
    moves.extend(accumulator.finish());

    Ok(moves)
}

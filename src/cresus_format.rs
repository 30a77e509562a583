//! Crésus journal export reader.
//!
//! Crésus writes its journal as tab-separated text without a header line.
//! Every line carries the same nine positional columns, see [`FIELD_NAMES`].

use crate::error::{Error, Result};
use crate::types::RawRow;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use encoding_rs::{UTF_8, WINDOWS_1252};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::io::Read;
use std::str::FromStr;

/// Column names of a Crésus export, in file order.
pub const FIELD_NAMES: [&str; 9] = [
    "date",
    "debit",
    "credit",
    "pce",
    "ref",
    "amount",
    "typtvat",
    "currency_amount",
    "analytic_account",
];

/// Placeholder used in the debit or credit column when a row has no account on that side.
pub const ELLIPSIS: &str = "...";

const DELIMITER: u8 = b'\t';

// Both have been sighted in Crésus output.
const DATE_FORMATS: [&str; 2] = ["%d.%m.%y", "%d.%m.%Y"];

const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

/// Lazy reader turning a Crésus export into [`RawRow`]s.
pub struct CresusReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    row: usize,
}

impl<R: Read> CresusReader<R> {
    /// Read a Crésus export from any source implementing `Read`.
    ///
    /// The source must already be UTF-8, see [`decode_input`] for raw bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use ch_ledger::cresus_format::CresusReader;
    ///
    /// let data = "01.01.20\t1000\t2200\tA1\tSale\t100.00\t\t\t\n";
    /// let rows = CresusReader::from_read(data.as_bytes())
    ///     .collect::<ch_ledger::Result<Vec<_>>>()?;
    /// assert_eq!(rows[0].pce, "A1");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read(reader: R) -> Self {
        let records = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();

        CresusReader { records, row: 0 }
    }

    /// Number of records read so far.
    pub fn row(&self) -> usize {
        self.row
    }
}

impl<R: Read> Iterator for CresusReader<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.row += 1;

        Some(
            record
                .map_err(Error::from)
                .and_then(|record| row_from_record(&record, self.row)),
        )
    }
}

fn row_from_record(record: &StringRecord, row: usize) -> Result<RawRow> {
    // Short rows read as empty trailing columns, extra columns are ignored.
    let field = |index: usize| record.get(index).unwrap_or_default().to_string();

    Ok(RawRow {
        date: parse_date(record.get(0).unwrap_or_default(), row)?,
        debit: field(1),
        credit: field(2),
        pce: field(3),
        label: field(4),
        amount: field(5),
        tax_code: field(6),
        currency_amount: field(7),
        analytic_account: field(8),
    })
}

/// Decode raw export bytes.
///
/// UTF-8 is taken as is (a leading BOM is dropped). Anything else is read as
/// Windows-1252, the encoding of older Crésus installations.
pub fn decode_input(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text,
        None => {
            log::debug!("input is not UTF-8, decoding as Windows-1252");
            WINDOWS_1252.decode_without_bom_handling(bytes).0
        }
    }
}

/// Parse a Crésus date (`DD.MM.YY` first, then `DD.MM.YYYY`).
///
/// `row` is only used to identify the offending record in the error.
pub fn parse_date(value: &str, row: usize) -> Result<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| Error::InvalidDate {
            row,
            value: value.to_string(),
        })
}

/// Parse a signed amount written with de_CH digit grouping.
///
/// The group separator is `’`; older exports use `'` instead.
pub fn parse_amount(value: &str) -> Result<Decimal> {
    parse_de_ch(value)
        .or_else(|| parse_de_ch(&value.replace('\'', "’")))
        .ok_or_else(|| Error::InvalidAmount(value.to_string()))
}

fn parse_de_ch(value: &str) -> Option<Decimal> {
    let cleaned: String = value.trim().chars().filter(|c| *c != '’').collect();
    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn read_all(data: &str) -> Result<Vec<RawRow>> {
        CresusReader::from_read(data.as_bytes()).collect()
    }

    #[test]
    fn test_parse_date_both_year_widths() {
        let short = parse_date("01.01.70", 1).unwrap();
        let long = parse_date("01.01.1970", 1).unwrap();
        assert_eq!(short, long);
        assert_eq!(short.to_string(), "1970-01-01");

        assert_eq!(parse_date("31.12.20", 1).unwrap().to_string(), "2020-12-31");
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        match parse_date("2020-01-01", 4) {
            Err(Error::InvalidDate { row, value }) => {
                assert_eq!(row, 4);
                assert_eq!(value, "2020-01-01");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(parse_date("32.01.20", 1).is_err());
    }

    #[test]
    fn test_parse_amount_group_separators() {
        let apostrophe = parse_amount("1'234.50").unwrap();
        let quotation = parse_amount("1’234.50").unwrap();
        assert_eq!(apostrophe, quotation);
        assert_eq!(apostrophe, dec!(1234.50));
    }

    #[test]
    fn test_parse_amount_sign_and_errors() {
        assert_eq!(parse_amount("-12'000.05").unwrap(), dec!(-12000.05));
        assert_eq!(parse_amount("100.00").unwrap(), dec!(100));
        assert!(matches!(parse_amount("12,5"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_reader_positional_fields() {
        let rows = read_all(
            "01.01.20\t1000\t...\tA1\tSale\t-100.00\tVAT\t\tPRJ\n\
             02.01.2020\t...\t2200\tA1\tSale\t100.00\n",
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(rows[0].debit, "1000");
        assert_eq!(rows[0].credit, ELLIPSIS);
        assert_eq!(rows[0].label, "Sale");
        assert_eq!(rows[0].amount, "-100.00");
        assert_eq!(rows[0].tax_code, "VAT");
        assert_eq!(rows[0].analytic_account, "PRJ");

        // Missing trailing columns read as empty.
        assert_eq!(rows[1].tax_code, "");
        assert_eq!(rows[1].analytic_account, "");
    }

    #[test]
    fn test_reader_reports_row_of_bad_date() {
        let mut reader = CresusReader::from_read(
            "01.01.20\t1000\t2200\tA1\tSale\t1.00\n\
             bogus\t1000\t2200\tA2\tSale\t1.00\n"
                .as_bytes(),
        );

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(Error::InvalidDate { row, .. }) => assert_eq!(row, 2),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(reader.row(), 2);
    }

    #[test]
    fn test_reader_rejects_invalid_utf8() {
        let data: &[u8] = b"01.01.20\t1000\t2200\tA1\tSale\t10\xff00\n";
        let mut reader = CresusReader::from_read(data);

        assert!(matches!(reader.next(), Some(Err(Error::MalformedInput(_)))));
    }

    #[test]
    fn test_reader_empty_input() {
        assert!(read_all("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_input() {
        assert_eq!(decode_input(b"\xEF\xBB\xBFCaf\xC3\xA9"), "Café");
        assert_eq!(decode_input(b"Caf\xE9"), "Café");
    }
}

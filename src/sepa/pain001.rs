//! pain.001.001.03 customer credit transfer initiation.

use super::payment::{BankAccount, PaymentLine, PaymentOrder, PaymentState};
use super::schema;
use crate::error::{Error, Result};
use chrono::{Local, NaiveDateTime};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::io::Cursor;

/// Namespace of the pain.001.001.03 schema.
pub const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.001.001.03";

const PAYMENT_METHOD: &str = "TRF";
const CHARGE_BEARER: &str = "SLEV";

/// Render, check and validate a payment order, stamped with the local time.
pub fn compute_export(order: &PaymentOrder) -> Result<String> {
    render_at(order, Local::now().naive_local())
}

/// Render, check and validate a payment order with a given creation time.
pub fn render_at(order: &PaymentOrder, created_at: NaiveDateTime) -> Result<String> {
    check_data(order)?;

    let xml = render(order, created_at)?;
    if xml.trim().is_empty() {
        return Err(Error::XmlError(
            "An error has occurred during XML generation".to_string(),
        ));
    }

    schema::validate(&xml)?;
    log::info!(
        "exported payment order {} with {} transactions",
        order.reference,
        order.lines.len()
    );
    Ok(xml)
}

/// Check that the order holds everything the message needs.
pub fn check_data(order: &PaymentOrder) -> Result<()> {
    if order.state == PaymentState::Draft {
        return Err(Error::PaymentDraft(order.reference.clone()));
    }

    check_bank_account(order.mode.bank.as_ref(), "the company")?;

    for line in &order.lines {
        let creditor = format!("the creditor of {}", line.name);
        check_bank_account(line.bank.as_ref(), &creditor)?;
    }

    Ok(())
}

fn check_bank_account(account: Option<&BankAccount>, party: &str) -> Result<()> {
    let account = account.ok_or_else(|| Error::MissingBank {
        party: party.to_string(),
    })?;

    if account.bic().is_none() {
        return Err(Error::MissingBic {
            party: party.to_string(),
        });
    }
    if account.iban().is_none() && account.account_number().is_none() {
        return Err(Error::MissingAccountNumber {
            party: party.to_string(),
        });
    }

    Ok(())
}

fn render(order: &PaymentOrder, created_at: NaiveDateTime) -> Result<String> {
    let mut xml = XmlWriter::new()?;
    let count = order.lines.len().to_string();
    let total = format_amount(order.total());

    xml.start_element_with_attrs("Document", &[("xmlns", NAMESPACE)])?;
    xml.start_element("CstmrCdtTrfInitn")?;

    xml.start_element("GrpHdr")?;
    xml.text_element("MsgId", &order.reference)?;
    xml.text_element(
        "CreDtTm",
        &created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )?;
    xml.text_element("NbOfTxs", &count)?;
    xml.text_element("CtrlSum", &total)?;
    xml.start_element("InitgPty")?;
    xml.text_element("Nm", &order.company_name)?;
    xml.end_element("InitgPty")?;
    xml.end_element("GrpHdr")?;

    xml.start_element("PmtInf")?;
    xml.text_element("PmtInfId", &order.reference)?;
    xml.text_element("PmtMtd", PAYMENT_METHOD)?;
    xml.text_element("NbOfTxs", &count)?;
    xml.text_element("CtrlSum", &total)?;
    xml.text_element(
        "ReqdExctnDt",
        &order.execution_date.format("%Y-%m-%d").to_string(),
    )?;
    xml.start_element("Dbtr")?;
    xml.text_element("Nm", &order.company_name)?;
    xml.end_element("Dbtr")?;
    if let Some(account) = &order.mode.bank {
        write_account(&mut xml, "DbtrAcct", account)?;
        write_agent(&mut xml, "DbtrAgt", account)?;
    }
    xml.text_element("ChrgBr", CHARGE_BEARER)?;

    for line in &order.lines {
        write_transaction(&mut xml, line)?;
    }

    xml.end_element("PmtInf")?;
    xml.end_element("CstmrCdtTrfInitn")?;
    xml.end_element("Document")?;

    xml.into_string()
}

fn write_transaction(xml: &mut XmlWriter, line: &PaymentLine) -> Result<()> {
    xml.start_element("CdtTrfTxInf")?;

    xml.start_element("PmtId")?;
    xml.text_element("EndToEndId", &line.name)?;
    xml.end_element("PmtId")?;

    xml.start_element("Amt")?;
    xml.text_element_with_attrs(
        "InstdAmt",
        &format_amount(line.amount),
        &[("Ccy", line.currency.as_str())],
    )?;
    xml.end_element("Amt")?;

    if let Some(account) = &line.bank {
        write_agent(xml, "CdtrAgt", account)?;
    }
    xml.start_element("Cdtr")?;
    xml.text_element("Nm", &line.creditor_name)?;
    xml.end_element("Cdtr")?;
    if let Some(account) = &line.bank {
        write_account(xml, "CdtrAcct", account)?;
    }

    if let Some(communication) = line.communication.as_deref().filter(|c| !c.is_empty()) {
        xml.start_element("RmtInf")?;
        xml.text_element("Ustrd", communication)?;
        xml.end_element("RmtInf")?;
    }

    xml.end_element("CdtTrfTxInf")?;
    Ok(())
}

fn write_account(xml: &mut XmlWriter, name: &str, account: &BankAccount) -> Result<()> {
    xml.start_element(name)?;
    xml.start_element("Id")?;
    match (account.iban(), account.account_number()) {
        (Some(iban), _) => {
            xml.text_element("IBAN", &iban)?;
        }
        (None, Some(number)) => {
            xml.start_element("Othr")?;
            xml.text_element("Id", number)?;
            xml.end_element("Othr")?;
        }
        (None, None) => {}
    }
    xml.end_element("Id")?;
    xml.end_element(name)?;
    Ok(())
}

fn write_agent(xml: &mut XmlWriter, name: &str, account: &BankAccount) -> Result<()> {
    xml.start_element(name)?;
    xml.start_element("FinInstnId")?;
    if let Some(bic) = account.bic() {
        xml.text_element("BIC", bic)?;
    }
    xml.end_element("FinInstnId")?;
    xml.end_element(name)?;
    Ok(())
}

/// Format an amount with at least two fraction digits.
pub fn format_amount(amount: Decimal) -> String {
    let s = amount.normalize().to_string();
    match s.find('.') {
        Some(dot) if s.len() - dot - 1 >= 2 => s,
        Some(dot) => format!("{}{}", s, "0".repeat(2 - (s.len() - dot - 1))),
        None => format!("{}.00", s),
    }
}

fn xml_err(err: impl Display) -> Error {
    Error::XmlError(err.to_string())
}

struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    fn new() -> Result<Self> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        Ok(Self { writer })
    }

    fn into_string(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner().into_inner()).map_err(xml_err)
    }

    fn start_element(&mut self, name: &str) -> Result<()> {
        self.start_element_with_attrs(name, &[])
    }

    fn start_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_err)
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.text_element_with_attrs(name, text, &[])
    }

    fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<()> {
        self.start_element_with_attrs(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_err)?;
        self.end_element(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sepa::payment::{Bank, PaymentMode};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn account(iban: Option<&str>, acc_number: Option<&str>, bic: Option<&str>) -> BankAccount {
        BankAccount {
            iban: iban.map(String::from),
            acc_number: acc_number.map(String::from),
            owner_name: None,
            bank: Bank {
                name: "Bank".into(),
                bic: bic.map(String::from),
            },
        }
    }

    fn order() -> PaymentOrder {
        PaymentOrder {
            reference: "PO-0042".into(),
            state: PaymentState::Open,
            company_name: "Muster & Söhne AG".into(),
            mode: PaymentMode {
                name: "SEPA".into(),
                bank: Some(account(
                    Some("CH93 0076 2011 6238 5295 7"),
                    None,
                    Some("UBSWCHZH80A"),
                )),
            },
            execution_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            lines: vec![
                PaymentLine {
                    name: "INV-1".into(),
                    amount: dec!(1250.5),
                    currency: "EUR".into(),
                    creditor_name: "Lieferant GmbH".into(),
                    bank: Some(account(Some("DE89370400440532013000"), None, Some("COBADEFFXXX"))),
                    communication: Some("Invoice 1".into()),
                },
                PaymentLine {
                    name: "INV-2".into(),
                    amount: dec!(80),
                    currency: "EUR".into(),
                    creditor_name: "Handwerker".into(),
                    bank: Some(account(None, Some("12-345678-9"), Some("POFICHBEXXX"))),
                    communication: None,
                },
            ],
        }
    }

    fn created_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 28)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_render_valid_order() {
        let xml = render_at(&order(), created_at()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(&format!("<Document xmlns=\"{}\">", NAMESPACE)));
        assert!(xml.contains("<CreDtTm>2024-02-28T09:30:00</CreDtTm>"));
        assert!(xml.contains("<NbOfTxs>2</NbOfTxs>"));
        assert!(xml.contains("<CtrlSum>1330.50</CtrlSum>"));
        assert!(xml.contains("<Nm>Muster &amp; Söhne AG</Nm>"));
        assert!(xml.contains("<IBAN>CH9300762011623852957</IBAN>"));
        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">1250.50</InstdAmt>"));
        assert!(xml.contains("<Id>12-345678-9</Id>"));
        assert!(xml.contains("<Ustrd>Invoice 1</Ustrd>"));
        assert_eq!(xml.matches("<RmtInf>").count(), 1);
    }

    #[test]
    fn test_draft_order_is_refused() {
        let mut order = order();
        order.state = PaymentState::Draft;
        assert!(matches!(
            render_at(&order, created_at()),
            Err(Error::PaymentDraft(reference)) if reference == "PO-0042"
        ));
    }

    #[test]
    fn test_company_bank_checks() {
        let mut order = order();
        order.mode.bank = None;
        assert!(matches!(check_data(&order), Err(Error::MissingBank { .. })));

        order.mode.bank = Some(account(Some("CH9300762011623852957"), None, None));
        assert!(matches!(check_data(&order), Err(Error::MissingBic { .. })));

        order.mode.bank = Some(account(None, Some(" "), Some("UBSWCHZH80A")));
        assert!(matches!(
            check_data(&order),
            Err(Error::MissingAccountNumber { .. })
        ));
    }

    #[test]
    fn test_creditor_bank_checks_name_the_line() {
        let mut order = order();
        order.lines[1].bank = Some(account(Some("DE89370400440532013000"), None, None));

        match check_data(&order) {
            Err(Error::MissingBic { party }) => assert!(party.contains("INV-2")),
            other => panic!("unexpected result: {:?}", other),
        }

        order.lines[1].bank = None;
        assert!(matches!(check_data(&order), Err(Error::MissingBank { .. })));
    }

    #[test]
    fn test_schema_rejects_long_message_id() {
        let mut order = order();
        order.reference = "X".repeat(36);
        assert!(matches!(
            render_at(&order, created_at()),
            Err(Error::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_schema_rejects_bad_bic() {
        let mut order = order();
        order.lines[0].bank = Some(account(Some("DE89370400440532013000"), None, Some("cobadeff")));
        assert!(matches!(
            render_at(&order, created_at()),
            Err(Error::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(100)), "100.00");
        assert_eq!(format_amount(dec!(1250.5)), "1250.50");
        assert_eq!(format_amount(dec!(0.125)), "0.125");
        assert_eq!(format_amount(dec!(49.900)), "49.90");
    }
}

//! Validation of rendered pain.001.001.03 documents.
//!
//! Covers the parts of the pain.001.001.03 XSD the export can violate:
//! document shape, required elements, text lengths, identifier patterns,
//! decimal facets and the control totals.

use super::pain001::NAMESPACE;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

static BIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{6}[A-Z2-9][A-NP-Z0-9]([A-Z0-9]{3})?$").expect("invalid BIC regex")
});
static IBAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2}[a-zA-Z0-9]{1,30}$").expect("invalid IBAN regex"));
static CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("invalid currency regex"));
static NB_OF_TXS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,15}$").expect("invalid NbOfTxs regex"));

const MAX_TOTAL_DIGITS: usize = 18;
const AMOUNT_FRACTION_DIGITS: u32 = 5;
const DECIMAL_FRACTION_DIGITS: u32 = 17;
const PAYMENT_METHODS: [&str; 3] = ["CHK", "TRF", "TRA"];
const CHARGE_BEARERS: [&str; 4] = ["DEBT", "CRED", "SHAR", "SLEV"];

/// Validate a rendered document, failing with [`Error::SchemaViolation`].
pub fn validate(xml: &str) -> Result<()> {
    check_document_shape(xml)?;

    let document: DocumentXml = serde_xml_rs::from_str(xml)
        .map_err(|e| Error::SchemaViolation(format!("document structure: {}", e)))?;

    check_initiation(&document.initiation)
}

fn violation(path: &str, message: impl AsRef<str>) -> Error {
    Error::SchemaViolation(format!("{}: {}", path, message.as_ref()))
}

// Well-formedness and root element.
fn check_document_shape(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if !seen_root {
                    seen_root = true;
                    if start.local_name().as_ref() != b"Document" {
                        return Err(violation("/", "root element must be Document"));
                    }

                    let mut namespace = None;
                    for attr in start.attributes() {
                        let attr = attr.map_err(|e| Error::XmlError(e.to_string()))?;
                        if attr.key.as_ref() == b"xmlns" {
                            namespace = Some(attr.value.into_owned());
                        }
                    }
                    if namespace.as_deref() != Some(NAMESPACE.as_bytes()) {
                        return Err(violation("Document", "wrong or missing namespace"));
                    }
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(_) if !seen_root => {
                return Err(violation("/", "empty document"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(violation("/", "no root element"));
    }
    if depth != 0 {
        return Err(violation("/", "unclosed elements"));
    }
    Ok(())
}

fn check_initiation(initiation: &InitiationXml) -> Result<()> {
    let header = &initiation.grp_hdr;
    max_text("GrpHdr/MsgId", &header.msg_id, 35)?;
    iso_date_time("GrpHdr/CreDtTm", &header.cre_dt_tm)?;
    let declared = count("GrpHdr/NbOfTxs", &header.nb_of_txs)?;
    if let Some(name) = &header.initg_pty.nm {
        max_text("GrpHdr/InitgPty/Nm", name, 140)?;
    }

    if initiation.pmt_inf.is_empty() {
        return Err(violation("CstmrCdtTrfInitn", "at least one PmtInf is required"));
    }

    let mut transactions = 0usize;
    let mut sum = Decimal::ZERO;
    for payment in &initiation.pmt_inf {
        let (payment_count, payment_sum) = check_payment(payment)?;
        transactions += payment_count;
        sum += payment_sum;
    }

    if declared != transactions {
        return Err(violation(
            "GrpHdr/NbOfTxs",
            format!("declares {} transactions, found {}", declared, transactions),
        ));
    }
    if let Some(ctrl_sum) = &header.ctrl_sum {
        let ctrl_sum = decimal("GrpHdr/CtrlSum", ctrl_sum, DECIMAL_FRACTION_DIGITS)?;
        if ctrl_sum != sum {
            return Err(violation(
                "GrpHdr/CtrlSum",
                format!("{} does not match the total {}", ctrl_sum, sum),
            ));
        }
    }

    Ok(())
}

fn check_payment(payment: &PaymentInformationXml) -> Result<(usize, Decimal)> {
    max_text("PmtInf/PmtInfId", &payment.pmt_inf_id, 35)?;
    if !PAYMENT_METHODS.contains(&payment.pmt_mtd.as_str()) {
        return Err(violation(
            "PmtInf/PmtMtd",
            format!("unknown method '{}'", payment.pmt_mtd),
        ));
    }
    iso_date("PmtInf/ReqdExctnDt", &payment.reqd_exctn_dt)?;
    if let Some(name) = &payment.dbtr.nm {
        max_text("PmtInf/Dbtr/Nm", name, 140)?;
    }
    check_account("PmtInf/DbtrAcct", &payment.dbtr_acct)?;
    check_agent("PmtInf/DbtrAgt", &payment.dbtr_agt)?;
    if let Some(bearer) = &payment.chrg_br {
        if !CHARGE_BEARERS.contains(&bearer.as_str()) {
            return Err(violation(
                "PmtInf/ChrgBr",
                format!("unknown charge bearer '{}'", bearer),
            ));
        }
    }

    if payment.cdt_trf_tx_inf.is_empty() {
        return Err(violation("PmtInf", "at least one CdtTrfTxInf is required"));
    }

    let mut sum = Decimal::ZERO;
    for transaction in &payment.cdt_trf_tx_inf {
        sum += check_transaction(transaction)?;
    }

    let transactions = payment.cdt_trf_tx_inf.len();
    if let Some(nb_of_txs) = &payment.nb_of_txs {
        let declared = count("PmtInf/NbOfTxs", nb_of_txs)?;
        if declared != transactions {
            return Err(violation(
                "PmtInf/NbOfTxs",
                format!("declares {} transactions, found {}", declared, transactions),
            ));
        }
    }
    if let Some(ctrl_sum) = &payment.ctrl_sum {
        let ctrl_sum = decimal("PmtInf/CtrlSum", ctrl_sum, DECIMAL_FRACTION_DIGITS)?;
        if ctrl_sum != sum {
            return Err(violation(
                "PmtInf/CtrlSum",
                format!("{} does not match the total {}", ctrl_sum, sum),
            ));
        }
    }

    Ok((transactions, sum))
}

fn check_transaction(transaction: &TransactionXml) -> Result<Decimal> {
    max_text("CdtTrfTxInf/PmtId/EndToEndId", &transaction.pmt_id.end_to_end_id, 35)?;
    if let Some(instruction) = &transaction.pmt_id.instr_id {
        max_text("CdtTrfTxInf/PmtId/InstrId", instruction, 35)?;
    }

    let instructed = &transaction.amt.instd_amt;
    if !CURRENCY.is_match(&instructed.ccy) {
        return Err(violation(
            "CdtTrfTxInf/Amt/InstdAmt/@Ccy",
            format!("'{}' is not a currency code", instructed.ccy),
        ));
    }
    let amount = decimal(
        "CdtTrfTxInf/Amt/InstdAmt",
        &instructed.value,
        AMOUNT_FRACTION_DIGITS,
    )?;
    if amount < Decimal::ZERO {
        return Err(violation("CdtTrfTxInf/Amt/InstdAmt", "amount must not be negative"));
    }

    if let Some(agent) = &transaction.cdtr_agt {
        check_agent("CdtTrfTxInf/CdtrAgt", agent)?;
    }
    if let Some(name) = transaction.cdtr.as_ref().and_then(|party| party.nm.as_ref()) {
        max_text("CdtTrfTxInf/Cdtr/Nm", name, 140)?;
    }
    if let Some(account) = &transaction.cdtr_acct {
        check_account("CdtTrfTxInf/CdtrAcct", account)?;
    }
    if let Some(remittance) = &transaction.rmt_inf {
        for text in &remittance.ustrd {
            max_text("CdtTrfTxInf/RmtInf/Ustrd", text, 140)?;
        }
    }

    Ok(amount)
}

fn check_account(path: &str, account: &AccountXml) -> Result<()> {
    match (&account.id.iban, &account.id.othr) {
        (Some(iban), None) => {
            if !IBAN.is_match(iban) {
                return Err(violation(path, format!("'{}' is not an IBAN", iban)));
            }
            Ok(())
        }
        (None, Some(other)) => max_text(path, &other.id, 34),
        _ => Err(violation(path, "Id needs exactly one of IBAN or Othr")),
    }
}

fn check_agent(path: &str, agent: &AgentXml) -> Result<()> {
    match &agent.fin_instn_id.bic {
        Some(bic) if BIC.is_match(bic) => Ok(()),
        Some(bic) => Err(violation(path, format!("'{}' is not a BIC", bic))),
        None => Err(violation(path, "missing BIC")),
    }
}

fn max_text(path: &str, value: &str, max: usize) -> Result<()> {
    let length = value.chars().count();
    if length == 0 {
        return Err(violation(path, "must not be empty"));
    }
    if length > max {
        return Err(violation(path, format!("length {} exceeds {}", length, max)));
    }
    Ok(())
}

fn count(path: &str, value: &str) -> Result<usize> {
    if !NB_OF_TXS.is_match(value) {
        return Err(violation(path, format!("'{}' is not a transaction count", value)));
    }
    value
        .parse()
        .map_err(|_| violation(path, format!("'{}' is out of range", value)))
}

fn decimal(path: &str, value: &str, max_fraction: u32) -> Result<Decimal> {
    let amount = Decimal::from_str(value)
        .map_err(|_| violation(path, format!("'{}' is not a decimal", value)))?;

    if amount.scale() > max_fraction {
        return Err(violation(
            path,
            format!("more than {} fraction digits", max_fraction),
        ));
    }
    if amount.mantissa().unsigned_abs().to_string().len() > MAX_TOTAL_DIGITS {
        return Err(violation(
            path,
            format!("more than {} digits", MAX_TOTAL_DIGITS),
        ));
    }
    Ok(amount)
}

fn iso_date(path: &str, value: &str) -> Result<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| violation(path, format!("'{}' is not an ISO date", value)))
}

fn iso_date_time(path: &str, value: &str) -> Result<()> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|_| ())
        .map_err(|_| violation(path, format!("'{}' is not an ISO date time", value)))
}

// XML structure definitions
#[derive(Debug, Deserialize)]
#[serde(rename = "Document")]
struct DocumentXml {
    #[serde(rename = "CstmrCdtTrfInitn")]
    initiation: InitiationXml,
}

#[derive(Debug, Deserialize)]
struct InitiationXml {
    #[serde(rename = "GrpHdr")]
    grp_hdr: GroupHeaderXml,
    #[serde(rename = "PmtInf", default)]
    pmt_inf: Vec<PaymentInformationXml>,
}

#[derive(Debug, Deserialize)]
struct GroupHeaderXml {
    #[serde(rename = "MsgId")]
    msg_id: String,
    #[serde(rename = "CreDtTm")]
    cre_dt_tm: String,
    #[serde(rename = "NbOfTxs")]
    nb_of_txs: String,
    #[serde(rename = "CtrlSum")]
    ctrl_sum: Option<String>,
    #[serde(rename = "InitgPty")]
    initg_pty: PartyXml,
}

#[derive(Debug, Deserialize)]
struct PartyXml {
    #[serde(rename = "Nm")]
    nm: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentInformationXml {
    #[serde(rename = "PmtInfId")]
    pmt_inf_id: String,
    #[serde(rename = "PmtMtd")]
    pmt_mtd: String,
    #[serde(rename = "NbOfTxs")]
    nb_of_txs: Option<String>,
    #[serde(rename = "CtrlSum")]
    ctrl_sum: Option<String>,
    #[serde(rename = "ReqdExctnDt")]
    reqd_exctn_dt: String,
    #[serde(rename = "Dbtr")]
    dbtr: PartyXml,
    #[serde(rename = "DbtrAcct")]
    dbtr_acct: AccountXml,
    #[serde(rename = "DbtrAgt")]
    dbtr_agt: AgentXml,
    #[serde(rename = "ChrgBr")]
    chrg_br: Option<String>,
    #[serde(rename = "CdtTrfTxInf", default)]
    cdt_trf_tx_inf: Vec<TransactionXml>,
}

#[derive(Debug, Deserialize)]
struct AccountXml {
    #[serde(rename = "Id")]
    id: AccountIdXml,
}

#[derive(Debug, Deserialize)]
struct AccountIdXml {
    #[serde(rename = "IBAN")]
    iban: Option<String>,
    #[serde(rename = "Othr")]
    othr: Option<OtherAccountIdXml>,
}

#[derive(Debug, Deserialize)]
struct OtherAccountIdXml {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct AgentXml {
    #[serde(rename = "FinInstnId")]
    fin_instn_id: FinancialInstitutionIdXml,
}

#[derive(Debug, Deserialize)]
struct FinancialInstitutionIdXml {
    #[serde(rename = "BIC")]
    bic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionXml {
    #[serde(rename = "PmtId")]
    pmt_id: PaymentIdXml,
    #[serde(rename = "Amt")]
    amt: AmountXml,
    #[serde(rename = "CdtrAgt")]
    cdtr_agt: Option<AgentXml>,
    #[serde(rename = "Cdtr")]
    cdtr: Option<PartyXml>,
    #[serde(rename = "CdtrAcct")]
    cdtr_acct: Option<AccountXml>,
    #[serde(rename = "RmtInf")]
    rmt_inf: Option<RemittanceInformationXml>,
}

#[derive(Debug, Deserialize)]
struct PaymentIdXml {
    #[serde(rename = "InstrId")]
    instr_id: Option<String>,
    #[serde(rename = "EndToEndId")]
    end_to_end_id: String,
}

#[derive(Debug, Deserialize)]
struct AmountXml {
    #[serde(rename = "InstdAmt")]
    instd_amt: InstructedAmountXml,
}

#[derive(Debug, Deserialize)]
struct InstructedAmountXml {
    #[serde(rename = "Ccy")]
    ccy: String,
    #[serde(rename = "$value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RemittanceInformationXml {
    #[serde(rename = "Ustrd", default)]
    ustrd: Vec<String>,
}

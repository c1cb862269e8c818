//! Conversion of raw upstream payloads into [`FilingRecord`]s.
//!
//! Validation is per record: a malformed payload yields a
//! [`RejectionReason`] and never affects its neighbours in the batch.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use rust_decimal::Decimal;
use thiserror::Error;

use super::wire::{FlatFiling, RawPayload, RawScalar, RelationshipNode, StructuredFiling};
use crate::core::{FilingRecord, FormType, InsiderRole, TransactionType};

/// Why a payload could not become a [`FilingRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` is not a valid number")]
    InvalidNumber(&'static str),
    #[error("field `{0}` must not be negative")]
    NegativeValue(&'static str),
    #[error("field `{0}` is not a recognised date")]
    InvalidDate(&'static str),
    #[error("unknown form type `{0}`")]
    UnknownFormType(String),
    #[error("filed before the transaction took place")]
    FiledBeforeTransaction,
    #[error("payload is not a filing object")]
    Unrecognized,
}

impl RejectionReason {
    /// Stable short name used when tallying rejections.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidNumber(_) => "invalid_number",
            Self::NegativeValue(_) => "negative_value",
            Self::InvalidDate(_) => "invalid_date",
            Self::UnknownFormType(_) => "unknown_form_type",
            Self::FiledBeforeTransaction => "filed_before_transaction",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Outcome of normalizing a whole batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Valid records, in input order.
    pub records: Vec<FilingRecord>,
    /// One entry per rejected payload, in input order.
    pub rejections: Vec<RejectionReason>,
}

impl NormalizedBatch {
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejections.len()
    }

    /// Rejections tallied by [`RejectionReason::kind`].
    #[must_use]
    pub fn rejection_counts(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for r in &self.rejections {
            *out.entry(r.kind().to_string()).or_insert(0) += 1;
        }
        out
    }
}

// Field values pulled out of either payload shape, before validation.
struct Fields<'a> {
    filing_id: Option<String>,
    symbol: Option<&'a str>,
    insider: Option<&'a str>,
    role: InsiderRole,
    transaction: Option<&'a str>,
    shares: Option<&'a RawScalar>,
    price: Option<&'a RawScalar>,
    transaction_date: Option<&'a str>,
    filed_at: Option<&'a str>,
    form_type: Option<String>,
}

impl<'a> Fields<'a> {
    fn from_structured(s: &'a StructuredFiling) -> Self {
        let tx = s.transaction.as_ref();
        Self {
            filing_id: s.accession_no.as_ref().map(RawScalar::as_text),
            symbol: s.issuer.trading_symbol.as_deref(),
            insider: s.reporting_owner.name.as_deref(),
            role: s
                .reporting_owner
                .relationship
                .as_ref()
                .map_or(InsiderRole::Other, role_from_relationship),
            transaction: tx.and_then(|t| t.code.as_deref()),
            shares: tx.and_then(|t| t.shares.as_ref()),
            price: tx.and_then(|t| t.price_per_share.as_ref()),
            transaction_date: tx.and_then(|t| t.transaction_date.as_deref()),
            filed_at: s.filed_at.as_deref(),
            form_type: s.form_type.as_ref().map(RawScalar::as_text),
        }
    }

    fn from_flat(f: &'a FlatFiling) -> Self {
        Self {
            filing_id: f.id.as_ref().map(RawScalar::as_text),
            symbol: f.company.as_deref(),
            insider: f.insider.as_deref(),
            role: f.role.as_deref().map_or(InsiderRole::Other, role_from_text),
            transaction: f.transaction.as_deref(),
            shares: f.shares.as_ref(),
            price: f.price.as_ref(),
            transaction_date: f.date.as_deref(),
            filed_at: f.filed_at.as_deref(),
            form_type: f.form_type.as_ref().map(RawScalar::as_text),
        }
    }
}

/// Validates one payload and converts it into a canonical record.
///
/// # Errors
///
/// Returns the first [`RejectionReason`] found.
pub fn normalize(raw: &RawPayload) -> Result<FilingRecord, RejectionReason> {
    let f = match raw {
        RawPayload::Structured(s) => Fields::from_structured(s),
        RawPayload::Flat(f) => Fields::from_flat(f),
        RawPayload::Unrecognized(_) => return Err(RejectionReason::Unrecognized),
    };

    let filing_id = non_blank(f.filing_id.as_deref()).ok_or(RejectionReason::MissingField("filing_id"))?;
    let entity_symbol = non_blank(f.symbol)
        .ok_or(RejectionReason::MissingField("entity_symbol"))?
        .to_ascii_uppercase();
    let insider_name =
        non_blank(f.insider).ok_or(RejectionReason::MissingField("insider_name"))?;
    let transaction_type = transaction_from_text(
        non_blank(f.transaction).ok_or(RejectionReason::MissingField("transaction_type"))?,
    );

    let shares = parse_shares(
        f.shares.ok_or(RejectionReason::MissingField("shares"))?,
    )?;
    let price_per_share = match f.price {
        Some(p) => parse_price(p)?,
        // awards and other non-market transactions are often filed without a price
        None if matches!(transaction_type, TransactionType::Grant | TransactionType::Other) => {
            Decimal::ZERO
        }
        None => return Err(RejectionReason::MissingField("price_per_share")),
    };

    let transaction_date = parse_date(
        f.transaction_date
            .ok_or(RejectionReason::MissingField("transaction_date"))?,
    )?;
    let filed_local = parse_timestamp(f.filed_at.ok_or(RejectionReason::MissingField("filed_at"))?)?;
    if filed_local.date_naive() < transaction_date {
        return Err(RejectionReason::FiledBeforeTransaction);
    }

    let form_raw = f
        .form_type
        .ok_or(RejectionReason::MissingField("form_type"))?;
    let form_type =
        FormType::parse(&form_raw).ok_or(RejectionReason::UnknownFormType(form_raw))?;

    Ok(FilingRecord {
        filing_id: filing_id.to_string(),
        entity_symbol,
        insider_name: insider_name.to_string(),
        insider_role: f.role,
        transaction_type,
        shares,
        price_per_share,
        transaction_date,
        filed_at: filed_local.with_timezone(&Utc),
        form_type,
    })
}

/// Normalizes every payload, keeping all valid records.
pub fn normalize_batch<'a, I>(raws: I) -> NormalizedBatch
where
    I: IntoIterator<Item = &'a RawPayload>,
{
    let mut batch = NormalizedBatch::default();
    for raw in raws {
        match normalize(raw) {
            Ok(rec) => batch.records.push(rec),
            Err(reason) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(reason = %reason, "rejected filing payload");
                batch.rejections.push(reason);
            }
        }
    }
    batch
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn clean_number(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ',' | '$' | '_') && !c.is_whitespace())
        .collect()
}

fn parse_shares(raw: &RawScalar) -> Result<u64, RejectionReason> {
    const FIELD: &str = "shares";
    let value = match raw {
        RawScalar::Int(i) => {
            return u64::try_from(*i).map_err(|_| RejectionReason::NegativeValue(FIELD));
        }
        RawScalar::Float(f) => *f,
        RawScalar::Text(s) => clean_number(s)
            .parse::<f64>()
            .map_err(|_| RejectionReason::InvalidNumber(FIELD))?,
        RawScalar::Bool(_) => return Err(RejectionReason::InvalidNumber(FIELD)),
    };
    if !value.is_finite() {
        return Err(RejectionReason::InvalidNumber(FIELD));
    }
    if value < 0.0 {
        return Err(RejectionReason::NegativeValue(FIELD));
    }
    let rounded = value.round();
    if rounded > u64::MAX as f64 {
        return Err(RejectionReason::InvalidNumber(FIELD));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(rounded as u64)
}

fn parse_price(raw: &RawScalar) -> Result<Decimal, RejectionReason> {
    const FIELD: &str = "price_per_share";
    let value = match raw {
        RawScalar::Int(i) => Decimal::from(*i),
        RawScalar::Float(f) => {
            Decimal::try_from(*f).map_err(|_| RejectionReason::InvalidNumber(FIELD))?
        }
        RawScalar::Text(s) => Decimal::from_str(&clean_number(s))
            .map_err(|_| RejectionReason::InvalidNumber(FIELD))?,
        RawScalar::Bool(_) => return Err(RejectionReason::InvalidNumber(FIELD)),
    };
    if value.is_sign_negative() && !value.is_zero() {
        return Err(RejectionReason::NegativeValue(FIELD));
    }
    Ok(value)
}

/// `%Y-%m-%d`, alternately `%m/%d/%Y` or a full RFC 3339 timestamp.
fn parse_date(s: &str) -> Result<NaiveDate, RejectionReason> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
        .ok_or(RejectionReason::InvalidDate("transaction_date"))
}

/// RFC 3339, alternately `%Y-%m-%d %H:%M:%S` or a bare date, both read as
/// New York local time (EDGAR acceptance times carry no offset).
fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, RejectionReason> {
    const FIELD: &str = "filed_at";
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or(RejectionReason::InvalidDate(FIELD))?;
    New_York
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or(RejectionReason::InvalidDate(FIELD))
}

fn transaction_from_text(raw: &str) -> TransactionType {
    let s = raw.trim().to_ascii_lowercase();
    match s.as_str() {
        "p" => return TransactionType::Buy,
        "s" => return TransactionType::Sell,
        "a" => return TransactionType::Grant,
        _ => {}
    }
    if s.contains("purchase") || s.contains("buy") || s.contains("bought") {
        TransactionType::Buy
    } else if s.contains("sale") || s.contains("sell") || s.contains("sold") {
        TransactionType::Sell
    } else if s.contains("grant") || s.contains("award") {
        TransactionType::Grant
    } else {
        TransactionType::Other
    }
}

fn role_from_relationship(rel: &RelationshipNode) -> InsiderRole {
    if rel.is_officer == Some(true) {
        InsiderRole::Executive
    } else if rel.is_director == Some(true) {
        InsiderRole::Director
    } else if rel.is_ten_percent_owner == Some(true) {
        InsiderRole::TenPercentOwner
    } else {
        rel.officer_title
            .as_deref()
            .map_or(InsiderRole::Other, role_from_text)
    }
}

fn role_from_text(raw: &str) -> InsiderRole {
    const EXECUTIVE: &[&str] = &[
        "officer", "executive", "chief", "ceo", "cfo", "coo", "cto", "president", "vp", "evp",
        "svp", "counsel", "secretary", "treasurer",
    ];
    const DIRECTOR: &[&str] = &["director", "chair", "chairman", "chairwoman"];

    let s = raw.trim().to_ascii_lowercase();
    let words: Vec<&str> = s
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |set: &[&str]| words.iter().any(|w| set.contains(w));

    if s.contains("10%") || s.contains("ten percent") || s.contains("10 percent") {
        InsiderRole::TenPercentOwner
    } else if has(EXECUTIVE) {
        InsiderRole::Executive
    } else if has(DIRECTOR) {
        InsiderRole::Director
    } else {
        InsiderRole::Other
    }
}

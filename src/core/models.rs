use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::IwError;

/* ----- FILINGS (shared by filings/, compare/ and pipeline/) ----- */

/// Relationship of the reporting person to the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsiderRole {
    Executive,
    Director,
    TenPercentOwner,
    Other,
}

/// Direction of a disclosed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Buy,
    Sell,
    Grant,
    Other,
}

/// SEC ownership form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FormType {
    Form3,
    Form4,
    Form5,
}

impl FormType {
    /// Code used by the upstream query language (`formType:4`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Form3 => "3",
            Self::Form4 => "4",
            Self::Form5 => "5",
        }
    }

    /// Parses `4`, `4/A`, `Form 4`, `form4` and the like.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        let s = s.strip_prefix("form").unwrap_or(&s).trim_start();
        let s = s.strip_suffix("/a").unwrap_or(s);
        match s {
            "3" => Some(Self::Form3),
            "4" => Some(Self::Form4),
            "5" => Some(Self::Form5),
            _ => None,
        }
    }
}

/// One insider-trading disclosure in canonical form.
///
/// Records are only produced by [`crate::filings::normalize`], which
/// enforces the field invariants; there is no other constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingRecord {
    pub(crate) filing_id: String,
    pub(crate) entity_symbol: String,
    pub(crate) insider_name: String,
    pub(crate) insider_role: InsiderRole,
    pub(crate) transaction_type: TransactionType,
    pub(crate) shares: u64,
    pub(crate) price_per_share: Decimal,
    pub(crate) transaction_date: NaiveDate,
    pub(crate) filed_at: DateTime<Utc>,
    pub(crate) form_type: FormType,
}

impl FilingRecord {
    /// Source-assigned identity (accession number).
    pub fn filing_id(&self) -> &str {
        &self.filing_id
    }
    /// Upper-cased ticker of the issuer.
    pub fn entity_symbol(&self) -> &str {
        &self.entity_symbol
    }
    pub fn insider_name(&self) -> &str {
        &self.insider_name
    }
    pub const fn insider_role(&self) -> InsiderRole {
        self.insider_role
    }
    pub const fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }
    pub const fn shares(&self) -> u64 {
        self.shares
    }
    pub const fn price_per_share(&self) -> Decimal {
        self.price_per_share
    }
    pub const fn transaction_date(&self) -> NaiveDate {
        self.transaction_date
    }
    pub const fn filed_at(&self) -> DateTime<Utc> {
        self.filed_at
    }
    pub const fn form_type(&self) -> FormType {
        self.form_type
    }

    /// Shares × price, `None` if it does not fit a `Decimal`.
    #[must_use]
    pub fn value(&self) -> Option<Decimal> {
        Decimal::from(self.shares).checked_mul(self.price_per_share)
    }
}

/* ----- WINDOWS ----- */

/// Which side of the comparison a window feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLabel {
    Recent,
    Baseline,
}

impl WindowLabel {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Baseline => "baseline",
        }
    }
}

impl std::fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrieval scope with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    label: WindowLabel,
}

impl TimeWindow {
    /// # Errors
    ///
    /// Returns [`IwError::InvalidDates`] unless `start < end`.
    pub fn new(
        label: WindowLabel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, IwError> {
        if start >= end {
            return Err(IwError::InvalidDates);
        }
        Ok(Self { start, end, label })
    }

    /// The `length`-long window that ends at `end`.
    ///
    /// # Errors
    ///
    /// Returns [`IwError::InvalidDates`] for a non-positive length.
    pub fn trailing(label: WindowLabel, end: DateTime<Utc>, length: Duration) -> Result<Self, IwError> {
        Self::new(label, end - length, end)
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }
    pub const fn label(&self) -> WindowLabel {
        self.label
    }
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

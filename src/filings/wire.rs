use serde::Deserialize;

use crate::core::FormType;

// Numbers arrive as JSON numbers or as strings ("1,200", "$14.50").
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl RawScalar {
    pub(crate) fn as_text(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.trim().to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// A filing exactly as the upstream (or the fallback dataset) delivered it.
///
/// Nothing downstream of [`crate::filings::normalize`] sees this type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPayload {
    /// Query-API shape with nested issuer/owner/transaction nodes.
    Structured(StructuredFiling),
    /// Flat row shape used by older exports and the sample dataset.
    Flat(FlatFiling),
    /// Anything that is not a JSON object.
    Unrecognized(serde_json::Value),
}

impl RawPayload {
    /// Issuer symbol, if the payload names one. Used to scope fallback data.
    pub(crate) fn symbol_hint(&self) -> Option<&str> {
        match self {
            Self::Structured(s) => s.issuer.trading_symbol.as_deref(),
            Self::Flat(f) => f.company.as_deref(),
            Self::Unrecognized(_) => None,
        }
    }

    /// Form type, if the payload carries a recognizable one.
    pub(crate) fn form_hint(&self) -> Option<FormType> {
        let raw = match self {
            Self::Structured(s) => s.form_type.as_ref(),
            Self::Flat(f) => f.form_type.as_ref(),
            Self::Unrecognized(_) => None,
        }?;
        FormType::parse(&raw.as_text())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFiling {
    pub(crate) accession_no: Option<RawScalar>,
    pub(crate) form_type: Option<RawScalar>,
    pub(crate) filed_at: Option<String>,
    pub(crate) issuer: IssuerNode,
    pub(crate) reporting_owner: ReportingOwnerNode,
    pub(crate) transaction: Option<TransactionNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerNode {
    pub(crate) trading_symbol: Option<String>,
    #[allow(dead_code)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingOwnerNode {
    pub(crate) name: Option<String>,
    pub(crate) relationship: Option<RelationshipNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipNode {
    pub(crate) is_director: Option<bool>,
    pub(crate) is_officer: Option<bool>,
    pub(crate) officer_title: Option<String>,
    pub(crate) is_ten_percent_owner: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionNode {
    pub(crate) transaction_date: Option<String>,
    pub(crate) code: Option<String>,
    pub(crate) shares: Option<RawScalar>,
    pub(crate) price_per_share: Option<RawScalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatFiling {
    #[serde(alias = "filing_id", alias = "accession_no")]
    pub(crate) id: Option<RawScalar>,
    #[serde(alias = "ticker", alias = "symbol")]
    pub(crate) company: Option<String>,
    #[serde(alias = "insider_name")]
    pub(crate) insider: Option<String>,
    #[serde(alias = "insider_role", alias = "position")]
    pub(crate) role: Option<String>,
    #[serde(alias = "transaction_type")]
    pub(crate) transaction: Option<String>,
    pub(crate) shares: Option<RawScalar>,
    #[serde(alias = "price_per_share")]
    pub(crate) price: Option<RawScalar>,
    #[serde(alias = "transaction_date")]
    pub(crate) date: Option<String>,
    #[serde(alias = "filing_date")]
    pub(crate) filed_at: Option<String>,
    pub(crate) form_type: Option<RawScalar>,
}

// Query API response envelope.
#[derive(Deserialize)]
pub(crate) struct QueryEnvelope {
    pub(crate) total: Option<TotalNode>,
    #[serde(alias = "filings")]
    pub(crate) transactions: Option<Vec<RawPayload>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum TotalNode {
    Count(u64),
    Object { value: Option<u64> },
}

impl TotalNode {
    pub(crate) fn value(&self) -> Option<usize> {
        let v = match self {
            Self::Count(n) => Some(*n),
            Self::Object { value } => *value,
        };
        v.and_then(|n| usize::try_from(n).ok())
    }
}

// Bundled sample dataset, keyed by window label.
#[derive(Deserialize)]
pub(crate) struct FallbackFile {
    #[serde(default)]
    pub(crate) recent: Vec<RawPayload>,
    #[serde(default)]
    pub(crate) baseline: Vec<RawPayload>,
}

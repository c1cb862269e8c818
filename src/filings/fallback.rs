use std::collections::BTreeSet;
use std::sync::Arc;

use super::wire::{FallbackFile, RawPayload};
use crate::core::{FormType, IwError, WindowLabel};

const BUNDLED: &str = include_str!("fallback_filings.json");

/// Static substitute payloads, served when live retrieval is exhausted.
#[derive(Debug, Clone)]
pub struct FallbackDataset {
    recent: Arc<Vec<RawPayload>>,
    baseline: Arc<Vec<RawPayload>>,
}

impl FallbackDataset {
    /// The sample dataset shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`IwError::Json`] if the bundled file is corrupt.
    pub fn bundled() -> Result<Self, IwError> {
        Self::from_json(BUNDLED)
    }

    /// Parses a dataset of the form `{"recent": [...], "baseline": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`IwError::Json`] when `json` does not have that shape.
    pub fn from_json(json: &str) -> Result<Self, IwError> {
        let file: FallbackFile = serde_json::from_str(json)?;
        Ok(Self::new(file.recent, file.baseline))
    }

    #[must_use]
    pub fn new(recent: Vec<RawPayload>, baseline: Vec<RawPayload>) -> Self {
        Self {
            recent: Arc::new(recent),
            baseline: Arc::new(baseline),
        }
    }

    /// An empty dataset; fallback then yields no filings.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Payloads for `label` of the requested `forms`, restricted to
    /// `universe` when one is given.
    ///
    /// Rows without a readable form type are kept so the normalizer can
    /// reject them.
    #[must_use]
    pub fn for_window(
        &self,
        label: WindowLabel,
        forms: &BTreeSet<FormType>,
        universe: Option<&BTreeSet<String>>,
    ) -> Vec<RawPayload> {
        let src = match label {
            WindowLabel::Recent => &self.recent,
            WindowLabel::Baseline => &self.baseline,
        };
        src.iter()
            .filter(|p| p.form_hint().is_none_or(|f| forms.contains(&f)))
            .filter(|p| match universe {
                None => true,
                Some(u) => p
                    .symbol_hint()
                    .is_some_and(|s| u.contains(&s.trim().to_ascii_uppercase())),
            })
            .cloned()
            .collect()
    }
}

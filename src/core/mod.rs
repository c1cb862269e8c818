//! Core components of the `insiderwatch-rs` crate.
//!
//! This module contains the foundational building blocks of the library, including:
//! - The [`IwClient`] HTTP client, its builder, and the retry/pacing/budget primitives.
//! - The primary [`IwError`] type.
//! - Shared data models like [`FilingRecord`] and [`TimeWindow`].
//! - Service traits for the upstream source and the external collaborators.

/// The HTTP client (`IwClient`), builder, retry policy, pacer and request budget.
pub mod client;
/// The primary error type (`IwError`) for the crate.
pub mod error;
/// Shared data models used across modules (e.g., `FilingRecord`, `TimeWindow`).
pub mod models;
/// Service traits for the filing source and external collaborators.
pub mod services;

#[cfg(feature = "test-mode")]
pub(crate) mod fixtures;

pub(crate) mod net;

// convenient re-exports so most code can just `use crate::core::IwClient`
pub use client::{Backoff, IwClient, IwClientBuilder, Pacer, RequestBudget, RetryConfig};
pub use error::IwError;
pub use models::{
    FilingRecord, FormType, InsiderRole, TimeWindow, TransactionType, WindowLabel,
};
pub use services::{
    ChartRenderer, FilingSource, Page, PageRequest, ReportSynthesizer, SentimentProvider,
};

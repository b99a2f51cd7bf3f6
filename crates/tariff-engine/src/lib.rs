//! Normalization and matching engine for regulatory feed-in tariff catalogs.
//!
//! The engine turns free-text German commissioning-period and power-criteria
//! descriptions into comparable ranges at ingestion time, then answers
//! queries by filtering and sorting the normalized records. Storage and the
//! upstream workflow system stay behind the [`catalog::store::TariffStore`]
//! and [`catalog::webhook::WorkflowGateway`] seams.

pub mod catalog;
pub mod config;
pub mod error;
pub mod telemetry;

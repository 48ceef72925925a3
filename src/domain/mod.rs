//! Domain types used throughout the exporter.
//!
//! This module defines:
//!
//! - the quoted tenors (`Maturity`) and upstream identities (`Source`)
//! - a single fetched value (`Observation`) and its per-pass envelope (`SourceResult`)
//! - the immutable runtime configuration (`ExporterConfig`)

pub mod types;

pub use types::*;

//! `euribor-exporter` library crate.
//!
//! The binary is a thin wrapper around this library so that:
//!
//! - parsing, extraction and orchestration are testable without a network
//! - the publication sink can be inspected directly in tests
//! - the HTTP layer stays a small shell around the registry

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod parse;
pub mod server;

//! # salon-common
//!
//! Shared types, configuration, error handling, and the pure booking rules
//! (slot availability, slot numbering, pricing) used across all salon crates.
//! No I/O lives here.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway_event;
pub mod ids;
pub mod models;
pub mod pricing;
pub mod scheduling;
pub mod validation;

//! Timecard YTD reconciliation and backfill.
//!
//! This crate reconciles the weekly hour totals held in a key-value store
//! against timecard reports generated on a third-party report site. When the
//! year-to-date totals disagree it regenerates pay periods backward from the
//! most recent one until the store agrees again.

#![warn(missing_docs)]

pub mod acquire;
pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod session;
pub mod store;

//! Google Sheets backed [`RangeStore`](arena_core::RangeStore).

pub mod client;
pub mod config;
pub mod token;

pub use client::SheetsClient;
pub use config::SheetsConfig;

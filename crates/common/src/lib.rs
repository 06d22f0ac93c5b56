//! Shared value types for the checkout engine.
//!
//! Everything here is a plain value: monetary amounts in integer cents,
//! normalized 3-letter currency codes, and the shopper locale. The heavier
//! crates (`cart`, `checkout`, `orchestrator`) build on these.

pub mod types;

pub use types::{CurrencyCode, Locale, Money, format_money};

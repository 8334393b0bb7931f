//! Utility functions shared by the transports and the chain data types.
//!
//! ## Hex Quantities (`hex`)
//! - `0x`-prefixed quantity formatting and parsing for block numbers and indices
//! - Serde adapters so decoded provider responses carry plain `u64` fields

pub mod hex;

pub use self::hex::{format_hex_u64, parse_hex_u64};

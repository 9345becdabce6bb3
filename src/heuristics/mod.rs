//! Extraction sub-algorithms shared across source adapters. Several sites
//! need the same date, price, and tag handling; adapters call these instead
//! of carrying their own copies.

pub mod dates;
pub mod prices;
pub mod tags;
pub mod text;

//! Listing-page scrapers that turn weekly or daily paper pages into stub
//! records for the store.
//!
//! Network failures are logged and yield an empty result for that fetch; the
//! caller proceeds with whatever was already collected.

pub mod hf;

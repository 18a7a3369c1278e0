//! Domain layer types and invariants.

pub mod entities;

pub use entities::{Category, ListingRecord};

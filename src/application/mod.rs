//! Application layer: query model and collaborator traits.

pub mod filter;
pub mod repos;

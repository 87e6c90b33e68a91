//! Wire and domain types for the user directory contract.

pub mod domain;
pub mod error;
pub mod protocol;

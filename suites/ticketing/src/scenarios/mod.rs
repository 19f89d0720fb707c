//! Scenario definitions, grouped the way the API is exercised.

pub mod codes;
pub mod setup;
pub mod transfers;

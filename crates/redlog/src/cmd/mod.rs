//! Command implementations for the redlog CLI

pub mod check;
pub mod send;

//! Per-step data exchanged between the protocol driver and an evaluator.
//!
//! All quantities held by these types are in SI units. Conversion to and from the
//! wire convention happens in [`crate::core::io`] at the moment a payload is decoded
//! or encoded.

pub mod cell;
pub mod configuration;
pub mod forces;

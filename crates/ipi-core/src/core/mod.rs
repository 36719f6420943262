//! # Core Module
//!
//! Stateless building blocks of the driver.
//!
//! - **Units** ([`units`]) - The fixed SI conversion table and the wire unit convention
//! - **Data Model** ([`models`]) - Cells, atomic configurations and force results, all in SI
//! - **Wire Codec** ([`io`]) - Fixed-width command tokens and little-endian binary payloads
//! - **Evaluators** ([`evaluator`]) - The physics capability the driver calls on `GETFORCE`

pub mod evaluator;
pub mod io;
pub mod models;
pub mod units;

//! # Workflows Module
//!
//! Entry points that take a configuration and an evaluator and run complete
//! client sessions.
//!
//! - **Run Workflow** ([`run`]) - Connect, serve the server until it exits or disconnects,
//!   and report what happened. Also runs several independent replicas side by side.

pub mod run;

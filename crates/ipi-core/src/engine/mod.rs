//! # Engine Module
//!
//! The stateful half of the driver: one socket connection and the protocol state
//! machine that serves it.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Server address, connection retries, wire units and limits
//! - **Transport** ([`transport`]) - TCP and Unix domain stream sockets behind one trait
//! - **State Tracking** ([`state`]) - The connection states and the transitions between them
//! - **Driver** ([`driver`]) - Reads one command at a time, calls the evaluator and answers
//! - **Progress Monitoring** ([`progress`]) - Optional callbacks for front ends
//! - **Error Handling** ([`error`]) - The error type every run returns
//!
//! Exactly one driver owns a connection. Nothing in this module is shared between
//! connections, so several drivers can run side by side on separate threads.

pub mod config;
pub mod driver;
pub mod error;
pub mod progress;
pub mod state;
pub mod transport;

//! # i-PI Driver Library
//!
//! A client for the i-PI path-integral molecular dynamics socket protocol. The
//! server owns the simulation; this library connects to it, receives atomic
//! configurations, asks a pluggable [`Evaluator`](core::evaluator::Evaluator) for
//! energy, forces and virial, and sends the results back.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout.
//!
//! - **[`core`]: The Foundation.** Stateless pieces: the unit conversion table, the
//!   SI data model (`SimulationCell`, `AtomicConfiguration`, `ForceResult`), the binary
//!   wire codec and the `Evaluator` trait.
//!
//! - **[`engine`]: The Logic Core.** The per-connection protocol state machine
//!   (`Driver`), socket transports, configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Connect-and-run entry points that tie the
//!   engine and an evaluator together for one or many replicas.
//!
//! All physical quantities inside the library are SI. Conversion to and from the
//! units used on the wire happens only where messages are decoded and encoded.

pub mod core;
pub mod engine;
pub mod workflows;

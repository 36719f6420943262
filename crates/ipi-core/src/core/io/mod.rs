//! Encoding and decoding of the i-PI socket protocol.
//!
//! [`wire`] holds the framing primitives (fixed-width tokens, little-endian
//! integers and doubles); [`messages`] builds the INIT, POSDATA and FORCEREADY
//! payloads on top of them and performs the unit conversions at the boundary.

pub mod messages;
pub mod wire;

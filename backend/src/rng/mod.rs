//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: All randomness in the engine (demand generation in particular)
//! MUST go through this module so that seeded runs are reproducible.

mod xorshift;

pub use xorshift::RngManager;

//! Core engine primitives

pub mod time;

pub use time::TimeManager;

//! FLIPSCAN — Trader Flip Scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod market;
pub mod engine;
pub mod scheduler;
pub mod storage;

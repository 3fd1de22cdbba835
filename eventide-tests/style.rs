//! Style Enforcement Tests
//!
//! Scans the production sources of every workspace crate for patterns that
//! clippy does not reject on its own.
//!
//! - `production_code` - No `#[allow(dead_code)]`, no `.unwrap()` or `.expect(`
//!   outside of test modules

#[path = "style/production_code.rs"]
mod production_code;

//! Core types and trait definitions for the regional reference dataset.
//!
//! This crate has no HTTP or database dependencies. It owns the record model,
//! the store abstraction, the diff planner and the applier; backends and
//! transports live in sibling crates.

pub mod apply;
pub mod error;
pub mod plan;
pub mod regional;
pub mod store;
pub mod summary;

pub use error::{Error, Result};

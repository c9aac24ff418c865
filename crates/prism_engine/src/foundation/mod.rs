//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Identity counters for resources
//! - Logging utilities

pub mod math;
pub mod ids;
pub mod logging;

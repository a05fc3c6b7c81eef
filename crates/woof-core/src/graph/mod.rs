//! Graph engine for dependency resolution.
//!
//! This module provides:
//! - Dependency graph construction from `deps=` header tokens
//! - Three-color cycle detection
//! - Deterministic orderings and dependency closures

mod types;

pub use types::DependencyGraph;

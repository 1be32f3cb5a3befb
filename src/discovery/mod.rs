//! Handler discovery subsystem.
//!
//! # Responsibilities
//! - Walk the discovery base for handler scripts matching the include glob
//! - Apply exclusion globs (static assets, shared modules)
//! - Derive the short and full lookup names for each script
//! - Track which scripts have been claimed by a route
//!
//! # Design Decisions
//! - Scanning happens once at construction; new files need a rebuild
//! - Scan order is sorted by relative path so name collisions resolve
//!   deterministically (the later path wins the short name)

pub mod scanner;

pub use scanner::{scan, DiscoveryError, HandlerRecord, HandlerSet, DEFAULT_PATTERN};

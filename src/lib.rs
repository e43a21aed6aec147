//! orgdelta: org chart snapshots as navigable hierarchies.
//!
//! Flat employee records are validated, built into an arena-backed tree,
//! laid out for display and compared across two snapshots.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

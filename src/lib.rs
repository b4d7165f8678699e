//! Resolves installable software package releases into install recipes.
//!
//! Given a package name, a major version, and an os/arch pair, this crate
//! produces a normalized recipe describing what artifact to download and how
//! to install it. Resolved recipes and version listings are cached with a
//! process-wide TTL; upstream is only consulted on a miss.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod packages;

//! Package release resolution layer
//!
//! This module turns a package name, major version and os/arch pair into a
//! normalized install recipe, backed by per-provider upstream knowledge and
//! a shared TTL cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Resolver   │────▶│   Fetcher   │────▶│  upstream   │
//! │  (facade)   │     │  (network)  │     │  listing    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ├────▶ listing / version   (parse rows, order candidates)
//!        │
//!        ▼
//! ┌─────────────┐
//! │  TtlCache   │  version lists and recipes, one freshness window
//! └─────────────┘
//! ```
//!
//! Every request is handled independently: a cache hit answers immediately,
//! a miss consults upstream, selects the newest matching release, builds the
//! recipe and writes it back. Concurrent misses on one key are not
//! deduplicated; each performs its own fetch and write. Writes are
//! idempotent and recipes deterministic, so the last write wins without
//! drift.
//!
//! # Modules
//!
//! - [`error`]: Resolution failures and their HTTP-style status codes
//! - [`listing`]: Minimal HTML table scraping for upstream release pages
//! - [`resolver`]: The `PackageResolver` trait each provider implements
//! - [`resolvers`]: Concrete providers (Go toolchain, Google Cloud CLI)
//! - [`types`]: Release records, platform requests and install recipes
//! - [`version`]: Dotted version normalization and ordering

pub mod error;
pub mod listing;
pub mod resolver;
pub mod resolvers;
pub mod types;
pub mod version;

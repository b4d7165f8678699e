//! Errors for release resolution and their HTTP-style status codes.

use thiserror::Error;

use crate::cache::CacheError;
use crate::fetch::FetchError;

/// Appended to unsupported-platform errors so callers see what would have
/// worked.
pub const SUPPORTED_PLATFORMS: &str = "It currently supports the following. \
    OSes: [windows, macos, linux], CPU Architectures: [x86-64, arm64].";

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested os/arch pair is outside the provider's vocabulary.
    /// Detected before any network traffic.
    #[error("Unsupported os/arch combination: {os}/{arch}. {supported}", supported = SUPPORTED_PLATFORMS)]
    UnsupportedPlatform { os: String, arch: String },

    /// The request asks for something the provider does not have, e.g. LTS
    /// versions of a package without LTS lines.
    #[error("{0}")]
    BadRequest(String),

    /// No release matches the requested version and platform.
    #[error("nothing found")]
    NoMatchingRelease,

    #[error(transparent)]
    Upstream(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ResolveError {
    /// Status code callers surface for this failure: caller mistakes map to
    /// 400, an empty result to 404, upstream and store trouble to 500.
    pub fn status(&self) -> u16 {
        match self {
            ResolveError::UnsupportedPlatform { .. } | ResolveError::BadRequest(_) => 400,
            ResolveError::NoMatchingRelease => 404,
            ResolveError::Upstream(_) | ResolveError::Cache(_) => 500,
        }
    }
}

//! Resolver trait implemented by each package provider

#[cfg(test)]
use mockall::automock;

use crate::packages::error::ResolveError;
use crate::packages::types::{InstallRecipe, PlatformRequest, VersionsQuery};

/// Trait for resolving a package's releases into install recipes
///
/// Implementations keep no per-request state beyond the shared TTL cache:
/// a hit answers from the stored value, a miss consults upstream and writes
/// the result back before returning it.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageResolver: Send + Sync {
    /// Returns the package name this resolver handles; doubles as its cache
    /// namespace (`s:<name>:`)
    fn name(&self) -> &'static str;

    /// Lists the major versions available upstream
    ///
    /// # Arguments
    /// * `query` - Listing options, e.g. whether only LTS lines are wanted
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Major versions ordered lowest first, or a
    ///   provider's informational text when it does not enumerate releases
    /// * `Err(ResolveError)` - If the query is invalid or upstream fails
    async fn major_versions(&self, query: &VersionsQuery) -> Result<Vec<String>, ResolveError>;

    /// Resolves the newest release of a major version for a platform
    ///
    /// # Arguments
    /// * `request` - Major version plus the caller's raw os/arch pair
    ///
    /// # Returns
    /// * `Ok(InstallRecipe)` - What to download and how to install it
    /// * `Err(ResolveError)` - If the platform is unsupported, nothing
    ///   matches, or upstream fails
    async fn latest_release(&self, request: &PlatformRequest) -> Result<InstallRecipe, ResolveError>;

    /// Drops every cached record in this resolver's namespace
    fn clear_cache(&self) -> Result<(), ResolveError>;
}

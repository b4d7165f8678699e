//! Package-specific release resolvers

mod gcloud;
mod golang;

pub use gcloud::GcloudResolver;
pub use golang::GolangResolver;

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::fetch::Fetcher;
use crate::packages::resolver::PackageResolver;

/// Builds the provider table mapping package names to their resolvers, all
/// sharing one cache and one HTTP client.
pub fn all(
    cache: Arc<TtlCache>,
    fetcher: Arc<Fetcher>,
) -> HashMap<&'static str, Arc<dyn PackageResolver>> {
    let mut providers: HashMap<&'static str, Arc<dyn PackageResolver>> = HashMap::new();
    providers.insert("golang", Arc::new(GolangResolver::new(Arc::clone(&cache), fetcher)));
    providers.insert("gcloud", Arc::new(GcloudResolver::new(cache)));
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn all_registers_each_provider_under_its_own_name() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(TtlCache::new(&temp_dir.path().join("cache.db"), 8).unwrap());

        let providers = all(cache, Arc::new(Fetcher::new()));

        assert_eq!(providers.len(), 2);
        for (name, provider) in &providers {
            assert_eq!(provider.name(), *name);
        }
    }
}

//! Google Cloud CLI release resolver.
//!
//! There is no listing to scrape: release bundles live under a predictable
//! storage URL, so artifact links are constructed from the requested
//! version and platform and trusted without an existence check. Whether a
//! given bundle actually exists surfaces when the client downloads it.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error};

use crate::cache::TtlCache;
use crate::packages::error::ResolveError;
use crate::packages::resolver::PackageResolver;
use crate::packages::types::{Artifact, InstallRecipe, PlatformRequest, VersionsQuery};

/// Storage bucket all release bundles are published under.
const DEFAULT_RELEASE_URL: &str = "https://storage.googleapis.com/cloud-sdk-release/";

/// Returned instead of a scraped version list; the bucket has no index to
/// enumerate.
const AVAILABLE_VERSIONS_INFO: &str = "As of now, all versions from 100.0.0 to 502.0.0 \
    are available. Also, installation takes around 10 minutes.";

/// Fields recovered from a constructed artifact URL; all empty when the
/// filename does not match a known naming scheme.
#[derive(Debug, Default, PartialEq, Eq)]
struct PackageDetails {
    name: String,
    version: String,
    os: String,
    arch: String,
}

pub struct GcloudResolver {
    cache: Arc<TtlCache>,
    windows_re: Regex,
    tarball_re: Regex,
}

impl GcloudResolver {
    pub fn new(cache: Arc<TtlCache>) -> Self {
        Self {
            cache,
            windows_re: Regex::new(
                r"google-cloud-sdk-(\d+\.\d+\.\d+)-windows-(\w+)-bundled-python\.zip",
            )
            .unwrap(),
            tarball_re: Regex::new(r"google-cloud-sdk-(\d+\.\d+\.\d+)-(\w+)-(\w+)\.tar\.gz")
                .unwrap(),
        }
    }

    /// Builds the bundle URL for a version and mapped platform. Windows
    /// releases ship as zips with bundled python, everything else as
    /// tarballs.
    fn artifact_url(&self, major_version: &str, os: &str, arch: &str) -> String {
        if os == "windows" {
            format!(
                "{DEFAULT_RELEASE_URL}google-cloud-sdk-{major_version}-windows-{arch}-bundled-python.zip"
            )
        } else {
            format!("{DEFAULT_RELEASE_URL}google-cloud-sdk-{major_version}-{os}-{arch}.tar.gz")
        }
    }

    /// Parses the bundle filename back out of a URL. A filename outside the
    /// known schemes yields empty fields rather than an error.
    fn package_details(&self, package_url: &str) -> PackageDetails {
        let filename = package_url.rsplit('/').next().unwrap_or(package_url);

        if let Some(caps) = self.windows_re.captures(filename) {
            return PackageDetails {
                name: filename.to_string(),
                version: caps[1].to_string(),
                os: "windows".to_string(),
                arch: caps[2].to_string(),
            };
        }

        if let Some(caps) = self.tarball_re.captures(filename) {
            return PackageDetails {
                name: filename.to_string(),
                version: caps[1].to_string(),
                os: caps[2].to_string(),
                arch: caps[3].to_string(),
            };
        }

        PackageDetails::default()
    }
}

fn map_os(os: &str) -> Option<&'static str> {
    match os {
        "macos" => Some("darwin"),
        "linux" => Some("linux"),
        "windows" => Some("windows"),
        _ => {
            error!("unknown os: {}", os);
            None
        }
    }
}

fn map_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x64" | "x86-64" => Some("x86_64"),
        "aarch64" | "arm64" | "arm" => Some("arm"),
        _ => {
            error!("unknown cpu arch: {}", arch);
            None
        }
    }
}

fn script_link(requested_os: &str) -> &'static str {
    match requested_os {
        "windows" => "/static/assets/install-scripts/gcloud/setup.cmd",
        _ => "/static/assets/install-scripts/gcloud/setup.sh",
    }
}

fn build_recipe(version: &str, name: &str, link: &str, requested_os: &str) -> InstallRecipe {
    let install_dir = format!("google-cloud-sdk/gcloudsdk-{version}");

    InstallRecipe {
        script: script_link(requested_os).to_string(),
        script_dir: install_dir.clone(),
        package_version: version.to_string(),
        artifacts: vec![Artifact {
            artifact_type: "google-cloud-sdk".to_string(),
            action: "extract".to_string(),
            name: name.to_string(),
            extract_dir: install_dir.clone(),
            extract_target: install_dir,
            version: version.to_string(),
            link: link.to_string(),
            // The bucket publishes no checksums to pass along.
            checksum: None,
            checksum_type: None,
        }],
    }
}

#[async_trait::async_trait]
impl PackageResolver for GcloudResolver {
    fn name(&self) -> &'static str {
        "gcloud"
    }

    async fn major_versions(&self, query: &VersionsQuery) -> Result<Vec<String>, ResolveError> {
        if query.lts {
            return Err(ResolveError::BadRequest(
                "gcloud does not have LTS versions".to_string(),
            ));
        }

        let key = "s:gcloud:majorversions";
        if let Some(cached) = self.cache.get::<Vec<String>>(key) {
            return Ok(cached);
        }

        let versions = vec![AVAILABLE_VERSIONS_INFO.to_string()];
        if let Err(e) = self.cache.put(key, &versions) {
            error!("could not write cache for '{}': {}", key, e);
        }

        Ok(versions)
    }

    async fn latest_release(&self, request: &PlatformRequest) -> Result<InstallRecipe, ResolveError> {
        let (os, arch) = match (map_os(&request.os), map_arch(&request.arch)) {
            (Some(os), Some(arch)) => (os, arch),
            _ => {
                return Err(ResolveError::UnsupportedPlatform {
                    os: request.os.clone(),
                    arch: request.arch.clone(),
                });
            }
        };

        let key = format!(
            "s:gcloud:latestrelease:{}-{}-{}",
            request.major_version, os, arch
        );
        if let Some(cached) = self.cache.get::<InstallRecipe>(&key) {
            return Ok(cached);
        }

        let url = self.artifact_url(&request.major_version, os, arch);
        let details = self.package_details(&url);
        let recipe = build_recipe(&request.major_version, &details.name, &url, &request.os);

        if let Err(e) = self.cache.put(&key, &recipe) {
            error!("could not write cache for '{}': {}", key, e);
        }

        Ok(recipe)
    }

    fn clear_cache(&self) -> Result<(), ResolveError> {
        let removed = self.cache.remove_prefix("s:gcloud:")?;
        debug!("cleared {} cached gcloud records", removed);
        Ok(())
    }
}

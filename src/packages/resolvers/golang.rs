//! Go toolchain release resolver.
//!
//! The Go project publishes releases as one HTML table of
//! filename/kind/os/arch/size/checksum rows. This resolver scrapes that
//! table, keeps the archive rows for platforms it serves, and resolves the
//! newest release of a requested major version into an install recipe.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error, warn};

use crate::cache::TtlCache;
use crate::fetch::Fetcher;
use crate::packages::error::ResolveError;
use crate::packages::listing::ListingTable;
use crate::packages::resolver::PackageResolver;
use crate::packages::types::{
    Artifact, InstallRecipe, PlatformRequest, ReleaseRecord, VersionsQuery,
};
use crate::packages::version;

/// Upstream listing page. Artifact links are this URL plus the filename,
/// so it must end with a slash.
const DEFAULT_LISTING_URL: &str = "https://go.dev/dl/";

/// The only release kind surfaced to callers; installers, sources and
/// betas in the listing carry other kinds.
const KIND_ARCHIVE: &str = "archive";

/// Operating systems served, as they appear in the listing.
const SUPPORTED_OS: [&str; 3] = ["macos", "linux", "windows"];

/// CPU architectures served, as they appear in the listing.
const SUPPORTED_ARCH: [&str; 2] = ["arm64", "x86-64"];

pub struct GolangResolver {
    cache: Arc<TtlCache>,
    fetcher: Arc<Fetcher>,
    listing: ListingTable,
    version_re: Regex,
    listing_url: String,
}

impl GolangResolver {
    pub fn new(cache: Arc<TtlCache>, fetcher: Arc<Fetcher>) -> Self {
        Self::with_listing_url(cache, fetcher, DEFAULT_LISTING_URL)
    }

    /// Creates a resolver scraping `listing_url` instead of the go.dev
    /// listing. The URL doubles as the artifact link prefix and must end
    /// with a slash.
    pub fn with_listing_url(cache: Arc<TtlCache>, fetcher: Arc<Fetcher>, listing_url: &str) -> Self {
        Self {
            cache,
            fetcher,
            listing: ListingTable::new(),
            // Anchored to the dot before the platform suffix, so rc/beta
            // filenames never match.
            version_re: Regex::new(r"go(\d+(?:\.\d+)+)\.").unwrap(),
            listing_url: listing_url.to_string(),
        }
    }

    /// Scrapes the listing into release records, dropping rows that are not
    /// archives for supported platforms.
    async fn releases(&self) -> Result<Vec<ReleaseRecord>, ResolveError> {
        let page = self.fetcher.text(&self.listing_url).await?;

        let mut releases = Vec::new();
        for cells in self.listing.rows(&page) {
            // filename, kind, os, arch, size, sha256 checksum
            if cells.len() < 6 {
                continue;
            }

            let kind = cells[1].to_lowercase();
            let os = cells[2].to_lowercase();
            let arch = cells[3].to_lowercase();
            if kind != KIND_ARCHIVE
                || !SUPPORTED_OS.contains(&os.as_str())
                || !SUPPORTED_ARCH.contains(&arch.as_str())
            {
                continue;
            }

            let Some(release_version) = self.version_from_filename(&cells[0]) else {
                continue;
            };
            if !is_current_line(&release_version) {
                continue;
            }

            releases.push(ReleaseRecord {
                filename: cells[0].clone(),
                kind,
                os,
                arch,
                version: release_version,
                checksum: Some(cells[5].to_lowercase()),
            });
        }

        debug!("parsed {} usable go releases", releases.len());
        Ok(releases)
    }

    fn version_from_filename(&self, filename: &str) -> Option<String> {
        self.version_re
            .captures(filename)
            .map(|caps| caps[1].to_string())
    }
}

/// The listing still carries legacy go1.x entries up to 1.10 that are not
/// meant to be surfaced; only minor versions past 10 count as current.
fn is_current_line(release_version: &str) -> bool {
    release_version
        .split('.')
        .nth(1)
        .and_then(|minor| minor.parse::<u32>().ok())
        .is_some_and(|minor| minor > 10)
}

fn major_minor(release_version: &str) -> Option<String> {
    let mut parts = release_version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => Some(format!("{major}.{minor}")),
        _ => None,
    }
}

fn map_os(os: &str) -> Option<&'static str> {
    match os {
        "macos" => Some("macos"),
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
        "x64" | "x86-64" => Some("x86-64"),
        "arm64" => Some("arm64"),
        _ => {
            error!("unknown cpu arch: {}", arch);
            None
        }
    }
}

fn script_link(requested_os: &str) -> &'static str {
    match requested_os {
        "windows" => "/static/assets/install-scripts/golang/setup.cmd",
        _ => "/static/assets/install-scripts/golang/setup.sh",
    }
}

fn build_recipe(
    release_version: &str,
    filename: &str,
    link: &str,
    checksum: Option<&str>,
    requested_os: &str,
) -> InstallRecipe {
    InstallRecipe {
        script: script_link(requested_os).to_string(),
        script_dir: "golang".to_string(),
        package_version: release_version.to_string(),
        artifacts: vec![Artifact {
            artifact_type: "golang-sdk".to_string(),
            action: "extract".to_string(),
            name: filename.to_string(),
            extract_dir: format!("golang/go-{release_version}"),
            extract_target: format!("golang/go-{release_version}"),
            version: release_version.to_string(),
            link: link.to_string(),
            checksum: checksum.map(str::to_string),
            checksum_type: Some("sha256".to_string()),
        }],
    }
}

#[async_trait::async_trait]
impl PackageResolver for GolangResolver {
    fn name(&self) -> &'static str {
        "golang"
    }

    async fn major_versions(&self, query: &VersionsQuery) -> Result<Vec<String>, ResolveError> {
        if query.lts {
            return Err(ResolveError::BadRequest(
                "Go does not have LTS versions".to_string(),
            ));
        }

        let key = "s:golang:majorversions";
        if let Some(cached) = self.cache.get::<Vec<String>>(key) {
            return Ok(cached);
        }

        let releases = self.releases().await?;
        let mut majors: Vec<String> = releases
            .iter()
            .filter_map(|release| major_minor(&release.version))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        majors.sort_by(|a, b| version::compare(a, b));

        if let Err(e) = self.cache.put(key, &majors) {
            error!("could not write cache for '{}': {}", key, e);
        }

        Ok(majors)
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
            "s:golang:latestrelease:{}-{}-{}",
            request.major_version, os, arch
        );
        if let Some(cached) = self.cache.get::<InstallRecipe>(&key) {
            return Ok(cached);
        }

        let releases = self.releases().await?;
        let matching: Vec<&ReleaseRecord> = releases
            .iter()
            .filter(|release| {
                release.version.starts_with(&request.major_version)
                    && release.os == os
                    && release.arch == arch
            })
            .collect();

        let Some(latest) = matching
            .iter()
            .map(|release| release.version.as_str())
            .max_by(|a, b| version::compare(a, b))
        else {
            return Err(ResolveError::NoMatchingRelease);
        };

        let candidates: Vec<&ReleaseRecord> = matching
            .iter()
            .copied()
            .filter(|release| release.version == latest)
            .collect();
        if candidates.len() > 1 {
            warn!("found more than one candidate, returning the first!");
        }
        let Some(release) = candidates.first() else {
            return Err(ResolveError::NoMatchingRelease);
        };

        let link = format!("{}{}", self.listing_url, release.filename);
        let recipe = build_recipe(
            latest,
            &release.filename,
            &link,
            release.checksum.as_deref(),
            &request.os,
        );

        if let Err(e) = self.cache.put(&key, &recipe) {
            error!("could not write cache for '{}': {}", key, e);
        }

        Ok(recipe)
    }

    fn clear_cache(&self) -> Result<(), ResolveError> {
        let removed = self.cache.remove_prefix("s:golang:")?;
        debug!("cleared {} cached golang records", removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use rstest::rstest;
    use tempfile::TempDir;

    fn test_resolver(listing_url: &str) -> (TempDir, GolangResolver) {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(TtlCache::new(&temp_dir.path().join("cache.db"), 8).unwrap());
        let resolver = GolangResolver::with_listing_url(cache, Arc::new(Fetcher::new()), listing_url);
        (temp_dir, resolver)
    }

    /// Rows are (filename, kind, os, arch, size, sha256).
    fn listing_page(rows: &[[&str; 6]]) -> String {
        let mut html = String::from(
            "<html><body><table>\
             <tr><th>File name</th><th>Kind</th><th>OS</th><th>Arch</th>\
             <th>Size</th><th>SHA256 Checksum</th></tr>",
        );
        for cells in rows {
            html.push_str("<tr>");
            html.push_str(&format!(
                r#"<td class="filename"><a class="download" href="/dl/{0}">{0}</a></td>"#,
                cells[0]
            ));
            for cell in &cells[1..] {
                html.push_str(&format!("<td>{cell}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    #[rstest]
    #[case("go1.22.3.linux-arm64.tar.gz", Some("1.22.3"))]
    #[case("go1.21.0.windows-amd64.zip", Some("1.21.0"))]
    #[case("go1.22.3.src.tar.gz", Some("1.22.3"))]
    #[case("go1.22rc1.linux-arm64.tar.gz", None)]
    #[case("go1.23beta2.darwin-amd64.pkg", None)]
    #[case("getgo.exe", None)]
    fn version_from_filename_requires_a_dotted_release(
        #[case] filename: &str,
        #[case] expected: Option<&str>,
    ) {
        let (_temp_dir, resolver) = test_resolver("http://unused/");
        assert_eq!(
            resolver.version_from_filename(filename).as_deref(),
            expected
        );
    }

    #[rstest]
    #[case("1.22.3", true)]
    #[case("1.11", true)]
    #[case("1.10.8", false)]
    #[case("1.9", false)]
    #[case("1", false)]
    fn is_current_line_excludes_legacy_go_releases(
        #[case] release_version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_current_line(release_version), expected);
    }

    #[tokio::test]
    async fn major_versions_are_distinct_and_sorted() {
        let mut server = Server::new_async().await;
        let page = listing_page(&[
            ["go1.22.3.linux-arm64.tar.gz", "Archive", "Linux", "ARM64", "64MB", "aaa"],
            ["go1.22.1.linux-x86-64.tar.gz", "Archive", "Linux", "x86-64", "66MB", "bbb"],
            ["go1.21.5.windows-x86-64.zip", "Archive", "Windows", "x86-64", "70MB", "ccc"],
            ["go1.9.2.linux-x86-64.tar.gz", "Archive", "Linux", "x86-64", "50MB", "ddd"],
            ["go1.22.3.src.tar.gz", "Source", "", "", "20MB", "eee"],
            ["go1.22.3.freebsd-amd64.tar.gz", "Archive", "FreeBSD", "x86-64", "64MB", "fff"],
        ]);
        let mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let versions = resolver
            .major_versions(&VersionsQuery::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(versions, vec!["1.21", "1.22"]);
    }

    #[tokio::test]
    async fn major_versions_reject_lts_queries_without_fetching() {
        // Unroutable on purpose; the query must fail before any fetch.
        let (_temp_dir, resolver) = test_resolver("http://127.0.0.1:1/dl/");

        let result = resolver.major_versions(&VersionsQuery { lts: true }).await;

        match result {
            Err(error @ ResolveError::BadRequest(_)) => {
                assert_eq!(error.to_string(), "Go does not have LTS versions");
                assert_eq!(error.status(), 400);
            }
            other => panic!("expected bad request, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn major_versions_come_from_cache_on_the_second_call() {
        let mut server = Server::new_async().await;
        let page = listing_page(&[[
            "go1.22.3.linux-arm64.tar.gz",
            "Archive",
            "Linux",
            "ARM64",
            "64MB",
            "aaa",
        ]]);
        let mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .expect(1)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let first = resolver
            .major_versions(&VersionsQuery::default())
            .await
            .unwrap();
        let second = resolver
            .major_versions(&VersionsQuery::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn latest_release_resolves_the_highest_patch() {
        let mut server = Server::new_async().await;
        let page = listing_page(&[
            ["go1.22.1.linux-arm64.tar.gz", "Archive", "Linux", "ARM64", "64MB", "aaa"],
            ["go1.22.3.linux-arm64.tar.gz", "Archive", "Linux", "ARM64", "64MB", "4D169D9CF3DD"],
            ["go1.22.10.linux-x86-64.tar.gz", "Archive", "Linux", "x86-64", "66MB", "ccc"],
        ]);
        let mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;

        let listing_url = format!("{}/dl/", server.url());
        let (_temp_dir, resolver) = test_resolver(&listing_url);
        let recipe = resolver
            .latest_release(&PlatformRequest {
                major_version: "1.22".to_string(),
                os: "linux".to_string(),
                arch: "arm64".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(recipe.package_version, "1.22.3");
        assert_eq!(recipe.script_dir, "golang");
        assert_eq!(
            recipe.script,
            "/static/assets/install-scripts/golang/setup.sh"
        );

        let artifact = &recipe.artifacts[0];
        assert_eq!(artifact.name, "go1.22.3.linux-arm64.tar.gz");
        assert_eq!(
            artifact.link,
            format!("{listing_url}go1.22.3.linux-arm64.tar.gz")
        );
        assert_eq!(artifact.extract_dir, "golang/go-1.22.3");
        assert_eq!(artifact.checksum.as_deref(), Some("4d169d9cf3dd"));
        assert_eq!(artifact.checksum_type.as_deref(), Some("sha256"));
    }

    #[tokio::test]
    async fn latest_release_maps_x64_and_picks_the_windows_script() {
        let mut server = Server::new_async().await;
        let page = listing_page(&[[
            "go1.21.5.windows-amd64.zip",
            "Archive",
            "Windows",
            "x86-64",
            "70MB",
            "ccc",
        ]]);
        let _mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let recipe = resolver
            .latest_release(&PlatformRequest {
                major_version: "1.21".to_string(),
                os: "windows".to_string(),
                arch: "x64".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(recipe.package_version, "1.21.5");
        assert_eq!(
            recipe.script,
            "/static/assets/install-scripts/golang/setup.cmd"
        );
    }

    #[tokio::test]
    async fn latest_release_rejects_unsupported_platforms_before_fetching() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body("unreachable")
            .expect(0)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let result = resolver
            .latest_release(&PlatformRequest {
                major_version: "1.21".to_string(),
                os: "plan9".to_string(),
                arch: "x86-64".to_string(),
            })
            .await;

        mock.assert_async().await;
        match result {
            Err(error @ ResolveError::UnsupportedPlatform { .. }) => {
                assert_eq!(error.status(), 400);
                assert!(error
                    .to_string()
                    .contains("Unsupported os/arch combination: plan9/x86-64"));
            }
            other => panic!("expected unsupported platform, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn latest_release_returns_nothing_found_for_an_unknown_major() {
        let mut server = Server::new_async().await;
        let page = listing_page(&[[
            "go1.22.3.linux-arm64.tar.gz",
            "Archive",
            "Linux",
            "ARM64",
            "64MB",
            "aaa",
        ]]);
        let _mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let result = resolver
            .latest_release(&PlatformRequest {
                major_version: "1.99".to_string(),
                os: "linux".to_string(),
                arch: "arm64".to_string(),
            })
            .await;

        match result {
            Err(error @ ResolveError::NoMatchingRelease) => {
                assert_eq!(error.status(), 404);
                assert_eq!(error.to_string(), "nothing found");
            }
            other => panic!("expected nothing found, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn latest_release_picks_the_first_of_tied_candidates() {
        let mut server = Server::new_async().await;
        // Same version/os/arch twice; checksums tell the rows apart.
        let page = listing_page(&[
            ["go1.22.3.linux-arm64.tar.gz", "Archive", "Linux", "ARM64", "64MB", "first"],
            ["go1.22.3.linux-arm64.tar.gz", "Archive", "Linux", "ARM64", "64MB", "second"],
        ]);
        let _mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let recipe = resolver
            .latest_release(&PlatformRequest {
                major_version: "1.22".to_string(),
                os: "linux".to_string(),
                arch: "arm64".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(recipe.artifacts[0].checksum.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn upstream_failures_surface_as_resolution_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/dl/")
            .with_status(500)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let result = resolver.major_versions(&VersionsQuery::default()).await;

        mock.assert_async().await;
        match result {
            Err(error @ ResolveError::Upstream(_)) => {
                assert_eq!(error.status(), 500);
                assert!(error.to_string().contains("HTTP status 500"));
            }
            other => panic!("expected upstream error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn clear_cache_forgets_previous_resolutions() {
        let mut server = Server::new_async().await;
        let page = listing_page(&[[
            "go1.22.3.linux-arm64.tar.gz",
            "Archive",
            "Linux",
            "ARM64",
            "64MB",
            "aaa",
        ]]);
        let mock = server
            .mock("GET", "/dl/")
            .with_status(200)
            .with_body(page)
            .expect(2)
            .create_async()
            .await;

        let (_temp_dir, resolver) = test_resolver(&format!("{}/dl/", server.url()));
        let request = PlatformRequest {
            major_version: "1.22".to_string(),
            os: "linux".to_string(),
            arch: "arm64".to_string(),
        };

        resolver.latest_release(&request).await.unwrap();
        resolver.latest_release(&request).await.unwrap(); // served from cache
        resolver.clear_cache().unwrap();
        resolver.latest_release(&request).await.unwrap(); // fetches again

        mock.assert_async().await;
    }
}

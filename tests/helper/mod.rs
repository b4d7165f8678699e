//! Shared wiring for resolver end-to-end tests

use std::sync::Arc;

use tempfile::TempDir;

use release_resolver::cache::TtlCache;
use release_resolver::fetch::Fetcher;
use release_resolver::packages::resolvers::{GcloudResolver, GolangResolver};

/// Fresh cache in a temp directory. Keep the `TempDir` alive for the whole
/// test or the database file disappears.
pub fn create_test_cache() -> (TempDir, Arc<TtlCache>) {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(TtlCache::new(&temp_dir.path().join("cache.db"), 8).unwrap());
    (temp_dir, cache)
}

#[allow(dead_code)]
pub fn create_golang_resolver(cache: Arc<TtlCache>, listing_url: &str) -> GolangResolver {
    GolangResolver::with_listing_url(cache, Arc::new(Fetcher::new()), listing_url)
}

#[allow(dead_code)]
pub fn create_gcloud_resolver(cache: Arc<TtlCache>) -> GcloudResolver {
    GcloudResolver::new(cache)
}

/// Renders a download listing page. One row per release:
/// (filename, kind, os, arch, size, sha256).
#[allow(dead_code)]
pub fn go_listing_page(rows: &[[&str; 6]]) -> String {
    let mut html = String::from(
        "<html><body><table class=\"downloadtable\">\
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

//! Data shapes shared by the release resolvers.

use serde::{Deserialize, Serialize};

/// One release row parsed from an upstream listing, already filtered down
/// to the kinds and platforms a provider serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub filename: String,
    pub kind: String,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub checksum: Option<String>,
}

/// Platform parameters exactly as supplied by the caller. Resolvers map
/// `os` and `arch` through their own vocabulary before using them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRequest {
    pub major_version: String,
    pub os: String,
    pub arch: String,
}

/// Options for a major-versions listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionsQuery {
    /// Restrict the listing to long-term-support lines.
    pub lts: bool,
}

/// One downloadable artifact within a recipe. Field order is the wire
/// order consumed by install clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_type: String,
    pub action: String,
    pub name: String,
    pub extract_dir: String,
    pub extract_target: String,
    pub version: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_type: Option<String>,
}

/// What to download and how to install it. Identical inputs always produce
/// identical recipes, so cached copies can be returned verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecipe {
    pub script: String,
    pub script_dir: String,
    pub package_version: String,
    pub artifacts: Vec<Artifact>,
}

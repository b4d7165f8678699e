use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use release_resolver::cache::TtlCache;
use release_resolver::config::Config;
use release_resolver::fetch::Fetcher;
use release_resolver::packages::resolver::PackageResolver;
use release_resolver::packages::resolvers;
use release_resolver::packages::types::{PlatformRequest, VersionsQuery};

const LOG_FILE_NAME: &str = "release-resolver.log";

#[derive(Parser)]
#[command(name = "release-resolver")]
#[command(version, about = "Resolves package releases into install recipes")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the major versions a package provides
    Versions {
        /// Package name, e.g. "golang" or "gcloud"
        package: String,
        /// Only list long-term-support lines
        #[arg(long)]
        lts: bool,
    },
    /// Resolve the latest release of a major version for a platform
    Release {
        /// Package name, e.g. "golang" or "gcloud"
        package: String,
        /// Major version to resolve, e.g. "1.22"
        major_version: String,
        /// Target operating system: windows, macos or linux
        os: String,
        /// Target CPU architecture: x86-64 (or x64) or arm64
        arch: String,
    },
    /// Drop a package's cached versions and recipes
    ClearCache {
        /// Package name, e.g. "golang" or "gcloud"
        package: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let data_dir = config
        .ensure_data_dir()
        .with_context(|| format!("could not create data directory {:?}", config.data_dir()))?;
    let _log_guard = init_tracing(&data_dir);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, &config))
}

fn init_tracing(data_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::never(data_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}

async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    let cache = Arc::new(TtlCache::new(
        &config.cache_db_path(),
        config.cache_period_hours,
    )?);
    let fetcher = Arc::new(Fetcher::with_timeout(Duration::from_secs(
        config.fetch_timeout_secs,
    )));
    let providers = resolvers::all(cache, fetcher);

    match command {
        Command::Versions { package, lts } => {
            let provider = lookup(&providers, &package)?;
            let versions = provider
                .major_versions(&VersionsQuery { lts })
                .await
                .map_err(render)?;
            println!("{}", serde_json::to_string_pretty(&versions)?);
        }
        Command::Release {
            package,
            major_version,
            os,
            arch,
        } => {
            let provider = lookup(&providers, &package)?;
            let recipe = provider
                .latest_release(&PlatformRequest {
                    major_version,
                    os,
                    arch,
                })
                .await
                .map_err(render)?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        Command::ClearCache { package } => {
            let provider = lookup(&providers, &package)?;
            provider.clear_cache().map_err(render)?;
            let reply = serde_json::json!({ "ok": true, "message": "cache cleared" });
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    Ok(())
}

fn lookup<'a>(
    providers: &'a HashMap<&'static str, Arc<dyn PackageResolver>>,
    package: &str,
) -> anyhow::Result<&'a Arc<dyn PackageResolver>> {
    providers.get(package).ok_or_else(|| {
        let mut known: Vec<&str> = providers.keys().copied().collect();
        known.sort_unstable();
        anyhow::anyhow!(
            "unknown package '{}', expected one of: {}",
            package,
            known.join(", ")
        )
    })
}

fn render(error: release_resolver::packages::error::ResolveError) -> anyhow::Error {
    anyhow::anyhow!("{} (status {})", error, error.status())
}

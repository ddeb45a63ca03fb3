//! Locating a repository's manifest on disk.
//!
//! Local directories and `file://` URIs are read in place. Anything else is
//! treated as a git remote and kept as a shallow clone under the cache
//! directory, refreshed on every sync.

use crate::error::{Error, Result};
use crate::manifest;
use crate::process;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Where a repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    pub fn parse(repo: &str) -> Self {
        if let Some(path) = repo.strip_prefix("file://") {
            return Location::Local(PathBuf::from(path));
        }
        let scp_like = repo.contains('@') && repo.contains(':') && !repo.contains("://");
        if repo.contains("://") || scp_like {
            Location::Remote(repo.to_string())
        } else {
            Location::Local(PathBuf::from(repo))
        }
    }
}

/// Directory name used for a remote's clone.
///
/// A readable prefix plus a short hash of the full URL, so remotes that
/// sanitize to the same prefix still get separate clones.
pub fn cache_slug(url: &str) -> String {
    let trimmed = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .trim_end_matches('/')
        .trim_end_matches(".git");
    let slug: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let hash = blake3::hash(url.as_bytes()).to_hex();
    format!("{}-{}", slug.trim_matches('_'), &hash.as_str()[..12])
}

/// Make the repository's manifest available locally and return its path.
pub fn sync(repo: &str, git: &str, cache_dir: &Path) -> Result<PathBuf> {
    match Location::parse(repo) {
        Location::Local(path) => local_manifest(repo, &path),
        Location::Remote(url) => {
            let checkout = cache_dir.join(cache_slug(&url));
            sync_remote(&url, git, &checkout)?;
            let manifest = manifest::manifest_path(&checkout);
            if manifest.is_file() {
                Ok(manifest)
            } else {
                Err(unavailable(repo, "no dist.manifest in repository"))
            }
        }
    }
}

fn local_manifest(repo: &str, path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let manifest = manifest::manifest_path(path);
    if manifest.is_file() {
        Ok(manifest)
    } else if path.exists() {
        Err(unavailable(repo, "no dist.manifest in repository"))
    } else {
        Err(unavailable(repo, "path does not exist"))
    }
}

fn sync_remote(url: &str, git: &str, checkout: &Path) -> Result<()> {
    if checkout.join(".git").is_dir() {
        log::debug!("Refreshing {url} in {}", checkout.display());
        let output = process::run(
            Command::new(git)
                .arg("-C")
                .arg(checkout)
                .args(["pull", "--ff-only", "--quiet"]),
            Some(GIT_TIMEOUT),
        )?;
        if !output.success() {
            // A stale checkout still answers lookups
            log::warn!(
                "Could not refresh {url}, using cached copy: {}",
                output.combined().trim()
            );
        }
        return Ok(());
    }

    if let Some(parent) = checkout.parent() {
        std::fs::create_dir_all(parent)?;
    }
    log::info!("Cloning {url}");
    let output = process::run(
        Command::new(git)
            .args(["clone", "--depth", "1", "--quiet", url])
            .arg(checkout),
        Some(GIT_TIMEOUT),
    )?;
    if output.success() {
        return Ok(());
    }

    let combined = output.combined();
    match Error::from_luadist_output(&combined, None) {
        network @ Error::Network { .. } => Err(network),
        _ => Err(unavailable(url, combined.trim())),
    }
}

fn unavailable(repo: &str, message: &str) -> Error {
    Error::RepositoryUnavailable {
        repo: repo.to_string(),
        message: message.to_string(),
    }
}

//! Request and response records
//!
//! A request can come from a JSON or TOML file and from command-line flags.
//! Flags win over the file, the file wins over `config.toml`, and the config
//! wins over built-in defaults.

use anyhow::{Context, Result};
use reconcile::{DesiredState, DistPolicy, ExecuteOptions, ReconciliationResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cli::TargetArgs;
use crate::config::{self, Config};
use crate::paths;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no environment path given (use --path or env_directory in the request file)")]
    MissingPath,

    #[error("unsupported request format '{0}' (expected .json or .toml)")]
    UnsupportedFormat(String),
}

/// Reconciliation request as read from a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileRequest {
    #[serde(default, alias = "path")]
    pub env_directory: Option<String>,
    #[serde(default, alias = "package", alias = "name")]
    pub packages: Vec<String>,
    #[serde(default)]
    pub allow_dists: Option<DistPolicy>,
    #[serde(default)]
    pub dists_repo: Option<String>,
}

impl ReconcileRequest {
    /// Load a request file; the format follows the extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Invalid request {}", path.display())),
            "toml" => {
                toml::from_str(&content).with_context(|| format!("Invalid request {}", path.display()))
            }
            other => Err(RequestError::UnsupportedFormat(other.to_string()).into()),
        }
    }
}

/// Install tuning that only `apply` takes
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuning {
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
}

/// Everything a pass needs, after merging all sources
#[derive(Debug, Clone)]
pub struct Resolved {
    pub request: reconcile::Request,
    pub options: ExecuteOptions,
    pub retries: u32,
}

/// Merge flags, request file and config into a validated request
pub fn resolve(target: &TargetArgs, tuning: Tuning, config: &Config) -> Result<Resolved> {
    let file = match &target.request {
        Some(path) => ReconcileRequest::load(path)?,
        None => ReconcileRequest::default(),
    };
    resolve_with(target, &file, tuning, config)
}

fn resolve_with(
    target: &TargetArgs,
    file: &ReconcileRequest,
    tuning: Tuning,
    config: &Config,
) -> Result<Resolved> {
    let env_dir: PathBuf = match (&target.path, &file.env_directory) {
        (Some(path), _) => paths::expand_path(path),
        (None, Some(path)) => paths::expand(path),
        (None, None) => return Err(RequestError::MissingPath.into()),
    };

    let packages = if target.packages.is_empty() {
        &file.packages
    } else {
        &target.packages
    };
    let desired = DesiredState::parse(packages.iter().map(String::as_str))?;
    if desired.len() < packages.len() {
        log::debug!(
            "Ignoring {} duplicate package name(s)",
            packages.len() - desired.len()
        );
    }

    let policy = target
        .allow_dists
        .or(file.allow_dists)
        .or(config.allow_dists)
        .unwrap_or_default();

    let repo = target
        .repo
        .clone()
        .or_else(|| file.dists_repo.clone())
        .or_else(|| config.dists_repo.clone())
        .unwrap_or_else(|| distkit::DEFAULT_REPOSITORY.to_string());

    let jobs = tuning
        .jobs
        .or(config.jobs)
        .unwrap_or(config::DEFAULT_JOBS)
        .max(1);
    let timeout_secs = tuning
        .timeout_secs
        .or(config.install_timeout_secs)
        .unwrap_or(config::DEFAULT_INSTALL_TIMEOUT_SECS);
    let retries = tuning
        .retries
        .or(config.retries)
        .unwrap_or(config::DEFAULT_RETRIES)
        .max(1);

    Ok(Resolved {
        request: reconcile::Request {
            env_dir,
            desired,
            policy,
            repo,
        },
        options: ExecuteOptions {
            jobs,
            install_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        },
        retries,
    })
}

/// One failed package in the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub package: String,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailureRecord>,
    pub messages: Vec<String>,
    pub commands: Vec<String>,
    pub env_path: String,
}

impl ReconcileResult {
    pub fn new(result: &ReconciliationResult, env_dir: &Path) -> Self {
        let names = |list: &[reconcile::PackageName]| -> Vec<String> {
            list.iter().map(ToString::to_string).collect()
        };
        Self {
            changed: result.changed,
            installed: names(&result.installed),
            skipped: names(&result.skipped),
            failed: result
                .failed
                .iter()
                .map(|f| FailureRecord {
                    package: f.package.to_string(),
                    reason: f.reason.code(),
                    detail: Some(f.reason.detail()).filter(|d| !d.is_empty()),
                })
                .collect(),
            messages: result.messages.clone(),
            commands: result.commands.clone(),
            env_path: env_dir.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Failure, FailureReason, PackageName};

    fn target(path: Option<&str>, packages: &[&str]) -> TargetArgs {
        TargetArgs {
            path: path.map(PathBuf::from),
            packages: packages.iter().map(ToString::to_string).collect(),
            ..TargetArgs::default()
        }
    }

    #[test]
    fn test_load_json_request_with_module_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lua.json");
        fs::write(
            &path,
            r#"{ "path": "/opt/lua", "package": ["md5", "luagl"], "allow_dists": "source" }"#,
        )
        .unwrap();

        let request = ReconcileRequest::load(&path).unwrap();
        assert_eq!(request.env_directory.as_deref(), Some("/opt/lua"));
        assert_eq!(request.packages, vec!["md5", "luagl"]);
        assert_eq!(request.allow_dists, Some(DistPolicy::SourceOnly));
        assert_eq!(request.dists_repo, None);
    }

    #[test]
    fn test_load_toml_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lua.toml");
        fs::write(
            &path,
            "env_directory = \"/opt/lua\"\npackages = [\"md5\"]\ndists_repo = \"file:///srv/repo\"\n",
        )
        .unwrap();

        let request = ReconcileRequest::load(&path).unwrap();
        assert_eq!(request.packages, vec!["md5"]);
        assert_eq!(request.dists_repo.as_deref(), Some("file:///srv/repo"));
    }

    #[test]
    fn test_load_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lua.yaml");
        fs::write(&path, "packages: [md5]").unwrap();
        assert!(ReconcileRequest::load(&path).is_err());
    }

    #[test]
    fn test_invalid_policy_in_file() {
        let err = serde_json::from_str::<ReconcileRequest>(r#"{ "allow_dists": "rocks" }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_defaults_apply() {
        let resolved = resolve_with(
            &target(Some("/opt/lua"), &["md5"]),
            &ReconcileRequest::default(),
            Tuning::default(),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(resolved.request.policy, DistPolicy::All);
        assert_eq!(resolved.request.repo, distkit::DEFAULT_REPOSITORY);
        assert_eq!(resolved.options.jobs, 1);
        assert_eq!(
            resolved.options.install_timeout,
            Some(Duration::from_secs(1800))
        );
        assert_eq!(resolved.retries, 3);
    }

    #[test]
    fn test_precedence_flags_over_file_over_config() {
        let file = ReconcileRequest {
            env_directory: Some("/srv/file-env".into()),
            packages: vec!["luagl".into()],
            allow_dists: Some(DistPolicy::SourceOnly),
            dists_repo: Some("file:///file-repo".into()),
        };
        let config = Config {
            dists_repo: Some("file:///config-repo".into()),
            allow_dists: Some(DistPolicy::BinaryOnly),
            jobs: Some(3),
            install_timeout_secs: Some(0),
            ..Config::default()
        };
        let mut args = target(Some("/opt/lua"), &[]);
        args.allow_dists = Some(DistPolicy::All);

        let resolved = resolve_with(&args, &file, Tuning::default(), &config).unwrap();

        assert_eq!(resolved.request.env_dir, PathBuf::from("/opt/lua"));
        assert_eq!(
            resolved.request.desired.iter().map(PackageName::as_str).collect::<Vec<_>>(),
            vec!["luagl"]
        );
        assert_eq!(resolved.request.policy, DistPolicy::All);
        assert_eq!(resolved.request.repo, "file:///file-repo");
        assert_eq!(resolved.options.jobs, 3);
        assert_eq!(resolved.options.install_timeout, None);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let err = resolve_with(
            &target(None, &["md5"]),
            &ReconcileRequest::default(),
            Tuning::default(),
            &Config::default(),
        )
        .unwrap_err();
        assert!(err.downcast_ref::<RequestError>().is_some());
    }

    #[test]
    fn test_invalid_package_name_is_rejected() {
        let err = resolve_with(
            &target(Some("/opt/lua"), &["-source=false"]),
            &ReconcileRequest::default(),
            Tuning::default(),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<reconcile::Error>(),
            Some(reconcile::Error::InvalidPackageName { .. })
        ));
    }

    #[test]
    fn test_result_record() {
        let result = ReconciliationResult {
            changed: true,
            installed: vec![PackageName::new("md5").unwrap()],
            skipped: vec![PackageName::new("luagl").unwrap()],
            failed: vec![Failure {
                package: PackageName::new("slow").unwrap(),
                reason: FailureReason::Timeout {
                    after: Duration::from_secs(30),
                },
            }],
            messages: vec!["created package environment".into()],
            commands: vec!["luadist install md5".into()],
        };

        let record = ReconcileResult::new(&result, Path::new("/opt/lua"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["changed"], true);
        assert_eq!(json["installed"][0], "md5");
        assert_eq!(json["failed"][0]["reason"], "InstallFailed");
        assert_eq!(json["failed"][0]["detail"], "timed out after 30s");
        assert_eq!(json["env_path"], "/opt/lua");
    }
}

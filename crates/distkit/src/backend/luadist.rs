//! Real LuaDist backend driving `<env>/LuaDist/bin/luadist`.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::manifest::{self, Manifest};
use crate::process;
use crate::repo;
use crate::types::{BackendConfig, InstallOptions, InstalledDist};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// Directory LuaDist deploys itself into, relative to the environment.
pub const DEPLOYMENT_DIR: &str = "LuaDist";

/// Marker printed when every requested dist is already present
const NOTHING_TO_INSTALL: &str = "no packages to install";

/// Path of the `luadist` executable inside an environment.
pub fn luadist_path(env: &Path) -> PathBuf {
    env.join(DEPLOYMENT_DIR).join("bin").join("luadist")
}

/// Arguments for installing one dist.
pub fn install_args(name: &str, repo: &str, options: &InstallOptions) -> Vec<String> {
    vec![
        "install".to_string(),
        name.to_string(),
        format!("-source={}", options.allow_source),
        format!("-binary={}", options.allow_binary),
        format!("-repos={repo}"),
    ]
}

/// Backend that executes the deployment's own `luadist` script.
pub struct LuaDistBackend {
    config: BackendConfig,
}

impl LuaDistBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn registry_dir(&self, env: &Path) -> PathBuf {
        env.join(DEPLOYMENT_DIR).join(&self.config.registry_dir)
    }
}

impl Default for LuaDistBackend {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl Backend for LuaDistBackend {
    fn is_deployed(&self, env: &Path) -> bool {
        luadist_path(env).is_file()
    }

    fn bootstrap(&self, env: &Path) -> Result<()> {
        log::info!("Deploying LuaDist into {}", env.display());
        let output = process::run(
            Command::new("sh")
                .args(["-c", &self.config.bootstrap_command])
                .current_dir(env),
            None,
        )?;

        if self.is_deployed(env) {
            return Ok(());
        }

        let details = output.combined();
        Err(Error::BootstrapFailed {
            message: if details.trim().is_empty() {
                format!(
                    "'{}' exited with {} and left no {}",
                    self.config.bootstrap_command,
                    output.status,
                    luadist_path(env).display()
                )
            } else {
                details.trim().to_string()
            },
        })
    }

    fn list_installed(&self, env: &Path) -> Result<Vec<InstalledDist>> {
        let registry = self.registry_dir(env);
        if !registry.is_dir() {
            log::debug!("No registry at {}", registry.display());
            return Ok(Vec::new());
        }

        let mut dists = Vec::new();
        for entry in WalkDir::new(&registry).min_depth(2).max_depth(2) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && entry.file_name() == manifest::DIST_INFO_FILE {
                dists.push(manifest::read_dist_info(entry.path())?);
            }
        }
        dists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dists)
    }

    fn manifest(&self, repo: &str) -> Result<Manifest> {
        let path = repo::sync(repo, &self.config.git, &self.config.cache_dir)?;
        Manifest::from_file(&path)
    }

    fn install(&self, env: &Path, name: &str, repo: &str, options: &InstallOptions) -> Result<()> {
        let luadist = luadist_path(env);
        if !luadist.is_file() {
            return Err(Error::NotDeployed(env.to_path_buf()));
        }

        let output = process::run(
            Command::new(&luadist)
                .args(install_args(name, repo, options))
                .current_dir(env),
            options.timeout,
        )?;

        let combined = output.combined();
        if output.success() || combined.to_lowercase().contains(NOTHING_TO_INSTALL) {
            log::debug!("luadist install {name}: ok");
            return Ok(());
        }

        Err(Error::from_luadist_output(&combined, Some(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DistType;
    use std::time::Duration;

    fn backend_with(bootstrap: &str) -> LuaDistBackend {
        LuaDistBackend::new(BackendConfig {
            bootstrap_command: bootstrap.to_string(),
            ..BackendConfig::default()
        })
    }

    fn write_dist_info(env: &Path, dir: &str, body: &str) {
        let path = env
            .join("LuaDist/share/luadist-git/dists")
            .join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("dist.info"), body).unwrap();
    }

    #[cfg(unix)]
    fn fake_luadist(env: &Path, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = luadist_path(env);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_install_args() {
        let options = InstallOptions {
            allow_source: true,
            allow_binary: false,
            timeout: None,
        };
        assert_eq!(
            install_args("md5", "git://example.org/repo.git", &options),
            vec![
                "install",
                "md5",
                "-source=true",
                "-binary=false",
                "-repos=git://example.org/repo.git"
            ]
        );
    }

    #[test]
    fn test_list_installed_empty_without_deployment() {
        let env = tempfile::tempdir().unwrap();
        let dists = LuaDistBackend::default().list_installed(env.path()).unwrap();
        assert!(dists.is_empty());
    }

    #[test]
    fn test_list_installed_reads_registry() {
        let env = tempfile::tempdir().unwrap();
        write_dist_info(
            env.path(),
            "md5-1.2-Universal-source",
            "name = \"md5\"\nversion = \"1.2\"\narch = \"Universal\"\ntype = \"source\"\n",
        );
        write_dist_info(
            env.path(),
            "luacurl-1.2.1-Linux-x86_64",
            "name = \"luacurl\"\nversion = \"1.2.1\"\narch = \"Linux\"\ntype = \"x86_64\"\n",
        );

        let dists = LuaDistBackend::default().list_installed(env.path()).unwrap();

        assert_eq!(dists.len(), 2);
        assert_eq!(dists[0].name, "luacurl");
        assert_eq!(dists[0].dist_type, DistType::Binary);
        assert_eq!(dists[1].name, "md5");
        assert_eq!(dists[1].dist_type, DistType::Source);
    }

    #[test]
    fn test_list_installed_fails_on_corrupt_entry() {
        let env = tempfile::tempdir().unwrap();
        write_dist_info(env.path(), "broken", "name = {");

        let err = LuaDistBackend::default()
            .list_installed(env.path())
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_install_requires_deployment() {
        let env = tempfile::tempdir().unwrap();
        let err = LuaDistBackend::default()
            .install(env.path(), "md5", "repo", &InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotDeployed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_bootstrap_runs_command_in_env() {
        let env = tempfile::tempdir().unwrap();
        let backend = backend_with(
            "mkdir -p LuaDist/bin && printf '#!/bin/sh\\n' > LuaDist/bin/luadist",
        );

        assert!(!backend.is_deployed(env.path()));
        backend.bootstrap(env.path()).unwrap();
        assert!(backend.is_deployed(env.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_bootstrap_failure_is_reported() {
        let env = tempfile::tempdir().unwrap();
        let err = backend_with("echo 'curl: (6) Could not resolve host' >&2; exit 6")
            .bootstrap(env.path())
            .unwrap_err();
        match err {
            Error::BootstrapFailed { message } => assert!(message.contains("Could not resolve")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_install_success_and_already_installed() {
        let env = tempfile::tempdir().unwrap();
        fake_luadist(env.path(), "echo \"args: $*\"; exit 0");
        let backend = LuaDistBackend::default();

        backend
            .install(env.path(), "md5", "repo", &InstallOptions::default())
            .unwrap();

        fake_luadist(env.path(), "echo 'No packages to install.'; exit 1");
        backend
            .install(env.path(), "md5", "repo", &InstallOptions::default())
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_install_failure_is_classified() {
        let env = tempfile::tempdir().unwrap();
        fake_luadist(
            env.path(),
            "echo \"Error installing: No suitable candidate for package '$2' found.\"; exit 1",
        );

        let err = LuaDistBackend::default()
            .install(env.path(), "ghost", "repo", &InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name } if name == "ghost"));
    }

    #[cfg(unix)]
    #[test]
    fn test_install_timeout() {
        let env = tempfile::tempdir().unwrap();
        fake_luadist(env.path(), "sleep 5");
        let options = InstallOptions {
            timeout: Some(Duration::from_millis(200)),
            ..InstallOptions::default()
        };

        let err = LuaDistBackend::default()
            .install(env.path(), "md5", "repo", &options)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_manifest_from_local_repository() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(
            repo.path().join("dist.manifest"),
            "return { { name = \"md5\", version = \"1.2\", arch = \"Universal\", type = \"source\" } }",
        )
        .unwrap();

        let manifest = LuaDistBackend::default()
            .manifest(&repo.path().to_string_lossy())
            .unwrap();
        assert_eq!(manifest.available_types("md5"), vec![DistType::Source]);
    }
}

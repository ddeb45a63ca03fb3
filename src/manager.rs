//! LuaDist as the reconciliation engine's package manager

use distkit::{Client, DistType, InstallOptions};
use reconcile::{
    DistributionKind, InstallRequest, InstalledPackage, ManagerError, PackageManager, PackageName,
};
use std::path::Path;

/// Adapter from [`distkit::Client`] to [`reconcile::PackageManager`]
pub struct LuaDistManager {
    client: Client,
}

impl LuaDistManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn kind_of(dist_type: DistType) -> DistributionKind {
    match dist_type {
        DistType::Source => DistributionKind::Source,
        DistType::Binary => DistributionKind::Binary,
    }
}

fn install_options(request: &InstallRequest<'_>) -> InstallOptions {
    InstallOptions {
        allow_source: request.policy.allows_source(),
        allow_binary: request.policy.allows_binary(),
        timeout: request.timeout,
    }
}

fn manager_error(err: distkit::Error) -> ManagerError {
    match err {
        distkit::Error::NotFound { name } => ManagerError::NotFound(name),
        distkit::Error::Timeout { after } => ManagerError::Timeout(after),
        other => {
            let category = other.category();
            log::debug!("{}: {}", category.description(), category.advice());
            ManagerError::Failed(other.to_string())
        }
    }
}

impl PackageManager for LuaDistManager {
    fn installed(&self, env_dir: &Path) -> Result<Vec<InstalledPackage>, ManagerError> {
        let dists = self.client.list_installed(env_dir).map_err(manager_error)?;

        let mut packages = Vec::with_capacity(dists.len());
        for dist in dists {
            let name = match PackageName::new(dist.name.as_str()) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Ignoring registry entry: {e}");
                    continue;
                }
            };
            let mut package = InstalledPackage::new(name, kind_of(dist.dist_type));
            if let Some(version) = dist.version {
                package = package.with_version(version);
            }
            packages.push(package);
        }
        Ok(packages)
    }

    fn available_kinds(
        &self,
        repo: &str,
        package: &PackageName,
    ) -> Result<Vec<DistributionKind>, ManagerError> {
        let types = self
            .client
            .available_types(repo, package.as_str())
            .map_err(manager_error)?;
        Ok(types.into_iter().map(kind_of).collect())
    }

    fn prepare_environment(&self, env_dir: &Path) -> Result<bool, ManagerError> {
        self.client.ensure_environment(env_dir).map_err(manager_error)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<(), ManagerError> {
        let options = install_options(request);
        self.client
            .install_with_retry(request.env_dir, request.package.as_str(), request.repo, &options)
            .map_err(manager_error)
    }

    fn describe_install(&self, request: &InstallRequest<'_>) -> String {
        let options = install_options(request);
        self.client
            .install_command(request.env_dir, request.package.as_str(), request.repo, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distkit::backend::Backend;
    use reconcile::DistPolicy;
    use distkit::{InstalledDist, Manifest, RetryConfig};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded {
        installs: Vec<(String, InstallOptions)>,
    }

    struct FakeLuaDist {
        recorded: Arc<Mutex<Recorded>>,
    }

    impl Backend for FakeLuaDist {
        fn is_deployed(&self, _env: &Path) -> bool {
            true
        }

        fn bootstrap(&self, _env: &Path) -> distkit::Result<()> {
            Ok(())
        }

        fn list_installed(&self, _env: &Path) -> distkit::Result<Vec<InstalledDist>> {
            Ok(vec![
                InstalledDist {
                    name: "md5".into(),
                    version: Some("1.2".into()),
                    dist_type: DistType::Binary,
                },
                InstalledDist {
                    name: "bad name".into(),
                    version: None,
                    dist_type: DistType::Source,
                },
            ])
        }

        fn manifest(&self, _repo: &str) -> distkit::Result<Manifest> {
            Manifest::parse(r#"return { { name = "luacurl", type = "x86_64" } }"#)
        }

        fn install(
            &self,
            _env: &Path,
            name: &str,
            _repo: &str,
            options: &InstallOptions,
        ) -> distkit::Result<()> {
            self.recorded
                .lock()
                .unwrap()
                .installs
                .push((name.to_string(), *options));
            match name {
                "slow" => Err(distkit::Error::Timeout {
                    after: Duration::from_secs(5),
                }),
                "broken" => Err(distkit::Error::CommandFailed {
                    message: "luadist command failed for broken".into(),
                    output: "make: *** Error 2".into(),
                }),
                _ => Ok(()),
            }
        }
    }

    fn manager() -> (LuaDistManager, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let backend = FakeLuaDist {
            recorded: Arc::clone(&recorded),
        };
        let client = Client::with_backend(Box::new(backend)).with_retry(RetryConfig::no_retry());
        (LuaDistManager::new(client), recorded)
    }

    fn request<'a>(
        package: &'a PackageName,
        policy: DistPolicy,
        timeout: Option<Duration>,
    ) -> InstallRequest<'a> {
        InstallRequest {
            package,
            env_dir: Path::new("/opt/lua"),
            repo: "file:///srv/repo",
            policy,
            timeout,
        }
    }

    #[test]
    fn test_installed_maps_registry() {
        let (manager, _) = manager();
        let installed = manager.installed(Path::new("/opt/lua")).unwrap();

        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].name.as_str(), "md5");
        assert_eq!(installed[0].kind, DistributionKind::Binary);
        assert_eq!(installed[0].version.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_available_kinds() {
        let (manager, _) = manager();
        let luacurl = PackageName::new("luacurl").unwrap();
        let ghost = PackageName::new("ghost").unwrap();

        assert_eq!(
            manager.available_kinds("repo", &luacurl).unwrap(),
            vec![DistributionKind::Binary]
        );
        assert_eq!(
            manager.available_kinds("repo", &ghost),
            Err(ManagerError::NotFound("ghost".into()))
        );
    }

    #[test]
    fn test_install_forwards_policy_and_timeout() {
        let (manager, recorded) = manager();
        let md5 = PackageName::new("md5").unwrap();

        manager
            .install(&request(&md5, DistPolicy::SourceOnly, Some(Duration::from_secs(9))))
            .unwrap();

        let installs = &recorded.lock().unwrap().installs;
        assert_eq!(installs[0].0, "md5");
        assert!(installs[0].1.allow_source);
        assert!(!installs[0].1.allow_binary);
        assert_eq!(installs[0].1.timeout, Some(Duration::from_secs(9)));
    }

    #[test]
    fn test_install_errors_are_mapped() {
        let (manager, _) = manager();
        let slow = PackageName::new("slow").unwrap();
        let broken = PackageName::new("broken").unwrap();

        assert_eq!(
            manager.install(&request(&slow, DistPolicy::All, None)),
            Err(ManagerError::Timeout(Duration::from_secs(5)))
        );
        assert!(matches!(
            manager.install(&request(&broken, DistPolicy::All, None)),
            Err(ManagerError::Failed(msg)) if msg.contains("broken")
        ));
    }

    /// Stand-in for `luadist install`: records the dist the way LuaDist
    /// does, under the default registry of the deployment it runs in.
    #[cfg(unix)]
    const FAKE_LUADIST: &str = r#"#!/bin/sh
[ "$1" = install ] || exit 1
dir="LuaDist/share/luadist-git/dists/$2-1.0"
mkdir -p "$dir"
printf 'name = "%s"\nversion = "1.0"\ntype = "source"\n' "$2" > "$dir/dist.info"
echo "$2" >> installs.log
"#;

    #[cfg(unix)]
    #[test]
    fn test_luadist_environment_converges() {
        use distkit::BackendConfig;
        use reconcile::{DesiredState, Request};

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("luadist.sh");
        std::fs::write(&script, FAKE_LUADIST).unwrap();

        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(
            repo.join("dist.manifest"),
            r#"return {
  { name = "md5", version = "1.0", arch = "Universal", type = "source" },
  { name = "lpeg", version = "1.0", arch = "Universal", type = "source" },
  { name = "luacurl", version = "1.0", arch = "Linux", type = "x86_64" },
}"#,
        )
        .unwrap();

        let config = BackendConfig {
            bootstrap_command: format!(
                "mkdir -p LuaDist/bin && cp '{}' LuaDist/bin/luadist && chmod +x LuaDist/bin/luadist",
                script.display()
            ),
            cache_dir: tmp.path().join("cache"),
            ..BackendConfig::default()
        };
        let client = Client::new(config).with_retry(RetryConfig::no_retry());
        let manager = LuaDistManager::new(client);

        let env = tmp.path().join("lua");
        let request = |packages: &[&str], policy: DistPolicy| Request {
            env_dir: env.clone(),
            desired: DesiredState::parse(packages.iter().copied()).unwrap(),
            policy,
            repo: repo.to_string_lossy().into_owned(),
        };
        let names = |list: &[PackageName]| -> Vec<String> {
            list.iter().map(ToString::to_string).collect()
        };

        // Fresh environment: deployed, then both dists installed
        let first =
            reconcile::reconcile_simple(&manager, &request(&["md5", "lpeg"], DistPolicy::All))
                .unwrap();
        assert!(first.changed);
        assert_eq!(names(&first.installed), vec!["md5", "lpeg"]);
        assert!(first.failed.is_empty());

        // Same request again: everything is read back from the registry
        let second =
            reconcile::reconcile_simple(&manager, &request(&["md5", "lpeg"], DistPolicy::All))
                .unwrap();
        assert!(!second.changed);
        assert!(second.installed.is_empty());
        assert_eq!(names(&second.skipped), vec!["md5", "lpeg"]);

        // Growing the list under a stricter policy leaves installed dists alone
        let third = reconcile::reconcile_simple(
            &manager,
            &request(&["md5", "lpeg", "luacurl"], DistPolicy::SourceOnly),
        )
        .unwrap();
        assert!(!third.changed);
        assert_eq!(names(&third.skipped), vec!["md5", "lpeg"]);
        assert_eq!(third.failed[0].package.as_str(), "luacurl");
        assert_eq!(third.failed[0].reason.code(), "PolicyViolation");

        let log = std::fs::read_to_string(env.join("installs.log")).unwrap();
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["md5", "lpeg"]);
    }

    #[test]
    fn test_describe_install() {
        let (manager, _) = manager();
        let luagl = PackageName::new("luagl").unwrap();

        assert_eq!(
            manager.describe_install(&request(&luagl, DistPolicy::BinaryOnly, None)),
            "/opt/lua/LuaDist/bin/luadist install luagl -source=false -binary=true -repos=file:///srv/repo"
        );
    }
}

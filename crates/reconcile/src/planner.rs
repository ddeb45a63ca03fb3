//! Diff planner - decides what each desired package needs

use crate::error::ManagerError;
use crate::filter::DistPolicy;
use crate::manager::PackageManager;
use crate::types::{CurrentState, DesiredState, Failure, FailureReason, PackageName};

/// Classification of every desired package for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Packages to install, in desired order
    pub to_install: Vec<PackageName>,
    /// Packages already present in the environment
    pub already_satisfied: Vec<PackageName>,
    /// Packages whose every available kind is disallowed
    pub policy_rejected: Vec<Failure>,
    /// Packages missing from the repository or whose lookup failed
    pub unavailable: Vec<Failure>,
}

impl Plan {
    /// Check if the plan would install anything
    pub fn has_changes(&self) -> bool {
        !self.to_install.is_empty()
    }

    /// Rejected and unavailable packages together
    pub fn rejected(&self) -> impl Iterator<Item = &Failure> {
        self.policy_rejected.iter().chain(self.unavailable.iter())
    }

    /// Total number of packages classified
    pub fn total(&self) -> usize {
        self.to_install.len()
            + self.already_satisfied.len()
            + self.policy_rejected.len()
            + self.unavailable.len()
    }
}

/// Build a plan for `desired` against the inspected `current` state.
///
/// A package already present is satisfied whatever its kind: the policy only
/// gates new installs, so tightening it never re-evaluates what is installed.
/// The repository is only consulted for packages that are missing.
pub fn plan(
    desired: &DesiredState,
    current: &CurrentState,
    policy: DistPolicy,
    manager: &dyn PackageManager,
    repo: &str,
) -> Plan {
    let mut plan = Plan::default();

    for name in desired.iter() {
        if current.contains(name) {
            log::debug!("{name}: already installed");
            plan.already_satisfied.push(name.clone());
            continue;
        }

        let available = match manager.available_kinds(repo, name) {
            Ok(kinds) if kinds.is_empty() => {
                plan.unavailable.push(failure(name, FailureReason::NotFound));
                continue;
            }
            Ok(kinds) => kinds,
            Err(ManagerError::NotFound(_)) => {
                log::warn!("{name}: not found in {repo}");
                plan.unavailable.push(failure(name, FailureReason::NotFound));
                continue;
            }
            Err(e) => {
                log::warn!("{name}: repository lookup failed: {e}");
                plan.unavailable.push(failure(
                    name,
                    FailureReason::InstallFailed {
                        message: format!("repository lookup failed: {e}"),
                    },
                ));
                continue;
            }
        };

        if !policy.accepts_any(&available) {
            log::warn!("{name}: no dist allowed under policy '{policy}'");
            plan.policy_rejected.push(failure(
                name,
                FailureReason::PolicyViolation { available },
            ));
            continue;
        }

        log::debug!("{name}: will install");
        plan.to_install.push(name.clone());
    }

    log::debug!(
        "Planned {} packages, {} to install",
        plan.total(),
        plan.to_install.len()
    );
    plan
}

fn failure(name: &PackageName, reason: FailureReason) -> Failure {
    Failure {
        package: name.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeManager, names};
    use crate::types::{DistributionKind, InstalledPackage, PackageName};
    use crate::types::DistributionKind::{Binary, Source};

    fn installed(pkgs: &[(&str, DistributionKind)]) -> CurrentState {
        CurrentState::new(
            pkgs.iter()
                .map(|(n, k)| InstalledPackage::new(PackageName::new(*n).unwrap(), *k)),
        )
    }

    #[test]
    fn test_plan_skips_installed_and_installs_missing() {
        let manager = FakeManager::new()
            .with_repo_package("md5", &[Source])
            .with_repo_package("luagl", &[Source, Binary]);
        let desired = DesiredState::parse(["md5", "luagl"]).unwrap();
        let current = installed(&[("md5", Source)]);

        let plan = plan(&desired, &current, DistPolicy::All, &manager, "repo");

        assert_eq!(plan.already_satisfied, names(&["md5"]));
        assert_eq!(plan.to_install, names(&["luagl"]));
        assert!(plan.policy_rejected.is_empty());
        assert!(plan.unavailable.is_empty());
    }

    #[test]
    fn test_plan_preserves_desired_order() {
        let manager = FakeManager::new()
            .with_repo_package("c", &[Source])
            .with_repo_package("a", &[Source])
            .with_repo_package("b", &[Source]);
        let desired = DesiredState::parse(["c", "a", "b"]).unwrap();

        let plan = plan(&desired, &CurrentState::default(), DistPolicy::All, &manager, "repo");

        assert_eq!(plan.to_install, names(&["c", "a", "b"]));
    }

    #[test]
    fn test_installed_package_not_reevaluated_against_policy() {
        // md5 was installed as a binary under "all"; policy later tightens
        let manager = FakeManager::new().with_repo_package("md5", &[Binary]);
        let desired = DesiredState::parse(["md5"]).unwrap();
        let current = installed(&[("md5", Binary)]);

        let plan = plan(&desired, &current, DistPolicy::SourceOnly, &manager, "repo");

        assert_eq!(plan.already_satisfied, names(&["md5"]));
        assert!(plan.policy_rejected.is_empty());
        assert_eq!(manager.lookup_count(), 0);
    }

    #[test]
    fn test_policy_rejection() {
        let manager = FakeManager::new().with_repo_package("luacurl", &[Binary]);
        let desired = DesiredState::parse(["luacurl"]).unwrap();

        let plan = plan(
            &desired,
            &CurrentState::default(),
            DistPolicy::SourceOnly,
            &manager,
            "repo",
        );

        assert!(plan.to_install.is_empty());
        assert_eq!(plan.policy_rejected.len(), 1);
        assert_eq!(
            plan.policy_rejected[0].reason,
            FailureReason::PolicyViolation {
                available: vec![Binary]
            }
        );
    }

    #[test]
    fn test_missing_from_repository_is_not_found() {
        let manager = FakeManager::new();
        let desired = DesiredState::parse(["nosuchpkg"]).unwrap();

        let plan = plan(&desired, &CurrentState::default(), DistPolicy::All, &manager, "repo");

        assert_eq!(plan.unavailable.len(), 1);
        assert_eq!(plan.unavailable[0].reason, FailureReason::NotFound);
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_lookup_error_is_per_package() {
        let manager = FakeManager::new()
            .with_repo_package("md5", &[Source])
            .with_lookup_error("broken", "manifest unreadable");
        let desired = DesiredState::parse(["broken", "md5"]).unwrap();

        let plan = plan(&desired, &CurrentState::default(), DistPolicy::All, &manager, "repo");

        assert_eq!(plan.to_install, names(&["md5"]));
        assert_eq!(plan.unavailable.len(), 1);
        assert_eq!(plan.unavailable[0].reason.code(), "InstallFailed");
    }

    #[test]
    fn test_empty_desired_plans_nothing() {
        let manager = FakeManager::new();
        let current = installed(&[("md5", Source)]);

        let plan = plan(&DesiredState::default(), &current, DistPolicy::All, &manager, "repo");

        assert_eq!(plan.total(), 0);
    }
}

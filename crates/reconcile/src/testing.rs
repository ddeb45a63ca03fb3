//! In-memory package manager for engine tests

use crate::error::ManagerError;
use crate::manager::{InstallRequest, PackageManager};
use crate::types::{DistributionKind, InstalledPackage, PackageName};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) fn names(list: &[&str]) -> Vec<PackageName> {
    list.iter().map(|n| PackageName::new(*n).unwrap()).collect()
}

/// Fake manager whose registry lives in memory and survives across passes
#[derive(Default)]
pub(crate) struct FakeManager {
    repo: HashMap<String, Vec<DistributionKind>>,
    lookup_errors: HashMap<String, String>,
    install_errors: HashMap<String, ManagerError>,
    prepare_error: Option<String>,
    unreadable: bool,
    registry: Mutex<HashMap<PackageName, DistributionKind>>,
    install_calls: Mutex<Vec<PackageName>>,
    lookups: AtomicUsize,
    prepares: AtomicUsize,
}

impl FakeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo_package(mut self, name: &str, kinds: &[DistributionKind]) -> Self {
        self.repo.insert(name.to_string(), kinds.to_vec());
        self
    }

    pub fn with_installed(self, name: &str, kind: DistributionKind) -> Self {
        self.registry
            .lock()
            .unwrap()
            .insert(PackageName::new(name).unwrap(), kind);
        self
    }

    pub fn with_lookup_error(mut self, name: &str, message: &str) -> Self {
        self.lookup_errors
            .insert(name.to_string(), message.to_string());
        self
    }

    pub fn with_install_error(mut self, name: &str, error: ManagerError) -> Self {
        self.install_errors.insert(name.to_string(), error);
        self
    }

    pub fn with_prepare_error(mut self, message: &str) -> Self {
        self.prepare_error = Some(message.to_string());
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    pub fn install_calls(&self) -> Vec<PackageName> {
        self.install_calls.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn prepare_count(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }
}

impl PackageManager for FakeManager {
    fn installed(&self, _env_dir: &Path) -> Result<Vec<InstalledPackage>, ManagerError> {
        if self.unreadable {
            return Err(ManagerError::Failed("corrupt dist.info".to_string()));
        }
        Ok(self
            .registry
            .lock()
            .unwrap()
            .iter()
            .map(|(name, kind)| InstalledPackage::new(name.clone(), *kind))
            .collect())
    }

    fn available_kinds(
        &self,
        _repo: &str,
        package: &PackageName,
    ) -> Result<Vec<DistributionKind>, ManagerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.lookup_errors.get(package.as_str()) {
            return Err(ManagerError::Failed(message.clone()));
        }
        self.repo
            .get(package.as_str())
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(package.to_string()))
    }

    fn prepare_environment(&self, _env_dir: &Path) -> Result<bool, ManagerError> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        match &self.prepare_error {
            Some(message) => Err(ManagerError::Failed(message.clone())),
            None => Ok(false),
        }
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<(), ManagerError> {
        self.install_calls
            .lock()
            .unwrap()
            .push(request.package.clone());

        if let Some(error) = self.install_errors.get(request.package.as_str()) {
            return Err(error.clone());
        }

        let kind = self
            .repo
            .get(request.package.as_str())
            .and_then(|kinds| kinds.iter().copied().find(|k| request.policy.accepts(*k)))
            .ok_or_else(|| ManagerError::NotFound(request.package.to_string()))?;

        self.registry
            .lock()
            .unwrap()
            .insert(request.package.clone(), kind);
        Ok(())
    }
}

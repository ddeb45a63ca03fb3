//! Repository manifests and installed-dist metadata.

use crate::error::{Error, Result};
use crate::lua::{self, Table, Value};
use crate::types::{Dist, DistType, InstalledDist};
use std::path::{Path, PathBuf};

/// File name of a repository manifest.
pub const MANIFEST_FILE: &str = "dist.manifest";

/// File name of a dist's metadata inside the registry.
pub const DIST_INFO_FILE: &str = "dist.info";

/// Dists published by one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    dists: Vec<Dist>,
}

impl Manifest {
    /// Parse manifest source text.
    pub fn parse(source: &str) -> Result<Self> {
        let table = lua::parse_chunk(source)?;
        Ok(Self::from_table(&table))
    }

    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let table = lua::parse_file(path)?;
        let manifest = Self::from_table(&table);
        log::debug!(
            "Loaded {} dists from {}",
            manifest.dists.len(),
            path.display()
        );
        Ok(manifest)
    }

    fn from_table(table: &Table) -> Self {
        let dists = table
            .array
            .iter()
            .filter_map(Value::as_table)
            .filter_map(|entry| match dist_from_table(entry) {
                Some(dist) => Some(dist),
                None => {
                    log::debug!("Skipping manifest entry without a name");
                    None
                }
            })
            .collect();
        Self { dists }
    }

    /// All dists in manifest order
    pub fn dists(&self) -> &[Dist] {
        &self.dists
    }

    /// Every published build of `name`
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Dist> + 'a {
        self.dists.iter().filter(move |d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).next().is_some()
    }

    /// Distinct distribution types published for `name`, in manifest order.
    ///
    /// Empty when the package is not in the manifest.
    pub fn available_types(&self, name: &str) -> Vec<DistType> {
        let mut types = Vec::new();
        for dist in self.find(name) {
            let t = dist.dist_type();
            if !types.contains(&t) {
                types.push(t);
            }
        }
        types
    }
}

fn dist_from_table(entry: &Table) -> Option<Dist> {
    let name = entry.get_str("name")?.to_string();
    Some(Dist {
        name,
        version: entry.get_str("version").unwrap_or_default().to_string(),
        arch: entry.get_str("arch").unwrap_or("Universal").to_string(),
        platform: entry.get_str("type").unwrap_or("source").to_string(),
    })
}

/// Read one installed dist from its `dist.info`.
pub fn read_dist_info(path: &Path) -> Result<InstalledDist> {
    let table = lua::parse_file(path)?;
    let name = table
        .get_str("name")
        .ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: "missing 'name' field".to_string(),
        })?
        .to_string();

    Ok(InstalledDist {
        name,
        version: table.get_str("version").map(str::to_string),
        dist_type: DistType::from_field(table.get_str("type")),
    })
}

/// Path of the manifest inside a repository checkout.
pub fn manifest_path(repo_dir: &Path) -> PathBuf {
    repo_dir.join(MANIFEST_FILE)
}

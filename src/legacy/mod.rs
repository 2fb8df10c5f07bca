//! Translation of legacy `repo=<prefix><version>` tokens.
//!
//! Clients ask for repositories with tokens such as `core-updates-released-fc10`.
//! The part up to and including the last dash selects a (product, category)
//! pair from the prefix table, the rest names the version, optionally with
//! an `fc` marker in front.

use crate::catalog::{Arch, Catalog, Category, Product, Repository, Version};
use crate::error::{ConfigError, MirrorError, Result};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const FC_MARKER: &str = "fc";

/// Maps a token prefix such as `core-updates-released-` to the names of the
/// product and category it stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMap {
    entries: HashMap<String, (String, String)>,
}

impl RepoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes the Fedora yum configuration has been shipping.
    pub fn builtin() -> Self {
        let mut map = RepoMap::new();
        for (prefix, product, category) in [
            ("core-", "Fedora Core", "Fedora Core"),
            ("core-debug-", "Fedora Core", "Fedora Core"),
            ("core-source-", "Fedora Core", "Fedora Core"),
            ("updates-released-", "Fedora Core", "Fedora Core Updates"),
            ("updates-released-debug-", "Fedora Core", "Fedora Core Updates"),
            ("updates-released-source-", "Fedora Core", "Fedora Core Updates"),
            ("updates-testing-", "Fedora Core", "Fedora Core Updates Testing"),
            ("core-updates-released-", "Fedora", "Updates"),
            ("core-updates-testing-", "Fedora", "Updates Testing"),
            ("extras-", "Fedora Extras", "Fedora Extras"),
            ("extras-debug-", "Fedora Extras", "Fedora Extras"),
            ("extras-source-", "Fedora Extras", "Fedora Extras"),
        ] {
            map.insert(prefix, product, category);
        }
        map
    }

    /// Reads `prefix,product,category` lines. Blank lines and lines starting
    /// with `#` are skipped.
    pub fn from_csv(path: &Path) -> std::result::Result<Self, ConfigError> {
        let read_error = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let f = File::open(path).map_err(read_error)?;
        let reader = BufReader::new(f);
        let mut map = RepoMap::new();
        for (number, line) in reader.lines().enumerate() {
            let l = line.map_err(read_error)?;
            let l = l.trim();
            if l.is_empty() || l.starts_with('#') {
                continue;
            }
            let e: Vec<&str> = l.split(',').map(str::trim).collect();
            if e.len() != 3 || e[0].is_empty() {
                return Err(ConfigError::RepoMapLine {
                    path: path.to_path_buf(),
                    line: number + 1,
                });
            }
            map.insert(e[0], e[1], e[2]);
        }
        Ok(map)
    }

    pub fn insert(&mut self, prefix: &str, product: &str, category: &str) {
        self.entries.insert(
            prefix.to_string(),
            (product.to_string(), category.to_string()),
        );
    }

    pub fn get(&self, prefix: &str) -> Option<(&str, &str)> {
        self.entries
            .get(prefix)
            .map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepo<'a> {
    pub product: &'a Product,
    pub category: &'a Category,
    pub version: &'a Version,
    pub arch: &'a Arch,
    /// The repository prefix rebuilt from the token prefix and the version.
    pub prefix: String,
}

/// Splits a token after its last dash. Without a dash the prefix is empty.
pub fn split_token(repo: &str) -> (&str, &str) {
    let s = repo.rfind('-').map_or(0, |i| i + 1);
    repo.split_at(s)
}

pub fn resolve_repo_token<'a>(
    catalog: &'a dyn Catalog,
    repomap: &RepoMap,
    repo: &str,
    arch: &str,
) -> Result<ResolvedRepo<'a>> {
    let arch = catalog
        .arch_by_name(arch)
        .ok_or_else(|| MirrorError::NotFound(format!("arch {}", arch)))?;

    let (prefix, mut version) = split_token(repo);
    let fc = version.starts_with(FC_MARKER);
    if fc {
        version = &version[FC_MARKER.len()..];
    }

    let (pname, cname) = repomap
        .get(prefix)
        .ok_or_else(|| MirrorError::NotFound(format!("repository prefix {:?}", prefix)))?;
    let product = catalog
        .product_by_name(pname)
        .ok_or_else(|| MirrorError::NotFound(format!("product {}", pname)))?;
    let category = catalog
        .category_by_name(cname)
        .ok_or_else(|| MirrorError::NotFound(format!("category {}", cname)))?;
    let version = catalog
        .versions_by_name(product.id, version)
        .into_iter()
        .next()
        .ok_or_else(|| {
            MirrorError::NotFound(format!("version {} of {}", version, product.name))
        })?;

    let mut prefix = prefix.to_string();
    if fc {
        prefix.push_str(FC_MARKER);
    }
    prefix.push_str(&version.name);
    debug!("{} on {} resolved to prefix {}", repo, arch.name, prefix);

    Ok(ResolvedRepo {
        product,
        category,
        version,
        arch,
        prefix,
    })
}

/// The single repository matching a resolved token.
///
/// More than one match is refused rather than picking one arbitrarily.
pub fn select_repository<'a>(
    catalog: &'a dyn Catalog,
    resolved: &ResolvedRepo,
) -> Result<&'a Repository> {
    let repos = catalog.repositories(
        &resolved.prefix,
        resolved.category.id,
        resolved.version.id,
        resolved.arch.id,
    );
    match repos.as_slice() {
        [] => Err(MirrorError::NotFound(format!(
            "repository {} for {}",
            resolved.prefix, resolved.arch.name
        ))),
        [repo] => Ok(*repo),
        _ => Err(MirrorError::AmbiguousMatch(format!(
            "{} repositories named {} for {}",
            repos.len(),
            resolved.prefix,
            resolved.arch.name
        ))),
    }
}

#[cfg(test)]
mod legacy_test;

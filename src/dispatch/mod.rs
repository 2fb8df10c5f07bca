//! Public queries: path lookup, mirrorlist, rsync ACL and public list.
//!
//! A [`Dispatcher`] borrows the catalog and the prefix table, so one can be
//! built per request from shared state at no cost.

use crate::catalog::{Catalog, Host};
use crate::directory::{public_path, resolve_path, urls_for_directory, MirrorUrl};
use crate::error::{MirrorError, Result};
use crate::format::{comment, NO_MATCH};
use crate::geo::partition_and_select;
use crate::legacy::{resolve_repo_token, select_repository, RepoMap};
use crate::visibility::{filter_visible, Context};
use log::debug;
use std::cmp::Ordering;
use url::Url;

/// Schemes handed out to clients.
pub const PUBLIC_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

pub struct Dispatcher<'a> {
    catalog: &'a dyn Catalog,
    repomap: &'a RepoMap,
    minimum: usize,
}

impl<'a> Dispatcher<'a> {
    pub fn new(catalog: &'a dyn Catalog, repomap: &'a RepoMap, minimum: usize) -> Self {
        Dispatcher {
            catalog,
            repomap,
            minimum,
        }
    }

    /// Bare URLs of the directory below `pub/` named by `segments`.
    ///
    /// `country` keeps only hosts located there, `client_country` is where
    /// the client was located. An unknown path gives an empty list.
    pub fn path_lookup<S: AsRef<str>>(
        &self,
        segments: &[S],
        country: Option<&str>,
        client_country: Option<&str>,
        context: &Context,
    ) -> Vec<String> {
        let path = public_path(segments);
        let directory = match resolve_path(self.catalog, &path) {
            Ok(d) => d,
            Err(e) => {
                debug!("Path lookup: {}", e);
                return Vec::new();
            }
        };
        let urls = urls_for_directory(self.catalog, directory, country, context.include_private());
        let urls = filter_visible(self.catalog, urls, client_country, context);
        filter_protocols(urls).into_iter().map(|u| u.url).collect()
    }

    /// Header and URL lines for a legacy `repo`/`arch` request, or the
    /// single no-match line.
    ///
    /// `client_country` is where the client was located and decides
    /// visibility. `preferred_country` only picks the country list.
    pub fn mirrorlist(
        &self,
        repo: Option<&str>,
        arch: Option<&str>,
        client_country: Option<&str>,
        preferred_country: Option<&str>,
    ) -> Vec<String> {
        let (repo, arch) = match (repo, arch) {
            (Some(r), Some(a)) => (r, a),
            _ => return vec![NO_MATCH.to_string()],
        };
        match self.resolve_mirrorlist(repo, arch, client_country, preferred_country) {
            Ok(lines) => lines,
            Err(e) => {
                debug!("Mirrorlist for {} on {}: {}", repo, arch, e);
                vec![NO_MATCH.to_string()]
            }
        }
    }

    fn resolve_mirrorlist(
        &self,
        repo: &str,
        arch: &str,
        client_country: Option<&str>,
        preferred_country: Option<&str>,
    ) -> Result<Vec<String>> {
        let resolved = resolve_repo_token(self.catalog, self.repomap, repo, arch)?;
        let repository = select_repository(self.catalog, &resolved)?;
        let directory = self.catalog.directory(repository.directory_id).ok_or_else(|| {
            MirrorError::NotFound(format!(
                "directory {} of repository {}",
                repository.directory_id, repository.name
            ))
        })?;

        let urls = urls_for_directory(self.catalog, directory, None, false);
        let urls = filter_visible(self.catalog, urls, client_country, &Context::Public);
        let urls = filter_protocols(urls);
        if urls.is_empty() {
            return Err(MirrorError::NotFound(format!(
                "eligible mirrors for {}",
                directory.name
            )));
        }
        Ok(partition_and_select(
            &urls,
            preferred_country,
            &resolved.prefix,
            &resolved.arch.name,
            self.minimum,
        ))
    }

    /// ACL entries of all active hosts, hosts in name order.
    pub fn rsync_acl(&self) -> Vec<String> {
        self.catalog
            .hosts()
            .into_iter()
            .filter(|h| h.is_active())
            .flat_map(|h| h.acl_ips.iter().cloned())
            .collect()
    }

    /// Public active hosts, by country and name, optionally narrowed to
    /// hosts carrying `product[/version[/arch]]`.
    ///
    /// Lines are tab separated: country, name, bandwidth, comment.
    pub fn publiclist(
        &self,
        product: Option<&str>,
        version: Option<&str>,
        arch: Option<&str>,
    ) -> Vec<String> {
        let title = [product, version, arch]
            .iter()
            .flatten()
            .copied()
            .collect::<Vec<&str>>()
            .join("/");
        let mut hosts: Vec<&Host> = self
            .catalog
            .hosts()
            .into_iter()
            .filter(|h| self.is_public(h))
            .filter(|h| match product {
                Some(p) => self.carries(h, p, version, arch),
                None => true,
            })
            .collect();
        hosts.sort_by(|a, b| by_country(a, b).then_with(|| a.name.cmp(&b.name)));

        let mut lines = Vec::with_capacity(hosts.len() + 1);
        lines.push(if title.is_empty() {
            comment(&format!("{} public active mirrors", hosts.len()))
        } else {
            comment(&format!("{} public active mirrors for {}", hosts.len(), title))
        });
        for h in hosts {
            lines.push(format!(
                "{}\t{}\t{}\t{}",
                h.country.as_deref().unwrap_or(""),
                h.name,
                h.bandwidth_int,
                h.comment.replace(['\t', '\n', '\r'], " ")
            ));
        }
        lines
    }

    /// Country restricted hosts are listed too.
    fn is_public(&self, host: &Host) -> bool {
        let site = self.catalog.site(host.site_id);
        host.is_active() && site.map_or(false, |s| s.is_active()) && !host.is_private(site)
    }

    fn carries(&self, host: &Host, product: &str, version: Option<&str>, arch: Option<&str>) -> bool {
        let product = match self.catalog.product_by_name(product) {
            Some(p) => p,
            None => return false,
        };
        self.catalog
            .host_categories_for_host(host.id)
            .into_iter()
            .filter(|hc| hc.is_active())
            .any(|hc| {
                let category = match self.catalog.category(hc.category_id) {
                    Some(c) if c.product_id == product.id => c,
                    _ => return false,
                };
                if version.is_none() && arch.is_none() {
                    return true;
                }
                category
                    .directories
                    .iter()
                    .filter(|d| hc.carries(**d))
                    .flat_map(|d| self.catalog.repositories_in_directory(*d))
                    .any(|r| {
                        r.category_id == category.id
                            && version.map_or(true, |v| {
                                self.catalog
                                    .version(r.version_id)
                                    .map_or(false, |rv| rv.name == v)
                            })
                            && arch.map_or(true, |a| {
                                self.catalog.arch(r.arch_id).map_or(false, |ra| ra.name == a)
                            })
                    })
            })
    }
}

/// Keeps URLs whose scheme may be handed to clients. Unparseable URLs are
/// dropped.
pub fn filter_protocols(urls: Vec<MirrorUrl>) -> Vec<MirrorUrl> {
    urls.into_iter()
        .filter(|u| match Url::parse(&u.url) {
            Ok(parsed) => PUBLIC_SCHEMES.contains(&parsed.scheme()),
            Err(e) => {
                debug!("Skipping {}: {}", u.url, e);
                false
            }
        })
        .collect()
}

/// Hosts without a country sort last.
fn by_country(a: &Host, b: &Host) -> Ordering {
    match (&a.country, &b.country) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod dispatch_test;

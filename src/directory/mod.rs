//! Public path to directory mapping, and directory to mirror URLs.

use crate::catalog::{Catalog, Directory, Host};
use crate::error::{MirrorError, Result};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Every published directory lives below this root.
pub const PUBLIC_ROOT: &str = "pub";

static SLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/+").expect("valid regex"));

/// One way to reach a directory: the URL, the country of the host serving
/// it and the host itself for later filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorUrl<'a> {
    pub url: String,
    pub country: Option<String>,
    pub host: &'a Host,
}

/// Collapses repeated slashes and strips leading and trailing ones.
pub fn normalize_path(path: &str) -> String {
    SLASHES
        .replace_all(path.trim_matches('/'), "/")
        .trim_matches('/')
        .to_string()
}

/// Builds the stored directory name for a request below [`PUBLIC_ROOT`].
pub fn public_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::from(PUBLIC_ROOT);
    for s in segments {
        path.push('/');
        path.push_str(s.as_ref());
    }
    normalize_path(&path)
}

pub fn resolve_path<'a>(catalog: &'a dyn Catalog, path: &str) -> Result<&'a Directory> {
    let path = normalize_path(path);
    catalog
        .directory_by_name(&path)
        .ok_or(MirrorError::NotFound(path))
}

/// All URLs under which `directory` is mirrored, in catalog order.
///
/// `country` limits the result to hosts located in that country.
/// URLs flagged private are only returned with `include_private`. Host
/// level activity and privacy are left to the visibility filter.
pub fn urls_for_directory<'a>(
    catalog: &'a dyn Catalog,
    directory: &Directory,
    country: Option<&str>,
    include_private: bool,
) -> Vec<MirrorUrl<'a>> {
    let mut result: Vec<MirrorUrl<'a>> = Vec::new();

    for category in catalog.categories_for_directory(directory.id) {
        let subpath = catalog
            .directory(category.topdir_id)
            .map(|top| subpath(&top.name, &directory.name))
            .unwrap_or_default();

        for hc in catalog.host_categories_for_category(category.id) {
            if !hc.is_active() || !hc.carries(directory.id) {
                continue;
            }
            let host = match catalog.host(hc.host_id) {
                Some(h) => h,
                None => continue,
            };
            if let Some(cc) = country {
                if !host
                    .country
                    .as_deref()
                    .map_or(false, |hcc| hcc.eq_ignore_ascii_case(cc))
                {
                    continue;
                }
            }
            for hcurl in catalog.host_category_urls(hc.id) {
                if hcurl.private && !include_private {
                    continue;
                }
                result.push(MirrorUrl {
                    url: join_url(&hcurl.url, &subpath),
                    country: host.country.clone(),
                    host,
                });
            }
        }
    }
    debug!("{} mirror URLs for {}", result.len(), directory.name);
    result
}

/// Path of `name` relative to the category top directory `topdir`.
fn subpath(topdir: &str, name: &str) -> String {
    match name.strip_prefix(topdir) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            rest.trim_matches('/').to_string()
        }
        _ => String::new(),
    }
}

fn join_url(base: &str, subpath: &str) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    if !subpath.is_empty() {
        url.push('/');
        url.push_str(subpath);
    }
    url.push('/');
    url
}

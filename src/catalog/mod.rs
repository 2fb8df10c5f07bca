//! Typed catalog entities and the read-only query port the resolution
//! engine works against.
//!
//! Every component receives a `&dyn Catalog` explicitly. The server backs it
//! with a [`MemoryCatalog`] loaded from the snapshot file, tests build one
//! by hand.

use ipnet::IpNet;
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::mem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub admin_active: bool,
    pub user_active: bool,
    pub private: bool,
}

impl Site {
    pub fn is_active(&self) -> bool {
        self.admin_active && self.user_active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    /// Upper-case ISO 3166 code.
    pub country: Option<String>,
    pub admin_active: bool,
    pub user_active: bool,
    pub private: bool,
    pub bandwidth_int: i64,
    pub comment: String,
    /// Entries as typed in by the site admin; may be host names.
    pub acl_ips: Vec<String>,
    pub netblocks: Vec<IpNet>,
    /// Upper-case ISO 3166 codes. Empty means unrestricted.
    pub countries_allowed: Vec<String>,
}

impl Host {
    pub fn is_active(&self) -> bool {
        self.admin_active && self.user_active
    }

    /// A host is private if it or its site says so.
    pub fn is_private(&self, site: Option<&Site>) -> bool {
        self.private || site.map_or(false, |s| s.private)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCategory {
    pub id: i64,
    pub host_id: i64,
    pub category_id: i64,
    pub upstream: Option<String>,
    pub admin_active: bool,
    pub user_active: bool,
    pub always_up2date: bool,
    pub up2date_directories: HashSet<i64>,
}

impl HostCategory {
    pub fn is_active(&self) -> bool {
        self.admin_active && self.user_active
    }

    pub fn carries(&self, directory_id: i64) -> bool {
        self.always_up2date || self.up2date_directories.contains(&directory_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCategoryUrl {
    pub id: i64,
    pub host_category_id: i64,
    pub url: String,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub product_id: i64,
    pub topdir_id: i64,
    pub directories: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arch {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub prefix: String,
    pub category_id: i64,
    pub version_id: i64,
    pub arch_id: i64,
    pub directory_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetblockCountry {
    pub netblock: IpNet,
    pub country: String,
}

/// Read-only queries over one consistent catalog snapshot.
///
/// Listing methods return entities ordered by name so that every caller
/// sees the same order for the same snapshot.
pub trait Catalog: Send + Sync {
    fn site(&self, id: i64) -> Option<&Site>;
    fn host(&self, id: i64) -> Option<&Host>;
    fn hosts(&self) -> Vec<&Host>;
    fn directory(&self, id: i64) -> Option<&Directory>;
    fn directory_by_name(&self, name: &str) -> Option<&Directory>;
    fn category(&self, id: i64) -> Option<&Category>;
    fn category_by_name(&self, name: &str) -> Option<&Category>;
    /// Categories whose tree contains the directory. Usually exactly one.
    fn categories_for_directory(&self, directory_id: i64) -> Vec<&Category>;
    fn product_by_name(&self, name: &str) -> Option<&Product>;
    fn version(&self, id: i64) -> Option<&Version>;
    fn versions_by_name(&self, product_id: i64, name: &str) -> Vec<&Version>;
    fn arch(&self, id: i64) -> Option<&Arch>;
    fn arch_by_name(&self, name: &str) -> Option<&Arch>;
    fn repositories(
        &self,
        prefix: &str,
        category_id: i64,
        version_id: i64,
        arch_id: i64,
    ) -> Vec<&Repository>;
    fn repositories_in_directory(&self, directory_id: i64) -> Vec<&Repository>;
    /// Host categories of one category, in catalog order.
    fn host_categories_for_category(&self, category_id: i64) -> Vec<&HostCategory>;
    fn host_categories_for_host(&self, host_id: i64) -> Vec<&HostCategory>;
    fn host_category_urls(&self, host_category_id: i64) -> Vec<&HostCategoryUrl>;
    fn is_embargoed(&self, country: &str) -> bool;
    fn netblock_countries(&self) -> Vec<&NetblockCountry>;
}

/// `Catalog` held entirely in memory.
///
/// Entities keep their insertion order; `insert_*` replaces an existing
/// entity with the same id in place. Secondary indexes are maintained on
/// insert, so lookups never walk a whole table.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    /// Seconds since the epoch at which the snapshot was taken.
    pub time: u64,
    sites: Table<Site>,
    hosts: Table<Host>,
    host_categories: Table<HostCategory>,
    host_category_urls: Table<HostCategoryUrl>,
    directories: Table<Directory>,
    categories: Table<Category>,
    products: Table<Product>,
    versions: Table<Version>,
    arches: Table<Arch>,
    repositories: Table<Repository>,
    embargoed: HashSet<String>,
    netblock_countries: Vec<NetblockCountry>,

    directory_names: Index<String>,
    category_names: Index<String>,
    product_names: Index<String>,
    arch_names: Index<String>,
    categories_by_directory: Index<i64>,
    versions_by_product: Index<i64>,
    repositories_by_prefix: Index<String>,
    repositories_by_directory: Index<i64>,
    host_categories_by_category: Index<i64>,
    host_categories_by_host: Index<i64>,
    urls_by_host_category: Index<i64>,
}

#[derive(Debug, Clone)]
struct Table<T> {
    rows: Vec<T>,
    by_id: HashMap<i64, usize>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table {
            rows: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    /// Position of the row and the row it replaced, if any.
    fn upsert(&mut self, id: i64, row: T) -> (usize, Option<T>) {
        match self.by_id.get(&id) {
            Some(&i) => (i, Some(mem::replace(&mut self.rows[i], row))),
            None => {
                let i = self.rows.len();
                self.by_id.insert(id, i);
                self.rows.push(row);
                (i, None)
            }
        }
    }

    fn get(&self, id: i64) -> Option<&T> {
        self.by_id.get(&id).map(|&i| &self.rows[i])
    }

    fn at(&self, positions: &[usize]) -> Vec<&T> {
        positions.iter().map(|&i| &self.rows[i]).collect()
    }
}

/// Row positions by key, ascending so results keep catalog order.
#[derive(Debug, Clone)]
struct Index<K> {
    positions: HashMap<K, Vec<usize>>,
}

impl<K> Default for Index<K> {
    fn default() -> Self {
        Index {
            positions: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Index<K> {
    fn add(&mut self, key: K, pos: usize) {
        let entries = self.positions.entry(key).or_default();
        if let Err(i) = entries.binary_search(&pos) {
            entries.insert(i, pos);
        }
    }

    fn remove<Q>(&mut self, key: &Q, pos: usize)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if let Some(entries) = self.positions.get_mut(key) {
            entries.retain(|&p| p != pos);
            if entries.is_empty() {
                self.positions.remove(key);
            }
        }
    }

    fn get<Q>(&self, key: &Q) -> &[usize]
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.positions.get(key).map_or(&[], Vec::as_slice)
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&mut self, site: Site) {
        self.sites.upsert(site.id, site);
    }

    pub fn insert_host(&mut self, host: Host) {
        self.hosts.upsert(host.id, host);
    }

    pub fn insert_host_category(&mut self, hc: HostCategory) {
        let (category_id, host_id) = (hc.category_id, hc.host_id);
        let (pos, old) = self.host_categories.upsert(hc.id, hc);
        if let Some(old) = old {
            self.host_categories_by_category.remove(&old.category_id, pos);
            self.host_categories_by_host.remove(&old.host_id, pos);
        }
        self.host_categories_by_category.add(category_id, pos);
        self.host_categories_by_host.add(host_id, pos);
    }

    pub fn insert_host_category_url(&mut self, url: HostCategoryUrl) {
        let host_category_id = url.host_category_id;
        let (pos, old) = self.host_category_urls.upsert(url.id, url);
        if let Some(old) = old {
            self.urls_by_host_category.remove(&old.host_category_id, pos);
        }
        self.urls_by_host_category.add(host_category_id, pos);
    }

    pub fn insert_directory(&mut self, directory: Directory) {
        let name = directory.name.clone();
        let (pos, old) = self.directories.upsert(directory.id, directory);
        if let Some(old) = old {
            self.directory_names.remove(old.name.as_str(), pos);
        }
        self.directory_names.add(name, pos);
    }

    pub fn insert_category(&mut self, category: Category) {
        let name = category.name.clone();
        let directories = category.directories.clone();
        let (pos, old) = self.categories.upsert(category.id, category);
        if let Some(old) = old {
            self.category_names.remove(old.name.as_str(), pos);
            for d in &old.directories {
                self.categories_by_directory.remove(d, pos);
            }
        }
        self.category_names.add(name, pos);
        for d in directories {
            self.categories_by_directory.add(d, pos);
        }
    }

    pub fn insert_product(&mut self, product: Product) {
        let name = product.name.clone();
        let (pos, old) = self.products.upsert(product.id, product);
        if let Some(old) = old {
            self.product_names.remove(old.name.as_str(), pos);
        }
        self.product_names.add(name, pos);
    }

    pub fn insert_version(&mut self, version: Version) {
        let product_id = version.product_id;
        let (pos, old) = self.versions.upsert(version.id, version);
        if let Some(old) = old {
            self.versions_by_product.remove(&old.product_id, pos);
        }
        self.versions_by_product.add(product_id, pos);
    }

    pub fn insert_arch(&mut self, arch: Arch) {
        let name = arch.name.clone();
        let (pos, old) = self.arches.upsert(arch.id, arch);
        if let Some(old) = old {
            self.arch_names.remove(old.name.as_str(), pos);
        }
        self.arch_names.add(name, pos);
    }

    pub fn insert_repository(&mut self, repository: Repository) {
        let prefix = repository.prefix.clone();
        let directory_id = repository.directory_id;
        let (pos, old) = self.repositories.upsert(repository.id, repository);
        if let Some(old) = old {
            self.repositories_by_prefix.remove(old.prefix.as_str(), pos);
            self.repositories_by_directory.remove(&old.directory_id, pos);
        }
        self.repositories_by_prefix.add(prefix, pos);
        self.repositories_by_directory.add(directory_id, pos);
    }

    pub fn insert_embargoed_country(&mut self, country: &str) {
        self.embargoed.insert(country.to_uppercase());
    }

    pub fn insert_netblock_country(&mut self, nc: NetblockCountry) {
        self.netblock_countries.push(nc);
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites.rows
    }

    pub fn all_hosts(&self) -> &[Host] {
        &self.hosts.rows
    }

    pub fn all_host_categories(&self) -> &[HostCategory] {
        &self.host_categories.rows
    }

    pub fn all_host_category_urls(&self) -> &[HostCategoryUrl] {
        &self.host_category_urls.rows
    }

    pub fn directories(&self) -> &[Directory] {
        &self.directories.rows
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories.rows
    }

    pub fn all_products(&self) -> &[Product] {
        &self.products.rows
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions.rows
    }

    pub fn arches(&self) -> &[Arch] {
        &self.arches.rows
    }

    pub fn all_repositories(&self) -> &[Repository] {
        &self.repositories.rows
    }

    /// Embargoed countries, sorted.
    pub fn embargoed_countries(&self) -> Vec<&str> {
        let mut countries: Vec<&str> = self.embargoed.iter().map(String::as_str).collect();
        countries.sort_unstable();
        countries
    }
}

impl Catalog for MemoryCatalog {
    fn site(&self, id: i64) -> Option<&Site> {
        self.sites.get(id)
    }

    fn host(&self, id: i64) -> Option<&Host> {
        self.hosts.get(id)
    }

    fn hosts(&self) -> Vec<&Host> {
        let mut hosts: Vec<&Host> = self.hosts.rows.iter().collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        hosts
    }

    fn directory(&self, id: i64) -> Option<&Directory> {
        self.directories.get(id)
    }

    fn directory_by_name(&self, name: &str) -> Option<&Directory> {
        self.directories.at(self.directory_names.get(name)).into_iter().next()
    }

    fn category(&self, id: i64) -> Option<&Category> {
        self.categories.get(id)
    }

    fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.at(self.category_names.get(name)).into_iter().next()
    }

    fn categories_for_directory(&self, directory_id: i64) -> Vec<&Category> {
        self.categories.at(self.categories_by_directory.get(&directory_id))
    }

    fn product_by_name(&self, name: &str) -> Option<&Product> {
        self.products.at(self.product_names.get(name)).into_iter().next()
    }

    fn version(&self, id: i64) -> Option<&Version> {
        self.versions.get(id)
    }

    fn versions_by_name(&self, product_id: i64, name: &str) -> Vec<&Version> {
        self.versions
            .at(self.versions_by_product.get(&product_id))
            .into_iter()
            .filter(|v| v.name == name)
            .collect()
    }

    fn arch(&self, id: i64) -> Option<&Arch> {
        self.arches.get(id)
    }

    fn arch_by_name(&self, name: &str) -> Option<&Arch> {
        self.arches.at(self.arch_names.get(name)).into_iter().next()
    }

    fn repositories(
        &self,
        prefix: &str,
        category_id: i64,
        version_id: i64,
        arch_id: i64,
    ) -> Vec<&Repository> {
        self.repositories
            .at(self.repositories_by_prefix.get(prefix))
            .into_iter()
            .filter(|r| {
                r.category_id == category_id && r.version_id == version_id && r.arch_id == arch_id
            })
            .collect()
    }

    fn repositories_in_directory(&self, directory_id: i64) -> Vec<&Repository> {
        self.repositories.at(self.repositories_by_directory.get(&directory_id))
    }

    fn host_categories_for_category(&self, category_id: i64) -> Vec<&HostCategory> {
        self.host_categories.at(self.host_categories_by_category.get(&category_id))
    }

    fn host_categories_for_host(&self, host_id: i64) -> Vec<&HostCategory> {
        self.host_categories.at(self.host_categories_by_host.get(&host_id))
    }

    fn host_category_urls(&self, host_category_id: i64) -> Vec<&HostCategoryUrl> {
        self.host_category_urls.at(self.urls_by_host_category.get(&host_category_id))
    }

    fn is_embargoed(&self, country: &str) -> bool {
        self.embargoed.contains(&country.to_uppercase())
    }

    fn netblock_countries(&self) -> Vec<&NetblockCountry> {
        self.netblock_countries.iter().collect()
    }
}

#[cfg(test)]
pub(crate) mod fixture;

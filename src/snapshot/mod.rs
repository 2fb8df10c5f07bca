//! Protobuf encoding of the catalog snapshot.
//!
//! The generator writes one file, the server reads it once at start. The
//! message layout lives in `protos/catalog.proto`.

use crate::catalog::{
    Arch, Catalog, Category, Directory, Host, HostCategory, HostCategoryUrl, MemoryCatalog,
    NetblockCountry, Product, Repository, Site, Version,
};
use crate::error::SnapshotError;
use crate::protos::catalog as pb;
use ipnet::IpNet;
use log::{info, warn};
use protobuf::Message;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

pub type Result<T> = std::result::Result<T, SnapshotError>;

pub fn to_proto(catalog: &MemoryCatalog) -> pb::Catalog {
    let mut c = pb::Catalog::new();
    c.time = catalog.time;

    for s in catalog.sites() {
        let mut site = pb::Site::new();
        site.id = s.id;
        site.name = s.name.clone();
        site.admin_active = s.admin_active;
        site.user_active = s.user_active;
        site.private = s.private;
        c.sites.push(site);
    }

    for h in catalog.all_hosts() {
        let mut host = pb::Host::new();
        host.id = h.id;
        host.site_id = h.site_id;
        host.name = h.name.clone();
        host.country = h.country.clone().unwrap_or_default();
        host.admin_active = h.admin_active;
        host.user_active = h.user_active;
        host.private = h.private;
        host.bandwidth_int = h.bandwidth_int;
        host.comment = h.comment.clone();
        host.acl_ips = h.acl_ips.clone();
        host.netblocks = h.netblocks.iter().map(|n| n.to_string()).collect();
        host.countries_allowed = h.countries_allowed.clone();
        c.hosts.push(host);
    }

    for hc in catalog.all_host_categories() {
        let mut e = pb::HostCategory::new();
        e.id = hc.id;
        e.host_id = hc.host_id;
        e.category_id = hc.category_id;
        e.upstream = hc.upstream.clone().unwrap_or_default();
        e.admin_active = hc.admin_active;
        e.user_active = hc.user_active;
        e.always_up2date = hc.always_up2date;
        let mut up2date: Vec<i64> = hc.up2date_directories.iter().copied().collect();
        up2date.sort_unstable();
        e.up2date_directories = up2date;
        c.host_categories.push(e);
    }

    for u in catalog.all_host_category_urls() {
        let mut e = pb::HostCategoryUrl::new();
        e.id = u.id;
        e.host_category_id = u.host_category_id;
        e.url = u.url.clone();
        e.private = u.private;
        c.host_category_urls.push(e);
    }

    for d in catalog.directories() {
        let mut e = pb::Directory::new();
        e.id = d.id;
        e.name = d.name.clone();
        c.directories.push(e);
    }

    for cat in catalog.categories() {
        let mut e = pb::Category::new();
        e.id = cat.id;
        e.name = cat.name.clone();
        e.product_id = cat.product_id;
        e.topdir_id = cat.topdir_id;
        e.directories = cat.directories.clone();
        c.categories.push(e);
    }

    for p in catalog.all_products() {
        let mut e = pb::Product::new();
        e.id = p.id;
        e.name = p.name.clone();
        c.products.push(e);
    }

    for v in catalog.versions() {
        let mut e = pb::Version::new();
        e.id = v.id;
        e.product_id = v.product_id;
        e.name = v.name.clone();
        c.versions.push(e);
    }

    for a in catalog.arches() {
        let mut e = pb::Arch::new();
        e.id = a.id;
        e.name = a.name.clone();
        c.arches.push(e);
    }

    for r in catalog.all_repositories() {
        let mut e = pb::Repository::new();
        e.id = r.id;
        e.name = r.name.clone();
        e.prefix = r.prefix.clone();
        e.category_id = r.category_id;
        e.version_id = r.version_id;
        e.arch_id = r.arch_id;
        e.directory_id = r.directory_id;
        c.repositories.push(e);
    }

    c.embargoed_countries = catalog
        .embargoed_countries()
        .into_iter()
        .map(str::to_string)
        .collect();

    for nc in catalog.netblock_countries() {
        let mut e = pb::NetblockCountry::new();
        e.netblock = nc.netblock.to_string();
        e.country = nc.country.clone();
        c.netblock_countries.push(e);
    }

    c
}

/// Country codes are stored upper case; anything but two ASCII letters is
/// rejected.
fn country_code(entity: &'static str, id: i64, code: &str) -> Result<String> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(SnapshotError::Invalid {
            entity,
            id,
            reason: format!("country code {:?}", code),
        })
    }
}

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub fn from_proto(c: pb::Catalog) -> Result<MemoryCatalog> {
    let mut catalog = MemoryCatalog::new();
    catalog.time = c.time;

    for s in c.sites {
        catalog.insert_site(Site {
            id: s.id,
            name: s.name,
            admin_active: s.admin_active,
            user_active: s.user_active,
            private: s.private,
        });
    }

    for h in c.hosts {
        let country = match none_if_empty(h.country) {
            Some(cc) => Some(country_code("host", h.id, &cc)?),
            None => None,
        };
        let countries_allowed = h
            .countries_allowed
            .iter()
            .map(|cc| country_code("host", h.id, cc))
            .collect::<Result<Vec<String>>>()?;
        let mut netblocks = Vec::with_capacity(h.netblocks.len());
        for n in &h.netblocks {
            match IpNet::from_str(n) {
                Ok(net) => netblocks.push(net),
                Err(_) => warn!("Ignoring netblock {} of host {}", n, h.name),
            }
        }
        catalog.insert_host(Host {
            id: h.id,
            site_id: h.site_id,
            name: h.name,
            country,
            admin_active: h.admin_active,
            user_active: h.user_active,
            private: h.private,
            bandwidth_int: h.bandwidth_int,
            comment: h.comment,
            acl_ips: h.acl_ips,
            netblocks,
            countries_allowed,
        });
    }

    for hc in c.host_categories {
        catalog.insert_host_category(HostCategory {
            id: hc.id,
            host_id: hc.host_id,
            category_id: hc.category_id,
            upstream: none_if_empty(hc.upstream),
            admin_active: hc.admin_active,
            user_active: hc.user_active,
            always_up2date: hc.always_up2date,
            up2date_directories: hc.up2date_directories.into_iter().collect(),
        });
    }

    for u in c.host_category_urls {
        catalog.insert_host_category_url(HostCategoryUrl {
            id: u.id,
            host_category_id: u.host_category_id,
            url: u.url,
            private: u.private,
        });
    }

    for d in c.directories {
        catalog.insert_directory(Directory {
            id: d.id,
            name: d.name,
        });
    }

    for cat in c.categories {
        catalog.insert_category(Category {
            id: cat.id,
            name: cat.name,
            product_id: cat.product_id,
            topdir_id: cat.topdir_id,
            directories: cat.directories,
        });
    }

    for p in c.products {
        catalog.insert_product(Product {
            id: p.id,
            name: p.name,
        });
    }

    for v in c.versions {
        catalog.insert_version(Version {
            id: v.id,
            product_id: v.product_id,
            name: v.name,
        });
    }

    for a in c.arches {
        catalog.insert_arch(Arch {
            id: a.id,
            name: a.name,
        });
    }

    for r in c.repositories {
        if r.prefix.is_empty() {
            return Err(SnapshotError::Invalid {
                entity: "repository",
                id: r.id,
                reason: "empty prefix".to_string(),
            });
        }
        catalog.insert_repository(Repository {
            id: r.id,
            name: r.name,
            prefix: r.prefix,
            category_id: r.category_id,
            version_id: r.version_id,
            arch_id: r.arch_id,
            directory_id: r.directory_id,
        });
    }

    for cc in &c.embargoed_countries {
        catalog.insert_embargoed_country(cc);
    }

    for nc in c.netblock_countries {
        match IpNet::from_str(&nc.netblock) {
            Ok(netblock) => catalog.insert_netblock_country(NetblockCountry {
                netblock,
                country: nc.country.to_uppercase(),
            }),
            Err(_) => warn!("Ignoring netblock country entry {}", nc.netblock),
        }
    }

    Ok(catalog)
}

pub fn write(catalog: &MemoryCatalog, path: &Path) -> Result<()> {
    let io_error = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    to_proto(catalog).write_to_writer(&mut writer)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<MemoryCatalog> {
    let file = File::open(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let c = pb::Catalog::parse_from_reader(&mut reader)?;
    let catalog = from_proto(c)?;
    info!(
        "Loaded snapshot {} taken at {}: {} hosts, {} directories, {} repositories",
        path.display(),
        catalog.time,
        catalog.all_hosts().len(),
        catalog.directories().len(),
        catalog.all_repositories().len()
    );
    Ok(catalog)
}

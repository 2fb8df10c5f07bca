#![deny(warnings)]
#[macro_use]
extern crate diesel;

pub mod db;

use chrono::Utc;
use console::style;
use db::models;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::ConnectionError;
use dns_lookup::lookup_host;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use ipnetwork::IpNetwork;
use itertools::Itertools;
use log::warn;
use mirrormanager::catalog::{
    Arch, Category, Directory, Host, HostCategory, HostCategoryUrl, MemoryCatalog,
    NetblockCountry, Product, Repository, Site, Version,
};
use mirrormanager::config::{print_usage, GeneratorConfig};
use mirrormanager::error::SnapshotError;
use mirrormanager::snapshot;
use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

/* Only rows the server can act on are exported: repositories need a prefix
 * and must not be disabled, host categories need a host and a category.
 * */

const STEPS: usize = 19;
static CALL_COUNT: AtomicUsize = AtomicUsize::new(1);
static DEBUG: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
enum GenerateError {
    #[error("Error reading configuration file {path}: DB_URL not set")]
    Config { path: PathBuf },
    #[error("Error connecting to database: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Error, PartialEq, Eq)]
enum NetblockError {
    #[error("cannot parse netblock {0:?}")]
    Invalid(String),
    #[error("DNS resolve error {entry} for host {host}")]
    Unresolvable { entry: String, host: String },
}

fn pg_conn(conf: &Path) -> Result<PgConnection, GenerateError> {
    dotenv::from_filename(conf).ok();

    let db_url = env::var("DB_URL").map_err(|_| GenerateError::Config {
        path: conf.to_path_buf(),
    })?;
    Ok(PgConnection::establish(&db_url)?)
}

fn print_step(msg: String) {
    let s = CALL_COUNT.fetch_add(1, Ordering::SeqCst);
    if !DEBUG.load(Ordering::SeqCst) {
        return;
    }
    println!(
        " Step {}: {}",
        style(format!("[{}/{}]", s, STEPS)).bold().dim(),
        msg
    );
}

fn get_sites(c: &mut PgConnection) -> QueryResult<Vec<models::Site>> {
    use crate::db::schema::site::dsl::*;
    let query = site
        .select((id, name, admin_active, user_active, private))
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Site>(c)
}

fn get_hosts(c: &mut PgConnection) -> QueryResult<Vec<models::Host>> {
    use crate::db::schema::host::dsl::*;
    let query = host
        .select((
            id,
            site_id,
            name,
            country,
            admin_active,
            user_active,
            private,
            bandwidth_int,
            comment,
        ))
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Host>(c)
}

fn get_acl_ips(c: &mut PgConnection) -> QueryResult<Vec<(i32, String)>> {
    use crate::db::schema::host_acl_ip::dsl::*;
    let query = host_acl_ip.select((host_id, ip)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<(i32, String)>(c)
}

fn get_netblocks(c: &mut PgConnection) -> QueryResult<Vec<(i32, String)>> {
    use crate::db::schema::host_netblock::dsl::*;
    let query = host_netblock.select((host_id, netblock)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<(i32, String)>(c)
}

fn get_countries_allowed(c: &mut PgConnection) -> QueryResult<Vec<(i32, String)>> {
    use crate::db::schema::host_country_allowed::dsl::*;
    let query = host_country_allowed.select((host_id, country)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<(i32, String)>(c)
}

fn get_host_categories(c: &mut PgConnection) -> QueryResult<Vec<models::HostCategory>> {
    use crate::db::schema::host_category::dsl::*;
    let query = host_category
        .select((
            id,
            host_id,
            category_id,
            upstream,
            admin_active,
            user_active,
            always_up2date,
        ))
        .filter(host_id.is_not_null())
        .filter(category_id.is_not_null())
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::HostCategory>(c)
}

fn get_up2date_directories(c: &mut PgConnection) -> QueryResult<Vec<(i32, i32)>> {
    use crate::db::schema::host_category_dir::dsl::*;
    let query = host_category_dir
        .select((host_category_id, directory_id))
        .filter(up2date.eq(true))
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<(i32, i32)>(c)
}

fn get_host_category_urls(c: &mut PgConnection) -> QueryResult<Vec<models::HostCategoryUrl>> {
    use crate::db::schema::host_category_url::dsl::*;
    let query = host_category_url
        .select((id, host_category_id, url, private))
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::HostCategoryUrl>(c)
}

fn get_directories(c: &mut PgConnection) -> QueryResult<Vec<models::Directory>> {
    use crate::db::schema::directory::dsl::*;
    let query = directory.select((id, name)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Directory>(c)
}

fn get_categories(c: &mut PgConnection) -> QueryResult<Vec<models::Category>> {
    use crate::db::schema::category::dsl::*;
    let query = category
        .select((id, name, product_id, topdir_id))
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Category>(c)
}

fn get_category_directories(c: &mut PgConnection) -> QueryResult<Vec<(i32, i32)>> {
    use crate::db::schema::category_directory::dsl::*;
    let query = category_directory
        .select((category_id, directory_id))
        .order((category_id, directory_id));
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<(i32, i32)>(c)
}

fn get_products(c: &mut PgConnection) -> QueryResult<Vec<models::Product>> {
    use crate::db::schema::product::dsl::*;
    let query = product.select((id, name)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Product>(c)
}

fn get_versions(c: &mut PgConnection) -> QueryResult<Vec<models::Version>> {
    use crate::db::schema::version::dsl::*;
    let query = version.select((id, name, product_id)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Version>(c)
}

fn get_arches(c: &mut PgConnection) -> QueryResult<Vec<models::Arch>> {
    use crate::db::schema::arch::dsl::*;
    let query = arch.select((id, name)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Arch>(c)
}

fn get_repositories(c: &mut PgConnection) -> QueryResult<Vec<models::Repository>> {
    use crate::db::schema::repository::dsl::*;
    let query = repository
        .select((
            id,
            name,
            prefix,
            category_id,
            version_id,
            arch_id,
            directory_id,
        ))
        .filter(prefix.is_not_null())
        .filter(disabled.eq(false))
        .order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::Repository>(c)
}

fn get_embargoed_countries(c: &mut PgConnection) -> QueryResult<Vec<String>> {
    use crate::db::schema::embargoed_country::dsl::*;
    let query = embargoed_country.select(country_code).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<String>(c)
}

fn get_netblock_countries(c: &mut PgConnection) -> QueryResult<Vec<models::NetblockCountry>> {
    use crate::db::schema::netblock_country::dsl::*;
    let query = netblock_country.select((netblock, country)).order(id);
    print_step(diesel::debug_query::<Pg, _>(&query).to_string());
    query.load::<models::NetblockCountry>(c)
}

#[derive(Debug, Default)]
struct Rows {
    sites: Vec<models::Site>,
    hosts: Vec<models::Host>,
    acl_ips: Vec<(i32, String)>,
    netblocks: Vec<(i32, String)>,
    countries_allowed: Vec<(i32, String)>,
    host_categories: Vec<models::HostCategory>,
    up2date_directories: Vec<(i32, i32)>,
    host_category_urls: Vec<models::HostCategoryUrl>,
    directories: Vec<models::Directory>,
    categories: Vec<models::Category>,
    category_directories: Vec<(i32, i32)>,
    products: Vec<models::Product>,
    versions: Vec<models::Version>,
    arches: Vec<models::Arch>,
    repositories: Vec<models::Repository>,
    embargoed: Vec<String>,
    netblock_countries: Vec<models::NetblockCountry>,
}

fn load_rows(c: &mut PgConnection) -> QueryResult<Rows> {
    Ok(Rows {
        sites: get_sites(c)?,
        hosts: get_hosts(c)?,
        acl_ips: get_acl_ips(c)?,
        netblocks: get_netblocks(c)?,
        countries_allowed: get_countries_allowed(c)?,
        host_categories: get_host_categories(c)?,
        up2date_directories: get_up2date_directories(c)?,
        host_category_urls: get_host_category_urls(c)?,
        directories: get_directories(c)?,
        categories: get_categories(c)?,
        category_directories: get_category_directories(c)?,
        products: get_products(c)?,
        versions: get_versions(c)?,
        arches: get_arches(c)?,
        repositories: get_repositories(c)?,
        embargoed: get_embargoed_countries(c)?,
        netblock_countries: get_netblock_countries(c)?,
    })
}

fn host_net(ip: IpAddr) -> IpNet {
    match ip {
        IpAddr::V4(ip4) => IpNet::V4(Ipv4Net::from(ip4)),
        IpAddr::V6(ip6) => IpNet::V6(Ipv6Net::from(ip6)),
    }
}

/* Netblocks are free form user input: CIDR, a single address, an address
 * with a dotted netmask or a DNS name standing for all its addresses. */
fn parse_ip(input: &str, host: &str) -> Result<Vec<IpNet>, NetblockError> {
    let entry = input.trim();
    if let Ok(net) = IpNet::from_str(entry) {
        return Ok(vec![net]);
    }
    if let Ok(ip) = IpAddr::from_str(entry) {
        return Ok(vec![host_net(ip)]);
    }
    match entry.split_once('/') {
        Some((prefix, netmask)) => {
            let invalid = || NetblockError::Invalid(entry.to_string());
            let prefix = IpAddr::from_str(prefix).map_err(|_| invalid())?;
            let netmask = IpAddr::from_str(netmask).map_err(|_| invalid())?;
            // IpNet cannot read x.x.x.x/x.x.x.x, IpNetwork can
            let network = IpNetwork::with_netmask(prefix, netmask).map_err(|_| invalid())?;
            let net = IpNet::new(network.ip(), network.prefix()).map_err(|_| invalid())?;
            Ok(vec![net])
        }
        None => match lookup_host(entry) {
            Ok(ips) => Ok(ips.into_iter().map(host_net).unique().collect()),
            Err(_) => Err(NetblockError::Unresolvable {
                entry: entry.to_string(),
                host: host.to_string(),
            }),
        },
    }
}

fn country_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_uppercase())
    } else {
        None
    }
}

fn assemble(rows: Rows) -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();

    for s in rows.sites {
        catalog.insert_site(Site {
            id: s.id.into(),
            name: s.name,
            admin_active: s.admin_active,
            user_active: s.user_active,
            private: s.private,
        });
    }

    let mut acl_ips = rows.acl_ips.into_iter().into_group_map();
    let mut netblocks = rows.netblocks.into_iter().into_group_map();
    let mut countries_allowed = rows.countries_allowed.into_iter().into_group_map();

    let pb = ProgressBar::new(rows.hosts.len() as u64);
    match ProgressStyle::default_bar().template(
        " Resolving hosts [{elapsed_precise}] {wide_bar:.cyan/blue} {pos:>7}/{len:7} {msg}",
    ) {
        Ok(s) => pb.set_style(s.progress_chars("##-")),
        Err(e) => warn!("Progress bar template rejected: {}", e),
    }
    if !DEBUG.load(Ordering::SeqCst) {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    print_step(format!("Resolving netblocks of {} hosts", rows.hosts.len()));
    for h in rows.hosts {
        pb.inc(1);
        let active = h.admin_active && h.user_active;
        // Inactive hosts are never served, their netblocks are not resolved.
        let nets: Vec<IpNet> = match netblocks.remove(&h.id) {
            Some(entries) if active => entries
                .iter()
                .filter_map(|n| match parse_ip(n, &h.name) {
                    Ok(net) => Some(net),
                    Err(e) => {
                        warn!("{}", e);
                        None
                    }
                })
                .flatten()
                .unique()
                .collect(),
            _ => Vec::new(),
        };
        let country = h.country.as_deref().and_then(country_code);
        if country.is_none() && h.country.is_some() {
            warn!("Host {} has an invalid country {:?}", h.name, h.country);
        }
        catalog.insert_host(Host {
            id: h.id.into(),
            site_id: h.site_id.into(),
            name: h.name,
            country,
            admin_active: h.admin_active,
            user_active: h.user_active,
            private: h.private,
            bandwidth_int: h.bandwidth_int.into(),
            comment: h.comment.unwrap_or_default(),
            acl_ips: acl_ips
                .remove(&h.id)
                .unwrap_or_default()
                .into_iter()
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
                .collect(),
            netblocks: nets,
            countries_allowed: countries_allowed
                .remove(&h.id)
                .unwrap_or_default()
                .iter()
                .filter_map(|c| country_code(c))
                .unique()
                .collect(),
        });
    }
    pb.finish_with_message("done");

    let mut up2date = rows.up2date_directories.into_iter().into_group_map();
    for hc in rows.host_categories {
        let (host_id, category_id) = match (hc.host_id, hc.category_id) {
            (Some(h), Some(c)) => (h, c),
            _ => continue,
        };
        catalog.insert_host_category(HostCategory {
            id: hc.id.into(),
            host_id: host_id.into(),
            category_id: category_id.into(),
            upstream: hc.upstream.filter(|u| !u.is_empty()),
            admin_active: hc.admin_active,
            user_active: hc.user_active,
            always_up2date: hc.always_up2date,
            up2date_directories: up2date
                .remove(&hc.id)
                .unwrap_or_default()
                .into_iter()
                .map(i64::from)
                .collect(),
        });
    }

    for u in rows.host_category_urls {
        catalog.insert_host_category_url(HostCategoryUrl {
            id: u.id.into(),
            host_category_id: u.host_category_id.into(),
            url: u.url,
            private: u.private,
        });
    }

    for d in rows.directories {
        catalog.insert_directory(Directory {
            id: d.id.into(),
            name: d.name,
        });
    }

    let mut category_directories = rows.category_directories.into_iter().into_group_map();
    for cat in rows.categories {
        let (product_id, topdir_id) = match (cat.product_id, cat.topdir_id) {
            (Some(p), Some(t)) => (p, t),
            _ => {
                warn!("Skipping category {} without product or top directory", cat.name);
                continue;
            }
        };
        catalog.insert_category(Category {
            id: cat.id.into(),
            name: cat.name,
            product_id: product_id.into(),
            topdir_id: topdir_id.into(),
            directories: category_directories
                .remove(&cat.id)
                .unwrap_or_default()
                .into_iter()
                .map(i64::from)
                .collect(),
        });
    }

    for p in rows.products {
        catalog.insert_product(Product {
            id: p.id.into(),
            name: p.name,
        });
    }

    for v in rows.versions {
        match v.product_id {
            Some(product_id) => catalog.insert_version(Version {
                id: v.id.into(),
                product_id: product_id.into(),
                name: v.name,
            }),
            None => warn!("Skipping version {} without product", v.name),
        }
    }

    for a in rows.arches {
        catalog.insert_arch(Arch {
            id: a.id.into(),
            name: a.name,
        });
    }

    for r in rows.repositories {
        match (r.prefix, r.category_id, r.version_id, r.arch_id, r.directory_id) {
            (Some(prefix), Some(category_id), Some(version_id), Some(arch_id), Some(directory_id))
                if !prefix.is_empty() =>
            {
                catalog.insert_repository(Repository {
                    id: r.id.into(),
                    name: r.name,
                    prefix,
                    category_id: category_id.into(),
                    version_id: version_id.into(),
                    arch_id: arch_id.into(),
                    directory_id: directory_id.into(),
                })
            }
            _ => warn!("Skipping incomplete repository {}", r.name),
        }
    }

    for e in rows.embargoed.iter().filter_map(|e| country_code(e)) {
        catalog.insert_embargoed_country(&e);
    }

    for nc in rows.netblock_countries {
        let country = match country_code(&nc.country) {
            Some(c) => c,
            None => {
                warn!("Skipping netblock {} with country {:?}", nc.netblock, nc.country);
                continue;
            }
        };
        match IpNet::from_str(nc.netblock.trim()) {
            Ok(netblock) => catalog.insert_netblock_country(NetblockCountry { netblock, country }),
            Err(_) => warn!("Skipping unparsable netblock {:?}", nc.netblock),
        }
    }

    catalog
}

fn run(config: &GeneratorConfig) -> Result<(), GenerateError> {
    let mut connection = pg_conn(&config.config)?;
    let rows = load_rows(&mut connection)?;
    let mut catalog = assemble(rows);
    catalog.time = Utc::now().timestamp() as u64;

    print_step(format!("Writing {}", config.outfile.display()));
    snapshot::write(&catalog, &config.outfile)?;
    Ok(())
}

fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let config = match GeneratorConfig::from_args(&args[1..]) {
        Ok(Some(c)) => c,
        Ok(None) => {
            print_usage(&program, &GeneratorConfig::options());
            return;
        }
        Err(e) => {
            println!("{}", e);
            print_usage(&program, &GeneratorConfig::options());
            process::exit(1);
        }
    };

    if config.debug {
        DEBUG.store(true, Ordering::SeqCst);
    }

    if let Err(e) = run(&config) {
        println!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod generate_mirrorlist_cache_test;

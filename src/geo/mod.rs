//! Client location and country based selection of mirror URLs.

use crate::catalog::NetblockCountry;
use crate::directory::MirrorUrl;
use crate::error::{MirrorError, Result};
use ipnet::IpNet;
use itertools::Itertools;
use log::{debug, warn};
use maxminddb::{geoip2, Reader};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use treebitmap::IpLookupTable;

/// A country specific list needs at least this many entries, otherwise the
/// global list is returned instead.
pub const DEFAULT_MINIMUM: usize = 2;

/// Turns the `country` request parameter into a country code.
///
/// `GLOBAL` and anything shorter than two characters mean "no country";
/// longer values are cut to their first two characters.
pub fn normalize_country_param(country: &str) -> Option<String> {
    let country = country.trim().to_uppercase();
    if country == "GLOBAL" || country.chars().count() < 2 {
        return None;
    }
    Some(country.chars().take(2).collect())
}

pub trait CountryLookup: Send + Sync {
    fn country(&self, ip: IpAddr) -> Result<Option<String>>;
}

pub struct GeoIp {
    reader: Reader<Vec<u8>>,
}

impl GeoIp {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(|e| {
            MirrorError::LookupServiceUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(GeoIp { reader })
    }
}

impl CountryLookup for GeoIp {
    fn country(&self, ip: IpAddr) -> Result<Option<String>> {
        // An address without a record is not an error.
        let found: Option<geoip2::Country> = self
            .reader
            .lookup::<geoip2::Country>(ip)
            .map(Option::from)
            .map_err(|e| MirrorError::LookupServiceUnavailable(e.to_string()))?;
        Ok(found
            .and_then(|c| c.country)
            .and_then(|co| co.iso_code)
            .map(|iso| iso.to_uppercase()))
    }
}

/// Netblocks whose clients are assigned a fixed country. Longest prefix wins.
pub struct NetblockCountries {
    v4: IpLookupTable<Ipv4Addr, String>,
    v6: IpLookupTable<Ipv6Addr, String>,
}

impl NetblockCountries {
    pub fn new(entries: &[&NetblockCountry]) -> Self {
        let mut v4 = IpLookupTable::new();
        let mut v6 = IpLookupTable::new();
        for e in entries {
            // The tree refuses prefixes with host bits set.
            match e.netblock.trunc() {
                IpNet::V4(net4) => {
                    v4.insert(net4.addr(), net4.prefix_len().into(), e.country.clone());
                }
                IpNet::V6(net6) => {
                    v6.insert(net6.addr(), net6.prefix_len().into(), e.country.clone());
                }
            }
        }
        NetblockCountries { v4, v6 }
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, ip: &IpAddr) -> Option<&str> {
        match ip {
            IpAddr::V4(ip4) => self.v4.longest_match(*ip4).map(|m| m.2.as_str()),
            IpAddr::V6(ip6) => self.v6.longest_match(*ip6).map(|m| m.2.as_str()),
        }
    }
}

/// Finds the country of a client: netblock overrides first, then GeoIP.
pub struct CountryLocator {
    netblocks: NetblockCountries,
    geoip: Option<Box<dyn CountryLookup>>,
}

impl CountryLocator {
    pub fn new(netblocks: NetblockCountries, geoip: Option<Box<dyn CountryLookup>>) -> Self {
        CountryLocator { netblocks, geoip }
    }

    /// Unknown and failed lookups both give `None`.
    pub fn locate(&self, ip: &IpAddr) -> Option<String> {
        if let Some(cc) = self.netblocks.find(ip) {
            debug!("{} located in {} by netblock", ip, cc);
            return Some(cc.to_uppercase());
        }
        let geoip = self.geoip.as_ref()?;
        match geoip.country(*ip) {
            Ok(cc) => cc,
            Err(e) => {
                warn!("Country lookup for {} failed: {}", ip, e);
                None
            }
        }
    }
}

/// Bucket key of the partition. Known countries sort lexically and before
/// hosts without a country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Bucket {
    Country(String),
    Unknown,
}

fn header(prefix: &str, country: &str, arch: &str) -> String {
    format!("# repo = {} country = {} arch = {}", prefix, country, arch)
}

/// Header line followed by the URLs for the client country, or by every URL
/// when the client country is unknown, has no mirrors, or has fewer than
/// `minimum` of them.
///
/// The global list is ordered by country code with hosts without a country
/// last; inside a country URLs keep the order they came in.
pub fn partition_and_select(
    urls: &[MirrorUrl],
    client_country: Option<&str>,
    prefix: &str,
    arch: &str,
    minimum: usize,
) -> Vec<String> {
    let mut buckets: BTreeMap<Bucket, Vec<String>> = BTreeMap::new();
    for (bucket, url) in urls
        .iter()
        .map(|u| {
            let bucket = match &u.country {
                Some(cc) => Bucket::Country(cc.to_uppercase()),
                None => Bucket::Unknown,
            };
            (bucket, u.url.clone())
        })
        .unique()
    {
        buckets.entry(bucket).or_default().push(url);
    }

    if let Some(cc) = client_country {
        let cc = cc.to_uppercase();
        if let Some(entries) = buckets.get(&Bucket::Country(cc.clone())) {
            if entries.len() >= minimum {
                let mut lines = vec![header(prefix, &cc, arch)];
                lines.extend(entries.iter().cloned());
                return lines;
            }
            debug!(
                "Only {} mirrors in {}, falling back to global",
                entries.len(),
                cc
            );
        }
    }

    let mut lines = vec![header(prefix, "global", arch)];
    lines.extend(buckets.into_values().flatten());
    lines
}

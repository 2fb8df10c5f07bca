//! Which hosts a client may be sent to.

use crate::catalog::{Catalog, Host};
use crate::directory::MirrorUrl;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// An end user. Private hosts are never visible.
    Public,
    /// Another mirror asking with `include_private`. Private hosts are
    /// visible, but those declaring netblocks or ACL entries only to clients
    /// inside them.
    Peer { client_ip: Option<IpAddr> },
}

impl Context {
    pub fn include_private(&self) -> bool {
        matches!(self, Context::Peer { .. })
    }
}

pub fn is_visible(
    catalog: &dyn Catalog,
    host: &Host,
    client_country: Option<&str>,
    context: &Context,
) -> bool {
    if !host.is_active() {
        return false;
    }
    let site = catalog.site(host.site_id);
    if !site.map_or(false, |s| s.is_active()) {
        return false;
    }

    if host.is_private(site) {
        match context {
            Context::Public => return false,
            Context::Peer { client_ip } => {
                if !acl_allows(host, *client_ip) {
                    return false;
                }
            }
        }
    }

    if let Some(cc) = client_country {
        if catalog.is_embargoed(cc) {
            return false;
        }
    }

    if !host.countries_allowed.is_empty() {
        return match client_country {
            Some(cc) => host
                .countries_allowed
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(cc)),
            None => false,
        };
    }

    true
}

/// Keeps the URLs whose host passes [`is_visible`], in their original order.
pub fn filter_visible<'a>(
    catalog: &dyn Catalog,
    urls: Vec<MirrorUrl<'a>>,
    client_country: Option<&str>,
    context: &Context,
) -> Vec<MirrorUrl<'a>> {
    urls.into_iter()
        .filter(|u| is_visible(catalog, u.host, client_country, context))
        .collect()
}

/// A host without netblocks or ACL entries accepts every peer.
fn acl_allows(host: &Host, client_ip: Option<IpAddr>) -> bool {
    let acl: Vec<IpNet> = host.acl_ips.iter().filter_map(|a| parse_acl(a)).collect();
    if host.netblocks.is_empty() && acl.is_empty() {
        return true;
    }
    let ip = match client_ip {
        Some(ip) => ip,
        None => return false,
    };
    host.netblocks
        .iter()
        .chain(acl.iter())
        .any(|net| net.contains(&ip))
}

/// ACL entries are networks or single addresses. Entries holding a host
/// name never match.
fn parse_acl(entry: &str) -> Option<IpNet> {
    let entry = entry.trim();
    if let Ok(net) = IpNet::from_str(entry) {
        return Some(net);
    }
    IpAddr::from_str(entry).ok().map(|ip| match ip {
        IpAddr::V4(ip4) => IpNet::V4(Ipv4Net::from(ip4)),
        IpAddr::V6(ip6) => IpNet::V6(Ipv6Net::from(ip6)),
    })
}

#[cfg(test)]
mod visibility_test;

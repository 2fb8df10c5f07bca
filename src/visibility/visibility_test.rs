use super::*;
use crate::catalog::{fixture, MemoryCatalog};
use crate::directory::{resolve_path, urls_for_directory};

fn with_host(c: &mut MemoryCatalog, id: i64, change: impl FnOnce(&mut Host)) {
    let mut h = c.host(id).unwrap().clone();
    change(&mut h);
    c.insert_host(h);
}

#[test]
fn active_host_visible_test() {
    let c = fixture::catalog();
    let de1 = c.host(1).unwrap();
    assert!(is_visible(&c, de1, Some("DE"), &Context::Public));
    assert!(is_visible(&c, de1, Some("US"), &Context::Public));
    assert!(is_visible(&c, de1, None, &Context::Public));
}

#[test]
fn user_inactive_host_never_visible_test() {
    let mut c = fixture::catalog();
    with_host(&mut c, 1, |h| h.user_active = false);
    let de1 = c.host(1).unwrap();
    for country in [Some("DE"), Some("US"), None] {
        assert!(!is_visible(&c, de1, country, &Context::Public));
        assert!(!is_visible(
            &c,
            de1,
            country,
            &Context::Peer {
                client_ip: Some("10.1.2.3".parse().unwrap())
            }
        ));
    }
}

#[test]
fn admin_inactive_host_test() {
    let mut c = fixture::catalog();
    with_host(&mut c, 2, |h| h.admin_active = false);
    assert!(!is_visible(&c, c.host(2).unwrap(), Some("DE"), &Context::Public));
}

#[test]
fn inactive_site_test() {
    let mut c = fixture::catalog();
    let mut site = c.site(1).unwrap().clone();
    site.user_active = false;
    c.insert_site(site);
    assert!(!is_visible(&c, c.host(3).unwrap(), Some("US"), &Context::Public));
}

#[test]
fn allowed_countries_test() {
    let mut c = fixture::catalog();
    with_host(&mut c, 4, |h| {
        h.countries_allowed = vec!["DE".to_string(), "FR".to_string()]
    });
    let fr1 = c.host(4).unwrap();
    assert!(!is_visible(&c, fr1, Some("US"), &Context::Public));
    assert!(is_visible(&c, fr1, Some("DE"), &Context::Public));
    assert!(is_visible(&c, fr1, Some("fr"), &Context::Public));
    assert!(!is_visible(&c, fr1, None, &Context::Public));
}

#[test]
fn embargoed_country_test() {
    let c = fixture::catalog();
    let de1 = c.host(1).unwrap();
    assert!(!is_visible(&c, de1, Some("KP"), &Context::Public));
    assert!(!is_visible(&c, de1, Some("kp"), &Context::Public));
}

#[test]
fn private_host_test() {
    let c = fixture::catalog();
    let internal = c.host(6).unwrap();
    assert!(!is_visible(&c, internal, Some("DE"), &Context::Public));
    let inside = Context::Peer {
        client_ip: Some("10.20.30.40".parse().unwrap()),
    };
    let outside = Context::Peer {
        client_ip: Some("192.0.2.1".parse().unwrap()),
    };
    let unknown = Context::Peer { client_ip: None };
    assert!(is_visible(&c, internal, Some("DE"), &inside));
    assert!(!is_visible(&c, internal, Some("DE"), &outside));
    assert!(!is_visible(&c, internal, Some("DE"), &unknown));
    // public hosts do not care about the peer address
    assert!(is_visible(&c, c.host(1).unwrap(), Some("DE"), &outside));
    assert!(inside.include_private());
    assert!(!Context::Public.include_private());
}

#[test]
fn private_host_acl_ip_test() {
    let mut c = fixture::catalog();
    with_host(&mut c, 6, |h| {
        h.netblocks.clear();
        h.acl_ips = vec!["192.0.2.1".to_string(), "2001:db8::/32".to_string()];
    });
    let internal = c.host(6).unwrap();
    for (ip, expected) in [
        ("192.0.2.1", true),
        ("192.0.2.2", false),
        ("2001:db8::5", true),
    ] {
        let ctx = Context::Peer {
            client_ip: Some(ip.parse().unwrap()),
        };
        assert_eq!(is_visible(&c, internal, None, &ctx), expected, "{}", ip);
    }

    with_host(&mut c, 6, |h| h.acl_ips.clear());
    let open = c.host(6).unwrap();
    assert!(is_visible(&c, open, None, &Context::Peer { client_ip: None }));
}

#[test]
fn filter_visible_keeps_order_test() {
    let c = fixture::catalog();
    let dir = resolve_path(&c, fixture::UPDATES_10_X86_64).unwrap();
    let urls = urls_for_directory(&c, dir, None, false);
    let visible = filter_visible(&c, urls, Some("DE"), &Context::Public);
    let hosts: Vec<i64> = visible.iter().map(|u| u.host.id).collect();
    assert_eq!(hosts, vec![1, 1, 2, 3, 4, 5]);
}

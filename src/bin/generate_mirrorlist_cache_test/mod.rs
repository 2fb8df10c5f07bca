use super::*;
use mirrormanager::catalog::Catalog;
use std::collections::HashSet;

fn net(s: &str) -> IpNet {
    IpNet::from_str(s).unwrap()
}

fn db_host(id: i32, name: &str, country: &str, active: bool) -> models::Host {
    models::Host {
        id,
        site_id: 1,
        name: name.to_string(),
        country: Some(country.to_string()),
        admin_active: active,
        user_active: true,
        private: false,
        bandwidth_int: 100,
        comment: None,
    }
}

fn rows() -> Rows {
    Rows {
        sites: vec![models::Site {
            id: 1,
            name: "Example".to_string(),
            admin_active: true,
            user_active: true,
            private: false,
        }],
        hosts: vec![
            db_host(1, "de1.example.org", "de", true),
            db_host(2, "off.example.org", "Germany", false),
        ],
        acl_ips: vec![(1, " 192.0.2.200 ".to_string()), (1, String::new())],
        netblocks: vec![
            (1, "192.0.2.0/24".to_string()),
            (1, "192.0.2.0/255.255.255.0".to_string()),
            (1, "1.2.3/x/y".to_string()),
            (2, "198.51.100.0/24".to_string()),
        ],
        countries_allowed: vec![
            (1, "de".to_string()),
            (1, "DE".to_string()),
            (1, "xx1".to_string()),
        ],
        host_categories: vec![
            models::HostCategory {
                id: 1,
                host_id: Some(1),
                category_id: Some(1),
                upstream: Some(String::new()),
                admin_active: true,
                user_active: true,
                always_up2date: false,
            },
            models::HostCategory {
                id: 2,
                host_id: None,
                category_id: Some(1),
                upstream: None,
                admin_active: true,
                user_active: true,
                always_up2date: true,
            },
        ],
        up2date_directories: vec![(1, 2)],
        host_category_urls: vec![models::HostCategoryUrl {
            id: 1,
            host_category_id: 1,
            url: "http://de1.example.org/pub".to_string(),
            private: false,
        }],
        directories: vec![
            models::Directory {
                id: 1,
                name: "pub/fedora/linux".to_string(),
            },
            models::Directory {
                id: 2,
                name: "pub/fedora/linux/updates".to_string(),
            },
        ],
        categories: vec![
            models::Category {
                id: 1,
                name: "Fedora Linux".to_string(),
                product_id: Some(1),
                topdir_id: Some(1),
            },
            models::Category {
                id: 2,
                name: "Orphan".to_string(),
                product_id: None,
                topdir_id: Some(1),
            },
        ],
        category_directories: vec![(1, 1), (1, 2)],
        products: vec![models::Product {
            id: 1,
            name: "Fedora".to_string(),
        }],
        versions: vec![
            models::Version {
                id: 1,
                name: "10".to_string(),
                product_id: Some(1),
            },
            models::Version {
                id: 2,
                name: "orphan".to_string(),
                product_id: None,
            },
        ],
        arches: vec![models::Arch {
            id: 1,
            name: "x86_64".to_string(),
        }],
        repositories: vec![
            models::Repository {
                id: 1,
                name: "Fedora 10".to_string(),
                prefix: Some("fedora-10".to_string()),
                category_id: Some(1),
                version_id: Some(1),
                arch_id: Some(1),
                directory_id: Some(2),
            },
            models::Repository {
                id: 2,
                name: "broken".to_string(),
                prefix: Some("broken".to_string()),
                category_id: Some(1),
                version_id: None,
                arch_id: Some(1),
                directory_id: Some(2),
            },
        ],
        embargoed: vec!["cu".to_string(), " KP ".to_string(), "bad".to_string()],
        netblock_countries: vec![
            models::NetblockCountry {
                netblock: "192.0.2.0/24".to_string(),
                country: "de".to_string(),
            },
            models::NetblockCountry {
                netblock: "nope".to_string(),
                country: "US".to_string(),
            },
            models::NetblockCountry {
                netblock: "198.51.100.0/24".to_string(),
                country: "Mars".to_string(),
            },
        ],
    }
}

#[test]
fn parse_ip_test() {
    assert_eq!(
        parse_ip("192.0.2.0/24", "h").unwrap(),
        vec![net("192.0.2.0/24")]
    );
    assert_eq!(
        parse_ip(" 192.0.2.7 ", "h").unwrap(),
        vec![net("192.0.2.7/32")]
    );
    assert_eq!(
        parse_ip("2001:db8::1", "h").unwrap(),
        vec![net("2001:db8::1/128")]
    );
    assert_eq!(
        parse_ip("192.0.2.0/255.255.255.0", "h").unwrap(),
        vec![net("192.0.2.0/24")]
    );
    assert_eq!(
        parse_ip("10.0.0.0/255.0.255.0", "h"),
        Err(NetblockError::Invalid("10.0.0.0/255.0.255.0".to_string()))
    );
    assert_eq!(
        parse_ip("1.2.3/x/y", "h"),
        Err(NetblockError::Invalid("1.2.3/x/y".to_string()))
    );
}

#[test]
fn country_code_test() {
    assert_eq!(country_code("de"), Some("DE".to_string()));
    assert_eq!(country_code(" us "), Some("US".to_string()));
    assert_eq!(country_code("EU1"), None);
    assert_eq!(country_code("1A"), None);
    assert_eq!(country_code(""), None);
}

#[test]
fn assemble_hosts_test() {
    let catalog = assemble(rows());

    let de1 = catalog.host(1).unwrap();
    assert_eq!(de1.country.as_deref(), Some("DE"));
    assert_eq!(de1.acl_ips, vec!["192.0.2.200".to_string()]);
    assert_eq!(de1.netblocks, vec![net("192.0.2.0/24")]);
    assert_eq!(de1.countries_allowed, vec!["DE".to_string()]);
    assert_eq!(de1.comment, "");
    assert_eq!(de1.bandwidth_int, 100);

    let off = catalog.host(2).unwrap();
    assert_eq!(off.country, None);
    assert!(off.netblocks.is_empty());

    assert!(catalog.site(1).unwrap().is_active());
}

#[test]
fn assemble_categories_test() {
    let catalog = assemble(rows());

    assert_eq!(catalog.all_host_categories().len(), 1);
    let hc = &catalog.all_host_categories()[0];
    assert_eq!(hc.upstream, None);
    assert_eq!(hc.up2date_directories, HashSet::from([2]));
    assert!(hc.carries(2));
    assert!(!hc.carries(1));
    assert_eq!(catalog.host_category_urls(1).len(), 1);

    assert_eq!(catalog.categories().len(), 1);
    assert_eq!(catalog.categories()[0].directories, vec![1, 2]);
    assert_eq!(catalog.versions().len(), 1);

    assert_eq!(catalog.all_repositories().len(), 1);
    assert_eq!(catalog.all_repositories()[0].prefix, "fedora-10");
}

#[test]
fn assemble_countries_test() {
    let catalog = assemble(rows());

    assert!(catalog.is_embargoed("CU"));
    assert!(catalog.is_embargoed("KP"));
    assert_eq!(catalog.embargoed_countries().len(), 2);

    let netblocks = catalog.netblock_countries();
    assert_eq!(netblocks.len(), 1);
    assert_eq!(netblocks[0].netblock, net("192.0.2.0/24"));
    assert_eq!(netblocks[0].country, "DE");
}

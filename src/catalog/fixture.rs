//! Small catalog shared by the unit tests.
//!
//! One product ("Fedora") with an "Updates" category rooted at
//! `pub/fedora/linux/updates`, three repositories, five public hosts and a
//! private one:
//!
//! | host | name                 | country | notes                          |
//! |------|----------------------|---------|--------------------------------|
//! | 1    | de1.example.org      | DE      | http + rsync URL               |
//! | 2    | de2.example.org      | DE      | ftp URL                        |
//! | 3    | us1.example.org      | US      | only carries 10/x86_64         |
//! | 4    | fr1.example.org      | FR      |                                |
//! | 5    | nowhere.example.org  | -       |                                |
//! | 6    | internal.example.com | DE      | private site, 10.0.0.0/8 ACL   |

use super::*;

pub const UPDATES_10_X86_64: &str = "pub/fedora/linux/updates/10/x86_64";
pub const UPDATES_9_X86_64: &str = "pub/fedora/linux/updates/9/x86_64";

pub fn host(id: i64, site_id: i64, name: &str, country: Option<&str>) -> Host {
    Host {
        id,
        site_id,
        name: name.to_string(),
        country: country.map(str::to_string),
        admin_active: true,
        user_active: true,
        private: false,
        bandwidth_int: 100,
        comment: String::new(),
        acl_ips: Vec::new(),
        netblocks: Vec::new(),
        countries_allowed: Vec::new(),
    }
}

fn host_category(id: i64, host_id: i64) -> HostCategory {
    HostCategory {
        id,
        host_id,
        category_id: 1,
        upstream: None,
        admin_active: true,
        user_active: true,
        always_up2date: true,
        up2date_directories: HashSet::new(),
    }
}

fn url(id: i64, host_category_id: i64, url: &str, private: bool) -> HostCategoryUrl {
    HostCategoryUrl {
        id,
        host_category_id,
        url: url.to_string(),
        private,
    }
}

pub fn catalog() -> MemoryCatalog {
    let mut c = MemoryCatalog::new();
    c.time = 1_234_567_890;

    c.insert_product(Product {
        id: 1,
        name: "Fedora".to_string(),
    });
    for (id, name) in [
        (1, "pub/fedora/linux/updates"),
        (2, UPDATES_10_X86_64),
        (3, UPDATES_9_X86_64),
        (4, "pub/fedora/linux/updates/10/i386"),
    ] {
        c.insert_directory(Directory {
            id,
            name: name.to_string(),
        });
    }
    c.insert_category(Category {
        id: 1,
        name: "Updates".to_string(),
        product_id: 1,
        topdir_id: 1,
        directories: vec![1, 2, 3, 4],
    });
    c.insert_version(Version {
        id: 1,
        product_id: 1,
        name: "10".to_string(),
    });
    c.insert_version(Version {
        id: 2,
        product_id: 1,
        name: "9".to_string(),
    });
    for (id, name) in [(1, "x86_64"), (2, "i386"), (3, "ppc")] {
        c.insert_arch(Arch {
            id,
            name: name.to_string(),
        });
    }
    for (id, prefix, version_id, arch_id, directory_id) in [
        (1, "core-updates-released-fc10", 1, 1, 2),
        (2, "core-updates-released-9", 2, 1, 3),
        (3, "core-updates-released-fc10", 1, 2, 4),
    ] {
        c.insert_repository(Repository {
            id,
            name: format!("repository {}", id),
            prefix: prefix.to_string(),
            category_id: 1,
            version_id,
            arch_id,
            directory_id,
        });
    }

    c.insert_site(Site {
        id: 1,
        name: "Example University".to_string(),
        admin_active: true,
        user_active: true,
        private: false,
    });
    c.insert_site(Site {
        id: 2,
        name: "Hidden Corp".to_string(),
        admin_active: true,
        user_active: true,
        private: true,
    });

    c.insert_host(host(1, 1, "de1.example.org", Some("DE")));
    c.insert_host(host(2, 1, "de2.example.org", Some("DE")));
    c.insert_host(host(3, 1, "us1.example.org", Some("US")));
    c.insert_host(host(4, 1, "fr1.example.org", Some("FR")));
    c.insert_host(host(5, 1, "nowhere.example.org", None));
    let mut internal = host(6, 2, "internal.example.com", Some("DE"));
    internal.netblocks = vec!["10.0.0.0/8".parse().unwrap()];
    internal.acl_ips = vec!["internal-sync.example.com".to_string()];
    c.insert_host(internal);

    for id in 1..=6 {
        c.insert_host_category(host_category(id, id));
    }
    let mut us = host_category(3, 3);
    us.always_up2date = false;
    us.up2date_directories = HashSet::from([2]);
    c.insert_host_category(us);

    c.insert_host_category_url(url(11, 1, "http://de1.example.org/pub/fedora/updates", false));
    c.insert_host_category_url(url(12, 1, "rsync://de1.example.org/fedora-updates", false));
    c.insert_host_category_url(url(21, 2, "ftp://de2.example.org/fedora/updates/", false));
    c.insert_host_category_url(url(31, 3, "https://us1.example.org/fedora/updates", false));
    c.insert_host_category_url(url(41, 4, "http://fr1.example.org/updates", false));
    c.insert_host_category_url(url(51, 5, "http://nowhere.example.org/fedora/updates", false));
    c.insert_host_category_url(url(61, 6, "http://internal.example.com/updates", false));
    c.insert_host_category_url(url(62, 6, "http://internal.example.com/peer/updates", true));

    c.insert_embargoed_country("KP");
    c
}

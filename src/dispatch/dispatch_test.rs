use super::*;
use crate::catalog::{fixture, MemoryCatalog};
use crate::format::render;

const DE1: &str = "http://de1.example.org/pub/fedora/updates/10/x86_64/";
const DE2: &str = "ftp://de2.example.org/fedora/updates/10/x86_64/";
const US1: &str = "https://us1.example.org/fedora/updates/10/x86_64/";
const FR1: &str = "http://fr1.example.org/updates/10/x86_64/";
const NOWHERE: &str = "http://nowhere.example.org/fedora/updates/10/x86_64/";

fn segments() -> Vec<&'static str> {
    vec!["fedora", "linux", "updates", "10", "x86_64"]
}

fn mirrorlist(c: &MemoryCatalog, repo: &str, arch: &str, country: Option<&str>) -> Vec<String> {
    let map = RepoMap::builtin();
    Dispatcher::new(c, &map, 2).mirrorlist(Some(repo), Some(arch), country, country)
}

#[test]
fn path_lookup_test() {
    let c = fixture::catalog();
    let map = RepoMap::builtin();
    let d = Dispatcher::new(&c, &map, 2);
    assert_eq!(
        d.path_lookup(&segments(), None, None, &Context::Public),
        vec![DE1, DE2, US1, FR1, NOWHERE]
    );
    assert_eq!(
        d.path_lookup(&segments(), Some("us"), Some("US"), &Context::Public),
        vec![US1]
    );
    assert!(d
        .path_lookup(&["fedora", "linux", "updates", "11"], None, None, &Context::Public)
        .is_empty());
}

#[test]
fn path_lookup_peer_test() {
    let c = fixture::catalog();
    let map = RepoMap::builtin();
    let d = Dispatcher::new(&c, &map, 2);
    let inside = Context::Peer {
        client_ip: Some("10.1.1.1".parse().unwrap()),
    };
    let found = d.path_lookup(&segments(), Some("DE"), Some("DE"), &inside);
    assert_eq!(
        found,
        vec![
            DE1,
            DE2,
            "http://internal.example.com/updates/10/x86_64/",
            "http://internal.example.com/peer/updates/10/x86_64/",
        ]
    );
    let outside = Context::Peer {
        client_ip: Some("192.0.2.1".parse().unwrap()),
    };
    assert_eq!(
        d.path_lookup(&segments(), Some("DE"), Some("DE"), &outside),
        vec![DE1, DE2]
    );
}

#[test]
fn mirrorlist_country_test() {
    let c = fixture::catalog();
    assert_eq!(
        mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("DE")),
        vec![
            "# repo = core-updates-released-fc10 country = DE arch = x86_64",
            DE1,
            DE2,
        ]
    );
}

#[test]
fn mirrorlist_global_test() {
    let c = fixture::catalog();
    let global = vec![
        "# repo = core-updates-released-fc10 country = global arch = x86_64",
        DE1,
        DE2,
        FR1,
        US1,
        NOWHERE,
    ];
    // France has a single mirror, Japan none
    assert_eq!(
        mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("FR")),
        global
    );
    assert_eq!(
        mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("JP")),
        global
    );
    assert_eq!(
        mirrorlist(&c, "core-updates-released-fc10", "x86_64", None),
        global
    );
}

#[test]
fn mirrorlist_up2date_test() {
    let c = fixture::catalog();
    let lines = mirrorlist(&c, "core-updates-released-9", "x86_64", None);
    assert_eq!(lines[0], "# repo = core-updates-released-9 country = global arch = x86_64");
    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|l| !l.contains("us1")));
}

#[test]
fn mirrorlist_no_match_test() {
    let c = fixture::catalog();
    let map = RepoMap::builtin();
    let d = Dispatcher::new(&c, &map, 2);
    let no_match = vec![NO_MATCH.to_string()];
    assert_eq!(d.mirrorlist(Some("core-updates-released-fc10"), None, None, None), no_match);
    assert_eq!(d.mirrorlist(None, Some("x86_64"), None, None), no_match);
    assert_eq!(
        d.mirrorlist(Some("core-updates-released-fc10"), Some("sparc"), None, None),
        no_match
    );
    assert_eq!(d.mirrorlist(Some("bogus"), Some("x86_64"), None, None), no_match);
    // ppc is a known arch without a repository
    assert_eq!(
        d.mirrorlist(Some("core-updates-released-fc10"), Some("ppc"), None, None),
        no_match
    );
    // every host is hidden from embargoed countries
    assert_eq!(
        d.mirrorlist(Some("core-updates-released-fc10"), Some("x86_64"), Some("KP"), Some("KP")),
        no_match
    );
    assert_eq!(
        render(&d.mirrorlist(None, None, None, None)),
        "#no repositories match\n"
    );
}

#[test]
fn mirrorlist_ambiguous_test() {
    let mut c = fixture::catalog();
    let mut twin = c.all_repositories()[0].clone();
    twin.id = 99;
    c.insert_repository(twin);
    assert_eq!(
        mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("DE")),
        vec![NO_MATCH]
    );
}

#[test]
fn mirrorlist_inactive_hosts_test() {
    let mut c = fixture::catalog();
    for id in [1, 2, 3, 4, 5] {
        let mut h = c.host(id).unwrap().clone();
        h.user_active = false;
        c.insert_host(h);
    }
    // the private host is left, but never for public requests
    assert_eq!(
        mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("DE")),
        vec![NO_MATCH]
    );
}

#[test]
fn mirrorlist_is_repeatable_test() {
    let c = fixture::catalog();
    let first = render(&mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("JP")));
    for _ in 0..10 {
        assert_eq!(
            render(&mirrorlist(&c, "core-updates-released-fc10", "x86_64", Some("JP"))),
            first
        );
    }
}

#[test]
fn filter_protocols_test() {
    let c = fixture::catalog();
    let de1 = c.host(1).unwrap();
    let urls = vec![
        MirrorUrl {
            url: "rsync://de1.example.org/fedora/".to_string(),
            country: None,
            host: de1,
        },
        MirrorUrl {
            url: "http://de1.example.org/fedora/".to_string(),
            country: None,
            host: de1,
        },
        MirrorUrl {
            url: "not a url".to_string(),
            country: None,
            host: de1,
        },
    ];
    let kept = filter_protocols(urls);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].url, "http://de1.example.org/fedora/");
}

#[test]
fn rsync_acl_test() {
    let mut c = fixture::catalog();
    let map = RepoMap::builtin();
    assert_eq!(
        Dispatcher::new(&c, &map, 2).rsync_acl(),
        vec!["internal-sync.example.com"]
    );

    let mut de1 = c.host(1).unwrap().clone();
    de1.acl_ips = vec!["192.0.2.10".to_string(), "192.0.2.11".to_string()];
    c.insert_host(de1);
    let mut us1 = c.host(3).unwrap().clone();
    us1.acl_ips = vec!["198.51.100.1".to_string()];
    us1.admin_active = false;
    c.insert_host(us1);
    assert_eq!(
        Dispatcher::new(&c, &map, 2).rsync_acl(),
        vec!["192.0.2.10", "192.0.2.11", "internal-sync.example.com"]
    );
}

#[test]
fn publiclist_test() {
    let mut c = fixture::catalog();
    let mut fr1 = c.host(4).unwrap().clone();
    fr1.comment = "Paris\tcampus".to_string();
    fr1.bandwidth_int = 1000;
    c.insert_host(fr1);
    let map = RepoMap::builtin();
    let d = Dispatcher::new(&c, &map, 2);
    assert_eq!(
        d.publiclist(None, None, None),
        vec![
            "# 5 public active mirrors",
            "DE\tde1.example.org\t100\t",
            "DE\tde2.example.org\t100\t",
            "FR\tfr1.example.org\t1000\tParis campus",
            "US\tus1.example.org\t100\t",
            "\tnowhere.example.org\t100\t",
        ]
    );
}

#[test]
fn publiclist_narrowed_test() {
    let c = fixture::catalog();
    let map = RepoMap::builtin();
    let d = Dispatcher::new(&c, &map, 2);
    assert_eq!(d.publiclist(Some("Fedora"), None, None).len(), 6);

    let names = |lines: Vec<String>| -> Vec<String> {
        lines
            .iter()
            .skip(1)
            .map(|l| l.split('\t').nth(1).unwrap_or_default().to_string())
            .collect()
    };
    let nine = d.publiclist(Some("Fedora"), Some("9"), Some("x86_64"));
    assert_eq!(nine[0], "# 4 public active mirrors for Fedora/9/x86_64");
    assert_eq!(
        names(nine),
        vec![
            "de1.example.org",
            "de2.example.org",
            "fr1.example.org",
            "nowhere.example.org",
        ]
    );
    assert_eq!(
        names(d.publiclist(Some("Fedora"), Some("10"), None)).len(),
        5
    );
    assert_eq!(
        d.publiclist(Some("Fedora"), Some("10"), Some("ppc")),
        vec!["# 0 public active mirrors for Fedora/10/ppc"]
    );
    assert_eq!(d.publiclist(Some("Fedora Core"), None, None).len(), 1);
}

#[test]
fn embargo_ignores_preferred_country_test() {
    let c = fixture::catalog();
    let map = RepoMap::builtin();
    let d = Dispatcher::new(&c, &map, 2);
    let repo = Some("core-updates-released-fc10");
    let no_match = vec![NO_MATCH.to_string()];
    assert_eq!(d.mirrorlist(repo, Some("x86_64"), Some("KP"), None), no_match);
    assert_eq!(d.mirrorlist(repo, Some("x86_64"), Some("KP"), Some("DE")), no_match);
    assert!(d
        .path_lookup(&segments(), Some("DE"), Some("KP"), &Context::Public)
        .is_empty());

    // a client located in DE may still ask for the global list
    let lines = d.mirrorlist(repo, Some("x86_64"), Some("DE"), None);
    assert_eq!(
        lines[0],
        "# repo = core-updates-released-fc10 country = global arch = x86_64"
    );
}

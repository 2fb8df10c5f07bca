use super::*;
use hyper::body;
use mirrormanager::catalog::{
    Arch, Category, Directory, Host, HostCategory, HostCategoryUrl, NetblockCountry, Product,
    Repository, Site, Version,
};
use std::collections::HashSet;
use std::io::Read;
use tempfile::tempdir;
use tokio::runtime::Runtime;

const DIR: &str = "pub/fedora/linux/updates/10/x86_64";

fn host(id: i64, name: &str, country: &str) -> Host {
    Host {
        id,
        site_id: 1,
        name: name.to_string(),
        country: Some(country.to_string()),
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

fn mirrors() -> Mirrors {
    let mut c = MemoryCatalog::new();
    c.insert_product(Product {
        id: 1,
        name: "Fedora".to_string(),
    });
    c.insert_directory(Directory {
        id: 1,
        name: "pub/fedora/linux/updates".to_string(),
    });
    c.insert_directory(Directory {
        id: 2,
        name: DIR.to_string(),
    });
    c.insert_category(Category {
        id: 1,
        name: "Updates".to_string(),
        product_id: 1,
        topdir_id: 1,
        directories: vec![1, 2],
    });
    c.insert_version(Version {
        id: 1,
        product_id: 1,
        name: "10".to_string(),
    });
    c.insert_arch(Arch {
        id: 1,
        name: "x86_64".to_string(),
    });
    c.insert_repository(Repository {
        id: 1,
        name: "Fedora 10 updates".to_string(),
        prefix: "core-updates-released-fc10".to_string(),
        category_id: 1,
        version_id: 1,
        arch_id: 1,
        directory_id: 2,
    });
    c.insert_site(Site {
        id: 1,
        name: "Example".to_string(),
        admin_active: true,
        user_active: true,
        private: false,
    });
    let mut de1 = host(1, "de1.example.org", "DE");
    de1.acl_ips = vec!["192.0.2.200".to_string()];
    c.insert_host(de1);
    c.insert_host(host(2, "de2.example.org", "DE"));
    c.insert_host(host(3, "us1.example.org", "US"));
    for id in 1..=3 {
        c.insert_host_category(HostCategory {
            id,
            host_id: id,
            category_id: 1,
            upstream: None,
            admin_active: true,
            user_active: true,
            always_up2date: true,
            up2date_directories: HashSet::new(),
        });
    }
    for (id, hc, url) in [
        (1, 1, "http://de1.example.org/updates"),
        (2, 1, "rsync://de1.example.org/updates"),
        (3, 2, "http://de2.example.org/updates"),
        (4, 3, "http://us1.example.org/updates"),
    ] {
        c.insert_host_category_url(HostCategoryUrl {
            id,
            host_category_id: hc,
            url: url.to_string(),
            private: false,
        });
    }
    c.insert_netblock_country(NetblockCountry {
        netblock: "192.0.2.0/24".parse().unwrap(),
        country: "DE".to_string(),
    });
    c.insert_netblock_country(NetblockCountry {
        netblock: "198.51.100.0/24".parse().unwrap(),
        country: "US".to_string(),
    });

    let netblocks = NetblockCountries::new(&c.netblock_countries());
    Mirrors {
        catalog: c,
        repomap: RepoMap::builtin(),
        locator: CountryLocator::new(netblocks, None),
        minimum: 2,
    }
}

pub async fn read_response_body(res: Response<Body>) -> Result<String, hyper::Error> {
    let bytes = body::to_bytes(res.into_body()).await?;
    Ok(String::from_utf8(bytes.to_vec()).expect("response was not valid utf-8"))
}

fn get(m: &Mirrors, uri: &str, remote: &str, log_file: Option<&File>) -> (StatusCode, String) {
    let mut request = Request::new(Body::empty());
    *request.uri_mut() = uri.parse().unwrap();
    request
        .headers_mut()
        .insert("x-forwarded-for", HeaderValue::from_static("203.0.113.1, 198.51.100.9"));
    let response = do_request(request, m, &IpAddr::from_str(remote).unwrap(), log_file);
    let status = response.status();
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    let body = Runtime::new()
        .unwrap()
        .block_on(read_response_body(response))
        .unwrap();
    (status, body)
}

#[test]
fn flag_test() {
    assert!(!flag(None));
    assert!(flag(Some("")));
    assert!(flag(Some("1")));
    assert!(flag(Some("True")));
    assert!(!flag(Some("0")));
    assert!(!flag(Some("false")));
}

#[test]
fn client_ip_test() {
    let remote = IpAddr::from_str("127.0.0.1").unwrap();
    let mut headers = HeaderMap::new();
    let mut params = HashMap::new();
    assert_eq!(client_ip(&params, &headers, &remote), Some(remote));

    headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 192.0.2.1"));
    assert_eq!(
        client_ip(&params, &headers, &remote),
        Some(IpAddr::from_str("192.0.2.1").unwrap())
    );

    params.insert("ip".to_string(), "2001:db8::1".to_string());
    assert_eq!(
        client_ip(&params, &headers, &remote),
        Some(IpAddr::from_str("2001:db8::1").unwrap())
    );

    params.insert("ip".to_string(), "10.11.12.331".to_string());
    assert_eq!(client_ip(&params, &headers, &remote), None);
}

#[test]
fn not_found_test() {
    let m = mirrors();
    for uri in ["/", "/metalink", "/mirrorlist/extra", "/publiclist/a/b/c/d", "/rsync_acl/x"] {
        let (status, body) = get(&m, uri, "127.0.0.1", None);
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, "We don't serve their kind here!");
    }

    let mut request = Request::new(Body::empty());
    *request.method_mut() = Method::POST;
    *request.uri_mut() = "/mirrorlist".parse().unwrap();
    let response = do_request(request, &m, &IpAddr::from_str("127.0.0.1").unwrap(), None);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn mirrorlist_test() {
    let m = mirrors();
    let (status, body) = get(&m, "/mirrorlist", "127.0.0.1", None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#no repositories match\n");

    let (status, body) = get(&m, "/mirrorlist?repo=core-updates-released-fc10&arch=ppc", "127.0.0.1", None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#no repositories match\n");

    let (_, body) = get(
        &m,
        "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64&ip=192.0.2.5",
        "127.0.0.1",
        None,
    );
    assert_eq!(
        body,
        "# repo = core-updates-released-fc10 country = DE arch = x86_64\n\
         http://de1.example.org/updates/10/x86_64/\n\
         http://de2.example.org/updates/10/x86_64/\n"
    );

    let global = "# repo = core-updates-released-fc10 country = global arch = x86_64\n\
                  http://de1.example.org/updates/10/x86_64/\n\
                  http://de2.example.org/updates/10/x86_64/\n\
                  http://us1.example.org/updates/10/x86_64/\n";
    // X-Forwarded-For ends in the US, which has a single mirror
    let (_, body) = get(
        &m,
        "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64",
        "127.0.0.1",
        None,
    );
    assert_eq!(body, global);
    let (_, body) = get(
        &m,
        "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64&ip=192.0.2.5&country=global",
        "127.0.0.1",
        None,
    );
    assert_eq!(body, global);
    let (_, body) = get(
        &m,
        "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64&country=de",
        "127.0.0.1",
        None,
    );
    assert!(body.starts_with("# repo = core-updates-released-fc10 country = DE arch = x86_64\n"));
}

#[test]
fn access_log_test() {
    let m = mirrors();
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("mirrorlist.log");
    let log_file = File::create(&log_path).unwrap();
    get(
        &m,
        "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64&ip=192.0.2.5",
        "127.0.0.1",
        Some(&log_file),
    );
    // requests without repo and arch are not logged
    get(&m, "/mirrorlist?repo=core-updates-released-fc10", "127.0.0.1", Some(&log_file));

    let mut written = String::new();
    File::open(&log_path)
        .unwrap()
        .read_to_string(&mut written)
        .unwrap();
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    assert_eq!(
        written,
        format!(
            "IP: 192.0.2.5; DATE: {}; COUNTRY: DE; REPO: core-updates-released-fc10; ARCH: x86_64\n",
            today
        )
    );
    drop(log_file);
    dir.close().unwrap();
}

#[test]
fn path_test() {
    let m = mirrors();
    let (status, body) = get(&m, "/pub/fedora/linux/updates/10/x86_64", "127.0.0.1", None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "http://de1.example.org/updates/10/x86_64/\n\
         http://de2.example.org/updates/10/x86_64/\n\
         http://us1.example.org/updates/10/x86_64/\n"
    );

    let (_, body) = get(&m, "/pub//fedora/linux/updates/10/x86_64/?country=US", "127.0.0.1", None);
    assert_eq!(body, "http://us1.example.org/updates/10/x86_64/\n");

    let (status, body) = get(&m, "/pub/fedora/linux/updates/11", "127.0.0.1", None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[test]
fn listings_test() {
    let m = mirrors();
    let (status, body) = get(&m, "/rsync_acl", "127.0.0.1", None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "192.0.2.200\n");

    let (status, body) = get(&m, "/publiclist/Fedora/10", "127.0.0.1", None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "# 3 public active mirrors for Fedora/10\n\
         DE\tde1.example.org\t100\t\n\
         DE\tde2.example.org\t100\t\n\
         US\tus1.example.org\t100\t\n"
    );
}

#[test]
fn embargo_follows_client_address_test() {
    let mut m = mirrors();
    m.catalog.insert_embargoed_country("US");
    let no_match = "#no repositories match\n";
    for query in ["", "&country=global", "&country=DE"] {
        let uri = format!(
            "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64&ip=198.51.100.7{}",
            query
        );
        let (status, body) = get(&m, &uri, "127.0.0.1", None);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, no_match, "{}", uri);
    }
    let (_, body) = get(
        &m,
        "/pub/fedora/linux/updates/10/x86_64?ip=198.51.100.7&country=de",
        "127.0.0.1",
        None,
    );
    assert_eq!(body, "");

    // the same request from Germany is answered
    let (_, body) = get(
        &m,
        "/mirrorlist?repo=core-updates-released-fc10&arch=x86_64&ip=192.0.2.5&country=global",
        "127.0.0.1",
        None,
    );
    assert!(body.starts_with("# repo = core-updates-released-fc10 country = global"));
}

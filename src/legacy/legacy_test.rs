use super::*;
use crate::catalog::fixture;
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

fn repomap() -> RepoMap {
    let mut map = RepoMap::new();
    map.insert("core-updates-released-", "Fedora", "Updates");
    map.insert("core-", "Fedora Core", "Fedora Core");
    map
}

#[test]
fn split_token_test() {
    assert_eq!(
        split_token("core-updates-released-fc10"),
        ("core-updates-released-", "fc10")
    );
    assert_eq!(split_token("core-6"), ("core-", "6"));
    assert_eq!(split_token("rawhide"), ("", "rawhide"));
    assert_eq!(split_token("core-"), ("core-", ""));
}

#[test]
fn resolve_fc_token_test() {
    let c = fixture::catalog();
    let r = resolve_repo_token(&c, &repomap(), "core-updates-released-fc10", "x86_64").unwrap();
    assert_eq!(r.prefix, "core-updates-released-fc10");
    assert_eq!(r.product.name, "Fedora");
    assert_eq!(r.category.name, "Updates");
    assert_eq!(r.version.name, "10");
    assert_eq!(r.version.product_id, r.product.id);
    assert_eq!(r.arch.name, "x86_64");
    assert_eq!(select_repository(&c, &r).unwrap().id, 1);
}

#[test]
fn resolve_plain_token_test() {
    let c = fixture::catalog();
    let r = resolve_repo_token(&c, &repomap(), "core-updates-released-9", "x86_64").unwrap();
    assert_eq!(r.prefix, "core-updates-released-9");
    assert_eq!(select_repository(&c, &r).unwrap().directory_id, 3);
}

#[test]
fn resolve_requires_version_test() {
    let c = fixture::catalog();
    // "fc11" names version 11, which the catalog does not have
    assert_eq!(
        resolve_repo_token(&c, &repomap(), "core-updates-released-fc11", "x86_64"),
        Err(MirrorError::NotFound("version 11 of Fedora".to_string()))
    );
}

#[test]
fn resolve_failures_test() {
    let c = fixture::catalog();
    let map = repomap();
    assert!(resolve_repo_token(&c, &map, "core-updates-released-fc10", "sparc").is_err());
    assert!(resolve_repo_token(&c, &map, "extras-10", "x86_64").is_err());
    assert!(resolve_repo_token(&c, &map, "rawhide", "x86_64").is_err());
    // prefix known, product missing from the catalog
    assert_eq!(
        resolve_repo_token(&c, &map, "core-6", "x86_64"),
        Err(MirrorError::NotFound("product Fedora Core".to_string()))
    );
}

#[test]
fn select_repository_missing_arch_test() {
    let c = fixture::catalog();
    // ppc exists as an arch but carries no repository
    let r = resolve_repo_token(&c, &repomap(), "core-updates-released-fc10", "ppc").unwrap();
    assert!(matches!(
        select_repository(&c, &r),
        Err(MirrorError::NotFound(_))
    ));
}

#[test]
fn select_repository_ambiguous_test() {
    let mut c = fixture::catalog();
    let mut twin = c.all_repositories()[0].clone();
    twin.id = 99;
    twin.directory_id = 4;
    c.insert_repository(twin);
    let r = resolve_repo_token(&c, &repomap(), "core-updates-released-fc10", "x86_64").unwrap();
    assert!(matches!(
        select_repository(&c, &r),
        Err(MirrorError::AmbiguousMatch(_))
    ));
}

#[test]
fn builtin_repomap_test() {
    let map = RepoMap::builtin();
    assert_eq!(map.get("core-updates-released-"), Some(("Fedora", "Updates")));
    assert_eq!(map.get("core-"), Some(("Fedora Core", "Fedora Core")));
    assert_eq!(map.get("nope-"), None);
}

#[test]
fn repomap_from_csv_test() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("repomap.csv");
    let mut file = File::create(&file_path).unwrap();
    writeln!(file, "# prefix,product,category").unwrap();
    writeln!(file, "epel-, EPEL, EPEL").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "core-updates-released-,Fedora,Updates").unwrap();
    file.flush().unwrap();
    let map = RepoMap::from_csv(&file_path).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("epel-"), Some(("EPEL", "EPEL")));

    let bad_path = dir.path().join("bad.csv");
    let mut bad = File::create(&bad_path).unwrap();
    writeln!(bad, "core-,Fedora Core,Fedora Core").unwrap();
    writeln!(bad, "broken line").unwrap();
    bad.flush().unwrap();
    match RepoMap::from_csv(&bad_path) {
        Err(ConfigError::RepoMapLine { line, .. }) => assert_eq!(line, 2),
        other => panic!("unexpected {:?}", other),
    }

    assert!(matches!(
        RepoMap::from_csv(&dir.path().join("missing.csv")),
        Err(ConfigError::Read { .. })
    ));
    drop(file);
    drop(bad);
    dir.close().unwrap();
}

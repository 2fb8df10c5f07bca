use super::*;
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}

#[test]
fn server_defaults_test() {
    let config = ServerConfig::from_args(&[]).unwrap().unwrap();
    assert_eq!(config, ServerConfig::default());
    assert_eq!(config.addr().to_string(), "127.0.0.1:3000");
    assert_eq!(config.minimum, 2);
    assert_eq!(config.cache, PathBuf::from(DEFAULT_CACHE));
    assert_eq!(config.log, None);
    assert_eq!(config.load_repomap().unwrap(), RepoMap::builtin());
}

#[test]
fn server_overrides_test() {
    let config = ServerConfig::from_args(&args(&[
        "--listen",
        "::1",
        "--port",
        "8080",
        "-m",
        "1",
        "-m",
        "5",
        "--cache",
        "/tmp/cache.proto",
        "--geoip",
        "/tmp/country.mmdb",
        "-l",
        "/tmp/access.log",
    ]))
    .unwrap()
    .unwrap();
    assert_eq!(config.addr().to_string(), "[::1]:8080");
    assert_eq!(config.minimum, 5);
    assert_eq!(config.cache, PathBuf::from("/tmp/cache.proto"));
    assert_eq!(config.geoip, PathBuf::from("/tmp/country.mmdb"));
    assert_eq!(config.log, Some(PathBuf::from("/tmp/access.log")));
}

#[test]
fn server_invalid_values_test() {
    match ServerConfig::from_args(&args(&["--port", "http"])) {
        Err(ConfigError::InvalidValue { option, value }) => {
            assert_eq!(option, "port");
            assert_eq!(value, "http");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        ServerConfig::from_args(&args(&["--listen", "localhost"])),
        Err(ConfigError::InvalidValue {
            option: "listen",
            ..
        })
    ));
    assert!(matches!(
        ServerConfig::from_args(&args(&["--minimum=-1"])),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        ServerConfig::from_args(&args(&["--bogus"])),
        Err(ConfigError::Options(_))
    ));
    assert_eq!(ServerConfig::from_args(&args(&["-h"])).unwrap(), None);
}

#[test]
fn server_repomap_test() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("repomap.csv");
    let mut file = File::create(&file_path).unwrap();
    writeln!(file, "epel-,EPEL,EPEL").unwrap();
    file.flush().unwrap();
    let config = ServerConfig::from_args(&args(&["--repomap", file_path.to_str().unwrap()]))
        .unwrap()
        .unwrap();
    let map = config.load_repomap().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("core-"), None);
    drop(file);
    dir.close().unwrap();
}

#[test]
fn generator_test() {
    let config = GeneratorConfig::from_args(&[]).unwrap().unwrap();
    assert_eq!(config, GeneratorConfig::default());
    assert!(!config.debug);

    let config = GeneratorConfig::from_args(&args(&[
        "-o",
        "/tmp/out.proto",
        "--config",
        "/tmp/db.cfg",
        "-d",
        "-d",
    ]))
    .unwrap()
    .unwrap();
    assert_eq!(config.outfile, PathBuf::from("/tmp/out.proto"));
    assert_eq!(config.config, PathBuf::from("/tmp/db.cfg"));
    assert!(config.debug);
}

//! Command line configuration of both binaries.
//!
//! Every option may be given more than once; the last occurrence wins.

use crate::error::ConfigError;
use crate::geo::DEFAULT_MINIMUM;
use crate::legacy::RepoMap;
use getopts::{Matches, Options};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_LISTEN: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CACHE: &str = "/var/lib/mirrormanager/mirrorlist_cache.proto";
pub const DEFAULT_GEOIP: &str = "/usr/share/GeoIP/GeoLite2-Country.mmdb";
pub const DEFAULT_DB_CONFIG: &str = "/etc/mirrormanager/generate-mirrorlist-cache.cfg";

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: IpAddr,
    pub port: u16,
    /// Mirrors a country needs before it gets its own list.
    pub minimum: usize,
    pub cache: PathBuf,
    pub geoip: PathBuf,
    /// Access log; none is written when unset.
    pub log: Option<PathBuf>,
    /// Prefix table CSV replacing the built-in one.
    pub repomap: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: IpAddr::from([127, 0, 0, 1]),
            port: DEFAULT_PORT,
            minimum: DEFAULT_MINIMUM,
            cache: PathBuf::from(DEFAULT_CACHE),
            geoip: PathBuf::from(DEFAULT_GEOIP),
            log: None,
            repomap: None,
        }
    }
}

fn last(matches: &Matches, name: &str) -> Option<String> {
    matches.opt_strs(name).pop()
}

fn parsed<T: FromStr>(matches: &Matches, name: &'static str) -> Result<Option<T>> {
    match last(matches, name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                option: name,
                value,
            }),
        None => Ok(None),
    }
}

impl ServerConfig {
    pub fn options() -> Options {
        let mut opts = Options::new();
        opts.optmulti(
            "",
            "listen",
            &format!("IP address to listen to ({})", DEFAULT_LISTEN),
            "ADDRESS",
        );
        opts.optmulti(
            "",
            "port",
            &format!("TCP port to listen to ({})", DEFAULT_PORT),
            "PORT",
        );
        opts.optmulti(
            "m",
            "minimum",
            &format!(
                "minimum number of mirrors for a country list ({})",
                DEFAULT_MINIMUM
            ),
            "NUMBER",
        );
        opts.optmulti(
            "c",
            "cache",
            &format!("protobuf cache file location ({})", DEFAULT_CACHE),
            "CACHE",
        );
        opts.optmulti(
            "",
            "geoip",
            &format!("GeoIP country mmdb ({})", DEFAULT_GEOIP),
            "MMDB",
        );
        opts.optmulti("l", "log", "access log file (none)", "LOG");
        opts.optmulti(
            "r",
            "repomap",
            "repository prefix table, prefix,product,category per line (built-in)",
            "CSV",
        );
        opts.optflag("h", "help", "print this help");
        opts
    }

    /// `Ok(None)` when help was requested.
    pub fn from_args(args: &[String]) -> Result<Option<Self>> {
        let matches = Self::options().parse(args)?;
        if matches.opt_present("help") {
            return Ok(None);
        }
        let mut config = ServerConfig::default();
        if let Some(listen) = parsed(&matches, "listen")? {
            config.listen = listen;
        }
        if let Some(port) = parsed(&matches, "port")? {
            config.port = port;
        }
        if let Some(minimum) = parsed(&matches, "minimum")? {
            config.minimum = minimum;
        }
        if let Some(cache) = last(&matches, "cache") {
            config.cache = PathBuf::from(cache);
        }
        if let Some(geoip) = last(&matches, "geoip") {
            config.geoip = PathBuf::from(geoip);
        }
        config.log = last(&matches, "log").map(PathBuf::from);
        config.repomap = last(&matches, "repomap").map(PathBuf::from);
        Ok(Some(config))
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    pub fn load_repomap(&self) -> Result<RepoMap> {
        match &self.repomap {
            Some(path) => RepoMap::from_csv(path),
            None => Ok(RepoMap::builtin()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// dotenv style file providing `DB_URL`.
    pub config: PathBuf,
    pub outfile: PathBuf,
    pub debug: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            config: PathBuf::from(DEFAULT_DB_CONFIG),
            outfile: PathBuf::from(DEFAULT_CACHE),
            debug: false,
        }
    }
}

impl GeneratorConfig {
    pub fn options() -> Options {
        let mut opts = Options::new();
        opts.optmulti(
            "o",
            "outfile",
            &format!("protobuf cache file location ({})", DEFAULT_CACHE),
            "CACHE",
        );
        opts.optmulti(
            "c",
            "config",
            &format!("configuration file ({})", DEFAULT_DB_CONFIG),
            "CONFIG",
        );
        opts.optflagmulti("d", "debug", "enable debug");
        opts.optflag("h", "help", "print this help");
        opts
    }

    pub fn from_args(args: &[String]) -> Result<Option<Self>> {
        let matches = Self::options().parse(args)?;
        if matches.opt_present("help") {
            return Ok(None);
        }
        let mut config = GeneratorConfig::default();
        if let Some(outfile) = last(&matches, "outfile") {
            config.outfile = PathBuf::from(outfile);
        }
        if let Some(c) = last(&matches, "config") {
            config.config = PathBuf::from(c);
        }
        config.debug = matches.opt_present("debug");
        Ok(Some(config))
    }
}

pub fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

#[cfg(test)]
mod config_test;

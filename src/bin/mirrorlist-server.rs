#![deny(warnings)]
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info, warn};
use mirrormanager::catalog::{Catalog, MemoryCatalog};
use mirrormanager::config::{print_usage, ServerConfig};
use mirrormanager::dispatch::Dispatcher;
use mirrormanager::format::render;
use mirrormanager::geo::{
    normalize_country_param, CountryLocator, CountryLookup, GeoIp, NetblockCountries,
};
use mirrormanager::legacy::RepoMap;
use mirrormanager::snapshot;
use mirrormanager::visibility::Context;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::convert::Infallible;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::process;
use std::str::FromStr;
use std::sync::Arc;

const NOT_FOUND: &str = "We don't serve their kind here!";

struct Mirrors {
    catalog: MemoryCatalog,
    repomap: RepoMap,
    locator: CountryLocator,
    minimum: usize,
}

impl Mirrors {
    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.catalog, &self.repomap, self.minimum)
    }
}

fn query_params(req: &Request<Body>) -> HashMap<String, String> {
    match req.uri().query() {
        Some(q) => url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect(),
        None => HashMap::new(),
    }
}

fn get_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str)
}

fn flag(value: Option<&str>) -> bool {
    match value {
        Some(v) => !matches!(
            v.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => false,
    }
}

// The `ip` parameter, then the last `X-Forwarded-For` entry, then the
// peer address.
fn client_ip(params: &HashMap<String, String>, headers: &HeaderMap, remote: &IpAddr) -> Option<IpAddr> {
    let candidate = match get_param(params, "ip").filter(|ip| !ip.is_empty()) {
        Some(ip) => ip.to_string(),
        None => match headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
            Some(forwarded) => forwarded.rsplit(',').next().unwrap_or_default().trim().to_string(),
            None => return Some(*remote),
        },
    };
    match IpAddr::from_str(&candidate) {
        Ok(ip) => Some(ip),
        Err(_) => {
            warn!("Cannot parse client IP address {:?}", candidate);
            None
        }
    }
}

fn http_response(message: String, code: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    *response.status_mut() = code;
    response
}

fn not_found() -> Response<Body> {
    http_response(NOT_FOUND.to_string(), StatusCode::NOT_FOUND)
}

fn write_access_log(
    log_file: Option<&File>,
    client_ip: Option<IpAddr>,
    country: Option<&str>,
    repo: &str,
    arch: &str,
) {
    let mut log_file = match log_file {
        Some(f) => f,
        None => return,
    };
    let now = chrono::Utc::now();
    let log_msg = format!(
        "IP: {}; DATE: {}; COUNTRY: {}; REPO: {}; ARCH: {}\n",
        client_ip.map_or_else(|| "N/A".to_string(), |ip| ip.to_string()),
        now.format("%Y-%m-%d"),
        country.unwrap_or("N/A"),
        repo,
        arch
    );
    if let Err(e) = log_file.write_all(log_msg.as_bytes()) {
        warn!("Writing access log failed: {}", e);
    }
}

fn do_request(
    req: Request<Body>,
    mirrors: &Mirrors,
    remote: &IpAddr,
    log_file: Option<&File>,
) -> Response<Body> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return not_found();
    }

    let segments: Vec<&str> = req
        .uri()
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let params = query_params(&req);
    let d = mirrors.dispatcher();

    let lines = match segments.split_first() {
        Some((&"pub", rest)) => {
            let ip = client_ip(&params, req.headers(), remote);
            // `country` narrows the hosts, visibility follows the address
            let country = get_param(&params, "country").and_then(normalize_country_param);
            let located = ip.and_then(|ip| mirrors.locator.locate(&ip));
            let context = if flag(get_param(&params, "include_private")) {
                Context::Peer { client_ip: ip }
            } else {
                Context::Public
            };
            d.path_lookup(rest, country.as_deref(), located.as_deref(), &context)
        }
        Some((&"mirrorlist", [])) => {
            let ip = client_ip(&params, req.headers(), remote);
            let located = ip.and_then(|ip| mirrors.locator.locate(&ip));
            let preferred = match get_param(&params, "country") {
                Some(c) => normalize_country_param(c),
                None => located.clone(),
            };
            let repo = get_param(&params, "repo");
            let arch = get_param(&params, "arch");
            if let (Some(r), Some(a)) = (repo, arch) {
                write_access_log(log_file, ip, located.as_deref(), r, a);
            }
            d.mirrorlist(repo, arch, located.as_deref(), preferred.as_deref())
        }
        Some((&"rsync_acl", [])) => d.rsync_acl(),
        Some((&"publiclist", rest)) if rest.len() <= 3 => d.publiclist(
            rest.first().copied(),
            rest.get(1).copied(),
            rest.get(2).copied(),
        ),
        _ => return not_found(),
    };

    http_response(render(&lines), StatusCode::OK)
}

fn listener(addr: &SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;
    Ok(socket.into())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let config = match ServerConfig::from_args(&args[1..]) {
        Ok(Some(c)) => c,
        Ok(None) => {
            print_usage(&program, &ServerConfig::options());
            return;
        }
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program, &ServerConfig::options());
            process::exit(1);
        }
    };

    let log_file = match &config.log {
        Some(path) => match OpenOptions::new().append(true).create(true).open(path) {
            Ok(lf) => Some(lf),
            Err(e) => {
                error!("Opening log file {} failed: {}. Exiting!", path.display(), e);
                process::exit(1);
            }
        },
        None => None,
    };
    let log_file = Arc::new(log_file);

    info!("Loading protobuf input");
    let catalog = match snapshot::load(&config.cache) {
        Ok(c) => c,
        Err(e) => {
            error!("Loading {} failed: {}", config.cache.display(), e);
            process::exit(1);
        }
    };
    match chrono::DateTime::from_timestamp(catalog.time as i64, 0) {
        Some(t) => info!("Database creation time {} ({})", t, catalog.time),
        None => warn!("Database creation time {} out of range", catalog.time),
    }

    let repomap = match config.load_repomap() {
        Ok(r) => r,
        Err(e) => {
            error!("Loading repository prefix table failed: {}", e);
            process::exit(1);
        }
    };
    info!("{} repository prefixes known", repomap.len());

    info!("Loading geoip database");
    let geoip: Option<Box<dyn CountryLookup>> = match GeoIp::open(&config.geoip) {
        Ok(g) => Some(Box::new(g)),
        Err(e) => {
            warn!("Running without GeoIP: {}", e);
            None
        }
    };
    let netblocks = NetblockCountries::new(&catalog.netblock_countries());
    info!("{} netblock country overrides", netblocks.len());

    let mirrors = Arc::new(Mirrors {
        catalog,
        repomap,
        locator: CountryLocator::new(netblocks, geoip),
        minimum: config.minimum,
    });

    let addr = config.addr();
    let std_listener = match listener(&addr) {
        Ok(l) => l,
        Err(e) => {
            error!("Unable to listen on {}: {}", addr, e);
            process::exit(1);
        }
    };

    let new_service = make_service_fn(move |socket: &AddrStream| {
        let remote_addr = socket.remote_addr();
        let m = mirrors.clone();
        let lf = log_file.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let response = do_request(req, &m, &remote_addr.ip(), (*lf).as_ref());
                async move { Ok::<_, Infallible>(response) }
            }))
        }
    });

    let server = match Server::from_tcp(std_listener) {
        Ok(builder) => builder.serve(new_service),
        Err(e) => {
            error!("Unable to serve on {}: {}", addr, e);
            process::exit(1);
        }
    };

    println!("Listening on http://{}", addr);

    if let Err(err) = server.await {
        eprintln!("server error: {}", err);
    }
}

#[cfg(test)]
mod mirrorlist_server_test;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

pub fn default_watch_dir() -> PathBuf {
    PathBuf::from("./bin")
}

pub fn default_artifact_marker() -> String {
    ".wasm.o".to_string()
}

pub fn default_object_suffix() -> String {
    ".o".to_string()
}

pub fn default_serve_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

pub fn default_http_port() -> u16 {
    8000
}

pub fn default_ws_port() -> u16 {
    8001
}

pub fn default_optimizer_path() -> PathBuf {
    PathBuf::from("wasm-opt")
}

pub fn default_opt_level() -> String {
    "-g".to_string() // debug info kept; use "-O" for release loops
}

pub fn default_asyncify() -> bool {
    true
}

pub fn default_asyncify_imports() -> Vec<String> {
    vec!["env.frame".to_string(), "audio._load_sound".to_string()]
}

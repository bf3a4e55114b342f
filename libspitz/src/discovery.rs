/*
 * Created on Tue Feb 13 2024
 *
 * This file is a part of pits
 * pits is a small distributed bag-of-tasks execution runtime: a Job Manager
 * streams tasks to a fleet of Task Managers over a binary wire protocol, and
 * a co-located Committer guarantees each task's result is committed exactly
 * once.
 *
 * Copyright (c) 2024, the pits authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the MIT License as published in the LICENSE file
 * at the root of this project.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 *
*/

//! Parses the line-oriented `nodes.txt` discovery file (spec.md §4.5).
//!
//! Grammar:
//! ```text
//! proxy <name> <protocol>:<address>:<port>
//! node <host>:<port>
//! node <host>:<port> through <proxyname>
//! ```
//! A malformed line is logged and skipped; it never aborts the rest of the
//! file. `load_tm_list` itself is stateless — reload stickiness (spec.md §3,
//! property 5) is the caller's responsibility.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDef {
    pub protocol: String,
    pub address: String,
    pub port: u16,
}

/// Load and parse the fleet list from `path`. Returns an empty map (not an
/// error) if the file is missing or unreadable, matching the original's
/// "an empty or unreadable file yields an empty fleet" rule.
pub fn load_tm_list(path: &Path) -> HashMap<String, SocketAddr> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("could not read discovery file {}: {e}", path.display());
            return HashMap::new();
        }
    };

    let mut proxies: HashMap<String, ProxyDef> = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with("proxy") {
            match parse_proxy(line) {
                Ok((name, def)) => {
                    proxies.insert(name, def);
                }
                Err(e) => log::warn!("skipping malformed proxy line {line:?}: {e}"),
            }
        }
    }

    let mut tms = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with("node") {
            match parse_node(line, &proxies) {
                Ok(Some((name, addr))) => {
                    tms.insert(name, addr);
                }
                Ok(None) => {
                    // Behind a proxy: recognized but unsupported, intentionally skipped.
                }
                Err(e) => log::warn!("skipping malformed node line {line:?}: {e}"),
            }
        }
    }

    log::debug!("loaded {} task managers from {}", tms.len(), path.display());
    tms
}

fn parse_proxy(line: &str) -> Result<(String, ProxyDef), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err("expected `proxy <name> <protocol>:<address>:<port>`".to_owned());
    }
    let name = parts[1].to_owned();
    let gate: Vec<&str> = parts[2].splitn(3, ':').collect();
    if gate.len() != 3 {
        return Err("expected `<protocol>:<address>:<port>`".to_owned());
    }
    let port: u16 = gate[2]
        .parse()
        .map_err(|_| format!("invalid port {:?}", gate[2]))?;
    Ok((
        name,
        ProxyDef {
            protocol: gate[0].to_owned(),
            address: gate[1].to_owned(),
            port,
        },
    ))
}

fn parse_node(
    line: &str,
    proxies: &HashMap<String, ProxyDef>,
) -> Result<Option<(String, SocketAddr)>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err("expected `node <host>:<port>`".to_owned());
    }
    let name = parts[1].to_owned();

    match parts.len() {
        2 => {
            let addr: SocketAddr = name
                .parse()
                .map_err(|_| format!("{name:?} is not a valid host:port pair"))?;
            Ok(Some((name, addr)))
        }
        4 if parts[2] == "through" => {
            let proxy_name = parts[3];
            if !proxies.contains_key(proxy_name) {
                return Err(format!("unknown proxy {proxy_name:?}"));
            }
            log::info!("node {name} is behind a proxy and will be ignored");
            Ok(None)
        }
        _ => Err("unrecognized `node` line format".to_owned()),
    }
}

/// Apply the stickiness rule: an empty reload never replaces a non-empty list.
pub fn reload_sticky(
    current: HashMap<String, SocketAddr>,
    reloaded: HashMap<String, SocketAddr>,
) -> HashMap<String, SocketAddr> {
    if reloaded.is_empty() {
        if !current.is_empty() {
            log::warn!("new discovery list is empty, keeping the previous fleet");
        }
        current
    } else {
        reloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let f = tempfile::NamedTempFile::new().expect("tmp nodes file");
        f.as_file().write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_simple_nodes() {
        let f = write_tmp("node 127.0.0.1:9001\nnode 127.0.0.1:9002\n");
        let tms = load_tm_list(f.path());
        assert_eq!(tms.len(), 2);
        assert!(tms.contains_key("127.0.0.1:9001"));
    }

    #[test]
    fn skips_malformed_lines_but_keeps_the_rest() {
        let f = write_tmp("node host_no_port\nnode 127.0.0.1:9003\n");
        let tms = load_tm_list(f.path());
        assert_eq!(tms.len(), 1);
        assert!(tms.contains_key("127.0.0.1:9003"));
    }

    #[test]
    fn node_behind_proxy_is_skipped() {
        let f = write_tmp("proxy p1 tcp:10.0.0.1:9100\nnode 10.0.0.2:9001 through p1\n");
        let tms = load_tm_list(f.path());
        assert!(tms.is_empty());
    }

    #[test]
    fn missing_file_yields_empty_map() {
        let tms = load_tm_list(std::path::Path::new("/nonexistent/nodes.txt"));
        assert!(tms.is_empty());
    }

    #[test]
    fn sticky_reload_keeps_previous_on_empty() {
        let mut current = HashMap::new();
        current.insert("a:1".to_owned(), "127.0.0.1:1".parse().unwrap());
        let merged = reload_sticky(current.clone(), HashMap::new());
        assert_eq!(merged, current);
    }

    #[test]
    fn reload_with_entries_replaces_wholesale() {
        let mut current = HashMap::new();
        current.insert("a:1".to_owned(), "127.0.0.1:1".parse().unwrap());
        let mut fresh = HashMap::new();
        fresh.insert("b:2".to_owned(), "127.0.0.1:2".parse().unwrap());
        let merged = reload_sticky(current, fresh.clone());
        assert_eq!(merged, fresh);
    }
}

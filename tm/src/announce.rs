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

//! Broadcasts this TM's reachable address by appending it to the shared
//! discovery file (spec.md §4.2, `announce = cat_nodes`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub fn announce_cat_nodes(nodes_file: &Path, connectable_addr: &str) {
    log::debug!("appending node {connectable_addr} to {}", nodes_file.display());
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(nodes_file)
        .and_then(|mut f| writeln!(f, "node {connectable_addr}"));
    if let Err(e) = result {
        log::warn!("failed to announce to {}: {e}", nodes_file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_a_node_line() {
        let path = std::env::temp_dir().join(format!("spitz-announce-test-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);
        announce_cat_nodes(&path, "127.0.0.1:9001");
        announce_cat_nodes(&path, "127.0.0.1:9002");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "node 127.0.0.1:9001\nnode 127.0.0.1:9002\n");
        let _ = std::fs::remove_file(&path);
    }
}

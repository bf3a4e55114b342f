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

//! Reloads the TM fleet from the discovery file before every dispatch pass,
//! applying the reload-stickiness rule (spec §4.5). The JM loop and the CO
//! loop each keep their own copy — the fleet is read-mostly shared data, not
//! state that needs to be kept consistent across the two loops.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use libspitz::discovery;

pub fn reload(current: HashMap<String, SocketAddr>, nodes_file: &Path) -> HashMap<String, SocketAddr> {
    let reloaded = discovery::load_tm_list(nodes_file);
    discovery::reload_sticky(current, reloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn malformed_line_is_dropped_but_the_rest_of_the_file_loads() {
        let tmp = tempfile::NamedTempFile::new().expect("tmp nodes file");
        writeln!(tmp.as_file(), "node host_no_port").unwrap();
        writeln!(tmp.as_file(), "node 127.0.0.1:9003").unwrap();

        let fleet = reload(HashMap::new(), tmp.path());
        assert_eq!(fleet.len(), 1);
        assert!(fleet.contains_key("127.0.0.1:9003"));
    }

    #[test]
    fn a_reload_that_fails_to_parse_anything_keeps_the_previous_fleet() {
        let mut current = HashMap::new();
        current.insert("a:1".to_owned(), "127.0.0.1:1".parse().unwrap());

        let tmp = tempfile::NamedTempFile::new().expect("tmp nodes file");
        writeln!(tmp.as_file(), "node host_no_port").unwrap();

        let fleet = reload(current.clone(), tmp.path());
        assert_eq!(fleet, current);
    }
}

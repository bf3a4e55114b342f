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

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use libspitz::args::ArgMap;
use libspitz::config;

pub struct TmConfig {
    pub bind_addr: SocketAddr,
    pub max_workers: usize,
    pub overfill: usize,
    pub announce: Announce,
    pub nodes_file: PathBuf,
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
    pub log_file: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Announce {
    None,
    CatNodes,
}

impl TmConfig {
    pub fn from_args(args: &ArgMap) -> Self {
        let addr: IpAddr = args
            .str("tmaddr")
            .unwrap_or(config::DEFAULT_TM_ADDR)
            .parse()
            .unwrap_or_else(|_| config::DEFAULT_TM_ADDR.parse().unwrap());
        let port = args.i64("tmport", config::DEFAULT_TM_PORT as i64) as u16;

        let nw = args.i64("nw", -1);
        let max_workers = if nw <= 0 {
            num_cpus::get()
        } else {
            nw as usize
        };

        let overfill = args.i64("overfill", 0).max(0) as usize;

        let announce = match args.str("announce").unwrap_or(config::ANNOUNCE_NONE) {
            v if v == config::ANNOUNCE_CAT_NODES => Announce::CatNodes,
            _ => Announce::None,
        };

        Self {
            bind_addr: SocketAddr::new(addr, port),
            max_workers,
            overfill,
            announce,
            nodes_file: PathBuf::from(config::DEFAULT_NODES_FILE),
            recv_timeout: config::secs(args.i64("rtimeout", -1), config::DEFAULT_RECV_TIMEOUT),
            send_timeout: config::secs(args.i64("stimeout", -1), config::DEFAULT_SEND_TIMEOUT),
            log_file: args.str("log").map(String::from),
        }
    }
}

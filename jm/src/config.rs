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

use std::path::PathBuf;
use std::time::Duration;

use libspitz::args::ArgMap;
use libspitz::config;

pub struct JmConfig {
    pub killtms: bool,
    pub connect_timeout: Duration,
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
    pub send_backoff: Duration,
    pub recv_backoff: Duration,
    pub nodes_file: PathBuf,
    pub log_file: Option<String>,
}

impl JmConfig {
    pub fn from_args(args: &ArgMap) -> Self {
        Self {
            killtms: args.bool("killtms", true),
            connect_timeout: config::secs(args.i64("ctimeout", -1), config::DEFAULT_CONN_TIMEOUT),
            recv_timeout: config::secs(args.i64("rtimeout", -1), config::DEFAULT_RECV_TIMEOUT),
            send_timeout: config::secs(args.i64("stimeout", -1), config::DEFAULT_SEND_TIMEOUT),
            send_backoff: config::secs(args.i64("sbackoff", -1), config::DEFAULT_SEND_BACKOFF),
            recv_backoff: config::secs(args.i64("rbackoff", -1), config::DEFAULT_RECV_BACKOFF),
            nodes_file: PathBuf::from(config::DEFAULT_NODES_FILE),
            log_file: args.str("log").map(String::from),
        }
    }
}

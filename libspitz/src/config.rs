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

//! Default configuration values, mirroring `original_source`'s `config` module.

use std::time::Duration;

pub const DEFAULT_CONN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SEND_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_RECV_BACKOFF: Duration = Duration::from_millis(500);

pub const DEFAULT_TM_PORT: u16 = 9753;
pub const DEFAULT_TM_ADDR: &str = "0.0.0.0";
pub const DEFAULT_NODES_FILE: &str = "nodes.txt";

pub const ANNOUNCE_NONE: &str = "none";
pub const ANNOUNCE_CAT_NODES: &str = "cat_nodes";

pub fn secs(v: i64, default: Duration) -> Duration {
    if v < 0 {
        default
    } else {
        Duration::from_secs(v as u64)
    }
}

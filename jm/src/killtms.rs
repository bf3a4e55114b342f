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

//! Sends `msg_terminate` to every TM in the fleet once a job finishes
//! (spec §4.4, "TM kill"). Best-effort: a TM that doesn't answer is logged
//! and skipped, never fatal to the run.

use std::path::Path;
use std::time::Duration;

use libspitz::discovery;
use libspitz::endpoint::Endpoint;
use libspitz::messaging::MSG_TERMINATE;

pub async fn kill_all(nodes_file: &Path, connect_timeout: Duration) {
    let tmlist = discovery::load_tm_list(nodes_file);
    for (name, addr) in tmlist {
        match Endpoint::open(addr, connect_timeout).await {
            Ok(mut ep) => {
                if let Err(e) = ep.write_i64(MSG_TERMINATE).await {
                    log::warn!("killtms: failed to signal {name}: {e}");
                } else {
                    log::info!("killtms: terminated {name}");
                }
            }
            Err(e) => log::warn!("killtms: could not reach {name}: {e}"),
        }
    }
}

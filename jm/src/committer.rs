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

//! The Committer loop: drains results from the TM fleet and commits each one
//! exactly once (spec §4.4).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use libspitz::endpoint::Endpoint;
use libspitz::messaging::{MSG_READ_EMPTY, MSG_READ_RESULT};
use libspitz::module::CommitterModule;

use crate::fleet;
use crate::state::SharedState;

pub struct CoLoopConfig {
    pub connect_timeout: Duration,
    pub recv_timeout: Duration,
    pub recv_backoff: Duration,
    pub nodes_file: std::path::PathBuf,
}

/// Runs until the job is done, then hands the module handle back to the
/// caller so it can be finalized.
pub async fn run(
    state: Arc<SharedState>,
    mut module: Box<dyn CommitterModule>,
    cfg: CoLoopConfig,
) -> Box<dyn CommitterModule> {
    let mut tmlist: std::collections::HashMap<String, SocketAddr> = std::collections::HashMap::new();

    loop {
        tmlist = fleet::reload(tmlist, &cfg.nodes_file);

        for (name, &addr) in &tmlist {
            let mut ep = match Endpoint::open(addr, cfg.connect_timeout).await {
                Ok(ep) => ep,
                Err(e) => {
                    log::warn!("pull: could not reach {name}: {e}");
                    continue;
                }
            };
            if let Err(e) = ep.write_i64(MSG_READ_RESULT).await {
                log::warn!("pull: write to {name} failed: {e}");
                continue;
            }
            let tosend = match ep.read_i64(cfg.recv_timeout).await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("pull: read `tosend` from {name} failed: {e}");
                    continue;
                }
            };
            if tosend <= 0 {
                continue;
            }

            if let Err(e) = drain_one_tm(&mut ep, tosend, &state, module.as_mut(), &cfg).await {
                log::warn!("pull: connection to {name} ended early: {e}");
            }

            if state.is_done() {
                return module;
            }
        }

        if state.is_done() {
            return module;
        }

        state.prune_completed_from_tasklist();
        tokio::time::sleep(cfg.recv_backoff).await;
    }
}

async fn drain_one_tm(
    ep: &mut Endpoint,
    tosend: i64,
    state: &SharedState,
    module: &mut dyn CommitterModule,
    cfg: &CoLoopConfig,
) -> libspitz::SpitzResult<()> {
    for _ in 0..tosend {
        let taskid = ep.read_i64(cfg.recv_timeout).await?;
        if taskid == MSG_READ_EMPTY {
            break;
        }
        let worker_status = ep.read_i64(cfg.recv_timeout).await?;
        let size = ep.read_i64(cfg.recv_timeout).await?;
        let payload = ep.read_bytes(size, cfg.recv_timeout).await?;

        if state.is_completed(taskid) {
            log::debug!("duplicate delivery of task {taskid}, dropping");
            state.drop_from_tasklist(taskid);
            continue;
        }
        if !state.drop_from_tasklist(taskid) {
            log::warn!("task {taskid} was not in the working list (unknown task)");
        }

        let commit_status = module.commit_pit(&payload);
        state.record_completed(taskid, (worker_status, commit_status));
    }
    Ok(())
}

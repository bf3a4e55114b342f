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

//! The TM side of the wire protocol (spec.md §6): one message type read per
//! connection, one reply written, connection closed. Modeled on the
//! teacher's per-connection handler, but the protocol here is
//! request/response rather than a persistent session.

use std::time::Duration;

use libspitz::endpoint::Endpoint;
use libspitz::messaging::{MSG_READ_RESULT, MSG_SEND_TASK, MSG_TERMINATE};

use crate::pool::TaskPool;

pub struct ConnectionConfig {
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
}

/// Handle exactly one request on `endpoint`. Never propagates transient peer
/// errors to the caller — they're logged and the connection is simply
/// abandoned (spec.md §7).
pub async fn handle_connection(mut endpoint: Endpoint, pool: &TaskPool, cfg: &ConnectionConfig) {
    let peer = endpoint.addr;
    let result = dispatch(&mut endpoint, pool, cfg).await;
    if let Err(e) = result {
        if e.is_transient_peer_error() {
            log::warn!("connection to {peer} ended: {e}");
        } else {
            log::error!("protocol violation from {peer}: {e}");
        }
    }
}

async fn dispatch(
    endpoint: &mut Endpoint,
    pool: &TaskPool,
    cfg: &ConnectionConfig,
) -> libspitz::SpitzResult<()> {
    let mtype = endpoint.read_i64(cfg.recv_timeout).await?;
    match mtype {
        MSG_TERMINATE => {
            log::info!("received termination signal from {}", endpoint.addr);
            std::process::exit(0);
        }
        MSG_SEND_TASK => receive_tasks(endpoint, pool, cfg).await,
        MSG_READ_RESULT => send_results(endpoint, pool, cfg).await,
        other => {
            log::warn!("unknown message type {other} from {}, ignoring", endpoint.addr);
            Ok(())
        }
    }
}

async fn receive_tasks(
    endpoint: &mut Endpoint,
    pool: &TaskPool,
    cfg: &ConnectionConfig,
) -> libspitz::SpitzResult<()> {
    let free = pool.free() as i64;
    endpoint.write_i64(free).await?;
    for _ in 0..free {
        let taskid = endpoint.read_i64(cfg.recv_timeout).await?;
        let size = endpoint.read_i64(cfg.recv_timeout).await?;
        let payload = endpoint.read_bytes(size, cfg.recv_timeout).await?;
        log::debug!("received task {taskid} from {}", endpoint.addr);
        if !pool.put(taskid, payload) {
            log::warn!(
                "dropping just-received task {taskid}: intake queue filled up mid-receive"
            );
        }
    }
    Ok(())
}

async fn send_results(
    endpoint: &mut Endpoint,
    pool: &TaskPool,
    cfg: &ConnectionConfig,
) -> libspitz::SpitzResult<()> {
    let tosend = pool.result_queue_len() as i64;
    endpoint.write_i64(tosend).await?;
    for _ in 0..tosend {
        let Some((taskid, status, payload)) = pool.try_take_result() else {
            // The queue emptied out mid-drain under a benign race; stop here.
            break;
        };
        log::debug!("sending task {taskid} to {}", endpoint.addr);
        if let Err(e) = send_one_result(endpoint, taskid, status, &payload, cfg).await {
            // A write failed partway through: the result must not be lost.
            pool.requeue_result((taskid, status, payload));
            return Err(e);
        }
    }
    Ok(())
}

async fn send_one_result(
    endpoint: &mut Endpoint,
    taskid: i64,
    status: i64,
    payload: &[u8],
    _cfg: &ConnectionConfig,
) -> libspitz::SpitzResult<()> {
    endpoint.write_i64(taskid).await?;
    endpoint.write_i64(status).await?;
    endpoint.write_i64(payload.len() as i64).await?;
    endpoint.write_bytes(payload).await?;
    Ok(())
}

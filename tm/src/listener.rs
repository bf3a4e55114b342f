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

//! The TM's accept loop, modeled on the teacher's `dbnet` listener: a
//! capped-retry backoff around `accept()` and one spawned handler per
//! connection (spec.md §4.2 — "the server is otherwise single-threaded for
//! protocol work, with work fanned out to the worker pool").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use libspitz::endpoint::Endpoint;
use tokio::net::TcpListener;

use crate::pool::TaskPool;
use crate::protocol::{self, ConnectionConfig};

/// Retries `accept()` with exponential backoff up to this many doublings
/// before giving up and tearing down the listener.
struct AcceptBackoff {
    current: Duration,
}

impl AcceptBackoff {
    const MAX: Duration = Duration::from_secs(64);

    fn new() -> Self {
        Self {
            current: Duration::from_secs(1),
        }
    }

    fn should_give_up(&self) -> bool {
        self.current > Self::MAX
    }

    async fn spin(&mut self) {
        tokio::time::sleep(self.current).await;
        self.current *= 2;
    }
}

pub async fn run(
    bind_addr: SocketAddr,
    pool: Arc<TaskPool>,
    conn_cfg: Arc<ConnectionConfig>,
) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    log::info!("listening on {local_addr}");

    tokio::spawn(accept_loop(listener, pool, conn_cfg));

    Ok(local_addr)
}

async fn accept_loop(listener: TcpListener, pool: Arc<TaskPool>, conn_cfg: Arc<ConnectionConfig>) {
    let mut backoff = AcceptBackoff::new();
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                backoff = AcceptBackoff::new();
                let endpoint = Endpoint::from_accepted(stream, peer);
                let pool = pool.clone();
                let conn_cfg = conn_cfg.clone();
                tokio::spawn(async move {
                    protocol::handle_connection(endpoint, &pool, &conn_cfg).await;
                });
            }
            Err(e) => {
                log::error!("accept() failed: {e}");
                if backoff.should_give_up() {
                    log::error!("too many consecutive accept() failures, giving up");
                    return;
                }
                backoff.spin().await;
            }
        }
    }
}

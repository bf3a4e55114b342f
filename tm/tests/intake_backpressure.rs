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

//! S4: a TM with no draining workers advertises `free` honestly and stops
//! accepting once its intake queue is full.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use libspitz::endpoint::Endpoint;
use libspitz::messaging::MSG_SEND_TASK;
use libspitz::module::LoadedModule;
use tm::listener;
use tm::pool::TaskPool;
use tm::protocol::ConnectionConfig;
use wordcount_module::WordcountModule;

#[tokio::test]
async fn advertises_free_then_zero_once_full() {
    let module = Arc::new(LoadedModule::from_module(Box::new(WordcountModule::new())));
    // Zero workers: nothing drains the intake queue, so the second push is
    // guaranteed to observe a full queue rather than racing a worker.
    let pool = Arc::new(TaskPool::start(0, 1, module, Arc::new(vec![])));
    let conn_cfg = Arc::new(ConnectionConfig {
        recv_timeout: Duration::from_secs(5),
        send_timeout: Duration::from_secs(5),
    });
    let bind_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let local = listener::run(bind_addr, pool, conn_cfg)
        .await
        .expect("bind should succeed");

    let free1 = push_and_read_free(local, &[(1, b"fox".to_vec())]).await;
    assert_eq!(free1, 1);

    let free2 = push_and_read_free(local, &[]).await;
    assert_eq!(free2, 0);
}

async fn push_and_read_free(addr: SocketAddr, tasks: &[(i64, Vec<u8>)]) -> i64 {
    let timeout = Duration::from_secs(5);
    let mut ep = Endpoint::open(addr, timeout).await.expect("connect");
    ep.write_i64(MSG_SEND_TASK).await.expect("write mtype");
    let free = ep.read_i64(timeout).await.expect("read free");
    for (taskid, payload) in tasks {
        ep.write_framed_task(*taskid, payload).await.expect("write task");
    }
    free
}

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

//! S1: a single, always-responsive TM carries a whole job to completion —
//! every generated task is committed exactly once and `commit_job` resolves.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jm::committer::{self, CoLoopConfig};
use jm::jobmanager::{self, JmLoopConfig};
use jm::state::SharedState;
use libspitz::messaging::JOB_FINALIZE_MAGIC;
use libspitz::module::{CommitterModule, JobManagerModule, LoadedModule};
use tm::pool::TaskPool;
use tm::protocol::ConnectionConfig;
use wordcount_module::WordcountModule;

#[tokio::test]
async fn single_tm_carries_the_job_to_completion() {
    let tm_module = Arc::new(LoadedModule::from_module(Box::new(WordcountModule::new())));
    let pool = Arc::new(TaskPool::start(2, 1, tm_module, Arc::new(vec![])));
    let conn_cfg = Arc::new(ConnectionConfig {
        recv_timeout: Duration::from_secs(2),
        send_timeout: Duration::from_secs(2),
    });
    let bind_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let tm_addr = tm::listener::run(bind_addr, pool, conn_cfg)
        .await
        .expect("tm should bind");

    let tmp = tempfile::NamedTempFile::new().expect("tmp nodes file");
    writeln!(tmp.as_file(), "node {tm_addr}").unwrap();

    let jm_module = LoadedModule::from_module(Box::new(WordcountModule::new()));
    let jm_handle = jm_module.new_job_manager(&[]);
    let co_handle = jm_module.new_committer(&[]);

    let state = SharedState::new();
    let jm_cfg = JmLoopConfig {
        connect_timeout: Duration::from_secs(1),
        recv_timeout: Duration::from_secs(2),
        send_timeout: Duration::from_secs(2),
        send_backoff: Duration::from_millis(20),
        nodes_file: tmp.path().to_path_buf(),
    };
    let co_cfg = CoLoopConfig {
        connect_timeout: Duration::from_secs(1),
        recv_timeout: Duration::from_secs(2),
        recv_backoff: Duration::from_millis(20),
        nodes_file: tmp.path().to_path_buf(),
    };

    let jm_task = tokio::spawn(jobmanager::run(state.clone(), jm_handle, jm_cfg));
    let co_task = tokio::spawn(committer::run(state.clone(), co_handle, co_cfg));

    let (jm_result, co_result) = tokio::time::timeout(Duration::from_secs(15), async {
        tokio::join!(jm_task, co_task)
    })
    .await
    .expect("job should finish well within the timeout");

    jm_result.expect("jm task panicked").finalize();
    let mut co_handle = co_result.expect("co task panicked");

    assert!(state.is_done());
    // The default corpus is four lines; every one must have been committed
    // exactly once, never more.
    assert_eq!(state.completed_count(), 4);

    let outcome = co_handle.commit_job(JOB_FINALIZE_MAGIC);
    assert_eq!(outcome.ctx, JOB_FINALIZE_MAGIC);
    let result = outcome.result.expect("commit_job must produce a result");
    let text = String::from_utf8_lossy(&result);
    assert!(text.contains("fox=1"), "expected merged counts to include fox=1, got {text}");
}

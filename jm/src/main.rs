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

//! The job manager binary: runs the JM and CO loops concurrently against a
//! shared tasklist, then finalizes the job through the module (spec §4.4).

use std::path::Path;

use libspitz::args::ArgMap;
use libspitz::messaging::{JOB_FINALIZE_MAGIC, RES_MODULE_CTXER, RES_MODULE_NOANS};
use libspitz::module::LoadedModule;
use jm::committer::{self, CoLoopConfig};
use jm::config::JmConfig;
use jm::jobmanager::{self, JmLoopConfig};
use jm::killtms;
use jm::state::SharedState;

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        eprintln!("USAGE: jm [key=value ...] module [module args]");
        std::process::exit(1);
    }

    let args = ArgMap::parse(&argv);
    let cfg = JmConfig::from_args(&args);
    libspitz::logging::init(cfg.log_file.as_deref());

    let Some(module_path) = args.module_path() else {
        log::error!("no job module path given");
        std::process::exit(1);
    };

    let module = match LoadedModule::load(Path::new(module_path)) {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let module_argv = args.module_args.clone();

    let state = SharedState::new();
    let jm_handle = module.new_job_manager(&module_argv);
    let co_handle = module.new_committer(&module_argv);

    let jm_cfg = JmLoopConfig {
        connect_timeout: cfg.connect_timeout,
        recv_timeout: cfg.recv_timeout,
        send_timeout: cfg.send_timeout,
        send_backoff: cfg.send_backoff,
        nodes_file: cfg.nodes_file.clone(),
    };
    let co_cfg = CoLoopConfig {
        connect_timeout: cfg.connect_timeout,
        recv_timeout: cfg.recv_timeout,
        recv_backoff: cfg.recv_backoff,
        nodes_file: cfg.nodes_file.clone(),
    };

    log::info!("starting job");
    let jm_task = tokio::spawn(jobmanager::run(state.clone(), jm_handle, jm_cfg));
    let co_task = tokio::spawn(committer::run(state.clone(), co_handle, co_cfg));

    let (jm_result, co_result) = tokio::join!(jm_task, co_task);
    let mut jm_handle = jm_result.expect("job manager task panicked");
    let mut co_handle = co_result.expect("committer task panicked");

    log::info!("job generation and commit complete, finalizing");
    let outcome = co_handle.commit_job(JOB_FINALIZE_MAGIC);
    let exit_code = match outcome.result {
        None => {
            log::error!("commit_job produced no result");
            RES_MODULE_NOANS
        }
        Some(_) if outcome.ctx != JOB_FINALIZE_MAGIC => {
            log::error!("commit_job returned a mismatched context");
            RES_MODULE_CTXER
        }
        Some(_) => {
            log::info!("job finished with status {}", outcome.status);
            outcome.status
        }
    };

    jm_handle.finalize();
    co_handle.finalize();

    if cfg.killtms {
        killtms::kill_all(&cfg.nodes_file, cfg.connect_timeout).await;
    }

    std::process::exit(exit_code as i32);
}

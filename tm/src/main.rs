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

//! The Task Manager binary: accepts tasks over the wire, runs them on a
//! worker pool, and serves results on demand (spec.md §4.2).

use std::sync::Arc;

use libspitz::args::ArgMap;
use libspitz::module::LoadedModule;
use tm::announce;
use tm::config::{Announce, TmConfig};
use tm::listener;
use tm::pool::TaskPool;
use tm::protocol::ConnectionConfig;

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        eprintln!("USAGE: tm [key=value ...] module [module args]");
        std::process::exit(1);
    }

    let args = ArgMap::parse(&argv);
    let cfg = TmConfig::from_args(&args);
    libspitz::logging::init(cfg.log_file.as_deref());

    let Some(module_path) = args.module_path() else {
        log::error!("no job module path given");
        std::process::exit(1);
    };

    let module = match LoadedModule::load(std::path::Path::new(module_path)) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let module_argv = Arc::new(args.module_args.clone());

    log::info!(
        "starting task manager with {} workers (overfill {})",
        cfg.max_workers,
        cfg.overfill
    );
    let pool = Arc::new(TaskPool::start(
        cfg.max_workers,
        cfg.overfill,
        module,
        module_argv,
    ));

    let conn_cfg = Arc::new(ConnectionConfig {
        recv_timeout: cfg.recv_timeout,
        send_timeout: cfg.send_timeout,
    });

    let local_addr = match listener::run(cfg.bind_addr, pool, conn_cfg).await {
        Ok(addr) => addr,
        Err(e) => {
            log::error!("failed to bind {}: {e}", cfg.bind_addr);
            std::process::exit(1);
        }
    };

    let connectable = if local_addr.ip().is_unspecified() {
        std::net::SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), local_addr.port())
    } else {
        local_addr
    };
    log::info!("announce {connectable}");

    match cfg.announce {
        Announce::CatNodes => announce::announce_cat_nodes(&cfg.nodes_file, &connectable.to_string()),
        Announce::None => {}
    }

    log::info!("waiting for work...");
    // The accept loop runs forever in its own task; `msg_terminate` exits the
    // process directly (spec.md §5, cancellation).
    std::future::pending::<()>().await;
}

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

//! Logging setup shared by `tm` and `jm`.
//!
//! Mirrors `original_source`'s `setup_log`: a single formatter carrying a
//! timestamp, the current thread's name and the level, written either to
//! stderr or to a file named by the `log=<path>` CLI argument.

use std::io::Write;
use std::sync::Once;

use chrono::Local;

static INIT: Once = Once::new();

pub fn init(log_file: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()))
            .format(|buf, record| {
                let thread = std::thread::current();
                let thread_name = thread.name().unwrap_or("unnamed");
                writeln!(
                    buf,
                    "{} - {} - {} - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    thread_name,
                    record.level(),
                    record.args()
                )
            });

        if let Some(path) = log_file {
            match std::fs::File::create(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => {
                    eprintln!("could not open log file {path}: {e}, logging to stderr instead");
                }
            }
        }

        builder.init();
    });
}

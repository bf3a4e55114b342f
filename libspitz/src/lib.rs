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

//! Shared primitives for the `pits` distributed bag-of-tasks runtime: the
//! wire protocol, endpoint I/O, discovery-file parsing, CLI argument parsing,
//! job-module loading and logging setup used by both the `tm` and `jm`
//! binaries.

pub mod args;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod module;

pub use error::{Error, SpitzResult};

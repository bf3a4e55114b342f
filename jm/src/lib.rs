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

//! Library surface of the job manager + committer, split out from `main.rs`
//! so integration tests can drive the loops directly.

pub mod committer;
pub mod config;
pub mod fleet;
pub mod jobmanager;
pub mod killtms;
pub mod state;

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

//! Wire protocol constants. These must stay identical between the `tm` and
//! `jm` binaries since they are exchanged as raw `i64`s with no self-describing
//! framing beyond what's specified here.

/// Sent by a TM's peer to request the connection be torn down and the TM
/// process terminated immediately.
pub const MSG_TERMINATE: i64 = 0;
/// Sent by a job manager that wants to push tasks onto a TM's intake queue.
pub const MSG_SEND_TASK: i64 = 1;
/// Sent by a committer that wants to drain a TM's result queue.
pub const MSG_READ_RESULT: i64 = 2;

/// Sentinel taskid written by a TM to signal "no more results in this batch",
/// used when the result queue empties out before `tosend` iterations complete.
pub const MSG_READ_EMPTY: i64 = -1;

/// Worker-side status code meaning the worker crashed while running the task.
pub const RES_MODULE_ERROR: i64 = -1;
/// Returned by the run routine when `commit_job` produced no result.
pub const RES_MODULE_NOANS: i64 = -2;
/// Returned by the run routine when `commit_job`'s context verification failed.
pub const RES_MODULE_CTXER: i64 = -3;

/// The magic context value passed to `commit_job` at job finalization.
pub const JOB_FINALIZE_MAGIC: i64 = 0x12345678;

/// Frames declaring a payload larger than this are treated as a protocol
/// violation rather than allocated (spec.md §9 risk note).
pub const MAX_PAYLOAD_BYTES: i64 = 64 * 1024 * 1024;

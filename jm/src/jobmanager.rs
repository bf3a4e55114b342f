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

//! The Job Manager loop: streams tasks to the TM fleet with duplication-based
//! fault tolerance (spec §4.3).

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;

use libspitz::endpoint::Endpoint;
use libspitz::messaging::MSG_SEND_TASK;
use libspitz::module::{JobManagerModule, NextTask};

use crate::fleet;
use crate::state::SharedState;

struct Submission {
    taskid: i64,
    payload: Vec<u8>,
    submitted_to: HashSet<String>,
}

pub struct JmLoopConfig {
    pub connect_timeout: Duration,
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
    pub send_backoff: Duration,
    pub nodes_file: std::path::PathBuf,
}

/// A task pulled from the module but not yet fully delivered to a TM.
struct CurrentTask {
    taskid: i64,
    payload: Vec<u8>,
    submitted_to: HashSet<String>,
}

/// Runs until the job is done, then hands the module handle back to the
/// caller so it can be finalized.
pub async fn run(
    state: std::sync::Arc<SharedState>,
    mut module: Box<dyn JobManagerModule>,
    cfg: JmLoopConfig,
) -> Box<dyn JobManagerModule> {
    let mut tmlist: std::collections::HashMap<String, SocketAddr> = std::collections::HashMap::new();
    let mut taskid: i64 = 0;
    let mut current: Option<CurrentTask> = None;
    let mut submissions: VecDeque<Submission> = VecDeque::new();

    loop {
        tmlist = fleet::reload(tmlist, &cfg.nodes_file);

        for (name, &addr) in &tmlist {
            let name: &str = name.as_str();
            if let Some(ct) = &current {
                if ct.submitted_to.contains(name) {
                    continue;
                }
            }

            let mut ep = match Endpoint::open(addr, cfg.connect_timeout).await {
                Ok(ep) => ep,
                Err(e) => {
                    log::warn!("push: could not reach {name}: {e}");
                    continue;
                }
            };
            if let Err(e) = ep.write_i64(MSG_SEND_TASK).await {
                log::warn!("push: write to {name} failed: {e}");
                continue;
            }
            let free = match ep.read_i64(cfg.recv_timeout).await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("push: read `free` from {name} failed: {e}");
                    continue;
                }
            };
            if free <= 0 {
                continue;
            }

            let mut pushed = 0i64;
            while pushed < free {
                if current.is_none() {
                    match module.next_task(taskid + 1) {
                        NextTask::Done => {
                            state.mark_finished();
                            break;
                        }
                        NextTask::Task { payload, ctx } => {
                            if ctx != taskid + 1 {
                                log::error!(
                                    "task-generation mismatch: expected ctx {}, got {ctx}",
                                    taskid + 1
                                );
                                break;
                            }
                            taskid += 1;
                            state.insert_task(taskid, payload.clone());
                            current = Some(CurrentTask {
                                taskid,
                                payload,
                                submitted_to: HashSet::new(),
                            });
                        }
                    }
                }

                let Some(ct) = current.as_mut() else { break };
                match ep.write_framed_task(ct.taskid, &ct.payload).await {
                    Ok(()) => {
                        ct.submitted_to.insert(name.to_owned());
                        submissions.push_back(Submission {
                            taskid: ct.taskid,
                            payload: ct.payload.clone(),
                            submitted_to: ct.submitted_to.clone(),
                        });
                        current = None;
                        pushed += 1;
                    }
                    Err(e) => {
                        log::warn!("push: write to {name} failed mid-task: {e}");
                        break;
                    }
                }
            }

            if state.is_done() {
                return module;
            }

            // Replay policy: once generation has ended, re-dispatch the oldest
            // submission still outstanding to a TM that hasn't seen it yet.
            if state.is_finished() && current.is_none() {
                while let Some(sub) = submissions.pop_front() {
                    if state.tasklist_contains(sub.taskid) {
                        current = Some(CurrentTask {
                            taskid: sub.taskid,
                            payload: sub.payload,
                            submitted_to: sub.submitted_to,
                        });
                        break;
                    }
                }
            }
        }

        if state.is_done() {
            return module;
        }

        if let Some(ct) = current.take() {
            submissions.push_front(Submission {
                taskid: ct.taskid,
                payload: ct.payload,
                submitted_to: ct.submitted_to,
            });
        }
        submissions.retain(|s| state.tasklist_contains(s.taskid));

        tokio::time::sleep(cfg.send_backoff).await;
    }
}

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

//! The state shared between the JM loop and the CO loop: `TaskList` and
//! `Completed`, guarded by a single mutex (spec §5 — "single mutex covering
//! both... atomic with respect to is-completed?-then-remove").
//!
//! `original_source` stores the "all tasks generated" marker in-band as
//! `completed[0]`. The redesign notes call that a source quirk to avoid
//! reproducing, so it's a dedicated flag here instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// `(worker_status, payload)` awaiting commit.
pub type TaskEntry = (i64, Vec<u8>);
/// `(worker_status, commit_status)` recorded once committed.
pub type CompletedEntry = (i64, i64);

struct Inner {
    tasklist: HashMap<i64, TaskEntry>,
    completed: HashMap<i64, CompletedEntry>,
}

pub struct SharedState {
    inner: Mutex<Inner>,
    /// Single-writer (JM loop), multi-reader: true once task generation has
    /// produced every task it will ever produce.
    finished: AtomicBool,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                tasklist: HashMap::new(),
                completed: HashMap::new(),
            }),
            finished: AtomicBool::new(false),
        })
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn insert_task(&self, taskid: i64, payload: Vec<u8>) {
        self.inner.lock().tasklist.insert(taskid, (0, payload));
    }

    pub fn tasklist_is_empty(&self) -> bool {
        self.inner.lock().tasklist.is_empty()
    }

    pub fn tasklist_contains(&self, taskid: i64) -> bool {
        self.inner.lock().tasklist.contains_key(&taskid)
    }

    /// Done when generation has finished and every generated task has had
    /// its commit observed (spec §5, the JM/CO loop exit condition).
    pub fn is_done(&self) -> bool {
        self.is_finished() && self.tasklist_is_empty()
    }

    /// Is `taskid` already committed? The committer must check this *before*
    /// invoking `commit_pit`, never after, so a duplicate delivery is never
    /// passed to the module (property 1, exactly-once commit).
    pub fn is_completed(&self, taskid: i64) -> bool {
        self.inner.lock().completed.contains_key(&taskid)
    }

    /// Drop `taskid` from the working list without recording a commit.
    /// Returns whether it was actually present (its absence is logged by the
    /// caller as an "unknown task").
    pub fn drop_from_tasklist(&self, taskid: i64) -> bool {
        self.inner.lock().tasklist.remove(&taskid).is_some()
    }

    /// Record a freshly computed commit outcome and retire the task.
    pub fn record_completed(&self, taskid: i64, entry: CompletedEntry) {
        let mut guard = self.inner.lock();
        guard.tasklist.remove(&taskid);
        guard.completed.insert(taskid, entry);
    }

    /// Belt-and-braces cleanup: drop any tasklist entry that's already
    /// completed (spec §4.4, run after each committer pass).
    pub fn prune_completed_from_tasklist(&self) {
        let mut guard = self.inner.lock();
        let completed_ids: Vec<i64> = guard.completed.keys().copied().collect();
        for id in completed_ids {
            guard.tasklist.remove(&id);
        }
    }

    pub fn completed_count(&self) -> usize {
        self.inner.lock().completed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_delivery_is_never_recorded_twice() {
        let state = SharedState::new();
        state.insert_task(1, b"a".to_vec());
        assert!(!state.is_completed(1));
        state.record_completed(1, (0, 0));
        assert!(state.is_completed(1));
        // A second arrival of task 1 must be recognized before any commit call.
        assert!(state.is_completed(1));
        assert_eq!(state.completed_count(), 1);
    }

    #[test]
    fn is_done_requires_finished_and_empty_tasklist() {
        let state = SharedState::new();
        state.insert_task(1, b"a".to_vec());
        assert!(!state.is_done());
        state.mark_finished();
        assert!(!state.is_done());
        state.record_completed(1, (0, 0));
        assert!(state.is_done());
    }

    #[test]
    fn prune_removes_completed_entries_left_in_tasklist() {
        let state = SharedState::new();
        state.insert_task(1, b"a".to_vec());
        state.record_completed(1, (0, 0));
        // Simulate a replica re-adding task 1 to the tasklist after it was committed.
        state.insert_task(1, b"a".to_vec());
        assert!(state.tasklist_contains(1));
        state.prune_completed_from_tasklist();
        assert!(!state.tasklist_contains(1));
    }
}

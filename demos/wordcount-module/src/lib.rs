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

//! A reference job module: splits a small corpus into one task per line,
//! counts word frequencies per task, and merges them at commit time.
//!
//! Demonstrates the ABI a job module must implement (`libspitz::module`)
//! without pulling in a serialization crate: results are encoded as flat
//! `word=count;` strings since the payloads here are tiny and line-oriented.

use std::collections::HashMap;

use libspitz::module::{
    CommitterModule, JobCommitOutcome, JobManagerModule, JobModule, NextTask, WorkerModule,
    WorkerOutcome,
};

const DEFAULT_CORPUS: &str = "\
the quick brown fox jumps over the lazy dog
pack my box with five dozen liquor jugs
the five boxing wizards jump quickly
how vexingly quick daft zebras jump";

fn corpus_lines(argv: &[String]) -> Vec<String> {
    // argv[0] is the module path; argv[1], if present, overrides the corpus
    // (one line per `|`-separated segment) so the demo can be driven with
    // different input without rebuilding.
    match argv.get(1) {
        Some(text) => text.split('|').map(str::to_owned).collect(),
        None => DEFAULT_CORPUS.lines().map(str::to_owned).collect(),
    }
}

fn count_words(line: &str) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for word in line.split_whitespace() {
        *counts.entry(word.to_lowercase()).or_insert(0u64) += 1;
    }
    counts
}

fn encode_counts(counts: &HashMap<String, u64>) -> Vec<u8> {
    let mut out = String::new();
    for (word, n) in counts {
        out.push_str(word);
        out.push('=');
        out.push_str(&n.to_string());
        out.push(';');
    }
    out.into_bytes()
}

fn decode_counts(bytes: &[u8]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    let text = String::from_utf8_lossy(bytes);
    for entry in text.split(';') {
        if entry.is_empty() {
            continue;
        }
        if let Some((word, n)) = entry.split_once('=') {
            if let Ok(n) = n.parse::<u64>() {
                counts.insert(word.to_owned(), n);
            }
        }
    }
    counts
}

struct WordcountWorker;

impl WorkerModule for WordcountWorker {
    fn run(&mut self, task: &[u8], taskid: i64) -> WorkerOutcome {
        let line = String::from_utf8_lossy(task);
        let counts = count_words(&line);
        WorkerOutcome {
            status: 0,
            result: Some(encode_counts(&counts)),
            ctx: taskid,
        }
    }
}

struct WordcountJobManager {
    lines: Vec<String>,
    next_index: usize,
}

impl JobManagerModule for WordcountJobManager {
    fn next_task(&mut self, next_taskid: i64) -> NextTask {
        if self.next_index >= self.lines.len() {
            return NextTask::Done;
        }
        let payload = self.lines[self.next_index].clone().into_bytes();
        self.next_index += 1;
        NextTask::Task {
            payload,
            ctx: next_taskid,
        }
    }
}

struct WordcountCommitter {
    totals: HashMap<String, u64>,
}

impl CommitterModule for WordcountCommitter {
    fn commit_pit(&mut self, result: &[u8]) -> i64 {
        for (word, n) in decode_counts(result) {
            *self.totals.entry(word).or_insert(0) += n;
        }
        0
    }

    fn commit_job(&mut self, magic: i64) -> JobCommitOutcome {
        JobCommitOutcome {
            status: 0,
            result: Some(encode_counts(&self.totals)),
            ctx: magic,
        }
    }
}

/// Exported so integration tests in other workspace crates can embed this
/// module in-process via `LoadedModule::from_module`, without going through
/// the `cdylib` + `libloading` path.
pub struct WordcountModule;

impl WordcountModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordcountModule {
    fn default() -> Self {
        Self::new()
    }
}

impl JobModule for WordcountModule {
    fn new_worker(&self, _argv: &[String]) -> Box<dyn WorkerModule> {
        Box::new(WordcountWorker)
    }

    fn new_job_manager(&self, argv: &[String]) -> Box<dyn JobManagerModule> {
        Box::new(WordcountJobManager {
            lines: corpus_lines(argv),
            next_index: 0,
        })
    }

    fn new_committer(&self, _argv: &[String]) -> Box<dyn CommitterModule> {
        Box::new(WordcountCommitter {
            totals: HashMap::new(),
        })
    }
}

libspitz::export_job_module!(WordcountModule);

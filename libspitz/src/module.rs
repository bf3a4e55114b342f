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

//! The job module ABI (spec.md §6).
//!
//! `original_source`'s Python runtime loaded the module through `ctypes` and
//! had the module call back into the runtime (`main(margv, run_callback)`)
//! because C function pointers were the only thing that could cross that
//! boundary cheaply. A Rust plugin doesn't need that indirection: the host
//! and the module are built by the same compiler, so once we're holding a
//! `Box<dyn JobModule>` every further call is a plain virtual dispatch, not
//! an FFI call. The only pointer that actually has to cross the `extern "C"`
//! boundary is the one produced by the module's constructor.

use std::ffi::c_void;
use std::path::Path;

use crate::error::{Error, SpitzResult};

/// Outcome of [`JobManagerModule::next_task`].
pub enum NextTask {
    /// No more tasks will ever be generated.
    Done,
    /// A task was generated; `ctx` must equal the `next_taskid` that was
    /// requested or the caller treats this as a task-generation mismatch
    /// (spec.md §7).
    Task { payload: Vec<u8>, ctx: i64 },
}

/// Outcome of [`WorkerModule::run`].
pub struct WorkerOutcome {
    pub status: i64,
    /// `None` mirrors the source's `result == nil`: the task is dropped.
    pub result: Option<Vec<u8>>,
    pub ctx: i64,
}

/// Outcome of [`CommitterModule::commit_job`].
pub struct JobCommitOutcome {
    pub status: i64,
    pub result: Option<Vec<u8>>,
    pub ctx: i64,
}

pub trait WorkerModule: Send {
    fn run(&mut self, task: &[u8], taskid: i64) -> WorkerOutcome;
}

pub trait JobManagerModule: Send {
    fn next_task(&mut self, next_taskid: i64) -> NextTask;
    fn finalize(&mut self) {}
}

pub trait CommitterModule: Send {
    fn commit_pit(&mut self, result: &[u8]) -> i64;
    fn commit_job(&mut self, magic: i64) -> JobCommitOutcome;
    fn finalize(&mut self) {}
}

/// Implemented by a job module crate and exposed to the runtime as a
/// `cdylib` via [`EXPORT_SYMBOL`].
pub trait JobModule: Send + Sync {
    fn new_worker(&self, argv: &[String]) -> Box<dyn WorkerModule>;
    fn new_job_manager(&self, argv: &[String]) -> Box<dyn JobManagerModule>;
    fn new_committer(&self, argv: &[String]) -> Box<dyn CommitterModule>;
}

/// The symbol a module crate must export. See [`export_job_module!`].
pub const EXPORT_SYMBOL: &[u8] = b"_spits_create_module";

/// Declares the `extern "C"` constructor a job module crate must export so
/// `libspitz::module::load` can find it.
///
/// ```ignore
/// libspitz::export_job_module!(MyModule::new());
/// ```
#[macro_export]
macro_rules! export_job_module {
    ($ctor:expr) => {
        #[no_mangle]
        pub extern "C" fn _spits_create_module() -> *mut ::std::ffi::c_void {
            let module: ::std::boxed::Box<dyn $crate::module::JobModule> =
                ::std::boxed::Box::new($ctor);
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(module)) as *mut ::std::ffi::c_void
        }
    };
}

type CreateModuleFn = unsafe extern "C" fn() -> *mut c_void;

/// A dynamically loaded job module. Keeps the `libloading::Library` alive for
/// as long as the module's trait object is in use, since the module's vtable
/// lives in that shared object.
pub struct LoadedModule {
    module: Box<dyn JobModule>,
    // Order matters: `module` must be dropped before `_library` is unloaded.
    _library: Option<libloading::Library>,
}

impl LoadedModule {
    /// Wrap an already-constructed, in-process module. Useful for tests and
    /// for embedding a module directly without going through a `cdylib`.
    pub fn from_module(module: Box<dyn JobModule>) -> Self {
        Self {
            module,
            _library: None,
        }
    }

    /// Load a job module `cdylib` from `path` and call its constructor.
    ///
    /// # Safety contract
    /// This calls into foreign code: `path` must point to a library that
    /// exports `_spits_create_module` via [`export_job_module!`], built
    /// against the same `libspitz` version as the host. Loading an
    /// arbitrary/untrusted library is inherently unsafe; that risk is
    /// accepted here the same way spec.md accepts it for the job module as
    /// an external collaborator (§1 scope).
    pub fn load(path: &Path) -> SpitzResult<Self> {
        let library = unsafe { libloading::Library::new(path) }
            .map_err(|e| Error::ModuleLoad(format!("{}: {e}", path.display())))?;

        let create: libloading::Symbol<CreateModuleFn> = unsafe { library.get(EXPORT_SYMBOL) }
            .map_err(|e| {
                Error::ModuleLoad(format!(
                    "{} does not export _spits_create_module: {e}",
                    path.display()
                ))
            })?;

        let raw = unsafe { create() };
        if raw.is_null() {
            return Err(Error::ModuleLoad(format!(
                "{}'s constructor returned a null module",
                path.display()
            )));
        }
        // SAFETY: `raw` was produced by `export_job_module!`, which boxes a
        // `Box<dyn JobModule>` and leaks it via `Box::into_raw` with this
        // exact pointer type.
        let module = *unsafe { Box::from_raw(raw as *mut Box<dyn JobModule>) };

        Ok(Self {
            module,
            _library: Some(library),
        })
    }

    pub fn new_worker(&self, argv: &[String]) -> Box<dyn WorkerModule> {
        self.module.new_worker(argv)
    }

    pub fn new_job_manager(&self, argv: &[String]) -> Box<dyn JobManagerModule> {
        self.module.new_job_manager(argv)
    }

    pub fn new_committer(&self, argv: &[String]) -> Box<dyn CommitterModule> {
        self.module.new_committer(argv)
    }
}

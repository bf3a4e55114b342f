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

//! Error types shared by the task manager, the job manager and the committer.

use std::{fmt, io};

pub type SpitzResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Timeout,
    SocketClosed,
    Protocol(String),
    ModuleLoad(String),
    DiscoveryParse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::SocketClosed => write!(f, "peer closed the connection"),
            Self::Protocol(msg) => write!(f, "protocol violation: {msg}"),
            Self::ModuleLoad(msg) => write!(f, "failed to load job module: {msg}"),
            Self::DiscoveryParse(msg) => write!(f, "failed to parse discovery file: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset => Self::SocketClosed,
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

impl Error {
    /// Peer errors (timeout, reset, generic I/O) are always transient: the caller
    /// abandons the current endpoint and moves on to the next one (spec §7).
    pub fn is_transient_peer_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout | Self::SocketClosed)
    }
}

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

//! A framed TCP endpoint: fixed-width `i64` integers (little-endian) and
//! length-prefixed byte blobs, each read/write bounded by an explicit timeout.
//!
//! This is the Rust shape of the `Endpoint` interface in spec.md §4.1:
//! `Open`, `Close`, `WriteInt64`, `ReadInt64`, `Write`, `Read`.

use crate::error::{Error, SpitzResult};
use crate::messaging::MAX_PAYLOAD_BYTES;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub struct Endpoint {
    stream: TcpStream,
    pub addr: SocketAddr,
}

impl Endpoint {
    /// Open a connection to `addr`, failing with [`Error::Timeout`] if the
    /// handshake doesn't complete within `connect_timeout`.
    pub async fn open(addr: SocketAddr, connect_timeout: Duration) -> SpitzResult<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr)).await??;
        Ok(Self { stream, addr })
    }

    pub fn from_accepted(stream: TcpStream, addr: SocketAddr) -> Self {
        Self { stream, addr }
    }

    pub async fn write_i64(&mut self, v: i64) -> SpitzResult<()> {
        self.stream.write_all(&v.to_le_bytes()).await?;
        Ok(())
    }

    pub async fn read_i64(&mut self, recv_timeout: Duration) -> SpitzResult<i64> {
        let mut buf = [0u8; 8];
        timeout(recv_timeout, self.stream.read_exact(&mut buf)).await??;
        Ok(i64::from_le_bytes(buf))
    }

    pub async fn write_bytes(&mut self, data: &[u8]) -> SpitzResult<()> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// Read exactly `n` bytes, or fail with [`Error::Timeout`] /
    /// [`Error::SocketClosed`]. `n` beyond [`MAX_PAYLOAD_BYTES`] is rejected
    /// as a protocol violation instead of being allocated.
    pub async fn read_bytes(&mut self, n: i64, recv_timeout: Duration) -> SpitzResult<Vec<u8>> {
        if !(0..=MAX_PAYLOAD_BYTES).contains(&n) {
            return Err(Error::Protocol(format!(
                "refusing to read a frame of {n} bytes (cap is {MAX_PAYLOAD_BYTES})"
            )));
        }
        let mut buf = vec![0u8; n as usize];
        timeout(recv_timeout, self.stream.read_exact(&mut buf)).await??;
        Ok(buf)
    }

    /// Write a `(taskid, size, payload)` frame, as exchanged during task push
    /// and result pull (spec.md §6).
    pub async fn write_framed_task(&mut self, taskid: i64, payload: &[u8]) -> SpitzResult<()> {
        self.write_i64(taskid).await?;
        self.write_i64(payload.len() as i64).await?;
        self.write_bytes(payload).await
    }

}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    cfg::config::Config,
    client::{common::io_with_timeout, transport::HidTransport},
    error::Result,
    models::report::{REPORT_LEN, RequestReport},
};

/// One connected token.
///
/// Owns the HID handle and is responsible only for moving whole reports with
/// a timeout; framing, checksums and polling policy live above. The handle
/// sits behind a mutex so a cancellation path can reach it while a
/// transaction is in flight.
#[derive(Debug)]
pub struct DeviceConnection<T> {
    transport: Mutex<T>,
    /// Configuration parameters for this connection.
    pub cfg: Config,

    /// "Stop now" token: when cancelled, in-flight I/O aborts and further
    /// reports are refused. Honored between reports, never inside one.
    cancel: CancellationToken,
}

impl<T: HidTransport> DeviceConnection<T> {
    pub fn new(transport: T, cfg: Config) -> Self {
        Self {
            transport: Mutex::new(transport),
            cfg,
            cancel: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn cancel_now(&self) {
        self.cancel.cancel();
    }

    /// Writes one framed request report.
    pub async fn write_report(&self, req: &RequestReport) -> Result<()> {
        debug!("SEND cmd=0x{:02x} crc=0x{:08x}", req.command_id(), req.crc());

        let mut t = self.transport.lock().await;
        io_with_timeout(
            "write report",
            t.write_report(req.as_bytes()),
            self.cfg.runtime.io_timeout,
            &self.cancel,
        )
        .await
    }

    /// Reads the device's current response report.
    pub async fn read_report(&self) -> Result<[u8; REPORT_LEN]> {
        let mut buf = [0u8; REPORT_LEN];

        let mut t = self.transport.lock().await;
        io_with_timeout(
            "read report",
            t.read_report(&mut buf),
            self.cfg.runtime.io_timeout,
            &self.cancel,
        )
        .await?;

        Ok(buf)
    }

    /// Cancels outstanding I/O and releases the HID handle.
    pub async fn close(&self) -> Result<()> {
        self.cancel.cancel();
        let mut t = self.transport.lock().await;
        t.close().await?;
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The platform HID boundary.
//!
//! The library never talks USB itself; it hands fully framed 64-byte reports
//! to a [`HidTransport`] and reads raw 64-byte reports back. Platform
//! bindings (hidapi, kernel hidraw, a test double) implement these two traits
//! and stay completely ignorant of the command protocol.

use std::io;

use crate::models::report::REPORT_LEN;

/// One open HID handle to one token.
pub trait HidTransport: Send {
    /// Sends a single 64-byte feature report.
    fn write_report(
        &mut self,
        report: &[u8; REPORT_LEN],
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Reads the device's current 64-byte response report. The device keeps
    /// re-serving its latest response, so reading is also how the host polls.
    fn read_report(
        &mut self,
        buf: &mut [u8; REPORT_LEN],
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Releases the handle. Default is a no-op for transports that close on
    /// drop.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Opens HID handles by USB id pair.
pub trait HidBackend: Send + Sync {
    type Transport: HidTransport;

    /// Opens the first device matching `(vendor_id, product_id)`.
    fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> impl Future<Output = io::Result<Self::Transport>> + Send;
}

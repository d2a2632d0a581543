// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! 64-byte HID report codec.
//!
//! Request:
//!
//! ```text
//! +--------+-----------------------+------------+
//! | cmd id |   payload (59 bytes)  | crc32 (LE) |
//! |   0    |         1..60         |   60..64   |
//! +--------+-----------------------+------------+
//! ```
//!
//! Response:
//!
//! ```text
//! +------+-----------+--------+---------------------+------------+
//! | rsvd | crc echo  | status |  payload (53 bytes) | crc32 (LE) |
//! |  0   |   1..5    |   5    |        6..59        |   60..64   |
//! +------+-----------+--------+---------------------+------------+
//! ```
//!
//! Both directions hash bytes `[0..60)` with [`crate::crc::device_crc`] and
//! store the checksum little-endian in the trailing word. The echo word of a
//! response repeats the CRC of the request the firmware last executed, which
//! is how the host tells a fresh answer from a stale one.

use crate::{
    crc::device_crc,
    error::{Error, Result},
    models::{command::CommandId, status::DeviceStatus},
};

pub const REPORT_LEN: usize = 64;
pub const REQUEST_PAYLOAD_LEN: usize = 59;
pub const RESPONSE_PAYLOAD_LEN: usize = 53;

const HASHED_LEN: usize = 60;
const CRC_OFFSET: usize = 60;
const ECHO_OFFSET: usize = 1;
const STATUS_OFFSET: usize = 5;
const RESPONSE_PAYLOAD_OFFSET: usize = 6;

/// An encoded request report, checksummed and ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestReport {
    buf: [u8; REPORT_LEN],
}

impl RequestReport {
    /// Lays out `payload` behind the command byte, zero-fills the rest and
    /// seals the report with its CRC.
    pub fn encode(id: CommandId, payload: &[u8]) -> Result<Self> {
        if payload.len() > REQUEST_PAYLOAD_LEN {
            return Err(Error::TooLong {
                field: "request payload",
                len: payload.len(),
                max: REQUEST_PAYLOAD_LEN,
            });
        }

        let mut buf = [0u8; REPORT_LEN];
        buf[0] = id as u8;
        buf[1..1 + payload.len()].copy_from_slice(payload);

        let mut report = Self { buf };
        report.seal();
        Ok(report)
    }

    /// Overwrites `bytes` at `offset` within the payload region and reseals.
    /// Used to splice a cached temporary password into a privileged request.
    pub fn splice_payload(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= REQUEST_PAYLOAD_LEN)
            .ok_or(Error::TooLong {
                field: "payload splice",
                len: offset + bytes.len(),
                max: REQUEST_PAYLOAD_LEN,
            })?;

        self.buf[1 + offset..1 + end].copy_from_slice(bytes);
        self.seal();
        Ok(())
    }

    fn seal(&mut self) {
        let crc = device_crc(&self.buf[..HASHED_LEN]);
        self.buf[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    }

    /// The sealed checksum; the response echo must repeat this value.
    #[inline]
    pub fn crc(&self) -> u32 {
        u32::from_le_bytes([
            self.buf[CRC_OFFSET],
            self.buf[CRC_OFFSET + 1],
            self.buf[CRC_OFFSET + 2],
            self.buf[CRC_OFFSET + 3],
        ])
    }

    #[inline]
    pub fn command_id(&self) -> u8 {
        self.buf[0]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.buf
    }
}

/// A CRC-verified response report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseReport {
    buf: [u8; REPORT_LEN],
    status: DeviceStatus,
}

impl ResponseReport {
    /// Verifies the trailing checksum, then the status byte. A CRC mismatch
    /// is surfaced as [`Error::BadCrc`] before anything else is interpreted.
    pub fn parse(buf: [u8; REPORT_LEN]) -> Result<Self> {
        let stored = u32::from_le_bytes([
            buf[CRC_OFFSET],
            buf[CRC_OFFSET + 1],
            buf[CRC_OFFSET + 2],
            buf[CRC_OFFSET + 3],
        ]);
        if device_crc(&buf[..HASHED_LEN]) != stored {
            return Err(Error::BadCrc);
        }

        let status = DeviceStatus::from_u8(buf[STATUS_OFFSET])
            .ok_or(Error::Malformed("status byte outside the published set"))?;

        Ok(Self { buf, status })
    }

    #[inline]
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// CRC of the request the firmware last executed.
    #[inline]
    pub fn crc_echo(&self) -> u32 {
        u32::from_le_bytes([
            self.buf[ECHO_OFFSET],
            self.buf[ECHO_OFFSET + 1],
            self.buf[ECHO_OFFSET + 2],
            self.buf[ECHO_OFFSET + 3],
        ])
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.buf[RESPONSE_PAYLOAD_OFFSET..RESPONSE_PAYLOAD_OFFSET + RESPONSE_PAYLOAD_LEN]
    }
}

/// Builds a well-formed response report; shared by the codec tests and the
/// scripted fake device in the integration suite.
pub fn build_response(echo: u32, status: DeviceStatus, payload: &[u8]) -> [u8; REPORT_LEN] {
    debug_assert!(payload.len() <= RESPONSE_PAYLOAD_LEN);

    let mut buf = [0u8; REPORT_LEN];
    buf[ECHO_OFFSET..ECHO_OFFSET + 4].copy_from_slice(&echo.to_le_bytes());
    buf[STATUS_OFFSET] = status as u8;
    buf[RESPONSE_PAYLOAD_OFFSET..RESPONSE_PAYLOAD_OFFSET + payload.len()]
        .copy_from_slice(payload);

    let crc = device_crc(&buf[..HASHED_LEN]);
    buf[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    buf
}

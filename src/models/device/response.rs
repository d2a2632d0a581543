// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U16, U32, U64};

use crate::{
    error::{Error, Result},
    models::device::common::GeneralConfig,
};

/// `GET_STATUS` response: firmware version, card serial and the live general
/// config. Serial-number and config reads are projections of this payload.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct StatusResponse {
    pub firmware_version: U16<LittleEndian>, // 0..2
    pub card_serial: U32<LittleEndian>,      // 2..6
    pub general_config: GeneralConfig,       // 6..11
}

impl StatusResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| Error::Malformed("truncated GetStatus response"))
    }

    /// Card serial rendered the way the C API exposes it.
    pub fn serial_hex(&self) -> String {
        hex::encode(self.card_serial.get().to_be_bytes())
    }
}

/// `GET_PASSWORD_RETRY_COUNT` / `GET_USER_PASSWORD_RETRY_COUNT` response.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RetryCountResponse {
    pub count: u8, // 0
}

impl RetryCountResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| Error::Malformed("truncated retry count response"))
    }
}

/// Device clock as reported by the time-check command.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct TimeResponse {
    pub time: U64<LittleEndian>, // 0..8
}

impl TimeResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| Error::Malformed("truncated time response"))
    }
}

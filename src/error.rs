// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

use crate::{
    cfg::enums::DeviceModel,
    models::{command::Privilege, status::DeviceStatus},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Slot families with distinct index bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Hotp,
    Totp,
    PasswordSafe,
}

impl SlotKind {
    pub fn limit(self) -> u8 {
        match self {
            SlotKind::Hotp => 3,
            SlotKind::Totp => 15,
            SlotKind::PasswordSafe => 16,
        }
    }
}

/// Library error. The first group never reaches the device (caller mistakes),
/// the second group is the transport boundary, the third is the device itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind:?} slot {slot} out of range (limit {limit})")]
    SlotOutOfRange {
        kind: SlotKind,
        slot: u8,
        limit: u8,
    },

    #[error("{field} is {len} bytes, limit {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("no {0:?} temporary password cached; authenticate first")]
    NotAuthenticated(Privilege),

    #[error("no device connected")]
    NotConnected,

    #[error("a device is already connected")]
    AlreadyConnected,

    #[error("no {0} device found")]
    DeviceNotFound(DeviceModel),

    #[error("command requires a {required} device, connected model is {connected}")]
    WrongModel {
        required: DeviceModel,
        connected: DeviceModel,
    },

    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),

    #[error("device stayed busy past the poll budget")]
    Timeout,

    #[error("response CRC mismatch")]
    BadCrc,

    #[error("malformed response: {0}")]
    Malformed(&'static str),

    #[error("device reported {0}")]
    Device(DeviceStatus),
}

impl Error {
    /// Transport-category faults invalidate cached temporary passwords; the
    /// device may have dropped the session on its side.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout)
    }
}

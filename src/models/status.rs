// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;
use std::convert::TryFrom;

use thiserror::Error;

/// Outcome byte carried by every response report.
///
/// `Busy` means the firmware is still executing the last request and the host
/// should read again; every other value terminates the poll.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Ok = 0,
    Busy = 1,
    WrongCrc = 2,
    WrongSlot = 3,
    SlotNotProgrammed = 4,
    WrongPassword = 5,
    UserNotAuthenticated = 6,
    TimestampWarning = 7,
    NoNameError = 8,
    NotSupported = 9,
    UnknownCommand = 10,
    AesDecFailed = 11,
}

impl DeviceStatus {
    #[inline]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Ok,
            1 => Self::Busy,
            2 => Self::WrongCrc,
            3 => Self::WrongSlot,
            4 => Self::SlotNotProgrammed,
            5 => Self::WrongPassword,
            6 => Self::UserNotAuthenticated,
            7 => Self::TimestampWarning,
            8 => Self::NoNameError,
            9 => Self::NotSupported,
            10 => Self::UnknownCommand,
            11 => Self::AesDecFailed,
            _ => return None,
        })
    }

    /// Only `Busy` is worth another status read.
    #[inline]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Busy => "busy",
            Self::WrongCrc => "wrong CRC",
            Self::WrongSlot => "wrong slot",
            Self::SlotNotProgrammed => "slot not programmed",
            Self::WrongPassword => "wrong password",
            Self::UserNotAuthenticated => "user not authenticated",
            Self::TimestampWarning => "timestamp warning",
            Self::NoNameError => "no name set",
            Self::NotSupported => "not supported",
            Self::UnknownCommand => "unknown command",
            Self::AesDecFailed => "AES decryption failed",
        })
    }
}

/// Returned when a response carries a status byte outside the published set.
#[derive(Debug, Error)]
#[error("invalid device status: 0x{0:02x}")]
pub struct UnknownStatus(pub u8);

impl TryFrom<u8> for DeviceStatus {
    type Error = UnknownStatus;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        DeviceStatus::from_u8(byte).ok_or(UnknownStatus(byte))
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Firmware command identifiers.
//!
//! Every request report starts with one of these bytes:
//!
//! ```text
//! +--------+----------------------+------------+
//! | cmd id |  payload (59 bytes)  | crc32 (LE) |
//! +--------+----------------------+------------+
//! ```
//!
//! Ids below `0x20` are the base (Pro) set, the `0x20..0x3f` range is the
//! Storage superset, and `0x60..` covers the password safe and smartcard AES
//! helpers.

use std::convert::TryFrom;

use thiserror::Error;

/// The firmware command ids the catalog drives.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    #[default]
    GetStatus = 0x00,
    WriteToSlot = 0x01,
    ReadSlot = 0x03,
    GetCode = 0x04,
    WriteConfig = 0x05,
    EraseSlot = 0x06,
    FirstAuthenticate = 0x07,
    Authorize = 0x08,
    GetPasswordRetryCount = 0x09,
    SetTime = 0x0b,
    TestTime = 0x0d,
    UserAuthenticate = 0x0e,
    GetUserPasswordRetryCount = 0x0f,
    UserAuthorize = 0x10,
    UnlockUserPassword = 0x11,
    LockDevice = 0x12,
    FactoryReset = 0x13,
    ChangeUserPin = 0x14,
    ChangeAdminPin = 0x15,

    /* Storage superset */
    EnableCryptedPartition = 0x20,
    DisableCryptedPartition = 0x21,
    EnableHiddenCryptedPartition = 0x22,
    DisableHiddenCryptedPartition = 0x23,
    EnableFirmwareUpdate = 0x24,
    ExportFirmwareToFile = 0x25,
    FillSdCardWithRandomChars = 0x27,
    EnableReadonlyUncryptedLun = 0x29,
    EnableReadwriteUncryptedLun = 0x2a,
    SendHiddenVolumeSetup = 0x2d,
    SendLockStickHardware = 0x36,
    ChangeUpdatePin = 0x38,

    /* Password safe + smartcard AES */
    GetPwSafeSlotStatus = 0x60,
    GetPwSafeSlotName = 0x61,
    GetPwSafeSlotPassword = 0x62,
    GetPwSafeSlotLogin = 0x63,
    SetPwSafeSlotData1 = 0x64,
    SetPwSafeSlotData2 = 0x65,
    PwSafeEraseSlot = 0x66,
    PwSafeEnable = 0x67,
    DetectScAes = 0x6a,
    NewAesKey = 0x6b,
}

impl CommandId {
    #[inline]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::GetStatus,
            0x01 => Self::WriteToSlot,
            0x03 => Self::ReadSlot,
            0x04 => Self::GetCode,
            0x05 => Self::WriteConfig,
            0x06 => Self::EraseSlot,
            0x07 => Self::FirstAuthenticate,
            0x08 => Self::Authorize,
            0x09 => Self::GetPasswordRetryCount,
            0x0b => Self::SetTime,
            0x0d => Self::TestTime,
            0x0e => Self::UserAuthenticate,
            0x0f => Self::GetUserPasswordRetryCount,
            0x10 => Self::UserAuthorize,
            0x11 => Self::UnlockUserPassword,
            0x12 => Self::LockDevice,
            0x13 => Self::FactoryReset,
            0x14 => Self::ChangeUserPin,
            0x15 => Self::ChangeAdminPin,
            0x20 => Self::EnableCryptedPartition,
            0x21 => Self::DisableCryptedPartition,
            0x22 => Self::EnableHiddenCryptedPartition,
            0x23 => Self::DisableHiddenCryptedPartition,
            0x24 => Self::EnableFirmwareUpdate,
            0x25 => Self::ExportFirmwareToFile,
            0x27 => Self::FillSdCardWithRandomChars,
            0x29 => Self::EnableReadonlyUncryptedLun,
            0x2a => Self::EnableReadwriteUncryptedLun,
            0x2d => Self::SendHiddenVolumeSetup,
            0x36 => Self::SendLockStickHardware,
            0x38 => Self::ChangeUpdatePin,
            0x60 => Self::GetPwSafeSlotStatus,
            0x61 => Self::GetPwSafeSlotName,
            0x62 => Self::GetPwSafeSlotPassword,
            0x63 => Self::GetPwSafeSlotLogin,
            0x64 => Self::SetPwSafeSlotData1,
            0x65 => Self::SetPwSafeSlotData2,
            0x66 => Self::PwSafeEraseSlot,
            0x67 => Self::PwSafeEnable,
            0x6a => Self::DetectScAes,
            0x6b => Self::NewAesKey,
            _ => return None,
        })
    }
}

/// Returned when a byte does not name a published command.
#[derive(Debug, Error)]
#[error("invalid command id: 0x{0:02x}")]
pub struct UnknownCommand(pub u8);

impl TryFrom<u8> for CommandId {
    type Error = UnknownCommand;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        CommandId::from_u8(byte).ok_or(UnknownCommand(byte))
    }
}

/// Privilege a command runs under. `User` and `Admin` require the matching
/// temporary password to be cached in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    None,
    User,
    Admin,
}

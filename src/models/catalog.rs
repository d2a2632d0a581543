// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Declarative command catalog.
//!
//! One [`CommandDescriptor`] per firmware operation: the command id, the
//! privilege it runs under, how that privilege is proven on the wire, and
//! whether only the Storage firmware implements it. The transaction engine is
//! a single function parameterized by a descriptor; nothing else in the crate
//! hard-codes per-command behavior.
//!
//! Two proof mechanisms exist:
//!
//! * `InlineTemp` — the request payload reserves a 25-byte field for the
//!   temporary password; the engine splices the cached value in at the
//!   recorded offset.
//! * `Challenge` — the payload has no such field; the engine first runs an
//!   `Authorize`/`UserAuthorize` transaction binding the CRC of the outgoing
//!   request to the cached temporary password.

use crate::{
    error::{Error, Result, SlotKind},
    models::command::{CommandId, Privilege},
};

/// How a privileged command proves possession of the temporary password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    InlineTemp { offset: usize },
    Challenge,
}

/// Static description of one firmware command.
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub id: CommandId,
    pub privilege: Privilege,
    pub auth: AuthScheme,
    pub storage_only: bool,
}

impl CommandDescriptor {
    const fn plain(id: CommandId) -> Self {
        Self {
            id,
            privilege: Privilege::None,
            auth: AuthScheme::None,
            storage_only: false,
        }
    }

    const fn admin_challenge(id: CommandId) -> Self {
        Self {
            id,
            privilege: Privilege::Admin,
            auth: AuthScheme::Challenge,
            storage_only: false,
        }
    }

    const fn user_challenge(id: CommandId) -> Self {
        Self {
            id,
            privilege: Privilege::User,
            auth: AuthScheme::Challenge,
            storage_only: false,
        }
    }

    const fn admin_inline(id: CommandId, offset: usize) -> Self {
        Self {
            id,
            privilege: Privilege::Admin,
            auth: AuthScheme::InlineTemp { offset },
            storage_only: false,
        }
    }

    const fn storage(id: CommandId) -> Self {
        Self {
            id,
            privilege: Privilege::None,
            auth: AuthScheme::None,
            storage_only: true,
        }
    }
}

/* Status & identity */
pub const GET_STATUS: CommandDescriptor = CommandDescriptor::plain(CommandId::GetStatus);
pub const GET_PASSWORD_RETRY_COUNT: CommandDescriptor =
    CommandDescriptor::plain(CommandId::GetPasswordRetryCount);
pub const GET_USER_PASSWORD_RETRY_COUNT: CommandDescriptor =
    CommandDescriptor::plain(CommandId::GetUserPasswordRetryCount);

/* Authentication. The authenticate commands carry the PIN itself, so they
 * run unprivileged; the authorize pair is issued by the engine as a
 * challenge leg and never by callers. */
pub const FIRST_AUTHENTICATE: CommandDescriptor =
    CommandDescriptor::plain(CommandId::FirstAuthenticate);
pub const USER_AUTHENTICATE: CommandDescriptor =
    CommandDescriptor::plain(CommandId::UserAuthenticate);
pub const AUTHORIZE: CommandDescriptor = CommandDescriptor::plain(CommandId::Authorize);
pub const USER_AUTHORIZE: CommandDescriptor =
    CommandDescriptor::plain(CommandId::UserAuthorize);
pub const LOCK_DEVICE: CommandDescriptor = CommandDescriptor::plain(CommandId::LockDevice);

/* OTP programming */
pub const WRITE_TO_SLOT: CommandDescriptor =
    CommandDescriptor::admin_challenge(CommandId::WriteToSlot);
pub const READ_SLOT: CommandDescriptor =
    CommandDescriptor::admin_challenge(CommandId::ReadSlot);
// payload: slot_number u8, then the temporary password field
pub const ERASE_SLOT: CommandDescriptor =
    CommandDescriptor::admin_inline(CommandId::EraseSlot, 1);

/* OTP retrieval */
pub const GET_CODE: CommandDescriptor = CommandDescriptor::plain(CommandId::GetCode);
pub const GET_CODE_PIN: CommandDescriptor =
    CommandDescriptor::user_challenge(CommandId::GetCode);

/* Configuration; the five config bytes precede the temporary password */
pub const WRITE_CONFIG: CommandDescriptor =
    CommandDescriptor::admin_inline(CommandId::WriteConfig, 5);

/* PIN management */
pub const CHANGE_ADMIN_PIN: CommandDescriptor =
    CommandDescriptor::plain(CommandId::ChangeAdminPin);
pub const CHANGE_USER_PIN: CommandDescriptor =
    CommandDescriptor::plain(CommandId::ChangeUserPin);
pub const UNLOCK_USER_PASSWORD: CommandDescriptor =
    CommandDescriptor::plain(CommandId::UnlockUserPassword);

/* Password safe */
pub const PW_SAFE_ENABLE: CommandDescriptor =
    CommandDescriptor::plain(CommandId::PwSafeEnable);
pub const GET_PW_SAFE_SLOT_STATUS: CommandDescriptor =
    CommandDescriptor::plain(CommandId::GetPwSafeSlotStatus);
pub const GET_PW_SAFE_SLOT_NAME: CommandDescriptor =
    CommandDescriptor::plain(CommandId::GetPwSafeSlotName);
pub const GET_PW_SAFE_SLOT_LOGIN: CommandDescriptor =
    CommandDescriptor::plain(CommandId::GetPwSafeSlotLogin);
pub const GET_PW_SAFE_SLOT_PASSWORD: CommandDescriptor =
    CommandDescriptor::plain(CommandId::GetPwSafeSlotPassword);
pub const SET_PW_SAFE_SLOT_DATA_1: CommandDescriptor =
    CommandDescriptor::plain(CommandId::SetPwSafeSlotData1);
pub const SET_PW_SAFE_SLOT_DATA_2: CommandDescriptor =
    CommandDescriptor::plain(CommandId::SetPwSafeSlotData2);
pub const PW_SAFE_ERASE_SLOT: CommandDescriptor =
    CommandDescriptor::plain(CommandId::PwSafeEraseSlot);

/* Device management; these carry the full PIN in the payload */
pub const FACTORY_RESET: CommandDescriptor =
    CommandDescriptor::plain(CommandId::FactoryReset);
pub const BUILD_AES_KEY: CommandDescriptor = CommandDescriptor::plain(CommandId::NewAesKey);
pub const DETECT_SC_AES: CommandDescriptor =
    CommandDescriptor::plain(CommandId::DetectScAes);
pub const SET_TIME: CommandDescriptor = CommandDescriptor::plain(CommandId::SetTime);
pub const GET_TIME: CommandDescriptor = CommandDescriptor::plain(CommandId::TestTime);

/* Storage superset */
pub const ENABLE_CRYPTED_PARTITION: CommandDescriptor =
    CommandDescriptor::storage(CommandId::EnableCryptedPartition);
pub const DISABLE_CRYPTED_PARTITION: CommandDescriptor =
    CommandDescriptor::storage(CommandId::DisableCryptedPartition);
pub const ENABLE_HIDDEN_CRYPTED_PARTITION: CommandDescriptor =
    CommandDescriptor::storage(CommandId::EnableHiddenCryptedPartition);
pub const DISABLE_HIDDEN_CRYPTED_PARTITION: CommandDescriptor =
    CommandDescriptor::storage(CommandId::DisableHiddenCryptedPartition);
pub const SEND_HIDDEN_VOLUME_SETUP: CommandDescriptor =
    CommandDescriptor::storage(CommandId::SendHiddenVolumeSetup);
pub const ENABLE_FIRMWARE_UPDATE: CommandDescriptor =
    CommandDescriptor::storage(CommandId::EnableFirmwareUpdate);
pub const EXPORT_FIRMWARE_TO_FILE: CommandDescriptor =
    CommandDescriptor::storage(CommandId::ExportFirmwareToFile);
pub const FILL_SD_CARD_WITH_RANDOM_CHARS: CommandDescriptor =
    CommandDescriptor::storage(CommandId::FillSdCardWithRandomChars);
pub const ENABLE_READONLY_UNCRYPTED_LUN: CommandDescriptor =
    CommandDescriptor::storage(CommandId::EnableReadonlyUncryptedLun);
pub const ENABLE_READWRITE_UNCRYPTED_LUN: CommandDescriptor =
    CommandDescriptor::storage(CommandId::EnableReadwriteUncryptedLun);
pub const CHANGE_UPDATE_PIN: CommandDescriptor =
    CommandDescriptor::storage(CommandId::ChangeUpdatePin);
pub const SEND_LOCK_STICK_HARDWARE: CommandDescriptor =
    CommandDescriptor::storage(CommandId::SendLockStickHardware);

/* Slot numbering */

pub const HOTP_SLOT_COUNT: u8 = 3;
pub const TOTP_SLOT_COUNT: u8 = 15;
pub const PWS_SLOT_COUNT: u8 = 16;

/// Firmware slot addressing is offset per family.
pub const HOTP_WIRE_BASE: u8 = 0x10;
pub const TOTP_WIRE_BASE: u8 = 0x20;

fn checked_slot(kind: SlotKind, slot: u8, limit: u8) -> Result<u8> {
    if slot < limit {
        Ok(slot)
    } else {
        Err(Error::SlotOutOfRange { kind, slot, limit })
    }
}

/// Wire slot number for a HOTP index, rejecting out-of-range indices locally.
pub fn hotp_wire_slot(slot: u8) -> Result<u8> {
    Ok(HOTP_WIRE_BASE + checked_slot(SlotKind::Hotp, slot, HOTP_SLOT_COUNT)?)
}

/// Wire slot number for a TOTP index.
pub fn totp_wire_slot(slot: u8) -> Result<u8> {
    Ok(TOTP_WIRE_BASE + checked_slot(SlotKind::Totp, slot, TOTP_SLOT_COUNT)?)
}

/// Password-safe slots are addressed without an offset.
pub fn pws_slot(slot: u8) -> Result<u8> {
    checked_slot(SlotKind::PasswordSafe, slot, PWS_SLOT_COUNT)
}

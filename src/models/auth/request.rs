// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Authentication and PIN-management request payloads.
//!
//! PINs travel NUL-padded in fixed 25-byte fields; temporary passwords are
//! always exactly 25 opaque bytes. Oversize input fails locally before any
//! report is built.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U32};

use crate::{
    error::Result,
    utils::{TEMP_PASSWORD_LEN, pack_fixed},
};

pub const PIN_LEN: usize = 25;

/// `FIRST_AUTHENTICATE`: proves the admin PIN and plants the admin temporary
/// password for the rest of the session.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FirstAuthenticate {
    pub card_password: [u8; PIN_LEN],            // 0..25
    pub temporary_password: [u8; TEMP_PASSWORD_LEN], // 25..50
}

impl FirstAuthenticate {
    pub fn new(admin_pin: &[u8], temp: [u8; TEMP_PASSWORD_LEN]) -> Result<Self> {
        Ok(Self {
            card_password: pack_fixed("admin PIN", admin_pin)?,
            temporary_password: temp,
        })
    }
}

/// `USER_AUTHENTICATE`: same contract at user level.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct UserAuthenticate {
    pub card_password: [u8; PIN_LEN],            // 0..25
    pub temporary_password: [u8; TEMP_PASSWORD_LEN], // 25..50
}

impl UserAuthenticate {
    pub fn new(user_pin: &[u8], temp: [u8; TEMP_PASSWORD_LEN]) -> Result<Self> {
        Ok(Self {
            card_password: pack_fixed("user PIN", user_pin)?,
            temporary_password: temp,
        })
    }
}

/// `AUTHORIZE` / `USER_AUTHORIZE` challenge leg: binds the CRC of the request
/// that follows to a cached temporary password.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Authorize {
    pub crc_to_authorize: U32<LittleEndian>,     // 0..4
    pub temporary_password: [u8; TEMP_PASSWORD_LEN], // 4..29
}

impl Authorize {
    pub fn new(crc: u32, temp: [u8; TEMP_PASSWORD_LEN]) -> Self {
        Self {
            crc_to_authorize: U32::new(crc),
            temporary_password: temp,
        }
    }
}

/// `CHANGE_ADMIN_PIN` / `CHANGE_USER_PIN`.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ChangePin {
    pub current_password: [u8; PIN_LEN], // 0..25
    pub new_password: [u8; PIN_LEN],     // 25..50
}

impl ChangePin {
    pub fn new(current: &[u8], new: &[u8]) -> Result<Self> {
        Ok(Self {
            current_password: pack_fixed("current PIN", current)?,
            new_password: pack_fixed("new PIN", new)?,
        })
    }
}

/// `UNLOCK_USER_PASSWORD`: admin resets a user PIN locked by failed tries.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct UnlockUserPassword {
    pub admin_password: [u8; PIN_LEN],   // 0..25
    pub user_new_password: [u8; PIN_LEN], // 25..50
}

impl UnlockUserPassword {
    pub fn new(admin_pin: &[u8], new_user_pin: &[u8]) -> Result<Self> {
        Ok(Self {
            admin_password: pack_fixed("admin PIN", admin_pin)?,
            user_new_password: pack_fixed("new user PIN", new_user_pin)?,
        })
    }
}

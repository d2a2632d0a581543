// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Device-management request payloads. Unlike the session-scoped commands,
//! these carry the relevant PIN in full; the firmware checks it against the
//! smartcard and burns a retry on mismatch.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U64};

use crate::{
    error::Result,
    models::device::common::GeneralConfig,
    utils::{TEMP_PASSWORD_LEN, pack_fixed},
};

/// PIN length for the reset/AES family of commands.
pub const SHORT_PIN_LEN: usize = 20;

/// `WRITE_CONFIG`. The temporary password is spliced in by the engine.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct WriteGeneralConfig {
    pub config: GeneralConfig,                           // 0..5
    pub temporary_admin_password: [u8; TEMP_PASSWORD_LEN], // 5..30
}

impl WriteGeneralConfig {
    pub fn new(config: GeneralConfig) -> Self {
        Self {
            config,
            temporary_admin_password: [0; TEMP_PASSWORD_LEN],
        }
    }
}

/// `SET_TIME`. `reset = 1` sets unconditionally; `0` only checks drift.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SetTime {
    pub reset: u8,                   // 0
    pub timestamp: U64<LittleEndian>, // 1..9
}

impl SetTime {
    pub fn set(unix_seconds: u64) -> Self {
        Self {
            reset: 1,
            timestamp: U64::new(unix_seconds),
        }
    }
}

/// `FACTORY_RESET`.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FactoryReset {
    pub admin_password: [u8; SHORT_PIN_LEN], // 0..20
}

impl FactoryReset {
    pub fn new(admin_pin: &[u8]) -> Result<Self> {
        Ok(Self {
            admin_password: pack_fixed("admin PIN", admin_pin)?,
        })
    }
}

/// `NEW_AES_KEY`.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct BuildAesKey {
    pub admin_password: [u8; SHORT_PIN_LEN], // 0..20
}

impl BuildAesKey {
    pub fn new(admin_pin: &[u8]) -> Result<Self> {
        Ok(Self {
            admin_password: pack_fixed("admin PIN", admin_pin)?,
        })
    }
}

/// `DETECT_SC_AES`.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DetectScAes {
    pub user_password: [u8; SHORT_PIN_LEN], // 0..20
}

impl DetectScAes {
    pub fn new(user_pin: &[u8]) -> Result<Self> {
        Ok(Self {
            user_password: pack_fixed("user PIN", user_pin)?,
        })
    }
}

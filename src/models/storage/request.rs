// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Storage-only request payloads. This whole family authenticates by
//! carrying a password in the report; several commands share the plain
//! 30-byte shape.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{error::Result, utils::pack_fixed};

pub const STORAGE_PASSWORD_LEN: usize = 30;
pub const UPDATE_PIN_LEN: usize = 15;
pub const HIDDEN_VOLUME_PASSWORD_LEN: usize = 21;

/// Volume enable/disable, firmware-update arming, firmware export and
/// hardware lock all send exactly this.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct StoragePassword {
    pub password: [u8; STORAGE_PASSWORD_LEN], // 0..30
}

impl StoragePassword {
    pub fn new(password: &[u8]) -> Result<Self> {
        Ok(Self {
            password: pack_fixed("storage password", password)?,
        })
    }
}

/// `FILL_SD_CARD_WITH_RANDOM_CHARS`. `volume_flag` selects which portion of
/// the card to overwrite.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FillSdCard {
    pub volume_flag: u8,                      // 0
    pub password: [u8; STORAGE_PASSWORD_LEN], // 1..31
}

impl FillSdCard {
    pub fn new(volume_flag: u8, password: &[u8]) -> Result<Self> {
        Ok(Self {
            volume_flag,
            password: pack_fixed("storage password", password)?,
        })
    }
}

/// `SEND_HIDDEN_VOLUME_SETUP`: carve a hidden volume between two points of
/// the encrypted region, given in percent of its size.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SetupHiddenVolume {
    pub slot_number: u8,                              // 0
    pub start_percent: u8,                            // 1
    pub end_percent: u8,                              // 2
    pub password: [u8; HIDDEN_VOLUME_PASSWORD_LEN],   // 3..24
}

impl SetupHiddenVolume {
    pub fn new(slot: u8, start_percent: u8, end_percent: u8, password: &[u8]) -> Result<Self> {
        Ok(Self {
            slot_number: slot,
            start_percent,
            end_percent,
            password: pack_fixed("hidden volume password", password)?,
        })
    }
}

/// `CHANGE_UPDATE_PIN`.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ChangeUpdatePin {
    pub old_password: [u8; UPDATE_PIN_LEN], // 0..15
    pub new_password: [u8; UPDATE_PIN_LEN], // 15..30
}

impl ChangeUpdatePin {
    pub fn new(old: &[u8], new: &[u8]) -> Result<Self> {
        Ok(Self {
            old_password: pack_fixed("current update PIN", old)?,
            new_password: pack_fixed("new update PIN", new)?,
        })
    }
}

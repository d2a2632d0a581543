// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Password-safe request payloads. The safe unlocks device-side on
//! `PW_SAFE_ENABLE`; afterwards the slot commands run without further
//! credentials until lock or power-down.
//!
//! A slot write is two firmware transactions: name+password first, login
//! second.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    error::Result,
    models::pws::{PWS_ENABLE_PIN_LEN, PWS_LOGIN_LEN, PWS_NAME_LEN, PWS_PASSWORD_LEN},
    utils::pack_fixed,
};

/// `PW_SAFE_ENABLE`.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PwSafeEnable {
    pub user_password: [u8; PWS_ENABLE_PIN_LEN], // 0..30
}

impl PwSafeEnable {
    pub fn new(user_pin: &[u8]) -> Result<Self> {
        Ok(Self {
            user_password: pack_fixed("user PIN", user_pin)?,
        })
    }
}

/// Slot selector shared by the three field reads and the erase command.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PwSafeSlot {
    pub slot_number: u8, // 0
}

/// `SET_PW_SAFE_SLOT_DATA_1`: name and password.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SetPwSafeSlotData1 {
    pub slot_number: u8,                      // 0
    pub slot_name: [u8; PWS_NAME_LEN],        // 1..12
    pub slot_password: [u8; PWS_PASSWORD_LEN], // 12..32
}

impl SetPwSafeSlotData1 {
    pub fn new(slot: u8, name: &str, password: &str) -> Result<Self> {
        Ok(Self {
            slot_number: slot,
            slot_name: pack_fixed("slot name", name.as_bytes())?,
            slot_password: pack_fixed("slot password", password.as_bytes())?,
        })
    }
}

/// `SET_PW_SAFE_SLOT_DATA_2`: login.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SetPwSafeSlotData2 {
    pub slot_number: u8,                // 0
    pub slot_login: [u8; PWS_LOGIN_LEN], // 1..33
}

impl SetPwSafeSlotData2 {
    pub fn new(slot: u8, login: &str) -> Result<Self> {
        Ok(Self {
            slot_number: slot,
            slot_login: pack_fixed("slot login", login.as_bytes())?,
        })
    }
}

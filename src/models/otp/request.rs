// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! OTP slot request payloads. Slot numbers here are *wire* numbers, i.e.
//! already offset per family (`0x10 + i` HOTP, `0x20 + i` TOTP); the catalog
//! helpers produce them and reject out-of-range indices before this layer.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U64};

use crate::{
    error::Result,
    models::otp::SlotConfig,
    utils::{TEMP_PASSWORD_LEN, pack_fixed},
};

pub const SLOT_NAME_LEN: usize = 15;
pub const SLOT_SECRET_LEN: usize = 20;
pub const TOKEN_ID_LEN: usize = 13;

/// `WRITE_TO_SLOT`: programs one HOTP or TOTP slot. The `slot_counter` word
/// is the HOTP counter or the TOTP time window, depending on the family.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct WriteToSlot {
    pub slot_number: u8,                     // 0
    pub slot_name: [u8; SLOT_NAME_LEN],      // 1..16
    pub slot_secret: [u8; SLOT_SECRET_LEN],  // 16..36
    pub slot_config: u8,                     // 36
    pub slot_token_id: [u8; TOKEN_ID_LEN],   // 37..50
    pub slot_counter: U64<LittleEndian>,     // 50..58
}

impl WriteToSlot {
    pub fn new(
        wire_slot: u8,
        name: &str,
        secret: &[u8],
        config: SlotConfig,
        token_id: &str,
        counter_or_window: u64,
    ) -> Result<Self> {
        Ok(Self {
            slot_number: wire_slot,
            slot_name: pack_fixed("slot name", name.as_bytes())?,
            slot_secret: pack_fixed("slot secret", secret)?,
            slot_config: config.bits(),
            slot_token_id: pack_fixed("token id", token_id.as_bytes())?,
            slot_counter: U64::new(counter_or_window),
        })
    }
}

/// `READ_SLOT`: fetches name, config, token id and counter of one slot.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ReadSlot {
    pub slot_number: u8, // 0
}

/// `ERASE_SLOT`. The temporary-password field stays zero here; the engine
/// splices the cached value in when sealing the report.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct EraseSlot {
    pub slot_number: u8,                                 // 0
    pub temporary_admin_password: [u8; TEMP_PASSWORD_LEN], // 1..26
}

impl EraseSlot {
    pub fn new(wire_slot: u8) -> Self {
        Self {
            slot_number: wire_slot,
            temporary_admin_password: [0; TEMP_PASSWORD_LEN],
        }
    }
}

/// `GET_CODE`. For TOTP the challenge/time/interval triple lets the firmware
/// warn when the host clock drifted backwards; HOTP leaves all three zero.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct GetCode {
    pub slot_number: u8,                 // 0
    pub challenge: U64<LittleEndian>,    // 1..9
    pub last_totp_time: U64<LittleEndian>, // 9..17
    pub last_interval: u8,               // 17
}

impl GetCode {
    pub fn hotp(wire_slot: u8) -> Self {
        Self {
            slot_number: wire_slot,
            ..Default::default()
        }
    }

    pub fn totp(wire_slot: u8, challenge: u64, last_time: u64, last_interval: u8) -> Self {
        Self {
            slot_number: wire_slot,
            challenge: U64::new(challenge),
            last_totp_time: U64::new(last_time),
            last_interval,
        }
    }
}

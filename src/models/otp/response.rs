// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U32, U64};

use crate::{
    error::{Error, Result},
    models::otp::{SlotConfig, request::{SLOT_NAME_LEN, TOKEN_ID_LEN}},
    utils::unpack_fixed,
};

/// `READ_SLOT` response. The secret is write-only and never read back.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ReadSlotResponse {
    pub slot_name: [u8; SLOT_NAME_LEN],    // 0..15
    pub slot_config: u8,                   // 15
    pub slot_token_id: [u8; TOKEN_ID_LEN], // 16..29
    pub slot_counter: U64<LittleEndian>,   // 29..37
}

impl ReadSlotResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| Error::Malformed("truncated ReadSlot response"))
    }

    pub fn name(&self) -> String {
        unpack_fixed(&self.slot_name)
    }

    pub fn config(&self) -> SlotConfig {
        SlotConfig::from_bits_truncate(self.slot_config)
    }

    pub fn token_id(&self) -> String {
        unpack_fixed(&self.slot_token_id)
    }
}

/// `GET_CODE` response.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct GetCodeResponse {
    pub code: U32<LittleEndian>, // 0..4
    pub slot_config: u8,         // 4
}

impl GetCodeResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| Error::Malformed("truncated GetCode response"))
    }

    /// The code as the device would type it: six digits unless the slot asks
    /// for eight.
    pub fn digits(&self) -> u8 {
        if SlotConfig::from_bits_truncate(self.slot_config)
            .contains(SlotConfig::USE_8_DIGITS)
        {
            8
        } else {
            6
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    error::{Error, Result},
    models::pws::{PWS_LOGIN_LEN, PWS_NAME_LEN, PWS_PASSWORD_LEN},
    utils::unpack_fixed,
};

/// `GET_PW_SAFE_SLOT_STATUS` response: one programmed/empty byte per slot.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PwSafeSlotStatus {
    pub programmed: [u8; 16], // 0..16
}

impl PwSafeSlotStatus {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| resp)
            .map_err(|_| Error::Malformed("truncated slot status response"))
    }

    pub fn is_programmed(&self, slot: u8) -> bool {
        self.programmed
            .get(slot as usize)
            .is_some_and(|b| *b != 0)
    }
}

/// `GET_PW_SAFE_SLOT_NAME` response.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PwSafeSlotName {
    pub slot_name: [u8; PWS_NAME_LEN], // 0..11
}

impl PwSafeSlotName {
    pub fn parse(payload: &[u8]) -> Result<String> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| unpack_fixed(&resp.slot_name))
            .map_err(|_| Error::Malformed("truncated slot name response"))
    }
}

/// `GET_PW_SAFE_SLOT_LOGIN` response.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PwSafeSlotLogin {
    pub slot_login: [u8; PWS_LOGIN_LEN], // 0..32
}

impl PwSafeSlotLogin {
    pub fn parse(payload: &[u8]) -> Result<String> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| unpack_fixed(&resp.slot_login))
            .map_err(|_| Error::Malformed("truncated slot login response"))
    }
}

/// `GET_PW_SAFE_SLOT_PASSWORD` response.
#[repr(C)]
#[derive(Debug, Default, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PwSafeSlotPassword {
    pub slot_password: [u8; PWS_PASSWORD_LEN], // 0..20
}

impl PwSafeSlotPassword {
    pub fn parse(payload: &[u8]) -> Result<String> {
        Self::read_from_prefix(payload)
            .map(|(resp, _)| unpack_fixed(&resp.slot_password))
            .map_err(|_| Error::Malformed("truncated slot password response"))
    }
}

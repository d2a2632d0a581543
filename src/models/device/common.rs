// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// The five general-config bytes, identical in `WRITE_CONFIG` requests and
/// the `GET_STATUS` response.
///
/// `numlock`/`capslock`/`scrolllock` hold an OTP slot index in `0..=1` to
/// bind that keyboard trigger, or any out-of-range value (conventionally
/// `0xff`) to disable it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct GeneralConfig {
    pub numlock: u8,              // 0
    pub capslock: u8,             // 1
    pub scrolllock: u8,           // 2
    pub enable_user_password: u8, // 3
    pub delete_user_password: u8, // 4
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            numlock: 0xff,
            capslock: 0xff,
            scrolllock: 0xff,
            enable_user_password: 0,
            delete_user_password: 0,
        }
    }
}

impl GeneralConfig {
    /// Whether OTP retrieval requires the user PIN.
    pub fn user_password_required(&self) -> bool {
        self.enable_user_password != 0
    }

    pub fn as_tuple(&self) -> (u8, u8, u8, bool, bool) {
        (
            self.numlock,
            self.capslock,
            self.scrolllock,
            self.enable_user_password != 0,
            self.delete_user_password != 0,
        )
    }
}

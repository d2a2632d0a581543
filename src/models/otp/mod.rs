// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod request;
pub mod response;

use bitflags::bitflags;

bitflags! {
    /// Per-slot option byte shared by write requests and read responses.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SlotConfig: u8 {
        /// Emit 8 digits instead of 6.
        const USE_8_DIGITS = 1 << 0;
        /// Send Enter after typing the code.
        const USE_ENTER = 1 << 1;
        /// Prefix the code with the slot's token id.
        const USE_TOKEN_ID = 1 << 2;
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Device integrity checksum.
//!
//! The token's microcontroller hashes reports with its hardware CRC unit:
//! CRC-32, polynomial `0x04C11DB7`, initial value `0xFFFFFFFF`, no input or
//! output reflection, no final XOR, consuming one 32-bit word per step. The
//! byte stream is read as little-endian words, but each word enters the
//! register most-significant-bit first.
//!
//! That per-word bit order is exactly CRC-32/MPEG-2 over the word's
//! big-endian byte rendering, so the implementation feeds the `crc` crate's
//! `CRC_32_MPEG_2` with byte-swapped words instead of hand-rolling the shift
//! loop.

use crc::{CRC_32_MPEG_2, Crc};

const DEVICE_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Checksum over `data`, which must be a multiple of 4 bytes long. Reports
/// hash bytes `[0..60)`, i.e. fifteen words.
pub fn device_crc(data: &[u8]) -> u32 {
    debug_assert_eq!(data.len() % 4, 0, "device CRC consumes whole words");

    let mut digest = DEVICE_CRC.digest();
    for word in data.chunks_exact(4) {
        let le = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        digest.update(&le.to_be_bytes());
    }
    digest.finalize()
}

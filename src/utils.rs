// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt::Write;

use rand::RngExt;

use crate::error::{Error, Result};

/// Length of a temporary password established by an authenticate command.
pub const TEMP_PASSWORD_LEN: usize = 25;

/// Generates a random 25-byte temporary password and returns:
/// - `[u8; 25]` for direct use in an authenticate payload
/// - `String` containing its hexadecimal representation (no prefix)
///
/// The firmware treats the value as opaque bytes; NUL is avoided so the
/// password survives C-string round-trips.
pub fn generate_temp_password() -> ([u8; TEMP_PASSWORD_LEN], String) {
    let mut tp = [0u8; TEMP_PASSWORD_LEN];
    rand::rng().fill(&mut tp);

    for b in &mut tp {
        if *b == 0 {
            *b = 0x7f;
        }
    }

    let mut hex = String::with_capacity(TEMP_PASSWORD_LEN * 2);
    for byte in &tp {
        write!(&mut hex, "{byte:02x}").expect("Writing to String cannot fail");
    }

    (tp, hex)
}

/// Packs `value` into a fixed NUL-padded field of `N` bytes. Oversize input is
/// a caller error and never reaches the device.
pub fn pack_fixed<const N: usize>(field: &'static str, value: &[u8]) -> Result<[u8; N]> {
    if value.len() > N {
        return Err(Error::TooLong {
            field,
            len: value.len(),
            max: N,
        });
    }
    let mut out = [0u8; N];
    out[..value.len()].copy_from_slice(value);
    Ok(out)
}

/// Reads a fixed NUL-padded field back into a `String`, truncating at the
/// first NUL. Non-UTF8 garbage is replaced rather than failing the whole
/// response.
pub fn unpack_fixed(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

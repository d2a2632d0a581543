// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Token model enumeration
///
/// Selects which member of the device family to drive. The Storage model
/// understands a superset of the Pro command set (encrypted volumes, firmware
/// update arming, SD-card handling).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    #[serde(rename = "Pro", alias = "pro", alias = "PRO", alias = "P")]
    Pro,
    #[serde(rename = "Storage", alias = "storage", alias = "STORAGE", alias = "S")]
    Storage,
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceModel::Pro => "Pro",
            DeviceModel::Storage => "Storage",
        })
    }
}

impl DeviceModel {
    /// USB vendor id shared by the family.
    pub const VENDOR_ID: u16 = 0x20a0;

    /// USB product id for this model.
    pub fn product_id(self) -> u16 {
        match self {
            DeviceModel::Pro => 0x4108,
            DeviceModel::Storage => 0x4109,
        }
    }

    /// `(vendor, product)` pair used for HID enumeration.
    pub fn usb_ids(self) -> (u16, u16) {
        (Self::VENDOR_ID, self.product_id())
    }
}

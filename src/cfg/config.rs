// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::DeviceModel;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Which token to look for and how to reach it.
    pub device: DeviceConfig,
    /// Busy-poll schedule applied after every request report.
    pub polling: PollingConfig,
    /// Implementation/runtime parameters outside the report protocol.
    pub runtime: RuntimeConfig,
}

/// Device selection settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceConfig {
    #[serde(default, rename = "Model")]
    /// Preferred model; `None` means probe Pro first, then Storage.
    pub model: Option<DeviceModel>,
}

/// Busy-poll schedule. The device answers `Busy` while a command is still
/// executing; the host re-reads with geometric backoff until the budget runs
/// out.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PollingConfig {
    #[serde(rename = "MaxAttempts")]
    /// Upper bound on status reads for one transaction.
    pub max_attempts: u32,

    #[serde(rename = "InitialDelayMs", with = "serde_millis")]
    /// Delay before the second read; doubles on every retry.
    pub initial_delay: Duration,

    #[serde(rename = "MaxDelayMs", with = "serde_millis")]
    /// Backoff cap.
    pub max_delay: Duration,
}

/// Runtime-only settings that never influence report contents.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "IoTimeoutMs", with = "serde_millis")]
    /// Timeout for a single HID read or write.
    pub io_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig { model: None },
            polling: PollingConfig {
                max_attempts: 40,
                initial_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(200),
            },
            runtime: RuntimeConfig {
                io_timeout: Duration::from_millis(500),
            },
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.polling.max_attempts >= 1, "MaxAttempts must be >= 1");

        ensure!(
            !self.polling.initial_delay.is_zero(),
            "InitialDelayMs must be > 0"
        );

        // A cap below the starting point would make the schedule regress.
        if self.polling.max_delay < self.polling.initial_delay {
            self.polling.max_delay = self.polling.initial_delay;
        }

        ensure!(!self.runtime.io_timeout.is_zero(), "IoTimeoutMs must be > 0");

        Ok(())
    }

    /// Backoff delay before poll attempt `attempt` (0-based; the first read
    /// happens immediately).
    pub fn poll_delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .polling
            .initial_delay
            .saturating_mul(1u32 << attempt.min(16));
        doubled.min(self.polling.max_delay)
    }
}

/// Serde helpers for representing `Duration` as a number of milliseconds.
mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

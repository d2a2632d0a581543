// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable consulted by [`default_config_path`].
pub const CONFIG_ENV: &str = "NK_CONFIG";

/// Resolves `rel` against the current working directory and canonicalizes it.
pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}

/// Config path from `NK_CONFIG`, falling back to `fallback`.
pub fn default_config_path(fallback: &str) -> Result<PathBuf> {
    match std::env::var(CONFIG_ENV) {
        Ok(p) if !p.is_empty() => resolve_config_path(&p),
        _ => resolve_config_path(fallback),
    }
}

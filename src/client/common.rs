// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{io, time::Duration};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

pub(super) async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Transport(io::Error::new(
            io::ErrorKind::Interrupted,
            format!("{label} cancelled"),
        ))),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(Error::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{label} timeout"),
                ))),
            }
        }
    }
}

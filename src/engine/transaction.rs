// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The one transaction shape every command shares.
//!
//! ```text
//! privilege check -> encode -> [authorize leg] -> write -> poll -> parse
//! ```
//!
//! Polling re-reads the device's response report until the status stops being
//! `Busy` *and* the echoed CRC matches the request we sent; a mismatched echo
//! is a stale answer to some earlier command and keeps the poll alive. The
//! backoff schedule and attempt budget come from [`Config`](crate::cfg::config::Config).
//!
//! Session bookkeeping happens here and nowhere else: `last_status` tracks
//! every completed poll, `User_Not_Authenticated` drops the cached user
//! credential, and transport faults wipe both temporary passwords because the
//! device may have dropped the session on its side.

use tokio::time::sleep;
use tracing::{debug, warn};
use zerocopy::IntoBytes;

use crate::{
    client::{device::DeviceConnection, manager::Session, transport::HidTransport},
    error::{Error, Result},
    models::{
        auth::request::Authorize,
        catalog::{self, AuthScheme, CommandDescriptor},
        command::Privilege,
        report::{RequestReport, ResponseReport},
        status::DeviceStatus,
    },
};

/// Runs one command against the connected device. The caller must hold the
/// manager's device lock for the whole call; nothing here re-checks it.
pub async fn run<T: HidTransport>(
    conn: &DeviceConnection<T>,
    session: &mut Session,
    desc: &CommandDescriptor,
    payload: &[u8],
) -> Result<ResponseReport> {
    let mut req = RequestReport::encode(desc.id, payload)?;

    match desc.auth {
        AuthScheme::None => {},
        AuthScheme::InlineTemp { offset } => {
            let temp = session.temp_for(desc.privilege)?;
            req.splice_payload(offset, &temp)?;
        },
        AuthScheme::Challenge => {
            let temp = session.temp_for(desc.privilege)?;
            let leg_desc = match desc.privilege {
                Privilege::Admin => &catalog::AUTHORIZE,
                Privilege::User => &catalog::USER_AUTHORIZE,
                Privilege::None => {
                    return Err(Error::Malformed(
                        "challenge descriptor without a privilege level",
                    ));
                },
            };

            // Bind the CRC of the request we are about to send.
            let authorize = Authorize::new(req.crc(), temp);
            let leg = RequestReport::encode(leg_desc.id, authorize.as_bytes())?;
            settle(conn, session, &leg).await?;
        },
    }

    settle(conn, session, &req).await
}

/// Writes `req` and polls until the device settles on a final status for it.
async fn settle<T: HidTransport>(
    conn: &DeviceConnection<T>,
    session: &mut Session,
    req: &RequestReport,
) -> Result<ResponseReport> {
    let outcome = write_and_poll(conn, req).await;

    match outcome {
        Ok(resp) => {
            session.last_status = Some(resp.status());
            match resp.status() {
                DeviceStatus::Ok => Ok(resp),
                status => {
                    if status == DeviceStatus::UserNotAuthenticated {
                        session.drop_user_temp();
                    }
                    Err(Error::Device(status))
                },
            }
        },
        Err(e) => {
            if e.invalidates_session() {
                warn!("transport fault, invalidating temporary passwords: {e}");
                session.clear_temps();
            }
            if matches!(e, Error::Timeout) {
                session.needs_resync = true;
            }
            Err(e)
        },
    }
}

async fn write_and_poll<T: HidTransport>(
    conn: &DeviceConnection<T>,
    req: &RequestReport,
) -> Result<ResponseReport> {
    conn.write_report(req).await?;

    let max_attempts = conn.cfg.polling.max_attempts;
    let mut attempt = 0u32;
    loop {
        let raw = conn.read_report().await?;
        let resp = ResponseReport::parse(raw)?;

        if resp.crc_echo() != req.crc() {
            debug!(
                "stale response: echo=0x{:08x} want=0x{:08x}",
                resp.crc_echo(),
                req.crc()
            );
        } else if resp.status() != DeviceStatus::Busy {
            debug!("RECV cmd=0x{:02x} status={}", req.command_id(), resp.status());
            return Ok(resp);
        }

        attempt += 1;
        if attempt >= max_attempts {
            warn!(
                "cmd=0x{:02x} still busy after {max_attempts} polls",
                req.command_id()
            );
            return Err(Error::Timeout);
        }
        sleep(conn.cfg.poll_delay(attempt - 1)).await;
    }
}

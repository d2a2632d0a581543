// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scripted in-memory token.
//!
//! Implements the HID backend the way real firmware would behave for the
//! commands under test, plus fault-injection knobs (busy streaks, corrupted
//! CRCs, stale echo words) the hardware cannot produce on demand.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex as StdMutex},
};

use nitrokey_client_rs::{
    cfg::{config::Config, enums::DeviceModel, logger::init_logger},
    client::{
        manager::DeviceManager,
        transport::{HidBackend, HidTransport},
    },
    crc::device_crc,
    models::{
        auth::request::{
            Authorize, ChangePin, FirstAuthenticate, UnlockUserPassword, UserAuthenticate,
        },
        command::CommandId,
        device::{
            common::GeneralConfig,
            request::{BuildAesKey, DetectScAes, FactoryReset, SetTime, WriteGeneralConfig},
            response::{RetryCountResponse, StatusResponse, TimeResponse},
        },
        otp::{
            request::{EraseSlot, GetCode, ReadSlot, WriteToSlot},
            response::{GetCodeResponse, ReadSlotResponse},
        },
        pws::{
            request::{PwSafeEnable, PwSafeSlot, SetPwSafeSlotData1, SetPwSafeSlotData2},
            response::{
                PwSafeSlotLogin, PwSafeSlotName, PwSafeSlotPassword, PwSafeSlotStatus,
            },
        },
        report::{REPORT_LEN, build_response},
        status::DeviceStatus,
        storage::request::{ChangeUpdatePin, FillSdCard, SetupHiddenVolume, StoragePassword},
    },
    utils::unpack_fixed,
};
use zerocopy::{FromBytes, IntoBytes, U16, U32, U64};

pub const DEFAULT_ADMIN_PIN: &str = "12345678";
pub const DEFAULT_USER_PIN: &str = "123456";
pub const FIRMWARE_VERSION: u16 = 0x000a;
pub const CARD_SERIAL: u32 = 0x0000_5e1f;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Level {
    Admin,
    User,
}

#[derive(Clone, Default)]
pub struct OtpSlot {
    pub name: [u8; 15],
    pub secret: [u8; 20],
    pub config: u8,
    pub token_id: [u8; 13],
    pub counter: u64,
}

#[derive(Clone, Default)]
pub struct PwsSlot {
    pub name: String,
    pub login: String,
    pub password: String,
}

pub struct TokenState {
    pub model: DeviceModel,
    pub admin_pin: String,
    pub user_pin: String,
    pub admin_retry: u8,
    pub user_retry: u8,
    admin_temp: Option<[u8; 25]>,
    user_temp: Option<[u8; 25]>,
    authorized: Option<(u32, Level)>,

    pub otp_slots: HashMap<u8, OtpSlot>,
    pub pws_slots: [Option<PwsSlot>; 16],
    pub pws_enabled: bool,
    pub general_config: GeneralConfig,
    pub clock: u64,
    pub aes_supported: bool,

    /// Command ids the firmware executed with status Ok, in order.
    pub ops_log: Vec<u8>,

    /// Serve this many Busy reads before the real response.
    pub inject_busy_reads: u32,
    /// Flip a CRC byte of the next response read.
    pub corrupt_next_response: bool,
    /// Serve one response with a mismatched echo word first.
    pub stale_echo_next_response: bool,
    /// Flip a payload byte of the next request, as line noise would.
    pub mangle_next_request: bool,

    queued_busy: u32,
    last_request_crc: u32,
    response: [u8; REPORT_LEN],
}

impl TokenState {
    pub fn new(model: DeviceModel) -> Self {
        Self {
            model,
            admin_pin: DEFAULT_ADMIN_PIN.to_string(),
            user_pin: DEFAULT_USER_PIN.to_string(),
            admin_retry: 3,
            user_retry: 3,
            admin_temp: None,
            user_temp: None,
            authorized: None,
            otp_slots: HashMap::new(),
            pws_slots: Default::default(),
            pws_enabled: false,
            general_config: GeneralConfig::default(),
            clock: 1_600_000_000,
            aes_supported: true,
            ops_log: Vec::new(),
            inject_busy_reads: 0,
            corrupt_next_response: false,
            stale_echo_next_response: false,
            mangle_next_request: false,
            queued_busy: 0,
            last_request_crc: 0,
            response: build_response(0, DeviceStatus::Ok, &[]),
        }
    }

    pub fn has_admin_temp(&self) -> bool {
        self.admin_temp.is_some()
    }

    /// Simulates the device dropping the user session on its side.
    pub fn lock_user_session(&mut self) {
        self.user_temp = None;
    }

    /// Stops an injected busy streak.
    pub fn queued_busy_reset(&mut self) {
        self.queued_busy = 0;
    }

    fn take_authorization(&mut self, level: Level, crc: u32) -> bool {
        if self.authorized == Some((crc, level)) {
            self.authorized = None;
            true
        } else {
            false
        }
    }

    fn handle_write(&mut self, report: &[u8; REPORT_LEN]) {
        let mut mangled;
        let report = if self.mangle_next_request {
            self.mangle_next_request = false;
            mangled = *report;
            mangled[1] ^= 0xff;
            &mangled
        } else {
            report
        };

        let stored = u32::from_le_bytes([report[60], report[61], report[62], report[63]]);
        self.last_request_crc = stored;

        let (status, payload) = if device_crc(&report[..60]) != stored {
            (DeviceStatus::WrongCrc, Vec::new())
        } else {
            match CommandId::from_u8(report[0]) {
                Some(cmd) => {
                    let (status, payload) = self.dispatch(cmd, &report[1..60], stored);
                    if status == DeviceStatus::Ok {
                        self.ops_log.push(cmd as u8);
                    }
                    (status, payload)
                },
                None => (DeviceStatus::UnknownCommand, Vec::new()),
            }
        };

        self.response = build_response(stored, status, &payload);
        self.queued_busy = std::mem::take(&mut self.inject_busy_reads);
    }

    fn handle_read(&mut self) -> [u8; REPORT_LEN] {
        if self.queued_busy > 0 {
            self.queued_busy -= 1;
            return build_response(self.last_request_crc, DeviceStatus::Busy, &[]);
        }
        if self.stale_echo_next_response {
            self.stale_echo_next_response = false;
            return build_response(!self.last_request_crc, DeviceStatus::Ok, &[]);
        }

        let mut out = self.response;
        if self.corrupt_next_response {
            self.corrupt_next_response = false;
            out[63] ^= 0x01;
        }
        out
    }

    fn dispatch(
        &mut self,
        cmd: CommandId,
        payload: &[u8],
        crc: u32,
    ) -> (DeviceStatus, Vec<u8>) {
        use DeviceStatus::*;

        match cmd {
            CommandId::GetStatus => {
                let resp = StatusResponse {
                    firmware_version: U16::new(FIRMWARE_VERSION),
                    card_serial: U32::new(CARD_SERIAL),
                    general_config: self.general_config,
                };
                (Ok, resp.as_bytes().to_vec())
            },

            CommandId::GetPasswordRetryCount => {
                let resp = RetryCountResponse {
                    count: self.admin_retry,
                };
                (Ok, resp.as_bytes().to_vec())
            },

            CommandId::GetUserPasswordRetryCount => {
                let resp = RetryCountResponse {
                    count: self.user_retry,
                };
                (Ok, resp.as_bytes().to_vec())
            },

            CommandId::FirstAuthenticate => {
                let Result::Ok((req, _)) = FirstAuthenticate::read_from_prefix(payload)
                else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.card_password) == self.admin_pin {
                    self.admin_temp = Some(req.temporary_password);
                    self.admin_retry = 3;
                    (Ok, Vec::new())
                } else {
                    self.admin_retry = self.admin_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::UserAuthenticate => {
                let Result::Ok((req, _)) = UserAuthenticate::read_from_prefix(payload)
                else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.card_password) == self.user_pin {
                    self.user_temp = Some(req.temporary_password);
                    self.user_retry = 3;
                    (Ok, Vec::new())
                } else {
                    self.user_retry = self.user_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::Authorize => {
                let Result::Ok((req, _)) = Authorize::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                match self.admin_temp {
                    None => (UserNotAuthenticated, Vec::new()),
                    Some(temp) if temp == req.temporary_password => {
                        self.authorized = Some((req.crc_to_authorize.get(), Level::Admin));
                        (Ok, Vec::new())
                    },
                    Some(_) => (WrongPassword, Vec::new()),
                }
            },

            CommandId::UserAuthorize => {
                let Result::Ok((req, _)) = Authorize::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                match self.user_temp {
                    None => (UserNotAuthenticated, Vec::new()),
                    Some(temp) if temp == req.temporary_password => {
                        self.authorized = Some((req.crc_to_authorize.get(), Level::User));
                        (Ok, Vec::new())
                    },
                    Some(_) => (WrongPassword, Vec::new()),
                }
            },

            CommandId::LockDevice => {
                self.admin_temp = None;
                self.user_temp = None;
                self.authorized = None;
                self.pws_enabled = false;
                (Ok, Vec::new())
            },

            CommandId::WriteToSlot => {
                if !self.take_authorization(Level::Admin, crc) {
                    return (UserNotAuthenticated, Vec::new());
                }
                let Result::Ok((req, _)) = WriteToSlot::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if !wire_slot_valid(req.slot_number) {
                    return (WrongSlot, Vec::new());
                }
                if req.slot_name.iter().all(|b| *b == 0) {
                    return (NoNameError, Vec::new());
                }
                self.otp_slots.insert(
                    req.slot_number,
                    OtpSlot {
                        name: req.slot_name,
                        secret: req.slot_secret,
                        config: req.slot_config,
                        token_id: req.slot_token_id,
                        counter: req.slot_counter.get(),
                    },
                );
                (Ok, Vec::new())
            },

            CommandId::ReadSlot => {
                if !self.take_authorization(Level::Admin, crc) {
                    return (UserNotAuthenticated, Vec::new());
                }
                let Result::Ok((req, _)) = ReadSlot::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                match self.otp_slots.get(&req.slot_number) {
                    Some(slot) => {
                        let resp = ReadSlotResponse {
                            slot_name: slot.name,
                            slot_config: slot.config,
                            slot_token_id: slot.token_id,
                            slot_counter: U64::new(slot.counter),
                        };
                        (Ok, resp.as_bytes().to_vec())
                    },
                    None => (SlotNotProgrammed, Vec::new()),
                }
            },

            CommandId::EraseSlot => {
                let Result::Ok((req, _)) = EraseSlot::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if self.admin_temp != Some(req.temporary_admin_password) {
                    return (UserNotAuthenticated, Vec::new());
                }
                self.otp_slots.remove(&req.slot_number);
                (Ok, Vec::new())
            },

            CommandId::GetCode => {
                let Result::Ok((req, _)) = GetCode::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if self.general_config.user_password_required()
                    && !self.take_authorization(Level::User, crc)
                {
                    return (UserNotAuthenticated, Vec::new());
                }
                match self.otp_slots.get_mut(&req.slot_number) {
                    Some(slot) => {
                        slot.counter = slot.counter.wrapping_add(1);
                        let eight = slot.config & 0b1 != 0;
                        let resp = GetCodeResponse {
                            code: U32::new(if eight { 84_755_224 } else { 755_224 }),
                            slot_config: slot.config,
                        };
                        (Ok, resp.as_bytes().to_vec())
                    },
                    None => (SlotNotProgrammed, Vec::new()),
                }
            },

            CommandId::WriteConfig => {
                let Result::Ok((req, _)) = WriteGeneralConfig::read_from_prefix(payload)
                else {
                    return (WrongCrc, Vec::new());
                };
                if self.admin_temp != Some(req.temporary_admin_password) {
                    return (UserNotAuthenticated, Vec::new());
                }
                self.general_config = req.config;
                (Ok, Vec::new())
            },

            CommandId::ChangeAdminPin => {
                let Result::Ok((req, _)) = ChangePin::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.current_password) == self.admin_pin {
                    self.admin_pin = unpack_fixed(&req.new_password);
                    self.admin_retry = 3;
                    (Ok, Vec::new())
                } else {
                    self.admin_retry = self.admin_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::ChangeUserPin => {
                let Result::Ok((req, _)) = ChangePin::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.current_password) == self.user_pin {
                    self.user_pin = unpack_fixed(&req.new_password);
                    self.user_retry = 3;
                    (Ok, Vec::new())
                } else {
                    self.user_retry = self.user_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::UnlockUserPassword => {
                let Result::Ok((req, _)) = UnlockUserPassword::read_from_prefix(payload)
                else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.admin_password) == self.admin_pin {
                    self.user_pin = unpack_fixed(&req.user_new_password);
                    self.user_retry = 3;
                    (Ok, Vec::new())
                } else {
                    self.admin_retry = self.admin_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::FactoryReset => {
                let Result::Ok((req, _)) = FactoryReset::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.admin_password) == self.admin_pin {
                    let model = self.model;
                    let aes = self.aes_supported;
                    *self = TokenState::new(model);
                    self.aes_supported = aes;
                    (Ok, Vec::new())
                } else {
                    self.admin_retry = self.admin_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::NewAesKey => {
                let Result::Ok((req, _)) = BuildAesKey::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.admin_password) == self.admin_pin {
                    (Ok, Vec::new())
                } else {
                    self.admin_retry = self.admin_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::DetectScAes => {
                let Result::Ok((req, _)) = DetectScAes::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.user_password) != self.user_pin {
                    self.user_retry = self.user_retry.saturating_sub(1);
                    return (WrongPassword, Vec::new());
                }
                if self.aes_supported {
                    (Ok, Vec::new())
                } else {
                    (NotSupported, Vec::new())
                }
            },

            CommandId::SetTime => {
                let Result::Ok((req, _)) = SetTime::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                self.clock = req.timestamp.get();
                (Ok, Vec::new())
            },

            CommandId::TestTime => {
                let resp = TimeResponse {
                    time: U64::new(self.clock),
                };
                (Ok, resp.as_bytes().to_vec())
            },

            CommandId::PwSafeEnable => {
                let Result::Ok((req, _)) = PwSafeEnable::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if unpack_fixed(&req.user_password) == self.user_pin {
                    self.pws_enabled = true;
                    self.user_retry = 3;
                    (Ok, Vec::new())
                } else {
                    self.user_retry = self.user_retry.saturating_sub(1);
                    (WrongPassword, Vec::new())
                }
            },

            CommandId::GetPwSafeSlotStatus => {
                if !self.pws_enabled {
                    return (UserNotAuthenticated, Vec::new());
                }
                let mut resp = PwSafeSlotStatus::default();
                for (i, slot) in self.pws_slots.iter().enumerate() {
                    resp.programmed[i] = u8::from(slot.is_some());
                }
                (Ok, resp.as_bytes().to_vec())
            },

            CommandId::GetPwSafeSlotName
            | CommandId::GetPwSafeSlotLogin
            | CommandId::GetPwSafeSlotPassword => {
                if !self.pws_enabled {
                    return (UserNotAuthenticated, Vec::new());
                }
                let Result::Ok((req, _)) = PwSafeSlot::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                let Some(Some(slot)) = self.pws_slots.get(req.slot_number as usize) else {
                    return (SlotNotProgrammed, Vec::new());
                };
                let resp = match cmd {
                    CommandId::GetPwSafeSlotName => {
                        let mut r = PwSafeSlotName::default();
                        fill(&mut r.slot_name, &slot.name);
                        r.as_bytes().to_vec()
                    },
                    CommandId::GetPwSafeSlotLogin => {
                        let mut r = PwSafeSlotLogin::default();
                        fill(&mut r.slot_login, &slot.login);
                        r.as_bytes().to_vec()
                    },
                    _ => {
                        let mut r = PwSafeSlotPassword::default();
                        fill(&mut r.slot_password, &slot.password);
                        r.as_bytes().to_vec()
                    },
                };
                (Ok, resp)
            },

            CommandId::SetPwSafeSlotData1 => {
                if !self.pws_enabled {
                    return (UserNotAuthenticated, Vec::new());
                }
                let Result::Ok((req, _)) = SetPwSafeSlotData1::read_from_prefix(payload)
                else {
                    return (WrongCrc, Vec::new());
                };
                let Some(entry) = self.pws_slots.get_mut(req.slot_number as usize) else {
                    return (WrongSlot, Vec::new());
                };
                let slot = entry.get_or_insert_with(PwsSlot::default);
                slot.name = unpack_fixed(&req.slot_name);
                slot.password = unpack_fixed(&req.slot_password);
                (Ok, Vec::new())
            },

            CommandId::SetPwSafeSlotData2 => {
                if !self.pws_enabled {
                    return (UserNotAuthenticated, Vec::new());
                }
                let Result::Ok((req, _)) = SetPwSafeSlotData2::read_from_prefix(payload)
                else {
                    return (WrongCrc, Vec::new());
                };
                let Some(entry) = self.pws_slots.get_mut(req.slot_number as usize) else {
                    return (WrongSlot, Vec::new());
                };
                let slot = entry.get_or_insert_with(PwsSlot::default);
                slot.login = unpack_fixed(&req.slot_login);
                (Ok, Vec::new())
            },

            CommandId::PwSafeEraseSlot => {
                if !self.pws_enabled {
                    return (UserNotAuthenticated, Vec::new());
                }
                let Result::Ok((req, _)) = PwSafeSlot::read_from_prefix(payload) else {
                    return (WrongCrc, Vec::new());
                };
                if let Some(entry) = self.pws_slots.get_mut(req.slot_number as usize) {
                    *entry = None;
                }
                (Ok, Vec::new())
            },

            CommandId::EnableCryptedPartition
            | CommandId::DisableCryptedPartition
            | CommandId::EnableHiddenCryptedPartition
            | CommandId::DisableHiddenCryptedPartition
            | CommandId::EnableFirmwareUpdate
            | CommandId::ExportFirmwareToFile
            | CommandId::FillSdCardWithRandomChars
            | CommandId::EnableReadonlyUncryptedLun
            | CommandId::EnableReadwriteUncryptedLun
            | CommandId::SendHiddenVolumeSetup
            | CommandId::ChangeUpdatePin
            | CommandId::SendLockStickHardware => self.dispatch_storage(cmd, payload),

            _ => (UnknownCommand, Vec::new()),
        }
    }

    fn dispatch_storage(
        &mut self,
        cmd: CommandId,
        payload: &[u8],
    ) -> (DeviceStatus, Vec<u8>) {
        use DeviceStatus::*;

        if self.model != DeviceModel::Storage {
            return (UnknownCommand, Vec::new());
        }

        let password_ok = match cmd {
            CommandId::DisableCryptedPartition
            | CommandId::DisableHiddenCryptedPartition => true,
            CommandId::FillSdCardWithRandomChars => FillSdCard::read_from_prefix(payload)
                .is_ok_and(|(req, _)| !unpack_fixed(&req.password).is_empty()),
            CommandId::SendHiddenVolumeSetup => SetupHiddenVolume::read_from_prefix(payload)
                .is_ok_and(|(req, _)| !unpack_fixed(&req.password).is_empty()),
            CommandId::ChangeUpdatePin => ChangeUpdatePin::read_from_prefix(payload)
                .is_ok_and(|(req, _)| !unpack_fixed(&req.old_password).is_empty()),
            _ => StoragePassword::read_from_prefix(payload)
                .is_ok_and(|(req, _)| !unpack_fixed(&req.password).is_empty()),
        };

        if password_ok {
            (Ok, Vec::new())
        } else {
            (WrongPassword, Vec::new())
        }
    }
}

fn fill(dst: &mut [u8], src: &str) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
}

fn wire_slot_valid(wire: u8) -> bool {
    (0x10..0x13).contains(&wire) || (0x20..0x2f).contains(&wire)
}

/// One open handle onto the shared token state.
pub struct FakeTransport {
    state: Arc<StdMutex<TokenState>>,
}

impl HidTransport for FakeTransport {
    fn write_report(
        &mut self,
        report: &[u8; REPORT_LEN],
    ) -> impl Future<Output = io::Result<()>> + Send {
        let state = self.state.clone();
        let report = *report;
        async move {
            state
                .lock()
                .expect("token state poisoned")
                .handle_write(&report);
            Ok(())
        }
    }

    fn read_report(
        &mut self,
        buf: &mut [u8; REPORT_LEN],
    ) -> impl Future<Output = io::Result<()>> + Send {
        let out = self.state.lock().expect("token state poisoned").handle_read();
        async move {
            *buf = out;
            Ok(())
        }
    }
}

/// Opens the fake token when the requested USB ids match its model.
#[derive(Clone)]
pub struct FakeBackend {
    pub state: Arc<StdMutex<TokenState>>,
}

impl FakeBackend {
    pub fn new(model: DeviceModel) -> Self {
        Self {
            state: Arc::new(StdMutex::new(TokenState::new(model))),
        }
    }
}

impl HidBackend for FakeBackend {
    type Transport = FakeTransport;

    fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> impl Future<Output = io::Result<FakeTransport>> + Send {
        let state = self.state.clone();
        async move {
            let model = state.lock().expect("token state poisoned").model;
            if model.usb_ids() == (vendor_id, product_id) {
                Ok(FakeTransport { state })
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such device"))
            }
        }
    }
}

pub fn test_path() -> String {
    std::env::var("TEST_CONFIG").unwrap_or_else(|_| "tests/config.yaml".into())
}

pub fn test_config() -> Config {
    Config::load_from_file(test_path()).expect("failed to load test config")
}

pub fn fake_manager(
    model: DeviceModel,
) -> (DeviceManager<FakeBackend>, Arc<StdMutex<TokenState>>) {
    // First caller installs the global subscriber; later calls are no-ops.
    let _ = init_logger(&test_path());

    let backend = FakeBackend::new(model);
    let state = backend.state.clone();
    (DeviceManager::new(backend, test_config()), state)
}

/// Connected manager plus a handle on the token state.
pub async fn connected(
    model: DeviceModel,
) -> (DeviceManager<FakeBackend>, Arc<StdMutex<TokenState>>) {
    let (manager, state) = fake_manager(model);
    manager.connect(model).await.expect("connect failed");
    (manager, state)
}

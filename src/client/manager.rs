// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zerocopy::IntoBytes;

use crate::{
    cfg::{config::Config, enums::DeviceModel},
    client::{device::DeviceConnection, transport::HidBackend},
    engine,
    error::{Error, Result},
    models::{
        auth::request::{
            ChangePin, FirstAuthenticate, UnlockUserPassword, UserAuthenticate,
        },
        catalog::{self, CommandDescriptor},
        command::{CommandId, Privilege},
        device::{
            common::GeneralConfig,
            request::{BuildAesKey, DetectScAes, FactoryReset, SetTime, WriteGeneralConfig},
            response::{RetryCountResponse, StatusResponse, TimeResponse},
        },
        otp::{
            SlotConfig,
            request::{EraseSlot, GetCode, ReadSlot, WriteToSlot},
            response::{GetCodeResponse, ReadSlotResponse},
        },
        pws::{
            request::{PwSafeEnable, PwSafeSlot, SetPwSafeSlotData1, SetPwSafeSlotData2},
            response::{
                PwSafeSlotLogin, PwSafeSlotName, PwSafeSlotPassword, PwSafeSlotStatus,
            },
        },
        report::ResponseReport,
        status::DeviceStatus,
        storage::{
            VolumeAccessMode,
            request::{ChangeUpdatePin, FillSdCard, SetupHiddenVolume, StoragePassword},
        },
    },
    utils::{TEMP_PASSWORD_LEN, pack_fixed},
};

/// Per-device authentication state.
///
/// Created on connect, torn down on disconnect. Temporary passwords live only
/// here; transport faults and factory resets wipe them.
pub struct Session {
    pub model: DeviceModel,
    admin_temp: Option<[u8; TEMP_PASSWORD_LEN]>,
    user_temp: Option<[u8; TEMP_PASSWORD_LEN]>,
    /// Status byte of the most recent completed transaction, for callers
    /// whose primary return channel cannot carry an error.
    pub last_status: Option<DeviceStatus>,
    /// Set after a poll timeout; forces a status query before the next
    /// logical operation because the device may have advanced meanwhile.
    pub needs_resync: bool,
}

impl Session {
    pub fn new(model: DeviceModel) -> Self {
        Self {
            model,
            admin_temp: None,
            user_temp: None,
            last_status: None,
            needs_resync: false,
        }
    }

    /// Cached temporary password for `privilege`, or the matching
    /// programming error. `Privilege::None` commands never ask.
    pub fn temp_for(&self, privilege: Privilege) -> Result<[u8; TEMP_PASSWORD_LEN]> {
        let cached = match privilege {
            Privilege::None => None,
            Privilege::User => self.user_temp,
            Privilege::Admin => self.admin_temp,
        };
        cached.ok_or(Error::NotAuthenticated(privilege))
    }

    pub fn set_admin_temp(&mut self, temp: [u8; TEMP_PASSWORD_LEN]) {
        self.admin_temp = Some(temp);
    }

    pub fn set_user_temp(&mut self, temp: [u8; TEMP_PASSWORD_LEN]) {
        self.user_temp = Some(temp);
    }

    pub fn drop_user_temp(&mut self) {
        self.user_temp = None;
    }

    pub fn clear_temps(&mut self) {
        self.admin_temp = None;
        self.user_temp = None;
    }

    pub fn has_admin_temp(&self) -> bool {
        self.admin_temp.is_some()
    }

    pub fn has_user_temp(&self) -> bool {
        self.user_temp.is_some()
    }
}

// Temporary passwords are secrets; show presence only.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("model", &self.model)
            .field("admin_temp", &self.admin_temp.is_some())
            .field("user_temp", &self.user_temp.is_some())
            .field("last_status", &self.last_status)
            .field("needs_resync", &self.needs_resync)
            .finish()
    }
}

struct Active<T> {
    conn: DeviceConnection<T>,
    session: Session,
}

/// Owns at most one connected token and serializes every transaction against
/// it. All typed operations below hold the manager lock from request write
/// through response parse, so concurrent callers can never interleave
/// request/response pairs.
pub struct DeviceManager<B: HidBackend> {
    backend: B,
    cfg: Config,
    active: Mutex<Option<Active<B::Transport>>>,
}

impl<B: HidBackend> DeviceManager<B> {
    pub fn new(backend: B, cfg: Config) -> Self {
        Self {
            backend,
            cfg,
            active: Mutex::new(None),
        }
    }

    /* Lifecycle */

    /// Opens the first device matching `model`. Connecting twice without a
    /// `disconnect` in between is a caller error.
    pub async fn connect(&self, model: DeviceModel) -> Result<()> {
        let mut guard = self.active.lock().await;
        if guard.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let (vid, pid) = model.usb_ids();
        let transport = match self.backend.open(vid, pid).await {
            Ok(t) => t,
            Err(e) => {
                debug!("open {model} ({vid:04x}:{pid:04x}) failed: {e}");
                return Err(Error::DeviceNotFound(model));
            },
        };

        info!("connected {model} ({vid:04x}:{pid:04x})");
        *guard = Some(Active {
            conn: DeviceConnection::new(transport, self.cfg.clone()),
            session: Session::new(model),
        });
        Ok(())
    }

    /// Tries the configured model first (when set), then Pro, then Storage.
    pub async fn connect_auto(&self) -> Result<()> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(preferred) = self.cfg.device.model {
            candidates.push(preferred);
        }
        for model in [DeviceModel::Pro, DeviceModel::Storage] {
            if !candidates.contains(&model) {
                candidates.push(model);
            }
        }

        for model in candidates {
            match self.connect(model).await {
                Ok(()) => return Ok(()),
                Err(Error::DeviceNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::DeviceNotFound(DeviceModel::Pro))
    }

    /// Tears down the session and closes the HID handle.
    pub async fn disconnect(&self) -> Result<()> {
        let mut guard = self.active.lock().await;
        let active = guard.take().ok_or(Error::NotConnected)?;
        active.conn.close().await?;
        info!("disconnected {}", active.session.model);
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn model(&self) -> Result<DeviceModel> {
        let guard = self.active.lock().await;
        guard
            .as_ref()
            .map(|a| a.session.model)
            .ok_or(Error::NotConnected)
    }

    /// Status byte of the most recent completed transaction.
    pub async fn last_command_status(&self) -> Result<Option<DeviceStatus>> {
        let guard = self.active.lock().await;
        guard
            .as_ref()
            .map(|a| a.session.last_status)
            .ok_or(Error::NotConnected)
    }

    /* Internals */

    async fn run_on(
        active: &mut Active<B::Transport>,
        desc: &CommandDescriptor,
        payload: &[u8],
    ) -> Result<ResponseReport> {
        if desc.storage_only && active.session.model != DeviceModel::Storage {
            return Err(Error::WrongModel {
                required: DeviceModel::Storage,
                connected: active.session.model,
            });
        }

        if active.session.needs_resync && desc.id != CommandId::GetStatus {
            debug!("re-syncing device status after poll timeout");
            engine::run(&active.conn, &mut active.session, &catalog::GET_STATUS, &[])
                .await?;
            active.session.needs_resync = false;
        }

        engine::run(&active.conn, &mut active.session, desc, payload).await
    }

    async fn transact(
        &self,
        desc: &CommandDescriptor,
        payload: &[u8],
    ) -> Result<ResponseReport> {
        let mut guard = self.active.lock().await;
        let active = guard.as_mut().ok_or(Error::NotConnected)?;
        Self::run_on(active, desc, payload).await
    }

    /* Status & identity */

    pub async fn get_status(&self) -> Result<StatusResponse> {
        let resp = self.transact(&catalog::GET_STATUS, &[]).await?;
        StatusResponse::parse(resp.payload())
    }

    /// Card serial in lower-case hex, as the C API renders it.
    pub async fn get_serial_number(&self) -> Result<String> {
        Ok(self.get_status().await?.serial_hex())
    }

    pub async fn get_admin_retry_count(&self) -> Result<u8> {
        let resp = self
            .transact(&catalog::GET_PASSWORD_RETRY_COUNT, &[])
            .await?;
        Ok(RetryCountResponse::parse(resp.payload())?.count)
    }

    pub async fn get_user_retry_count(&self) -> Result<u8> {
        let resp = self
            .transact(&catalog::GET_USER_PASSWORD_RETRY_COUNT, &[])
            .await?;
        Ok(RetryCountResponse::parse(resp.payload())?.count)
    }

    /* Authentication */

    /// Proves the admin PIN and caches `temp_password` (NUL-padded to 25
    /// bytes) as the session's admin credential.
    pub async fn first_authenticate(
        &self,
        admin_pin: &str,
        temp_password: &str,
    ) -> Result<()> {
        let temp = pack_fixed("temporary password", temp_password.as_bytes())?;
        let payload = FirstAuthenticate::new(admin_pin.as_bytes(), temp)?;

        let mut guard = self.active.lock().await;
        let active = guard.as_mut().ok_or(Error::NotConnected)?;
        Self::run_on(active, &catalog::FIRST_AUTHENTICATE, payload.as_bytes()).await?;
        active.session.set_admin_temp(temp);
        Ok(())
    }

    /// User-level counterpart of [`Self::first_authenticate`].
    pub async fn user_authenticate(
        &self,
        user_pin: &str,
        temp_password: &str,
    ) -> Result<()> {
        let temp = pack_fixed("temporary password", temp_password.as_bytes())?;
        let payload = UserAuthenticate::new(user_pin.as_bytes(), temp)?;

        let mut guard = self.active.lock().await;
        let active = guard.as_mut().ok_or(Error::NotConnected)?;
        Self::run_on(active, &catalog::USER_AUTHENTICATE, payload.as_bytes()).await?;
        active.session.set_user_temp(temp);
        Ok(())
    }

    /// Cancels device-side unlocks and forgets both temporary passwords.
    pub async fn lock_device(&self) -> Result<()> {
        let mut guard = self.active.lock().await;
        let active = guard.as_mut().ok_or(Error::NotConnected)?;
        Self::run_on(active, &catalog::LOCK_DEVICE, &[]).await?;
        active.session.clear_temps();
        Ok(())
    }

    /* OTP programming */

    pub async fn write_hotp_slot(
        &self,
        slot: u8,
        name: &str,
        secret: &[u8],
        counter: u64,
        config: SlotConfig,
        token_id: &str,
    ) -> Result<()> {
        let wire = catalog::hotp_wire_slot(slot)?;
        let payload = WriteToSlot::new(wire, name, secret, config, token_id, counter)?;
        self.transact(&catalog::WRITE_TO_SLOT, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn write_totp_slot(
        &self,
        slot: u8,
        name: &str,
        secret: &[u8],
        time_window: u16,
        config: SlotConfig,
        token_id: &str,
    ) -> Result<()> {
        let wire = catalog::totp_wire_slot(slot)?;
        let payload =
            WriteToSlot::new(wire, name, secret, config, token_id, u64::from(time_window))?;
        self.transact(&catalog::WRITE_TO_SLOT, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn erase_hotp_slot(&self, slot: u8) -> Result<()> {
        let payload = EraseSlot::new(catalog::hotp_wire_slot(slot)?);
        self.transact(&catalog::ERASE_SLOT, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn erase_totp_slot(&self, slot: u8) -> Result<()> {
        let payload = EraseSlot::new(catalog::totp_wire_slot(slot)?);
        self.transact(&catalog::ERASE_SLOT, payload.as_bytes())
            .await?;
        Ok(())
    }

    /// Reads one slot by its firmware (wire) number. The convenience wrappers
    /// below translate family indices.
    pub async fn read_slot(&self, wire_slot: u8) -> Result<ReadSlotResponse> {
        let payload = ReadSlot {
            slot_number: wire_slot,
        };
        let resp = self.transact(&catalog::READ_SLOT, payload.as_bytes()).await?;
        ReadSlotResponse::parse(resp.payload())
    }

    pub async fn read_hotp_slot(&self, slot: u8) -> Result<ReadSlotResponse> {
        self.read_slot(catalog::hotp_wire_slot(slot)?).await
    }

    pub async fn read_totp_slot(&self, slot: u8) -> Result<ReadSlotResponse> {
        self.read_slot(catalog::totp_wire_slot(slot)?).await
    }

    /* OTP retrieval */

    pub async fn get_hotp_code(&self, slot: u8) -> Result<u32> {
        let payload = GetCode::hotp(catalog::hotp_wire_slot(slot)?);
        let resp = self.transact(&catalog::GET_CODE, payload.as_bytes()).await?;
        Ok(GetCodeResponse::parse(resp.payload())?.code.get())
    }

    pub async fn get_totp_code(
        &self,
        slot: u8,
        challenge: u64,
        last_time: u64,
        last_interval: u8,
    ) -> Result<u32> {
        let payload = GetCode::totp(
            catalog::totp_wire_slot(slot)?,
            challenge,
            last_time,
            last_interval,
        );
        let resp = self.transact(&catalog::GET_CODE, payload.as_bytes()).await?;
        Ok(GetCodeResponse::parse(resp.payload())?.code.get())
    }

    /// PIN-protected variant: runs a user-authorization leg bound to the
    /// request before retrieving the code. Use after the device was
    /// configured with `enable_user_password`.
    pub async fn get_hotp_code_pin(&self, slot: u8) -> Result<u32> {
        let payload = GetCode::hotp(catalog::hotp_wire_slot(slot)?);
        let resp = self
            .transact(&catalog::GET_CODE_PIN, payload.as_bytes())
            .await?;
        Ok(GetCodeResponse::parse(resp.payload())?.code.get())
    }

    pub async fn get_totp_code_pin(
        &self,
        slot: u8,
        challenge: u64,
        last_time: u64,
        last_interval: u8,
    ) -> Result<u32> {
        let payload = GetCode::totp(
            catalog::totp_wire_slot(slot)?,
            challenge,
            last_time,
            last_interval,
        );
        let resp = self
            .transact(&catalog::GET_CODE_PIN, payload.as_bytes())
            .await?;
        Ok(GetCodeResponse::parse(resp.payload())?.code.get())
    }

    /* Configuration */

    pub async fn write_general_config(&self, config: GeneralConfig) -> Result<()> {
        let payload = WriteGeneralConfig::new(config);
        self.transact(&catalog::WRITE_CONFIG, payload.as_bytes())
            .await?;
        Ok(())
    }

    /// The firmware reports general config inside `GET_STATUS`.
    pub async fn read_general_config(&self) -> Result<GeneralConfig> {
        Ok(self.get_status().await?.general_config)
    }

    /* PIN management */

    pub async fn change_admin_pin(&self, current: &str, new: &str) -> Result<()> {
        let payload = ChangePin::new(current.as_bytes(), new.as_bytes())?;
        self.transact(&catalog::CHANGE_ADMIN_PIN, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn change_user_pin(&self, current: &str, new: &str) -> Result<()> {
        let payload = ChangePin::new(current.as_bytes(), new.as_bytes())?;
        self.transact(&catalog::CHANGE_USER_PIN, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn unlock_user_pin(&self, admin_pin: &str, new_user_pin: &str) -> Result<()> {
        let payload = UnlockUserPassword::new(admin_pin.as_bytes(), new_user_pin.as_bytes())?;
        self.transact(&catalog::UNLOCK_USER_PASSWORD, payload.as_bytes())
            .await?;
        Ok(())
    }

    /* Password safe */

    pub async fn enable_password_safe(&self, user_pin: &str) -> Result<()> {
        let payload = PwSafeEnable::new(user_pin.as_bytes())?;
        self.transact(&catalog::PW_SAFE_ENABLE, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn get_password_safe_slot_status(&self) -> Result<PwSafeSlotStatus> {
        let resp = self
            .transact(&catalog::GET_PW_SAFE_SLOT_STATUS, &[])
            .await?;
        PwSafeSlotStatus::parse(resp.payload())
    }

    pub async fn get_password_safe_slot_name(&self, slot: u8) -> Result<String> {
        let payload = PwSafeSlot {
            slot_number: catalog::pws_slot(slot)?,
        };
        let resp = self
            .transact(&catalog::GET_PW_SAFE_SLOT_NAME, payload.as_bytes())
            .await?;
        PwSafeSlotName::parse(resp.payload())
    }

    pub async fn get_password_safe_slot_login(&self, slot: u8) -> Result<String> {
        let payload = PwSafeSlot {
            slot_number: catalog::pws_slot(slot)?,
        };
        let resp = self
            .transact(&catalog::GET_PW_SAFE_SLOT_LOGIN, payload.as_bytes())
            .await?;
        PwSafeSlotLogin::parse(resp.payload())
    }

    pub async fn get_password_safe_slot_password(&self, slot: u8) -> Result<String> {
        let payload = PwSafeSlot {
            slot_number: catalog::pws_slot(slot)?,
        };
        let resp = self
            .transact(&catalog::GET_PW_SAFE_SLOT_PASSWORD, payload.as_bytes())
            .await?;
        PwSafeSlotPassword::parse(resp.payload())
    }

    /// Two firmware transactions under one lock acquisition: name+password,
    /// then login.
    pub async fn write_password_safe_slot(
        &self,
        slot: u8,
        name: &str,
        login: &str,
        password: &str,
    ) -> Result<()> {
        let slot = catalog::pws_slot(slot)?;
        let first = SetPwSafeSlotData1::new(slot, name, password)?;
        let second = SetPwSafeSlotData2::new(slot, login)?;

        let mut guard = self.active.lock().await;
        let active = guard.as_mut().ok_or(Error::NotConnected)?;
        Self::run_on(active, &catalog::SET_PW_SAFE_SLOT_DATA_1, first.as_bytes()).await?;
        Self::run_on(active, &catalog::SET_PW_SAFE_SLOT_DATA_2, second.as_bytes()).await?;
        Ok(())
    }

    pub async fn erase_password_safe_slot(&self, slot: u8) -> Result<()> {
        let payload = PwSafeSlot {
            slot_number: catalog::pws_slot(slot)?,
        };
        self.transact(&catalog::PW_SAFE_ERASE_SLOT, payload.as_bytes())
            .await?;
        Ok(())
    }

    /* Device management */

    /// Wipes slots and AES state. Cached temporary passwords are gone with
    /// the device session; callers must re-authenticate.
    pub async fn factory_reset(&self, admin_pin: &str) -> Result<()> {
        let payload = FactoryReset::new(admin_pin.as_bytes())?;

        let mut guard = self.active.lock().await;
        let active = guard.as_mut().ok_or(Error::NotConnected)?;
        Self::run_on(active, &catalog::FACTORY_RESET, payload.as_bytes()).await?;
        active.session.clear_temps();
        warn!("factory reset completed; all credentials invalidated");
        Ok(())
    }

    pub async fn build_aes_key(&self, admin_pin: &str) -> Result<()> {
        let payload = BuildAesKey::new(admin_pin.as_bytes())?;
        self.transact(&catalog::BUILD_AES_KEY, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn is_aes_supported(&self, user_pin: &str) -> Result<bool> {
        let payload = DetectScAes::new(user_pin.as_bytes())?;
        match self.transact(&catalog::DETECT_SC_AES, payload.as_bytes()).await {
            Ok(_) => Ok(true),
            Err(Error::Device(DeviceStatus::NotSupported)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn set_time(&self, unix_seconds: u64) -> Result<()> {
        let payload = SetTime::set(unix_seconds);
        self.transact(&catalog::SET_TIME, payload.as_bytes()).await?;
        Ok(())
    }

    pub async fn get_time(&self) -> Result<u64> {
        let resp = self.transact(&catalog::GET_TIME, &[]).await?;
        Ok(TimeResponse::parse(resp.payload())?.time.get())
    }

    /* Storage-only volume and firmware management */

    pub async fn enable_encrypted_partition(&self, password: &str) -> Result<()> {
        let payload = StoragePassword::new(password.as_bytes())?;
        self.transact(&catalog::ENABLE_CRYPTED_PARTITION, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn disable_encrypted_partition(&self) -> Result<()> {
        self.transact(&catalog::DISABLE_CRYPTED_PARTITION, &[])
            .await?;
        Ok(())
    }

    pub async fn enable_hidden_encrypted_partition(&self, password: &str) -> Result<()> {
        let payload = StoragePassword::new(password.as_bytes())?;
        self.transact(
            &catalog::ENABLE_HIDDEN_CRYPTED_PARTITION,
            payload.as_bytes(),
        )
        .await?;
        Ok(())
    }

    pub async fn disable_hidden_encrypted_partition(&self) -> Result<()> {
        self.transact(&catalog::DISABLE_HIDDEN_CRYPTED_PARTITION, &[])
            .await?;
        Ok(())
    }

    pub async fn setup_hidden_volume(
        &self,
        slot: u8,
        start_percent: u8,
        end_percent: u8,
        password: &str,
    ) -> Result<()> {
        let payload =
            SetupHiddenVolume::new(slot, start_percent, end_percent, password.as_bytes())?;
        self.transact(&catalog::SEND_HIDDEN_VOLUME_SETUP, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn enable_firmware_update(&self, update_password: &str) -> Result<()> {
        let payload = StoragePassword::new(update_password.as_bytes())?;
        self.transact(&catalog::ENABLE_FIRMWARE_UPDATE, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn export_firmware(&self, admin_pin: &str) -> Result<()> {
        let payload = StoragePassword::new(admin_pin.as_bytes())?;
        self.transact(&catalog::EXPORT_FIRMWARE_TO_FILE, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn fill_sd_card_with_random_chars(
        &self,
        volume_flag: u8,
        admin_pin: &str,
    ) -> Result<()> {
        let payload = FillSdCard::new(volume_flag, admin_pin.as_bytes())?;
        self.transact(&catalog::FILL_SD_CARD_WITH_RANDOM_CHARS, payload.as_bytes())
            .await?;
        Ok(())
    }

    /// Resolves the historical read-only/read-write id confusion: each mode
    /// maps to its own firmware command.
    pub async fn set_unencrypted_volume_mode(
        &self,
        mode: VolumeAccessMode,
        admin_pin: &str,
    ) -> Result<()> {
        let payload = StoragePassword::new(admin_pin.as_bytes())?;
        let desc = match mode {
            VolumeAccessMode::ReadOnly => &catalog::ENABLE_READONLY_UNCRYPTED_LUN,
            VolumeAccessMode::ReadWrite => &catalog::ENABLE_READWRITE_UNCRYPTED_LUN,
        };
        self.transact(desc, payload.as_bytes()).await?;
        Ok(())
    }

    pub async fn change_update_pin(&self, current: &str, new: &str) -> Result<()> {
        let payload = ChangeUpdatePin::new(current.as_bytes(), new.as_bytes())?;
        self.transact(&catalog::CHANGE_UPDATE_PIN, payload.as_bytes())
            .await?;
        Ok(())
    }

    pub async fn lock_stick_hardware(&self, password: &str) -> Result<()> {
        let payload = StoragePassword::new(password.as_bytes())?;
        self.transact(&catalog::SEND_LOCK_STICK_HARDWARE, payload.as_bytes())
            .await?;
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use nitrokey_client_rs::{
    cfg::enums::DeviceModel,
    error::Error,
    models::{device::common::GeneralConfig, status::DeviceStatus},
};
use serial_test::serial;

use crate::integration_tests::common::{
    DEFAULT_ADMIN_PIN, DEFAULT_USER_PIN, FIRMWARE_VERSION, connected,
};

#[tokio::test]
#[serial]
async fn test_status_and_serial() -> Result<()> {
    let (manager, _state) = connected(DeviceModel::Pro).await;

    let status = manager.get_status().await?;
    assert_eq!(status.firmware_version.get(), FIRMWARE_VERSION);
    assert_eq!(manager.get_serial_number().await?, "00005e1f");
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_general_config_round_trip() -> Result<()> {
    let (manager, _state) = connected(DeviceModel::Pro).await;
    manager
        .first_authenticate(DEFAULT_ADMIN_PIN, "tmpadm")
        .await?;

    let wanted = GeneralConfig {
        numlock: 0,
        capslock: 1,
        scrolllock: 0xff,
        enable_user_password: 0,
        delete_user_password: 0,
    };
    manager.write_general_config(wanted).await?;

    let read_back = manager.read_general_config().await?;
    assert_eq!(read_back.as_tuple(), wanted.as_tuple());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_config_write_needs_admin() -> Result<()> {
    let (manager, _state) = connected(DeviceModel::Pro).await;

    assert!(matches!(
        manager.write_general_config(GeneralConfig::default()).await,
        Err(Error::NotAuthenticated(_))
    ));
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_change_and_unlock_pins() -> Result<()> {
    let (manager, _state) = connected(DeviceModel::Pro).await;

    manager.change_admin_pin(DEFAULT_ADMIN_PIN, "87654321").await?;
    match manager.first_authenticate(DEFAULT_ADMIN_PIN, "t").await {
        Err(Error::Device(DeviceStatus::WrongPassword)) => {},
        other => panic!("expected WrongPassword, got {other:?}"),
    }
    manager.first_authenticate("87654321", "tmpadm").await?;

    manager.change_user_pin(DEFAULT_USER_PIN, "654321").await?;
    manager.unlock_user_pin("87654321", "111111").await?;
    manager.enable_password_safe("111111").await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_aes_probing() -> Result<()> {
    let (manager, state) = connected(DeviceModel::Pro).await;

    manager.build_aes_key(DEFAULT_ADMIN_PIN).await?;
    assert!(manager.is_aes_supported(DEFAULT_USER_PIN).await?);

    state.lock().expect("state").aes_supported = false;
    assert!(!manager.is_aes_supported(DEFAULT_USER_PIN).await?);

    // a wrong PIN is an error, not a "no"
    assert!(matches!(
        manager.is_aes_supported("999999").await,
        Err(Error::Device(DeviceStatus::WrongPassword))
    ));
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_device_clock() -> Result<()> {
    let (manager, _state) = connected(DeviceModel::Pro).await;

    manager.set_time(1_700_000_000).await?;
    assert_eq!(manager.get_time().await?, 1_700_000_000);
    Ok(())
}

// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persisted device configuration.
//!
//! One postcard-encoded record in the last flash page, behind a
//! magic/length header. Writes are debounced through a single writer task:
//! a save request landing while a write is in flight just leaves the
//! signal set, and the writer re-reads the live config on its next pass,
//! so concurrent requests coalesce into one write with the latest values.

use core::cell::RefCell;

use consts::{CONFIG_FLASH_ADDR, CONFIG_FLASH_PAGE_SIZE, CONFIG_MAGIC, CONFIG_RECORD_LEN, CUSTOM_NAME_MAX_LEN, DEVICE_NAME};
use defmt::{error, info, warn};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_storage_async::nor_flash::{NorFlash, ReadNorFlash};
use heapless::String;
use nrf_softdevice::{Flash, FlashError};
use serde::{Deserialize, Serialize};

/// Bumped on breaking record layout changes; older records are discarded.
pub const CONFIG_SCHEMA_VERSION: u16 = 1;

/// Magic (4) + payload length (2).
const RECORD_HEADER_LEN: usize = 6;

#[derive(Serialize, Deserialize, Clone)]
pub struct BridgeConfig {
    pub version: u16,
    pub custom_name: String<CUSTOM_NAME_MAX_LEN>,
}

impl BridgeConfig {
    const fn default_config() -> Self {
        Self {
            version: CONFIG_SCHEMA_VERSION,
            custom_name: String::new(),
        }
    }
}

static CONFIG: Mutex<ThreadModeRawMutex, RefCell<BridgeConfig>> = Mutex::new(RefCell::new(BridgeConfig::default_config()));

/// Pending-save flag: signalling an already-signalled Signal is a no-op,
/// which is exactly the coalescing the single writer needs.
static SAVE_REQUEST: Signal<ThreadModeRawMutex, ()> = Signal::new();

/// Name to advertise: the persisted custom name, or the default when none
/// has been written yet.
pub fn device_name() -> String<CUSTOM_NAME_MAX_LEN> {
    CONFIG.lock(|config| {
        let config = config.borrow();
        if config.custom_name.is_empty() {
            String::try_from(DEVICE_NAME).unwrap_or_default()
        } else {
            config.custom_name.clone()
        }
    })
}

/// Update the custom name from a characteristic write and schedule a save.
/// Oversized names are truncated to the characteristic limit; writes that
/// are not valid UTF-8 are discarded.
pub fn set_custom_name(raw: &[u8]) {
    let raw = &raw[..raw.len().min(CUSTOM_NAME_MAX_LEN)];
    match core::str::from_utf8(raw) {
        Ok(name) => {
            CONFIG.lock(|config| {
                let mut config = config.borrow_mut();
                config.custom_name.clear();
                let _ = config.custom_name.push_str(name);
            });
            info!("custom name updated ({} bytes)", name.len());
            request_save();
        }
        Err(_) => warn!("discarding custom name: not valid UTF-8"),
    }
}

pub fn request_save() {
    SAVE_REQUEST.signal(());
}

/// Load the stored record at boot; anything missing, corrupt or from
/// another schema version falls back to the defaults already in place.
pub async fn load(flash: &mut Flash) {
    let mut record = [0u8; CONFIG_RECORD_LEN];
    if let Err(e) = flash.read(CONFIG_FLASH_ADDR, &mut record).await {
        error!("config read failed: {:?}", e);
        return;
    }

    let magic = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
    if magic != CONFIG_MAGIC {
        info!("no stored config, using defaults");
        return;
    }
    let len = u16::from_le_bytes([record[4], record[5]]) as usize;
    if len > CONFIG_RECORD_LEN - RECORD_HEADER_LEN {
        warn!("stored config length out of range, using defaults");
        return;
    }

    match postcard::from_bytes::<BridgeConfig>(&record[RECORD_HEADER_LEN..RECORD_HEADER_LEN + len]) {
        Ok(config) if config.version == CONFIG_SCHEMA_VERSION => {
            info!("config loaded ({} byte record)", len);
            CONFIG.lock(|slot| slot.replace(config));
        }
        Ok(config) => warn!("config schema {} unsupported, using defaults", config.version),
        Err(_) => warn!("stored config corrupt, using defaults"),
    }
}

#[derive(defmt::Format)]
enum StoreError {
    Encode,
    Flash(FlashError),
}

async fn store(flash: &mut Flash, config: &BridgeConfig) -> Result<(), StoreError> {
    let mut record = [0xFFu8; CONFIG_RECORD_LEN];
    let len = postcard::to_slice(config, &mut record[RECORD_HEADER_LEN..])
        .map_err(|_| StoreError::Encode)?
        .len() as u16;
    record[0..4].copy_from_slice(&CONFIG_MAGIC.to_le_bytes());
    record[4..6].copy_from_slice(&len.to_le_bytes());

    flash
        .erase(CONFIG_FLASH_ADDR, CONFIG_FLASH_ADDR + CONFIG_FLASH_PAGE_SIZE)
        .await
        .map_err(StoreError::Flash)?;
    flash.write(CONFIG_FLASH_ADDR, &record).await.map_err(StoreError::Flash)?;
    info!("config record written ({} bytes)", len);
    Ok(())
}

/// Single flash writer. Snapshots the live config *after* each wakeup, so
/// a request that landed mid-write is served with the latest values on the
/// next pass instead of being queued.
#[embassy_executor::task]
pub async fn save_task(mut flash: Flash) -> ! {
    loop {
        SAVE_REQUEST.wait().await;
        let snapshot = CONFIG.lock(|config| config.borrow().clone());
        if let Err(e) = store(&mut flash, &snapshot).await {
            error!("config store failed: {:?}", e);
        }
    }
}

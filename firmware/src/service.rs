// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Radio bridge GATT service.
//!
//! One service carries the whole bridge surface: opaque command/response
//! bytes on Data, per-response flow accounting on Response Count, a 1 Hz
//! heartbeat on Timer Tick, plus the persisted device name, an LED mode
//! knob and the firmware version string.

use crate::{config, subg};
use consts::{CUSTOM_NAME_MAX_LEN, DATA_CHAR_LEN};
use defmt::info;
use heapless::Vec;
use nrf_softdevice::gatt_service;

pub const FIRMWARE_VERSION: &str = concat!("subg-bridge ", env!("CARGO_PKG_VERSION"));

/// Value length of the Version characteristic.
pub const VERSION_CHAR_LEN: usize = 24;

#[gatt_service(uuid = "0235733b-99c5-4197-b856-69219c2a3845")]
pub struct BridgeService {
    #[characteristic(uuid = "c842e849-5028-42e2-867c-016adada9155", read, write, write_without_response)]
    data: Vec<u8, DATA_CHAR_LEN>,

    #[characteristic(uuid = "6e6c7910-b89e-43a5-a0fe-50c5e8b81f9a", read, notify)]
    response_count: u8,

    #[characteristic(uuid = "6e6c7910-b89e-43a5-78af-50c5e8b81f9a", read, notify)]
    timer_tick: u8,

    #[characteristic(uuid = "d93b2af0-1e28-11e4-8c21-0800200c9a66", read, write)]
    custom_name: Vec<u8, CUSTOM_NAME_MAX_LEN>,

    #[characteristic(uuid = "c6d84241-f1a7-4f9c-a25f-fce16732f14e", read, write)]
    led_mode: u8,

    #[characteristic(uuid = "30d99dc9-7c91-4295-a051-0a104d238cf2", read)]
    version: Vec<u8, VERSION_CHAR_LEN>,
}

impl BridgeService {
    pub(crate) fn handle(&self, event: BridgeServiceEvent) {
        match event {
            BridgeServiceEvent::DataWrite(data) => {
                // Pure pass-through: the engine owns all protocol state.
                subg::submit_command(&data);
            }
            BridgeServiceEvent::CustomNameWrite(name) => {
                config::set_custom_name(&name);
            }
            BridgeServiceEvent::LedModeWrite(mode) => {
                // LED wiring is board specific; the mode is only recorded.
                info!("LED mode set to {}", mode);
            }
            BridgeServiceEvent::ResponseCountCccdWrite { notifications } => {
                info!("response count notifications: {}", notifications);
            }
            BridgeServiceEvent::TimerTickCccdWrite { notifications } => {
                info!("timer tick notifications: {}", notifications);
            }
        }
    }

    pub(crate) fn data_handle(&self) -> u16 {
        self.data_value_handle
    }

    pub(crate) fn response_count_handle(&self) -> u16 {
        self.response_count_value_handle
    }

    pub(crate) fn timer_tick_handle(&self) -> u16 {
        self.timer_tick_value_handle
    }

    pub(crate) fn custom_name_handle(&self) -> u16 {
        self.custom_name_value_handle
    }

    pub(crate) fn version_handle(&self) -> u16 {
        self.version_value_handle
    }
}

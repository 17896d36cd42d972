// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::config;
use crate::service::{BridgeService, FIRMWARE_VERSION};
use crate::{RESPONSE_COUNT, SUBG_RESPONSES, TIMER_TICK};
use consts::{ATT_MTU, DEVICE_NAME, SERVICES_LIST, SHORT_NAME};
use core::mem;
use core::sync::atomic::Ordering;
use defmt::{debug, error, info, unwrap};
use embassy_time::Timer;
use futures::future::{select, Either};
use futures::pin_mut;
use nrf_softdevice::ble::advertisement_builder::{ExtendedAdvertisementBuilder, ExtendedAdvertisementPayload, Flag, ServiceList};
use nrf_softdevice::ble::gatt_server::{notify_value, set_value, NotifyValueError};
use nrf_softdevice::ble::peripheral;
use nrf_softdevice::ble::{gatt_server, Connection};
use nrf_softdevice::gatt_server;
use nrf_softdevice::{raw, RawError, Softdevice};
use raw::ble_gap_conn_params_t;

// Get connection interval with macro
// to get 15ms just call ci_ms!(15)
macro_rules! ci_ms {
    ($a:expr) => {{
        let ms = ($a as f32 * 1000.0) / 1250.0;
        debug!("ci units: {}", ms);
        ms as u16
    }};
}

#[gatt_server]
pub struct Server {
    bridge: BridgeService,
}

pub fn initialize_sd() -> &'static mut Softdevice {
    let config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: ATT_MTU as u16 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(raw::BLE_GATTS_VLOC_STACK as u8),
        }),
        conn_gatts: Some(raw::ble_gatts_conn_cfg_t { hvn_tx_queue_size: 3 }),

        ..Default::default()
    };

    Softdevice::enable(&config)
}

/// Seed the readable characteristic values that exist before the first
/// connection: firmware version and the persisted custom name.
pub fn publish_gatt_values(sd: &Softdevice, server: &Server) {
    if set_value(sd, server.bridge.version_handle(), FIRMWARE_VERSION.as_bytes()).is_err() {
        error!("failed to publish firmware version");
    }
    let name = config::device_name();
    if set_value(sd, server.bridge.custom_name_handle(), name.as_bytes()).is_err() {
        error!("failed to publish device name");
    }
}

/// Forwards completed radio responses to the connected client: the frame
/// lands in the Data value and the Response Count characteristic is
/// incremented and notified, once per frame.
async fn relay_responses<'a>(sd: &Softdevice, server: &'a Server, connection: &'a Connection) -> ! {
    loop {
        let frame = SUBG_RESPONSES.receive().await;
        if let Err(e) = set_value(sd, server.bridge.data_handle(), &frame) {
            error!("data value update failed: {:?}", e);
            continue;
        }
        let count = RESPONSE_COUNT.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        match notify_value(connection, server.bridge.response_count_handle(), &[count]) {
            Ok(_) => {}
            Err(NotifyValueError::Raw(RawError::BleGattsSysAttrMissing)) => {
                // Client has not subscribed yet; keep the count readable.
                let _ = set_value(sd, server.bridge.response_count_handle(), &[count]);
            }
            Err(e) => error!("response count notify failed: {:?}", e),
        }
    }
}

/// 1 Hz heartbeat on the Timer Tick characteristic.
async fn tick_notifications<'a>(server: &'a Server, connection: &'a Connection) -> ! {
    loop {
        Timer::after_secs(1).await;
        let tick = TIMER_TICK.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        match notify_value(connection, server.bridge.timer_tick_handle(), &[tick]) {
            Ok(_) => {}
            Err(NotifyValueError::Raw(RawError::BleGattsSysAttrMissing)) => {
                // Ignore this error, no need to be spammed just because
                // we are waiting for sys attrs to be available
            }
            Err(e) => error!("timer tick notify failed: {:?}", e),
        }
    }
}

pub async fn run_bluetooth(sd: &'static Softdevice, server: &Server) -> ! {
    loop {
        // The full name can change over the air, so the payloads are
        // rebuilt for every advertising cycle.
        let name = config::device_name();
        let adv_data: ExtendedAdvertisementPayload = ExtendedAdvertisementBuilder::new()
            .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
            .services_128(ServiceList::Complete, &SERVICES_LIST)
            .short_name(SHORT_NAME)
            .build();
        let scan_data: ExtendedAdvertisementPayload = ExtendedAdvertisementBuilder::new().full_name(name.as_str()).build();

        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &scan_data,
        };

        // Set advertising timer in units of 625us (about 50ms with 75 units)
        let config = peripheral::Config {
            interval: 75,
            ..Default::default()
        };

        // Start advertising
        let conn = unwrap!(peripheral::advertise_connectable(sd, adv, &config).await);
        info!("advertising done!");

        let gap_conn_param = ble_gap_conn_params_t {
            conn_sup_timeout: 500, // 5s
            max_conn_interval: ci_ms!(30),
            min_conn_interval: ci_ms!(15),
            slave_latency: 0,
        };
        // Request connection param update
        if let Err(e) = conn.set_conn_params(gap_conn_param) {
            error!("set_conn_params error - {:?}", e)
        }

        let gatt_fut = gatt_server::run(&conn, server, |e| server.handle_event(e));
        let relay_fut = relay_responses(sd, server, &conn);
        let tick_fut = tick_notifications(server, &conn);

        // Pin mutable futures
        pin_mut!(gatt_fut);
        pin_mut!(relay_fut);
        pin_mut!(tick_fut);

        // The notification futures never return on their own; the select
        // tears them down when the GATT server exits on disconnect.
        let aux_fut = select(relay_fut, tick_fut);
        match select(gatt_fut, aux_fut).await {
            Either::Left((e, _)) => {
                info!("gatt_server run exited: {:?}", e);
            }
            Either::Right(_) => {
                error!("notification future exited");
            }
        }
    }
}

impl Server {
    fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Bridge(e) => self.bridge.handle(e),
        }
    }
}

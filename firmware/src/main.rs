// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

mod config;
mod server;
mod service;
mod subg;

use core::sync::atomic::{AtomicBool, AtomicU8};
#[cfg(feature = "debug")]
use defmt_rtt as _;
// global logger
use embassy_nrf as _;
// time driver
use panic_probe as _;

use consts::RESPONSE_QUEUE_LEN;
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::bind_interrupts;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::{
    peripherals::SPI2,
    spim::{self, Spim},
};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use heapless::Vec;
use nrf_softdevice::ble::get_address;
use nrf_softdevice::{Flash, Softdevice};
use server::{initialize_sd, publish_gatt_values, run_bluetooth, Server};
use subg_transfer::MAX_FRAME_LEN;

bind_interrupts!(struct Irqs {
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

#[cfg(not(feature = "debug"))]
mod dummy_logging {
    #[defmt::global_logger]
    struct Logger;

    unsafe impl defmt::Logger for Logger {
        fn acquire() {}

        unsafe fn flush() {}

        unsafe fn release() {}

        unsafe fn write(_bytes: &[u8]) {}
    }
}

/// Radio frame as shuttled between the BLE relay and the transfer engine.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Host command waiting for the engine. A `Signal`, not a queue: admission
/// control (busy-drop) lives in `subg::submit_command`.
static SUBG_COMMANDS: Signal<ThreadModeRawMutex, Frame> = Signal::new();

/// True while a transaction is in flight on the radio link.
static SUBG_BUSY: AtomicBool = AtomicBool::new(false);

/// Completed response frames on their way out over BLE.
static SUBG_RESPONSES: Channel<ThreadModeRawMutex, Frame, RESPONSE_QUEUE_LEN> = Channel::new();

/// Wrapping counter notified on the Response Count characteristic.
static RESPONSE_COUNT: AtomicU8 = AtomicU8::new(0);

/// Wrapping 1 Hz heartbeat notified on the Timer Tick characteristic.
static TIMER_TICK: AtomicU8 = AtomicU8::new(0);

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    info!("SD is running");
    sd.run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut conf = embassy_nrf::config::Config::default();
    conf.hfclk_source = embassy_nrf::config::HfclkSource::ExternalXtal;
    conf.lfclk_source = embassy_nrf::config::LfclkSource::ExternalXtal;

    conf.gpiote_interrupt_priority = interrupt::Priority::P2;
    conf.time_interrupt_priority = interrupt::Priority::P2;

    let p = embassy_nrf::init(conf);

    let spi = {
        // Configure SPI for the radio companion: it samples on the leading
        // edge, LSB first, and tops out well below 1 MHz.
        let mut config_spi = spim::Config::default();
        config_spi.frequency = spim::Frequency::K125;
        config_spi.mode = spim::MODE_0;
        config_spi.bit_order = spim::BitOrder::LSB_FIRST;
        Spim::new(p.SPI2, Irqs, p.P0_03, p.P0_28, p.P0_04, config_spi)
    };
    let cs = Output::new(p.P0_29, Level::High, OutputDrive::Standard);
    let peer_ready = Input::new(p.P0_07, Pull::Down);
    let mut radio_reset = Output::new(p.P0_30, Level::Low, OutputDrive::Standard);

    // set priority to avoid collisions with softdevice
    interrupt::SPIM2_SPIS2_SPI2.set_priority(interrupt::Priority::P3);

    let sd = initialize_sd();

    let server = unwrap!(Server::new(sd), "Creating the gatt server failed");
    unwrap!(spawner.spawn(softdevice_task(sd)), "Spawning the softdevice failed");

    // Get Bt device address
    let mut address = get_address(sd).bytes();
    address.reverse();
    info!("Address : {=[u8;6]:#X}", address);

    // Release the companion radio from reset once the clocks are stable.
    Timer::after_millis(10).await;
    radio_reset.set_high();

    let mut flash = Flash::take(sd);
    config::load(&mut flash).await;
    unwrap!(spawner.spawn(config::save_task(flash)), "Spawning the config writer failed");

    publish_gatt_values(sd, &server);

    unwrap!(
        spawner.spawn(subg::transfer_task(spi, cs, peer_ready)),
        "Spawning the transfer engine failed"
    );

    info!("Init tasks");
    run_bluetooth(sd, &server).await
}

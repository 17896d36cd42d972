// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! SPI driver for the sub-GHz transfer engine.
//!
//! Owns the bus, the chip-select line and the level-sensitive
//! "peer has data" input; the protocol itself lives in `subg-transfer`.

use crate::{Frame, SUBG_BUSY, SUBG_COMMANDS, SUBG_RESPONSES};
use consts::PEER_SETUP_DELAY_US;
use core::sync::atomic::Ordering;
use defmt::{info, warn};
use embassy_nrf::gpio::{Input, Output};
use embassy_nrf::peripherals::SPI2;
use embassy_nrf::spim::Spim;
use embassy_time::Timer;
use futures::future::{select, Either};
use futures::pin_mut;
use heapless::Vec;
use subg_transfer::{Completion, Engine, MAX_FRAME_LEN};

/// Entry point for the BLE relay: hand a command to the engine unless a
/// transaction is already in flight. A dropped command is lost; the
/// central has to re-submit (no queueing by design).
pub fn submit_command(frame: &[u8]) {
    if frame.len() > MAX_FRAME_LEN {
        warn!("command of {} bytes exceeds frame limit, dropped", frame.len());
        return;
    }
    // Claiming the busy flag here keeps a second write from overwriting a
    // signalled command the engine has not picked up yet; the transfer
    // task clears it once the transaction (and any drain chain) is done.
    if SUBG_BUSY.swap(true, Ordering::Relaxed) {
        info!("skipped command: busy");
        return;
    }
    if let Ok(frame) = Vec::from_slice(frame) {
        SUBG_COMMANDS.signal(frame);
    }
}

#[embassy_executor::task]
pub async fn transfer_task(mut spi: Spim<'static, SPI2>, mut cs: Output<'static>, mut peer_ready: Input<'static>) {
    let mut engine = Engine::new();
    info!("subg transfer engine started");

    loop {
        let admitted = {
            let command = SUBG_COMMANDS.wait();
            let ready = peer_ready.wait_for_high();
            pin_mut!(command);
            pin_mut!(ready);
            match select(command, ready).await {
                Either::Left((frame, _)) => engine.submit_command(&frame),
                Either::Right(((), _)) => {
                    SUBG_BUSY.store(true, Ordering::Relaxed);
                    engine.peer_data_ready()
                }
            }
        };
        if !admitted {
            // Cannot happen with a single driver task; keep the flag
            // consistent anyway so a drop never wedges the relay.
            SUBG_BUSY.store(false, Ordering::Relaxed);
            continue;
        }

        run_transaction(&mut engine, &mut spi, &mut cs).await;

        // The peer line is level sensitive: a signal that fired while the
        // engine was busy is only visible as the line still being high, so
        // keep draining until it drops.
        while peer_ready.is_high() && engine.peer_data_ready() {
            run_transaction(&mut engine, &mut spi, &mut cs).await;
        }
        SUBG_BUSY.store(false, Ordering::Relaxed);
    }
}

/// Drive one admitted transaction to completion: chip select, size
/// exchange, optional data phase, release.
async fn run_transaction(engine: &mut Engine, spi: &mut Spim<'static, SPI2>, cs: &mut Output<'static>) {
    cs.set_low();
    // The companion needs a moment to arm its slave DMA after chip select.
    Timer::after_micros(PEER_SETUP_DELAY_US).await;

    loop {
        {
            let Some(xfer) = engine.wire() else { break };
            if let Err(e) = spi.transfer(xfer.rx, xfer.tx).await {
                // The bus is in an unknown state; nothing in-band recovers it.
                defmt::panic!("spi transfer failed: {:?}", e);
            }
        }
        match engine.exchange_complete() {
            Completion::Continue => {}
            Completion::Done(Some(frame)) => {
                deliver_response(frame);
                break;
            }
            Completion::Done(None) => break,
        }
    }

    cs.set_high();
}

fn deliver_response(frame: &[u8]) {
    info!("radio response: {} bytes", frame.len());
    let Ok(frame) = Frame::from_slice(frame) else {
        return;
    };
    if SUBG_RESPONSES.try_send(frame).is_err() {
        warn!("response queue full, frame dropped");
    }
}

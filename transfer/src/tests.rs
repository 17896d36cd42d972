// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::*;

/// Run the size phase against a simulated peer announcing `peer_len` bytes.
fn run_size_phase(engine: &mut Engine, peer_len: u8) -> Completion<'_> {
    {
        let xfer = engine.wire().unwrap();
        assert_eq!(xfer.tx[0], SIZE_MARKER);
        assert_eq!(xfer.rx.len(), SIZE_HEADER_LEN);
        xfer.rx.copy_from_slice(&[SIZE_MARKER, peer_len]);
    }
    engine.exchange_complete()
}

#[test]
fn framing_round_trip() {
    let mut engine = Engine::new();
    assert!(engine.submit_command(&[0xAA, 0xBB, 0xCC]));
    assert_eq!(engine.state(), State::SizeExchange);

    {
        let xfer = engine.wire().unwrap();
        assert_eq!(xfer.tx, &[SIZE_MARKER, 3]);
        xfer.rx.copy_from_slice(&[SIZE_MARKER, 2]);
    }
    assert_eq!(engine.exchange_complete(), Completion::Continue);
    assert_eq!(engine.state(), State::DataTransfer);

    {
        let xfer = engine.wire().unwrap();
        assert_eq!(xfer.tx, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(xfer.rx.len(), 2);
        xfer.rx.copy_from_slice(&[0x11, 0x22]);
    }
    match engine.exchange_complete() {
        Completion::Done(Some(frame)) => assert_eq!(frame, &[0x11, 0x22]),
        other => panic!("expected response frame, got {:?}", other),
    }
    assert!(engine.is_idle());
}

#[test]
fn zero_length_command_with_silent_peer_goes_straight_back_to_idle() {
    let mut engine = Engine::new();
    assert!(engine.submit_command(&[]));

    // Both sides announce zero: no data phase, no response.
    assert_eq!(run_size_phase(&mut engine, 0), Completion::Done(None));
    assert!(engine.is_idle());
}

#[test]
fn command_with_zero_length_response_ends_without_frame() {
    let mut engine = Engine::new();
    assert!(engine.submit_command(&[0x42]));

    assert_eq!(run_size_phase(&mut engine, 0), Completion::Continue);
    {
        let xfer = engine.wire().unwrap();
        assert_eq!(xfer.tx, &[0x42]);
        assert!(xfer.rx.is_empty());
    }
    assert_eq!(engine.exchange_complete(), Completion::Done(None));
    assert!(engine.is_idle());
}

#[test]
fn peer_drain_transaction_sends_nothing_and_receives_frame() {
    let mut engine = Engine::new();
    assert!(engine.peer_data_ready());

    assert_eq!(run_size_phase(&mut engine, 4), Completion::Continue);
    {
        let xfer = engine.wire().unwrap();
        assert!(xfer.tx.is_empty());
        xfer.rx.copy_from_slice(&[1, 2, 3, 4]);
    }
    match engine.exchange_complete() {
        Completion::Done(Some(frame)) => assert_eq!(frame, &[1, 2, 3, 4]),
        other => panic!("expected drained frame, got {:?}", other),
    }
}

#[test]
fn busy_drop_leaves_in_flight_buffers_untouched() {
    let mut engine = Engine::new();
    assert!(engine.submit_command(&[0xAA, 0xBB]));

    // Both kinds of trigger are dropped while a transaction is in flight.
    assert!(!engine.submit_command(&[0xFF; 10]));
    assert!(!engine.peer_data_ready());
    assert_eq!(engine.state(), State::SizeExchange);

    // The first command's bytes still go out unmodified.
    assert_eq!(run_size_phase(&mut engine, 0), Completion::Continue);
    let xfer = engine.wire().unwrap();
    assert_eq!(xfer.tx, &[0xAA, 0xBB]);
}

#[test]
fn busy_drop_during_data_phase() {
    let mut engine = Engine::new();
    assert!(engine.submit_command(&[0x01]));
    assert_eq!(run_size_phase(&mut engine, 1), Completion::Continue);

    assert!(!engine.submit_command(&[0x02]));
    assert_eq!(engine.state(), State::DataTransfer);
}

#[test]
fn max_length_accepted_and_announced() {
    let mut engine = Engine::new();
    let frame = [0x5A; MAX_FRAME_LEN];
    assert!(engine.submit_command(&frame));

    let xfer = engine.wire().unwrap();
    assert_eq!(xfer.tx, &[SIZE_MARKER, 255]);
}

#[test]
fn oversized_command_rejected_before_the_wire() {
    let mut engine = Engine::new();
    let frame = [0u8; MAX_FRAME_LEN + 1];
    assert!(!engine.submit_command(&frame));
    assert!(engine.is_idle());
    assert!(engine.wire().is_none());
}

#[test]
fn engine_is_reusable_across_transactions() {
    let mut engine = Engine::new();

    assert!(engine.submit_command(&[0x10]));
    assert_eq!(run_size_phase(&mut engine, 0), Completion::Continue);
    engine.wire().unwrap();
    assert_eq!(engine.exchange_complete(), Completion::Done(None));

    // Back to idle: the drain chain can start a fresh transaction at once.
    assert!(engine.peer_data_ready());
    assert_eq!(engine.state(), State::SizeExchange);
}

#[test]
fn spurious_completion_while_idle_is_ignored() {
    let mut engine = Engine::new();
    assert_eq!(engine.exchange_complete(), Completion::Done(None));
    assert!(engine.is_idle());
}

#[test]
fn peer_marker_byte_is_not_validated() {
    let mut engine = Engine::new();
    assert!(engine.submit_command(&[0x07]));

    // Peer header with a garbage marker still negotiates the lengths.
    {
        let xfer = engine.wire().unwrap();
        xfer.rx.copy_from_slice(&[0x00, 1]);
    }
    assert_eq!(engine.exchange_complete(), Completion::Continue);
}

// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Half-duplex command/response engine for the sub-GHz radio companion.
//!
//! The companion chip is an SPI slave that cannot interrupt a transfer in
//! progress, so every transaction starts with a two-byte size exchange:
//! both sides announce `{0x99, len}` simultaneously over the full-duplex
//! link, then exchange exactly the announced number of payload bytes.
//! A dedicated "peer has data" line lets the companion request a
//! zero-length transaction to deliver unsolicited frames.
//!
//! This crate is the hardware-free half of the engine. The driver asks
//! [`Engine::wire`] what to put on the bus, runs the exchange, and reports
//! back through [`Engine::exchange_complete`]; the engine owns the buffers
//! and the phase sequencing. Keeping the peripheral out of the state
//! machine lets the protocol run under host tests.

#![no_std]

#[cfg(test)]
mod tests;

/// Largest frame the wire format can carry: the size byte is a `u8`.
pub const MAX_FRAME_LEN: usize = 255;

/// First byte of every size exchange. Sent on transmit, ignored on receive.
pub const SIZE_MARKER: u8 = 0x99;

/// Length of the size exchange, in bytes, each direction.
pub const SIZE_HEADER_LEN: usize = 2;

/// Transaction phase. `SizeExchange` and `DataTransfer` mean a transaction
/// is in flight and new work is dropped at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum State {
    Idle,
    SizeExchange,
    DataTransfer,
}

/// One full-duplex exchange the driver must run on the bus.
/// `tx` and `rx` may have different lengths; the bus pads/discards the tail.
pub struct Xfer<'a> {
    pub tx: &'a [u8],
    pub rx: &'a mut [u8],
}

/// Result of [`Engine::exchange_complete`].
#[derive(Debug, PartialEq, Eq)]
pub enum Completion<'a> {
    /// Size phase agreed on a non-zero length in at least one direction;
    /// run the next [`Engine::wire`] exchange.
    Continue,
    /// Transaction finished, chip select can be released. Holds the peer
    /// frame when the peer announced a non-zero length. The borrow is only
    /// valid until the engine is touched again.
    Done(Option<&'a [u8]>),
}

/// Transfer engine state machine. One instance per bus; the owning driver
/// is the only context that mutates it, so no locking is needed.
pub struct Engine {
    state: State,
    size_tx: [u8; SIZE_HEADER_LEN],
    size_rx: [u8; SIZE_HEADER_LEN],
    tx_buf: [u8; MAX_FRAME_LEN],
    rx_buf: [u8; MAX_FRAME_LEN],
}

impl Engine {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            size_tx: [SIZE_MARKER, 0],
            size_rx: [0; SIZE_HEADER_LEN],
            tx_buf: [0; MAX_FRAME_LEN],
            rx_buf: [0; MAX_FRAME_LEN],
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Admit a host command. Returns `false` without touching the buffers
    /// when a transaction is already in flight (busy-drop: the command is
    /// lost, the caller may re-submit) or when `frame` exceeds
    /// [`MAX_FRAME_LEN`] (caller contract violation, never reaches the
    /// wire). On `true` the transaction has begun: assert chip select and
    /// run the size exchange.
    pub fn submit_command(&mut self, frame: &[u8]) -> bool {
        if frame.len() > MAX_FRAME_LEN {
            return false;
        }
        if self.state != State::Idle {
            return false;
        }
        self.tx_buf[..frame.len()].copy_from_slice(frame);
        self.size_tx = [SIZE_MARKER, frame.len() as u8];
        self.size_rx = [0; SIZE_HEADER_LEN];
        self.state = State::SizeExchange;
        true
    }

    /// Admit a zero-length transaction to drain an unsolicited peer frame.
    /// Same admission rules as [`Self::submit_command`]; the line is level
    /// sensitive, so a drop here self-heals when the driver re-samples it
    /// at the end of the in-flight transaction.
    pub fn peer_data_ready(&mut self) -> bool {
        self.submit_command(&[])
    }

    /// The exchange to run for the current phase, `None` when idle.
    pub fn wire(&mut self) -> Option<Xfer<'_>> {
        match self.state {
            State::Idle => None,
            State::SizeExchange => Some(Xfer {
                tx: &self.size_tx,
                rx: &mut self.size_rx,
            }),
            State::DataTransfer => {
                let tx_len = self.size_tx[1] as usize;
                let rx_len = self.size_rx[1] as usize;
                Some(Xfer {
                    tx: &self.tx_buf[..tx_len],
                    rx: &mut self.rx_buf[..rx_len],
                })
            }
        }
    }

    /// Advance the state machine after the bus exchange finished.
    ///
    /// After the size phase the transaction continues only if either side
    /// announced payload bytes; the peer marker byte is not checked. After
    /// the data phase the peer frame is surfaced when its announced length
    /// was non-zero. Calling this while idle is a spurious completion and
    /// reports an empty `Done`.
    pub fn exchange_complete(&mut self) -> Completion<'_> {
        match self.state {
            State::Idle => Completion::Done(None),
            State::SizeExchange => {
                if self.size_tx[1] > 0 || self.size_rx[1] > 0 {
                    self.state = State::DataTransfer;
                    Completion::Continue
                } else {
                    self.state = State::Idle;
                    Completion::Done(None)
                }
            }
            State::DataTransfer => {
                let rx_len = self.size_rx[1] as usize;
                self.state = State::Idle;
                if rx_len > 0 {
                    Completion::Done(Some(&self.rx_buf[..rx_len]))
                } else {
                    Completion::Done(None)
                }
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

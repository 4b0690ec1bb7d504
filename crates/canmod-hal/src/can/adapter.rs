// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CAN adapter: exclusive owner of the bus handle
//!
//! The adapter is a pure byte-framed transport. It moves [`Frame`]s between the
//! caller and a [`CanPeripheral`] driver and never interprets them.

use tracing::{debug, info, trace, warn};

use crate::can::error::{CanError, CanResult};
use crate::can::frame::Frame;
use crate::can::handle::{BusHandle, ChipSelect};

/// Driver contract for a physical (or simulated) CAN controller
///
/// Implementations live outside the adapter: MCP2515 drivers, SocketCAN,
/// the in-process [`crate::VirtualBus`].
pub trait CanPeripheral {
    /// Stable identifier of the physical peripheral
    ///
    /// Two peripherals reporting the same identifier are the same hardware.
    fn peripheral_id(&self) -> &str;

    /// Bring the controller up on the given select line
    ///
    /// # Returns
    /// `BusUnavailable` if the hardware is absent or the select is invalid
    fn init(&mut self, select: ChipSelect) -> CanResult<()>;

    /// Queue a frame for transmission
    ///
    /// # Returns
    /// `BusBusy` if no transmit buffer is free, `BusError` on hardware faults
    fn transmit(&mut self, frame: &Frame) -> CanResult<()>;

    /// Fetch the next received frame without blocking
    fn try_receive(&mut self) -> CanResult<Option<Frame>>;

    /// Take the controller off the bus
    fn shutdown(&mut self) {}
}

/// Adapter-level counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Frames accepted by the peripheral
    pub frames_sent: u64,
    /// Frames handed to the caller
    pub frames_received: u64,
    /// Transmit attempts rejected with `BusBusy`
    pub busy_rejections: u64,
    /// Transport faults observed
    pub bus_errors: u64,
}

/// CAN adapter owning the bus handle and its peripheral
pub struct CanAdapter<P: CanPeripheral> {
    handle: BusHandle,
    peripheral: P,
    stats: AdapterStats,
}

impl<P: CanPeripheral> CanAdapter<P> {
    /// Acquire the bus handle for `select` and initialise the peripheral
    ///
    /// # Errors
    /// `BusUnavailable` if the peripheral is already open, not present, or the
    /// select parameter is invalid.
    pub fn open_bus(mut peripheral: P, select: ChipSelect) -> CanResult<Self> {
        let handle = BusHandle::acquire(peripheral.peripheral_id(), select)?;

        if let Err(e) = peripheral.init(select) {
            warn!(peripheral = peripheral.peripheral_id(), select = %select, error = %e, "CAN peripheral init failed");
            return Err(match e {
                CanError::BusUnavailable(_) => e,
                other => CanError::BusUnavailable(other.to_string()),
            });
        }

        info!(peripheral = peripheral.peripheral_id(), select = %select, "CAN bus opened");

        Ok(Self {
            handle,
            peripheral,
            stats: AdapterStats::default(),
        })
    }

    /// Transmit a frame
    pub fn send(&mut self, frame: &Frame) -> CanResult<()> {
        match self.peripheral.transmit(frame) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                trace!(id = frame.raw_id(), len = frame.len(), "frame sent");
                Ok(())
            }
            Err(CanError::BusBusy) => {
                self.stats.busy_rejections += 1;
                Err(CanError::BusBusy)
            }
            Err(e) => {
                if e.is_fatal() {
                    self.stats.bus_errors += 1;
                }
                Err(e)
            }
        }
    }

    /// Next pending frame in arrival order, or `None` if nothing is pending
    pub fn receive(&mut self) -> CanResult<Option<Frame>> {
        match self.peripheral.try_receive() {
            Ok(Some(frame)) => {
                self.stats.frames_received += 1;
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if e.is_fatal() {
                    self.stats.bus_errors += 1;
                }
                Err(e)
            }
        }
    }

    /// Chip-select the handle is bound to
    pub fn select(&self) -> ChipSelect {
        self.handle.select()
    }

    /// The open bus handle
    pub fn handle(&self) -> &BusHandle {
        &self.handle
    }

    /// Adapter counters
    pub fn stats(&self) -> AdapterStats {
        self.stats
    }

    /// Tear down: shut the peripheral down, release the handle and hand the
    /// peripheral back for a later re-open
    pub fn close(self) -> P {
        let CanAdapter {
            handle,
            mut peripheral,
            ..
        } = self;
        peripheral.shutdown();
        debug!(peripheral = handle.peripheral_id(), select = %handle.select(), "CAN bus closed");
        drop(handle);
        peripheral
    }
}

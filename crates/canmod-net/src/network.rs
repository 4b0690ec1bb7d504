// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Module network: address resolution, routing and announcements

use std::collections::{BTreeSet, VecDeque};

use canmod_config::NetworkConfig;
use canmod_hal::{CanAdapter, CanError, CanPeripheral, Frame, TimeProvider};
use tracing::{debug, info, trace, warn};

use crate::address::{ModuleAddress, BROADCAST_ADDRESS, UNASSIGNED_ADDRESS};
use crate::error::{NetworkError, NetworkResult};
use crate::message::ModuleMessage;
use crate::negotiation::{observe, AddressPlan, Observation};

/// Frames held back during negotiation for later delivery
const BACKLOG_CAPACITY: usize = 64;

/// Frames read per negotiation poll before yielding to the next delay
const MAX_FRAMES_PER_WATCH: usize = 256;

/// Foreign frames skipped in one `poll` before reporting nothing pending
const MAX_SKIPPED_PER_POLL: usize = 64;

/// Network counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Frames addressed to this module or broadcast
    pub frames_routed: u64,
    /// Frames addressed to other modules
    pub frames_ignored: u64,
    /// Routed frames that decoded to `Unknown`
    pub unknown_messages: u64,
    /// Messages accepted by the bus
    pub messages_sent: u64,
    /// Transmit attempts rejected with `BusBusy`
    pub busy_retries: u64,
    /// Announcements abandoned after all attempts were busy
    pub send_failures: u64,
    /// Negotiation-time frames dropped because the backlog was full
    pub backlog_dropped: u64,
    /// Address claims sent
    pub claims_sent: u64,
}

/// A module's view of the bus
///
/// Owns the open adapter. The address is resolved once; later calls to
/// [`Network::resolve_address`] return it unchanged.
pub struct Network<P: CanPeripheral> {
    adapter: CanAdapter<P>,
    serial: u32,
    address: Option<ModuleAddress>,
    config: NetworkConfig,
    backlog: VecDeque<Frame>,
    stats: NetworkStats,
}

impl<P: CanPeripheral> Network<P> {
    pub fn new(adapter: CanAdapter<P>, serial: u32, config: &NetworkConfig) -> Self {
        Self {
            adapter,
            serial,
            address: None,
            config: config.clone(),
            backlog: VecDeque::new(),
            stats: NetworkStats::default(),
        }
    }

    /// Resolved address, if any
    pub fn address(&self) -> Option<ModuleAddress> {
        self.address
    }

    /// Serial used to tell this module's claims apart from others
    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats
    }

    pub fn adapter(&self) -> &CanAdapter<P> {
        &self.adapter
    }

    /// Give the adapter back, e.g. to close the bus
    pub fn into_adapter(self) -> CanAdapter<P> {
        self.adapter
    }

    /// Establish this module's address
    ///
    /// Sends a claim, then polls `negotiation_rounds` times with
    /// `negotiation_interval_ms` between polls. The address is kept only if
    /// no other serial claims or reports it during that window. Frames that
    /// are not about addressing are kept for [`Network::poll`].
    ///
    /// # Errors
    /// `AddressConflict` if another module answers for the address (after
    /// `max_claim_attempts` candidates in dynamic mode), `NoFreeAddress` if
    /// a dynamic range is exhausted, or a bus error.
    pub fn resolve_address<T: TimeProvider>(
        &mut self,
        plan: &AddressPlan,
        clock: &T,
    ) -> NetworkResult<ModuleAddress> {
        if let Some(address) = self.address {
            debug!(address = %address, "address already resolved");
            return Ok(address);
        }

        let address = match *plan {
            AddressPlan::Fixed(address) => {
                self.claim(address, clock, &mut BTreeSet::new())?;
                address
            }
            AddressPlan::Dynamic { first, last } => self.claim_dynamic(first, last, clock)?,
        };

        info!(address = %address, serial = self.serial, "module address resolved");
        self.address = Some(address);
        Ok(address)
    }

    fn claim_dynamic<T: TimeProvider>(
        &mut self,
        first: ModuleAddress,
        last: ModuleAddress,
        clock: &T,
    ) -> NetworkResult<ModuleAddress> {
        let mut occupied = BTreeSet::new();

        // Listen for a full window before choosing
        for _ in 0..self.config.negotiation_rounds {
            clock.delay_ms(self.config.negotiation_interval_ms);
            self.watch(None, &mut occupied)?;
        }

        let mut last_conflict = None;
        for attempt in 1..=self.config.max_claim_attempts.max(1) {
            let candidate = (first.value()..=last.value())
                .filter(|raw| !occupied.contains(raw))
                .find_map(ModuleAddress::new)
                .ok_or(NetworkError::NoFreeAddress {
                    first: first.value(),
                    last: last.value(),
                })?;

            match self.claim(candidate, clock, &mut occupied) {
                Ok(()) => return Ok(candidate),
                Err(e @ NetworkError::AddressConflict { .. }) => {
                    debug!(attempt, candidate = %candidate, "dynamic claim lost, trying next address");
                    occupied.insert(candidate.value());
                    last_conflict = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_conflict.unwrap_or(NetworkError::NoFreeAddress {
            first: first.value(),
            last: last.value(),
        }))
    }

    fn claim<T: TimeProvider>(
        &mut self,
        candidate: ModuleAddress,
        clock: &T,
        occupied: &mut BTreeSet<u8>,
    ) -> NetworkResult<()> {
        let claim = ModuleMessage::AddressClaim {
            address: candidate.value(),
            serial: self.serial,
        };
        self.transmit(&claim, candidate.value(), BROADCAST_ADDRESS)?;
        self.stats.claims_sent += 1;
        debug!(candidate = %candidate, serial = self.serial, "address claim sent");

        for _ in 0..self.config.negotiation_rounds {
            clock.delay_ms(self.config.negotiation_interval_ms);
            if let Some(other_serial) = self.watch(Some(candidate.value()), occupied)? {
                warn!(
                    address = %candidate,
                    other_serial,
                    "address conflict during negotiation"
                );
                return Err(NetworkError::AddressConflict {
                    address: candidate.value(),
                    other_serial,
                });
            }
        }
        Ok(())
    }

    /// Drain pending frames during negotiation
    ///
    /// Returns the other serial if someone answers for `watched`.
    fn watch(
        &mut self,
        watched: Option<u8>,
        occupied: &mut BTreeSet<u8>,
    ) -> NetworkResult<Option<u32>> {
        for _ in 0..MAX_FRAMES_PER_WATCH {
            let frame = match self.adapter.receive() {
                Ok(Some(frame)) => frame,
                Ok(None) | Err(CanError::BusBusy) => break,
                Err(e) => return Err(e.into()),
            };

            match observe(&ModuleMessage::from_frame(&frame), watched, self.serial) {
                Observation::Conflict { other_serial } => return Ok(Some(other_serial)),
                Observation::Occupied(address) => {
                    occupied.insert(address);
                }
                Observation::Own => {}
                Observation::Unrelated => self.defer(frame),
            }
        }
        Ok(None)
    }

    fn defer(&mut self, frame: Frame) {
        if self.backlog.len() >= BACKLOG_CAPACITY {
            self.backlog.pop_front();
            self.stats.backlog_dropped += 1;
        }
        self.backlog.push_back(frame);
    }

    /// Serial of another module answering for our resolved address
    pub fn conflicting_serial(&self, msg: &ModuleMessage) -> Option<u32> {
        let ours = self.address?.value();
        match observe(msg, Some(ours), self.serial) {
            Observation::Conflict { other_serial } => Some(other_serial),
            _ => None,
        }
    }

    /// Decode a frame if it is addressed to this module or broadcast
    ///
    /// Frames for other modules are dropped. Our own transmissions echoed
    /// back by a loopback adapter are routed like any other frame.
    pub fn route(&mut self, frame: &Frame) -> Option<ModuleMessage> {
        let destination = frame.destination();
        let ours = self.address.map(ModuleAddress::value);

        if destination != BROADCAST_ADDRESS && Some(destination) != ours {
            self.stats.frames_ignored += 1;
            trace!(destination, source = frame.source(), "frame for another module");
            return None;
        }

        let msg = ModuleMessage::from_frame(frame);
        if let ModuleMessage::Unknown { message_type, .. } = &msg {
            self.stats.unknown_messages += 1;
            trace!(message_type = *message_type, source = frame.source(), "unknown message type");
        }
        self.stats.frames_routed += 1;
        Some(msg)
    }

    /// Next message for this module, or `None` if nothing is pending
    ///
    /// # Errors
    /// A fatal receive error (`BusError`). `BusBusy` on receive reads as
    /// nothing pending.
    pub fn poll(&mut self) -> NetworkResult<Option<ModuleMessage>> {
        while let Some(frame) = self.backlog.pop_front() {
            if let Some(msg) = self.route(&frame) {
                return Ok(Some(msg));
            }
        }

        for _ in 0..MAX_SKIPPED_PER_POLL {
            match self.adapter.receive() {
                Ok(Some(frame)) => {
                    if let Some(msg) = self.route(&frame) {
                        return Ok(Some(msg));
                    }
                }
                Ok(None) | Err(CanError::BusBusy) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Broadcast a message to every module on the segment
    ///
    /// # Errors
    /// `SendFailed` once `send_attempts` transmits were all `BusBusy`;
    /// other adapter errors propagate immediately.
    pub fn announce(&mut self, msg: &ModuleMessage) -> NetworkResult<()> {
        self.send_to(BROADCAST_ADDRESS, msg)
    }

    /// Send a message to one module (or [`BROADCAST_ADDRESS`])
    pub fn send_to(&mut self, destination: u8, msg: &ModuleMessage) -> NetworkResult<()> {
        let source = self
            .address
            .map(ModuleAddress::value)
            .unwrap_or(UNASSIGNED_ADDRESS);
        self.transmit(msg, source, destination)
    }

    fn transmit(&mut self, msg: &ModuleMessage, source: u8, destination: u8) -> NetworkResult<()> {
        let frame = msg.to_frame(source, destination)?;
        let attempts = self.config.send_attempts.max(1);

        for attempt in 1..=attempts {
            match self.adapter.send(&frame) {
                Ok(()) => {
                    self.stats.messages_sent += 1;
                    return Ok(());
                }
                Err(CanError::BusBusy) => {
                    self.stats.busy_retries += 1;
                    trace!(attempt, attempts, "bus busy, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.stats.send_failures += 1;
        Err(NetworkError::SendFailed { attempts })
    }
}

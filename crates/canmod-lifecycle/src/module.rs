// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The standard module: one explicitly owned lifecycle per process
//!
//! Setup resolves the bus identity, the enable gate holds the module until a
//! controller enables the segment, and the head/tail hooks bracket the
//! application's own per-cycle logic. Every inbound observation is made in
//! `loop_head`; every outbound announcement is made in `loop_tail`.

use std::collections::VecDeque;

use canmod_config::{validate_config, ModuleConfig};
use canmod_hal::{CanAdapter, CanPeripheral, ChipSelect, IndicatorLight, TimeProvider};
use canmod_net::{
    generate_serial, AddressPlan, AddressStrap, FaultCode, ModuleAddress, ModuleMessage, Network,
    NetworkError, NetworkStats,
};
use tracing::{debug, error, info, warn};

use crate::error::{ModuleError, ModuleResult};
use crate::indicator::indicator_pattern;
use crate::state::LifecycleState;

/// Lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleStats {
    /// Completed head/tail pairs
    pub cycles: u64,
    /// Status announcements accepted by the bus
    pub status_sent: u64,
    /// Status announcements dropped after `SendFailed`
    pub missed_announcements: u64,
    /// Routed messages of an unknown type
    pub unknown_messages: u64,
    /// Application messages dropped because the inbox was full
    pub inbox_dropped: u64,
    /// `Enable` broadcasts observed, including repeats while enabled
    pub enables_seen: u64,
    /// `Disable` broadcasts observed
    pub disables_seen: u64,
    /// Fault announcements from other modules
    pub remote_faults_seen: u64,
}

/// Where the caller is within a head/tail pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    Idle,
    InCycle,
}

/// A CAN bus module and its lifecycle
///
/// Generic over the CAN peripheral and the time source so the same state
/// machine runs on hardware, on SocketCAN and on a virtual bus.
pub struct StandardModule<P: CanPeripheral, C: TimeProvider> {
    config: ModuleConfig,
    clock: C,
    peripheral: Option<P>,
    network: Option<Network<P>>,
    state: LifecycleState,
    fault: Option<FaultCode>,
    indicator: Option<Box<dyn IndicatorLight + Send>>,
    strap: Option<Box<dyn AddressStrap + Send>>,
    inbox: VecDeque<ModuleMessage>,
    phase: CyclePhase,
    status_sequence: u16,
    stats: ModuleStats,
}

impl<P: CanPeripheral, C: TimeProvider> StandardModule<P, C> {
    pub fn new(config: ModuleConfig, peripheral: P, clock: C) -> Self {
        Self {
            config,
            clock,
            peripheral: Some(peripheral),
            network: None,
            state: LifecycleState::Uninitialized,
            fault: None,
            indicator: None,
            strap: None,
            inbox: VecDeque::new(),
            phase: CyclePhase::Idle,
            status_sequence: 0,
            stats: ModuleStats::default(),
        }
    }

    /// Attach the indicator output
    ///
    /// Kept only when the `indicator_light` feature flag is set; without it
    /// the module behaves exactly as if no indicator had been given.
    pub fn with_indicator(mut self, indicator: Box<dyn IndicatorLight + Send>) -> Self {
        if self.config.features.indicator_light {
            self.indicator = Some(indicator);
        } else {
            debug!("indicator supplied but the indicator_light feature is off; ignoring it");
        }
        self
    }

    /// Attach the hardware strap read in strap address mode
    pub fn with_address_strap(mut self, strap: Box<dyn AddressStrap + Send>) -> Self {
        self.strap = Some(strap);
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// True iff the module is READY or RUNNING
    pub fn ready(&self) -> bool {
        self.state.is_enabled()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Latched fault, if FAULTED
    pub fn fault(&self) -> Option<FaultCode> {
        self.fault
    }

    /// Resolved address; `None` before setup
    pub fn address(&self) -> Option<ModuleAddress> {
        self.network.as_ref().and_then(Network::address)
    }

    pub fn serial(&self) -> Option<u32> {
        self.network.as_ref().map(Network::serial)
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn has_indicator(&self) -> bool {
        self.indicator.is_some()
    }

    pub fn stats(&self) -> ModuleStats {
        self.stats
    }

    pub fn network_stats(&self) -> Option<NetworkStats> {
        self.network.as_ref().map(Network::stats)
    }

    /// Application messages received since the last call, oldest first
    pub fn take_inbox(&mut self) -> Vec<ModuleMessage> {
        self.inbox.drain(..).collect()
    }

    // ========================================================================
    // Setup and teardown
    // ========================================================================

    /// Set up on the configured bus select
    pub fn setup(&mut self) -> ModuleResult<()> {
        self.setup_with_select(ChipSelect(self.config.bus.chip_select))
    }

    /// Open the bus on `select`, resolve the address and wait for enable
    ///
    /// On success the module is WAITING_FOR_ENABLE, or READY if an enable
    /// was already pending on the bus.
    ///
    /// # Errors
    /// `BusUnavailable` and `AddressConflict` are fatal: the module stays
    /// UNINITIALIZED and must not be driven further.
    pub fn setup_with_select(&mut self, select: ChipSelect) -> ModuleResult<()> {
        if self.state != LifecycleState::Uninitialized {
            return Err(ModuleError::AlreadySetUp(self.state));
        }
        validate_config(&self.config)?;

        let peripheral = self
            .peripheral
            .take()
            .ok_or(ModuleError::PeripheralUnavailable)?;
        let adapter = CanAdapter::open_bus(peripheral, select).map_err(|e| {
            error!(select = %select, error = %e, "module setup failed: bus unavailable");
            e
        })?;

        let serial = self.config.module.serial.unwrap_or_else(generate_serial);
        let mut network = Network::new(adapter, serial, &self.config.network);

        if let Err(e) = self.resolve(&mut network) {
            error!(select = %select, error = %e, "module setup failed");
            self.peripheral = Some(network.into_adapter().close());
            return Err(e.into());
        }

        self.network = Some(network);
        self.stats = ModuleStats::default();
        self.status_sequence = 0;
        self.phase = CyclePhase::Idle;
        self.transition(LifecycleState::WaitingForEnable);

        // An enable may already be pending
        self.drain_inbound();
        Ok(())
    }

    fn resolve(&mut self, network: &mut Network<P>) -> Result<ModuleAddress, NetworkError> {
        let plan = match self.strap.as_mut() {
            Some(strap) => {
                let reader: &mut dyn AddressStrap = strap.as_mut();
                AddressPlan::from_config(&self.config.network.address, Some(reader))?
            }
            None => AddressPlan::from_config(&self.config.network.address, None)?,
        };
        network.resolve_address(&plan, &self.clock)
    }

    /// Close the bus and return to UNINITIALIZED
    ///
    /// The only way out of FAULTED; a later `setup` re-opens the bus.
    pub fn teardown(&mut self) {
        if let Some(network) = self.network.take() {
            self.peripheral = Some(network.into_adapter().close());
        }
        self.fault = None;
        self.inbox.clear();
        self.phase = CyclePhase::Idle;
        self.transition(LifecycleState::Uninitialized);
        self.drive_indicator();
    }

    // ========================================================================
    // Enable gate
    // ========================================================================

    /// Block until the module is enabled
    ///
    /// Polls the network every `poll_interval_ms`, announcing status every
    /// `waiting_status_period_polls` polls.
    ///
    /// # Errors
    /// `Faulted` as soon as a fault is latched, `NotSetUp` before setup.
    pub fn hold_till_enabled(&mut self) -> ModuleResult<()> {
        self.wait_for_enable(None).map(|_| ())
    }

    /// [`StandardModule::hold_till_enabled`] bounded by `timeout_ms`
    ///
    /// Returns `Ok(false)` if the timeout elapsed without an enable.
    pub fn hold_till_enabled_for(&mut self, timeout_ms: u64) -> ModuleResult<bool> {
        self.wait_for_enable(Some(timeout_ms))
    }

    fn wait_for_enable(&mut self, timeout_ms: Option<u64>) -> ModuleResult<bool> {
        let started_ms = self.clock.now_ms();
        let status_period = u64::from(self.config.lifecycle.waiting_status_period_polls.max(1));
        let mut polls: u64 = 0;

        loop {
            self.drain_inbound();
            match self.state {
                LifecycleState::Uninitialized => return Err(ModuleError::NotSetUp),
                LifecycleState::Ready | LifecycleState::Running => return Ok(true),
                LifecycleState::Faulted => return Err(self.faulted_error()),
                LifecycleState::WaitingForEnable => {}
            }

            if polls % status_period == 0 {
                self.announce_status();
                if self.state == LifecycleState::Faulted {
                    return Err(self.faulted_error());
                }
            }
            self.drive_indicator();

            if let Some(timeout) = timeout_ms {
                if self.clock.now_ms().saturating_sub(started_ms) >= timeout {
                    debug!(timeout_ms = timeout, "enable wait timed out");
                    return Ok(false);
                }
            }

            polls += 1;
            self.clock.delay_ms(self.config.lifecycle.poll_interval_ms);
        }
    }

    // ========================================================================
    // Per-cycle hooks
    // ========================================================================

    /// Pre-cycle bookkeeping
    ///
    /// READY becomes RUNNING, then pending messages are observed: enable,
    /// disable, fault and application traffic. Does nothing once FAULTED.
    pub fn loop_head(&mut self) -> ModuleResult<()> {
        if self.network.is_none() {
            return Err(ModuleError::NotSetUp);
        }
        if self.state == LifecycleState::Faulted {
            return Ok(());
        }
        if self.phase == CyclePhase::InCycle {
            return Err(ModuleError::HookOrder("loop_head called again before loop_tail"));
        }
        self.phase = CyclePhase::InCycle;

        if self.state == LifecycleState::Ready {
            self.transition(LifecycleState::Running);
        }
        self.drain_inbound();
        Ok(())
    }

    /// Post-cycle bookkeeping
    ///
    /// Announces status every `status_period_cycles` cycles and services the
    /// indicator. Does nothing once FAULTED.
    pub fn loop_tail(&mut self) -> ModuleResult<()> {
        if self.network.is_none() {
            return Err(ModuleError::NotSetUp);
        }
        if self.state == LifecycleState::Faulted {
            self.phase = CyclePhase::Idle;
            return Ok(());
        }
        if self.phase != CyclePhase::InCycle {
            return Err(ModuleError::HookOrder("loop_tail called without loop_head"));
        }
        self.phase = CyclePhase::Idle;
        self.stats.cycles += 1;

        let period = u64::from(self.config.lifecycle.status_period_cycles.max(1));
        if self.stats.cycles % period == 0 {
            self.announce_status();
        }
        self.drive_indicator();
        Ok(())
    }

    // ========================================================================
    // Application surface
    // ========================================================================

    /// Send an application message to `destination` (or broadcast)
    ///
    /// # Errors
    /// `NotEnabled` unless READY or RUNNING; `SendFailed` if the bus stayed
    /// busy. A `BusError` faults the module and is returned.
    pub fn send_application(&mut self, destination: u8, kind: u8, data: &[u8]) -> ModuleResult<()> {
        if self.state == LifecycleState::Faulted {
            return Err(self.faulted_error());
        }
        if !self.state.is_enabled() {
            return Err(ModuleError::NotEnabled(self.state));
        }
        let msg = ModuleMessage::application(kind, data).ok_or(
            ModuleError::InvalidApplicationMessage {
                kind,
                len: data.len(),
            },
        )?;

        let network = self.network.as_mut().ok_or(ModuleError::NotSetUp)?;
        match network.send_to(destination, &msg) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => {
                self.enter_fault(FaultCode::BusError, &e.to_string());
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Latch a fault raised by application logic
    pub fn raise_fault(&mut self, code: u8) -> ModuleResult<()> {
        if self.network.is_none() {
            return Err(ModuleError::NotSetUp);
        }
        self.enter_fault(FaultCode::Application(code), "raised by application");
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn drain_inbound(&mut self) {
        let max_frames = self.config.lifecycle.max_frames_per_cycle.max(1);

        for _ in 0..max_frames {
            if self.state == LifecycleState::Faulted {
                return;
            }
            let Some(network) = self.network.as_mut() else {
                return;
            };
            match network.poll() {
                Ok(Some(msg)) => self.observe(msg),
                Ok(None) => return,
                Err(e) if e.is_fatal() => {
                    self.enter_fault(FaultCode::BusError, &e.to_string());
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "receive failed");
                    return;
                }
            }
        }
    }

    fn observe(&mut self, msg: ModuleMessage) {
        if let Some(other_serial) = self
            .network
            .as_ref()
            .and_then(|network| network.conflicting_serial(&msg))
        {
            self.enter_fault(
                FaultCode::AddressConflict,
                &format!("address also claimed by serial {other_serial:#010x}"),
            );
            return;
        }

        match msg {
            ModuleMessage::Enable => {
                self.stats.enables_seen += 1;
                if self.state == LifecycleState::WaitingForEnable {
                    self.transition(LifecycleState::Ready);
                }
            }
            ModuleMessage::Disable => {
                self.stats.disables_seen += 1;
                if self.state.is_enabled() {
                    self.transition(LifecycleState::WaitingForEnable);
                }
            }
            ModuleMessage::Fault { address, code } => {
                if Some(address) == self.address().map(ModuleAddress::value) {
                    return;
                }
                self.stats.remote_faults_seen += 1;
                info!(remote = address, code = ?code, "remote module faulted");
                if self.config.lifecycle.hold_on_remote_fault && self.state.is_enabled() {
                    self.transition(LifecycleState::WaitingForEnable);
                }
            }
            ModuleMessage::Application { .. } => {
                if self.inbox.len() >= self.config.lifecycle.inbox_capacity.max(1) {
                    self.inbox.pop_front();
                    self.stats.inbox_dropped += 1;
                }
                self.inbox.push_back(msg);
            }
            ModuleMessage::Unknown { .. } => {
                self.stats.unknown_messages += 1;
            }
            ModuleMessage::AddressClaim { .. } | ModuleMessage::Status { .. } => {}
        }
    }

    fn announce_status(&mut self) {
        let Some(network) = self.network.as_mut() else {
            return;
        };
        let Some(address) = network.address() else {
            return;
        };

        let msg = ModuleMessage::Status {
            address: address.value(),
            state: self.state.code(),
            sequence: self.status_sequence,
            serial: network.serial(),
        };
        self.status_sequence = self.status_sequence.wrapping_add(1);

        match network.announce(&msg) {
            Ok(()) => self.stats.status_sent += 1,
            Err(e) if e.is_fatal() => self.enter_fault(FaultCode::BusError, &e.to_string()),
            Err(e) => {
                self.stats.missed_announcements += 1;
                warn!(
                    error = %e,
                    missed = self.stats.missed_announcements,
                    "status announcement missed"
                );
            }
        }
    }

    fn enter_fault(&mut self, code: FaultCode, reason: &str) {
        if self.state == LifecycleState::Faulted {
            return;
        }
        self.fault = Some(code);
        self.transition(LifecycleState::Faulted);
        error!(code = ?code, reason, "module faulted");

        // Disclose the fault once while the bus may still accept it
        if let Some(network) = self.network.as_mut() {
            if let Some(address) = network.address() {
                if code == FaultCode::AddressConflict {
                    // A joiner still negotiating must see the address is taken
                    let claim = ModuleMessage::AddressClaim {
                        address: address.value(),
                        serial: network.serial(),
                    };
                    if let Err(e) = network.announce(&claim) {
                        debug!(error = %e, "address reclaim not sent");
                    }
                }
                let msg = ModuleMessage::Fault {
                    address: address.value(),
                    code,
                };
                if let Err(e) = network.announce(&msg) {
                    debug!(error = %e, "fault announcement not sent");
                }
            }
        }
        self.drive_indicator();
    }

    fn transition(&mut self, next: LifecycleState) {
        if let Some((before, after)) =
            LifecycleState::change_state_and_return_before_and_after(&mut self.state, next)
        {
            let address = self.address().map(ModuleAddress::value);
            info!(from = %before, to = %after, address = ?address, "lifecycle transition");
        }
    }

    fn drive_indicator(&mut self) {
        let pattern = indicator_pattern(self.state, self.config.indicator.blink_half_period_ms);
        let now_ms = self.clock.now_ms();
        if let Some(indicator) = self.indicator.as_mut() {
            if let Err(e) = indicator.apply(pattern, now_ms) {
                warn!(error = %e, "indicator output failed");
            }
        }
    }

    fn faulted_error(&self) -> ModuleError {
        ModuleError::Faulted(self.fault.unwrap_or(FaultCode::BusError))
    }
}

impl<P: CanPeripheral, C: TimeProvider> Drop for StandardModule<P, C> {
    fn drop(&mut self) {
        if self.network.is_some() {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canmod_hal::{Frame, IndicatorPattern, StdClock, VirtualBus, VirtualPeripheral};
    use std::sync::{Arc, Mutex};

    const CONTROLLER: u8 = 0xFE;
    const BROADCAST: u8 = 0xFF;

    fn fast_config(address: u8) -> ModuleConfig {
        let mut config = ModuleConfig::default();
        config.network.address.address = address;
        config.network.negotiation_rounds = 1;
        config.network.negotiation_interval_ms = 1;
        config.lifecycle.poll_interval_ms = 1;
        config
    }

    fn module(bus: &VirtualBus, name: &str, address: u8) -> StandardModule<VirtualPeripheral, StdClock> {
        StandardModule::new(fast_config(address), bus.attach(name), StdClock::new())
    }

    fn send(bus: &VirtualBus, msg: ModuleMessage) {
        bus.inject(msg.to_frame(CONTROLLER, BROADCAST).unwrap());
    }

    fn cycle(module: &mut StandardModule<VirtualPeripheral, StdClock>) {
        module.loop_head().unwrap();
        module.loop_tail().unwrap();
    }

    #[derive(Clone, Default)]
    struct RecordingLight(Arc<Mutex<Vec<IndicatorPattern>>>);

    impl IndicatorLight for RecordingLight {
        fn apply(
            &mut self,
            pattern: IndicatorPattern,
            _now_ms: u64,
        ) -> Result<(), canmod_hal::IndicatorError> {
            self.0.lock().unwrap().push(pattern);
            Ok(())
        }
    }

    #[test]
    fn test_setup_waits_for_enable() {
        let bus = VirtualBus::new("lc-setup");
        let mut module = module(&bus, "m", 0x10);

        assert_eq!(module.state(), LifecycleState::Uninitialized);
        module.setup().unwrap();
        assert_eq!(module.state(), LifecycleState::WaitingForEnable);
        assert!(!module.ready());
        assert_eq!(module.address().map(ModuleAddress::value), Some(0x10));
    }

    #[test]
    fn test_setup_twice_is_rejected() {
        let bus = VirtualBus::new("lc-setup-twice");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        assert!(matches!(
            module.setup(),
            Err(ModuleError::AlreadySetUp(LifecycleState::WaitingForEnable))
        ));
    }

    #[test]
    fn test_ready_becomes_running_on_first_head() {
        let bus = VirtualBus::new("lc-running");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();

        send(&bus, ModuleMessage::Enable);
        module.loop_head().unwrap();
        assert_eq!(module.state(), LifecycleState::Ready);
        module.loop_tail().unwrap();

        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::Running);
    }

    #[test]
    fn test_disable_holds_module() {
        let bus = VirtualBus::new("lc-disable");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);
        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::Running);

        send(&bus, ModuleMessage::Disable);
        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::WaitingForEnable);
        assert!(!module.ready());

        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);
        assert!(module.ready());
    }

    #[test]
    fn test_remote_fault_holds_module() {
        let bus = VirtualBus::new("lc-remote-fault");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);

        send(
            &bus,
            ModuleMessage::Fault {
                address: 0x22,
                code: FaultCode::BusError,
            },
        );
        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::WaitingForEnable);
        assert_eq!(module.stats().remote_faults_seen, 1);
        assert_eq!(module.fault(), None);
    }

    #[test]
    fn test_remote_fault_ignored_when_configured() {
        let bus = VirtualBus::new("lc-remote-fault-ignored");
        let mut config = fast_config(0x10);
        config.lifecycle.hold_on_remote_fault = false;
        let mut module = StandardModule::new(config, bus.attach("m"), StdClock::new());
        module.setup().unwrap();
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);

        send(
            &bus,
            ModuleMessage::Fault {
                address: 0x22,
                code: FaultCode::BusError,
            },
        );
        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::Running);
    }

    #[test]
    fn test_hook_order_is_enforced() {
        let bus = VirtualBus::new("lc-hook-order");
        let mut module = module(&bus, "m", 0x10);
        assert!(matches!(module.loop_head(), Err(ModuleError::NotSetUp)));

        module.setup().unwrap();
        assert!(matches!(module.loop_tail(), Err(ModuleError::HookOrder(_))));
        module.loop_head().unwrap();
        assert!(matches!(module.loop_head(), Err(ModuleError::HookOrder(_))));
        module.loop_tail().unwrap();
    }

    #[test]
    fn test_tail_announces_status() {
        let bus = VirtualBus::new("lc-status");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        bus.clear_traffic();

        cycle(&mut module);
        let traffic = bus.traffic();
        assert_eq!(traffic.len(), 1);
        match ModuleMessage::from_frame(&traffic[0]) {
            ModuleMessage::Status {
                address, state, sequence, ..
            } => {
                assert_eq!(address, 0x10);
                assert_eq!(state, LifecycleState::WaitingForEnable.code());
                assert_eq!(sequence, 0);
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn test_status_period() {
        let bus = VirtualBus::new("lc-status-period");
        let mut config = fast_config(0x10);
        config.lifecycle.status_period_cycles = 3;
        let mut module = StandardModule::new(config, bus.attach("m"), StdClock::new());
        module.setup().unwrap();
        bus.clear_traffic();

        for _ in 0..6 {
            module.loop_head().unwrap();
            module.loop_tail().unwrap();
        }
        assert_eq!(bus.traffic().len(), 2);
        assert_eq!(module.stats().status_sent, 2);
    }

    #[test]
    fn test_busy_bus_counts_missed_announcement() {
        let bus = VirtualBus::new("lc-missed");
        let peripheral = bus.attach("m");
        let faults = peripheral.injector();
        let mut module = StandardModule::new(fast_config(0x10), peripheral, StdClock::new());
        module.setup().unwrap();
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);

        faults.busy_for(100);
        cycle(&mut module);
        assert_eq!(module.stats().missed_announcements, 1);
        assert_eq!(module.state(), LifecycleState::Running);
    }

    #[test]
    fn test_application_inbox() {
        let bus = VirtualBus::new("lc-inbox");
        let mut config = fast_config(0x10);
        config.lifecycle.inbox_capacity = 2;
        let mut module = StandardModule::new(config, bus.attach("m"), StdClock::new());
        module.setup().unwrap();

        for value in 0..3u8 {
            send(&bus, ModuleMessage::application(0x41, &[value]).unwrap());
        }
        // Addressed to another module
        bus.inject(Frame::new(0x41, 0x11, CONTROLLER, &[9]).unwrap());
        cycle(&mut module);

        let inbox = module.take_inbox();
        assert_eq!(
            inbox,
            vec![
                ModuleMessage::application(0x41, &[1]).unwrap(),
                ModuleMessage::application(0x41, &[2]).unwrap(),
            ]
        );
        assert_eq!(module.stats().inbox_dropped, 1);
        assert!(module.take_inbox().is_empty());
    }

    #[test]
    fn test_send_application_requires_enable() {
        let bus = VirtualBus::new("lc-send-app");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        assert!(matches!(
            module.send_application(0x11, 0x41, &[1]),
            Err(ModuleError::NotEnabled(LifecycleState::WaitingForEnable))
        ));

        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);
        assert!(matches!(
            module.send_application(0x11, 0x02, &[1]),
            Err(ModuleError::InvalidApplicationMessage { kind: 0x02, .. })
        ));

        bus.clear_traffic();
        module.send_application(0x11, 0x41, &[1, 2]).unwrap();
        let frame = bus.traffic()[0];
        assert_eq!(frame.destination(), 0x11);
        assert_eq!(frame.source(), 0x10);
        assert_eq!(frame.payload(), &[1, 2]);
    }

    #[test]
    fn test_raise_fault_then_teardown_recovers() {
        let bus = VirtualBus::new("lc-raise");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);

        bus.clear_traffic();
        module.raise_fault(0x90).unwrap();
        assert_eq!(module.state(), LifecycleState::Faulted);
        assert_eq!(module.fault(), Some(FaultCode::Application(0x90)));
        assert_eq!(
            ModuleMessage::from_frame(&bus.traffic()[0]),
            ModuleMessage::Fault {
                address: 0x10,
                code: FaultCode::Application(0x90)
            }
        );

        // Enable does not clear a latched fault
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::Faulted);
        assert!(matches!(
            module.hold_till_enabled(),
            Err(ModuleError::Faulted(FaultCode::Application(0x90)))
        ));

        module.teardown();
        assert_eq!(module.state(), LifecycleState::Uninitialized);
        assert_eq!(module.fault(), None);
        module.setup().unwrap();
        assert_eq!(module.state(), LifecycleState::WaitingForEnable);
    }

    #[test]
    fn test_post_setup_conflict_faults() {
        let bus = VirtualBus::new("lc-late-conflict");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);

        send(
            &bus,
            ModuleMessage::AddressClaim {
                address: 0x10,
                serial: module.serial().unwrap().wrapping_add(1),
            },
        );
        bus.clear_traffic();
        cycle(&mut module);
        assert_eq!(module.state(), LifecycleState::Faulted);
        assert_eq!(module.fault(), Some(FaultCode::AddressConflict));

        // The address is reclaimed before the fault is disclosed
        let sent: Vec<_> = bus
            .traffic()
            .iter()
            .filter(|frame| frame.source() == 0x10)
            .map(ModuleMessage::from_frame)
            .collect();
        assert_eq!(
            sent,
            vec![
                ModuleMessage::AddressClaim {
                    address: 0x10,
                    serial: module.serial().unwrap(),
                },
                ModuleMessage::Fault {
                    address: 0x10,
                    code: FaultCode::AddressConflict,
                },
            ]
        );
    }

    #[test]
    fn test_raised_codes_matching_system_codes_reach_peers_intact() {
        for code in [0x01, 0x02] {
            let bus = VirtualBus::new(&format!("lc-raise-collide-{code}"));
            let mut module = module(&bus, "m", 0x10);
            module.setup().unwrap();
            bus.clear_traffic();

            module.raise_fault(code).unwrap();
            assert_eq!(module.fault(), Some(FaultCode::Application(code)));
            assert_eq!(
                ModuleMessage::from_frame(&bus.traffic()[0]),
                ModuleMessage::Fault {
                    address: 0x10,
                    code: FaultCode::Application(code)
                }
            );
        }
    }

    #[test]
    fn test_hold_till_enabled_times_out() {
        let bus = VirtualBus::new("lc-hold-timeout");
        let mut module = module(&bus, "m", 0x10);
        module.setup().unwrap();
        assert!(!module.hold_till_enabled_for(5).unwrap());
        assert_eq!(module.state(), LifecycleState::WaitingForEnable);
    }

    #[test]
    fn test_indicator_follows_state() {
        let bus = VirtualBus::new("lc-indicator");
        let light = RecordingLight::default();
        let mut config = fast_config(0x10);
        config.features.indicator_light = true;
        config.indicator.blink_half_period_ms = 100;

        let mut module = StandardModule::new(config, bus.attach("m"), StdClock::new())
            .with_indicator(Box::new(light.clone()));
        assert!(module.has_indicator());
        module.setup().unwrap();

        cycle(&mut module);
        send(&bus, ModuleMessage::Enable);
        cycle(&mut module);
        cycle(&mut module);
        module.raise_fault(1).unwrap();

        let seen = light.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                IndicatorPattern::Steady,
                IndicatorPattern::Steady,
                IndicatorPattern::Blink {
                    half_period_ms: 100
                },
                IndicatorPattern::Off,
            ]
        );
    }

    #[test]
    fn test_indicator_ignored_without_feature() {
        let bus = VirtualBus::new("lc-no-indicator");
        let light = RecordingLight::default();
        let mut module = module(&bus, "m", 0x10).with_indicator(Box::new(light.clone()));
        assert!(!module.has_indicator());

        module.setup().unwrap();
        cycle(&mut module);
        assert!(light.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_fails_setup() {
        let bus = VirtualBus::new("lc-bad-config");
        let mut config = fast_config(0x10);
        config.network.send_attempts = 0;
        let mut module = StandardModule::new(config, bus.attach("m"), StdClock::new());
        assert!(matches!(module.setup(), Err(ModuleError::Config(_))));
        assert_eq!(module.state(), LifecycleState::Uninitialized);
    }
}

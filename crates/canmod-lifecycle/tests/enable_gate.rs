// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! `hold_till_enabled` driven by a scripted clock

use std::sync::atomic::{AtomicU64, Ordering};

use canmod_config::ModuleConfig;
use canmod_hal::{TimeProvider, VirtualBus};
use canmod_lifecycle::{LifecycleState, ModuleError, StandardModule};
use canmod_net::{FaultCode, ModuleMessage};

/// Manual clock that plays a bus event after a number of waits
struct ScriptedClock {
    bus: VirtualBus,
    now_us: AtomicU64,
    delays: AtomicU64,
    fire_after: u64,
    event: ModuleMessage,
}

impl ScriptedClock {
    fn new(bus: &VirtualBus, fire_after: u64, event: ModuleMessage) -> Self {
        Self {
            bus: bus.clone(),
            now_us: AtomicU64::new(0),
            delays: AtomicU64::new(0),
            fire_after,
            event,
        }
    }

    fn delays(&self) -> u64 {
        self.delays.load(Ordering::SeqCst)
    }
}

impl TimeProvider for ScriptedClock {
    fn get_time_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn delay_us(&self, us: u32) {
        self.now_us.fetch_add(u64::from(us), Ordering::SeqCst);
        let delays = self.delays.fetch_add(1, Ordering::SeqCst) + 1;
        if delays == self.fire_after {
            self.bus
                .inject(self.event.to_frame(0xFE, 0xFF).expect("encodable event"));
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn config() -> ModuleConfig {
    let mut config = ModuleConfig::default();
    config.network.address.address = 0x0C;
    config.network.negotiation_rounds = 2;
    config.lifecycle.poll_interval_ms = 10;
    config.lifecycle.waiting_status_period_polls = 2;
    config
}

#[test]
fn test_hold_returns_once_enable_arrives() {
    init_tracing();
    let bus = VirtualBus::new("gate-enable");
    // Two negotiation delays, then the enable lands on the fourth poll wait
    let clock = ScriptedClock::new(&bus, 6, ModuleMessage::Enable);
    let mut module = StandardModule::new(config(), bus.attach("m"), &clock);

    module.setup().unwrap();
    assert_eq!(module.state(), LifecycleState::WaitingForEnable);

    module.hold_till_enabled().unwrap();
    assert_eq!(module.state(), LifecycleState::Ready);
    assert_eq!(clock.delays(), 6);

    // Polls 0 and 2 announced status, poll 4 found the enable first
    assert_eq!(module.stats().status_sent, 2);
}

#[test]
fn test_hold_aborts_on_latched_fault() {
    init_tracing();
    let bus = VirtualBus::new("gate-fault");
    let peripheral = bus.attach("m");
    let faults = peripheral.injector();
    let clock = ScriptedClock::new(&bus, u64::MAX, ModuleMessage::Enable);
    let mut module = StandardModule::new(config(), peripheral, &clock);

    module.setup().unwrap();
    faults.bus_error_on_receive("controller bus-off");

    let err = module.hold_till_enabled().unwrap_err();
    assert!(matches!(err, ModuleError::Faulted(FaultCode::BusError)));
    assert_eq!(module.state(), LifecycleState::Faulted);
    assert!(!module.ready());
}

#[test]
fn test_hold_returns_immediately_when_enabled() {
    init_tracing();
    let bus = VirtualBus::new("gate-pending");
    let clock = ScriptedClock::new(&bus, u64::MAX, ModuleMessage::Enable);
    let mut module = StandardModule::new(config(), bus.attach("m"), &clock);

    bus.inject(ModuleMessage::Enable.to_frame(0xFE, 0xFF).unwrap());
    module.setup().unwrap();
    assert!(module.ready());

    let waits_after_setup = clock.delays();
    module.hold_till_enabled().unwrap();
    assert_eq!(clock.delays(), waits_after_setup);
}

#[test]
fn test_hold_before_setup_is_an_error() {
    init_tracing();
    let bus = VirtualBus::new("gate-unset");
    let clock = ScriptedClock::new(&bus, u64::MAX, ModuleMessage::Enable);
    let mut module = StandardModule::new(config(), bus.attach("m"), &clock);
    assert!(matches!(
        module.hold_till_enabled(),
        Err(ModuleError::NotSetUp)
    ));
}

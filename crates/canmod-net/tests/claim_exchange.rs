// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Two modules negotiating on one segment at the same time

use std::sync::{Arc, Barrier};
use std::thread;

use canmod_config::NetworkConfig;
use canmod_hal::{CanAdapter, ChipSelect, TimeProvider, VirtualBus};
use canmod_net::{AddressPlan, ModuleAddress, Network, NetworkError};

/// Clock whose delays rendezvous with the other module's thread
struct LockstepClock(Arc<Barrier>);

impl TimeProvider for LockstepClock {
    fn get_time_us(&self) -> u64 {
        0
    }

    fn delay_us(&self, _us: u32) {
        self.0.wait();
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn config() -> NetworkConfig {
    NetworkConfig {
        negotiation_rounds: 3,
        negotiation_interval_ms: 1,
        ..Default::default()
    }
}

fn negotiate(
    bus: &VirtualBus,
    barrier: &Arc<Barrier>,
    name: &'static str,
    serial: u32,
    raw: u8,
) -> thread::JoinHandle<Result<ModuleAddress, NetworkError>> {
    let peripheral = bus.attach_loopback(name);
    let barrier = Arc::clone(barrier);
    thread::spawn(move || {
        let adapter = CanAdapter::open_bus(peripheral, ChipSelect::default())?;
        let mut network = Network::new(adapter, serial, &config());
        let plan = AddressPlan::Fixed(ModuleAddress::new(raw).expect("valid address"));
        network.resolve_address(&plan, &LockstepClock(barrier))
    })
}

#[test]
fn test_same_fixed_address_conflicts_on_both_sides() {
    init_tracing();
    let bus = VirtualBus::new("claim-conflict");
    let barrier = Arc::new(Barrier::new(2));

    let a = negotiate(&bus, &barrier, "a", 0xA, 0x30);
    let b = negotiate(&bus, &barrier, "b", 0xB, 0x30);

    let a = a.join().unwrap();
    let b = b.join().unwrap();

    assert_eq!(
        a,
        Err(NetworkError::AddressConflict {
            address: 0x30,
            other_serial: 0xB
        })
    );
    assert_eq!(
        b,
        Err(NetworkError::AddressConflict {
            address: 0x30,
            other_serial: 0xA
        })
    );
}

#[test]
fn test_distinct_fixed_addresses_both_resolve() {
    init_tracing();
    let bus = VirtualBus::new("claim-distinct");
    let barrier = Arc::new(Barrier::new(2));

    let a = negotiate(&bus, &barrier, "a", 0xA, 0x30);
    let b = negotiate(&bus, &barrier, "b", 0xB, 0x31);

    assert_eq!(a.join().unwrap().unwrap().value(), 0x30);
    assert_eq!(b.join().unwrap().unwrap().value(), 0x31);
}

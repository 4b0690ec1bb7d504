// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process virtual CAN segment
//!
//! A [`VirtualBus`] models a shared multi-drop medium: every frame transmitted
//! by one node is delivered to every other attached node. Loopback nodes also
//! receive their own frames. Used for bench simulation and tests.
//!
//! Each [`VirtualPeripheral`] exposes a [`FaultInjector`] so tests can make the
//! transport report `BusBusy`, `BusError` or a missing device.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::can::adapter::CanPeripheral;
use crate::can::error::{CanError, CanResult};
use crate::can::frame::Frame;
use crate::can::handle::ChipSelect;

const DEFAULT_QUEUE_CAPACITY: usize = 256;
const TRAFFIC_LOG_CAPACITY: usize = 1024;

struct Node {
    name: String,
    echo: bool,
    online: bool,
    rx: VecDeque<Frame>,
    overruns: u64,
}

struct Segment {
    nodes: Vec<Node>,
    queue_capacity: usize,
    traffic: VecDeque<Frame>,
}

impl Segment {
    fn deliver(&mut self, from: Option<usize>, frame: Frame) {
        let capacity = self.queue_capacity;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if !node.online {
                continue;
            }
            if Some(index) == from && !node.echo {
                continue;
            }
            if node.rx.len() >= capacity {
                node.overruns += 1;
                continue;
            }
            node.rx.push_back(frame);
        }

        if self.traffic.len() >= TRAFFIC_LOG_CAPACITY {
            self.traffic.pop_front();
        }
        self.traffic.push_back(frame);
    }
}

/// Shared virtual CAN segment
#[derive(Clone)]
pub struct VirtualBus {
    name: Arc<str>,
    segment: Arc<Mutex<Segment>>,
}

impl VirtualBus {
    /// Create an empty segment
    pub fn new(name: &str) -> Self {
        Self::with_queue_capacity(name, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a segment whose per-node receive queues hold `capacity` frames
    pub fn with_queue_capacity(name: &str, capacity: usize) -> Self {
        Self {
            name: Arc::from(name),
            segment: Arc::new(Mutex::new(Segment {
                nodes: Vec::new(),
                queue_capacity: capacity.max(1),
                traffic: VecDeque::new(),
            })),
        }
    }

    /// Segment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a node that does not hear its own frames (normal CAN controller)
    pub fn attach(&self, node_name: &str) -> VirtualPeripheral {
        self.attach_node(node_name, false)
    }

    /// Attach a loopback node that also receives the frames it transmits
    pub fn attach_loopback(&self, node_name: &str) -> VirtualPeripheral {
        self.attach_node(node_name, true)
    }

    fn attach_node(&self, node_name: &str, echo: bool) -> VirtualPeripheral {
        let mut segment = self.segment.lock();
        segment.nodes.push(Node {
            name: node_name.to_string(),
            echo,
            online: true,
            rx: VecDeque::new(),
            overruns: 0,
        });

        VirtualPeripheral {
            bus: self.clone(),
            index: segment.nodes.len() - 1,
            id: format!("vbus:{}/{}", self.name, node_name),
            faults: FaultInjector::default(),
        }
    }

    /// Put a foreign frame on the segment, as if sent by an unattached device
    pub fn inject(&self, frame: Frame) {
        trace!(bus = %self.name, id = frame.raw_id(), "frame injected");
        self.segment.lock().deliver(None, frame);
    }

    /// Most recent frames seen on the segment, oldest first
    pub fn traffic(&self) -> Vec<Frame> {
        self.segment.lock().traffic.iter().copied().collect()
    }

    /// Forget the traffic log
    pub fn clear_traffic(&self) {
        self.segment.lock().traffic.clear();
    }

    /// Frames dropped because a node's receive queue was full
    pub fn overruns(&self, node_name: &str) -> u64 {
        self.segment
            .lock()
            .nodes
            .iter()
            .filter(|n| n.name == node_name)
            .map(|n| n.overruns)
            .sum()
    }
}

#[derive(Default)]
struct Faults {
    busy_sends: u32,
    send_error: Option<String>,
    receive_error: Option<String>,
    unavailable: bool,
}

/// Handle for injecting transport faults into a [`VirtualPeripheral`]
#[derive(Clone, Default)]
pub struct FaultInjector {
    faults: Arc<Mutex<Faults>>,
}

impl FaultInjector {
    /// Reject the next `attempts` transmissions with `BusBusy`
    pub fn busy_for(&self, attempts: u32) {
        self.faults.lock().busy_sends = attempts;
    }

    /// Fail the next transmission with `BusError`
    pub fn bus_error_on_send(&self, reason: &str) {
        self.faults.lock().send_error = Some(reason.to_string());
    }

    /// Fail the next receive with `BusError`
    pub fn bus_error_on_receive(&self, reason: &str) {
        self.faults.lock().receive_error = Some(reason.to_string());
    }

    /// Pretend the controller is absent at init
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }
}

/// Node on a [`VirtualBus`]
pub struct VirtualPeripheral {
    bus: VirtualBus,
    index: usize,
    id: String,
    faults: FaultInjector,
}

impl VirtualPeripheral {
    /// Fault injection handle (clone it before moving the peripheral)
    pub fn injector(&self) -> FaultInjector {
        self.faults.clone()
    }

    /// Segment this node is attached to
    pub fn bus(&self) -> &VirtualBus {
        &self.bus
    }
}

impl CanPeripheral for VirtualPeripheral {
    fn peripheral_id(&self) -> &str {
        &self.id
    }

    fn init(&mut self, _select: ChipSelect) -> CanResult<()> {
        if self.faults.faults.lock().unavailable {
            return Err(CanError::BusUnavailable(format!(
                "{} not present",
                self.id
            )));
        }
        let mut segment = self.bus.segment.lock();
        if let Some(node) = segment.nodes.get_mut(self.index) {
            node.online = true;
        }
        Ok(())
    }

    fn transmit(&mut self, frame: &Frame) -> CanResult<()> {
        {
            let mut faults = self.faults.faults.lock();
            if let Some(reason) = faults.send_error.take() {
                return Err(CanError::BusError(reason));
            }
            if faults.busy_sends > 0 {
                faults.busy_sends -= 1;
                return Err(CanError::BusBusy);
            }
        }

        self.bus.segment.lock().deliver(Some(self.index), *frame);
        Ok(())
    }

    fn try_receive(&mut self) -> CanResult<Option<Frame>> {
        if let Some(reason) = self.faults.faults.lock().receive_error.take() {
            return Err(CanError::BusError(reason));
        }

        let mut segment = self.bus.segment.lock();
        Ok(segment
            .nodes
            .get_mut(self.index)
            .and_then(|node| node.rx.pop_front()))
    }

    fn shutdown(&mut self) {
        let mut segment = self.bus.segment.lock();
        if let Some(node) = segment.nodes.get_mut(self.index) {
            node.online = false;
            node.rx.clear();
        }
    }
}

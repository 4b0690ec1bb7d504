// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Address plans and claim bookkeeping
//!
//! A module either owns a fixed address (configured, or read from a
//! hardware strap) or picks the lowest free address in a dynamic range.
//! In every mode the address is claimed on the bus and held only if no
//! other serial answers for it during the negotiation window.

use canmod_config::{AddressConfig, AddressMode};
use canmod_hal::GpioProvider;

use crate::address::ModuleAddress;
use crate::error::{NetworkError, NetworkResult};
use crate::message::ModuleMessage;

/// Hardware address selection (DIP switches, solder jumpers)
pub trait AddressStrap {
    /// Offset added to the configured strap base
    fn read_offset(&mut self) -> Result<u8, String>;
}

/// Strap read from up to eight GPIO inputs, pin `i` being bit `i`
pub struct GpioStrap<G: GpioProvider> {
    gpio: G,
    pins: heapless::Vec<G::Pin, 8>,
}

impl<G: GpioProvider> GpioStrap<G> {
    /// `None` if more than eight pins are given
    pub fn new(gpio: G, pins: &[G::Pin]) -> Option<Self> {
        let pins = heapless::Vec::from_slice(pins).ok()?;
        Some(Self { gpio, pins })
    }
}

impl<G: GpioProvider> AddressStrap for GpioStrap<G> {
    fn read_offset(&mut self) -> Result<u8, String> {
        let mut offset = 0u8;
        for (bit, pin) in self.pins.iter().enumerate() {
            let high = self
                .gpio
                .read_level(*pin)
                .map_err(|e| format!("strap bit {bit}: {e:?}"))?;
            if high {
                offset |= 1 << bit;
            }
        }
        Ok(offset)
    }
}

/// How a module obtains its address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPlan {
    /// Claim exactly this address
    Fixed(ModuleAddress),
    /// Claim the lowest address in the range nobody else answers for
    Dynamic {
        first: ModuleAddress,
        last: ModuleAddress,
    },
}

impl AddressPlan {
    /// Build the plan for an address configuration
    ///
    /// Strap mode reads the strap now and yields a fixed plan.
    pub fn from_config(
        config: &AddressConfig,
        strap: Option<&mut dyn AddressStrap>,
    ) -> NetworkResult<Self> {
        match config.mode {
            AddressMode::Fixed => ModuleAddress::new(config.address)
                .map(AddressPlan::Fixed)
                .ok_or(NetworkError::InvalidAddress(config.address)),
            AddressMode::Strap => {
                let strap = strap.ok_or_else(|| {
                    NetworkError::Strap("strap mode configured without a strap reader".into())
                })?;
                let offset = strap.read_offset().map_err(NetworkError::Strap)?;
                config
                    .strap_base
                    .checked_add(offset)
                    .and_then(ModuleAddress::new)
                    .map(AddressPlan::Fixed)
                    .ok_or_else(|| {
                        NetworkError::Strap(format!(
                            "base {:#04x} + offset {} is not a module address",
                            config.strap_base, offset
                        ))
                    })
            }
            AddressMode::Dynamic => {
                let first = ModuleAddress::new(config.dynamic_first)
                    .ok_or(NetworkError::InvalidAddress(config.dynamic_first))?;
                let last = ModuleAddress::new(config.dynamic_last)
                    .ok_or(NetworkError::InvalidAddress(config.dynamic_last))?;
                if first > last {
                    return Err(NetworkError::NoFreeAddress {
                        first: first.value(),
                        last: last.value(),
                    });
                }
                Ok(AddressPlan::Dynamic { first, last })
            }
        }
    }
}

/// What a received message says about address ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observation {
    /// Our own claim or status, echoed back
    Own,
    /// Another serial answers for the watched address
    Conflict { other_serial: u32 },
    /// Another module holds this address
    Occupied(u8),
    /// Not about addressing
    Unrelated,
}

pub(crate) fn observe(msg: &ModuleMessage, watched: Option<u8>, own_serial: u32) -> Observation {
    let (address, serial) = match msg {
        ModuleMessage::AddressClaim { address, serial } => (*address, *serial),
        ModuleMessage::Status {
            address, serial, ..
        } => (*address, *serial),
        _ => return Observation::Unrelated,
    };

    if serial == own_serial {
        Observation::Own
    } else if Some(address) == watched {
        Observation::Conflict {
            other_serial: serial,
        }
    } else {
        Observation::Occupied(address)
    }
}

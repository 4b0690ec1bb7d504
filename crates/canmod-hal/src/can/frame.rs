// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tagged CAN frame
//!
//! ## Wire Format
//!
//! Frames travel as CAN 2.0B extended frames. The 29-bit identifier carries the
//! tags, the data field carries up to 8 payload bytes.
//!
//! ```text
//! ┌──────────┬──────────────┬─────────────┬──────────┐
//! │ 28..24   │ 23..16       │ 15..8       │ 7..0     │
//! │ (unused) │ message type │ destination │ source   │
//! └──────────┴──────────────┴─────────────┴──────────┘
//! ```
//!
//! Lower message types win arbitration, so control traffic is kept in the low
//! range.

use crate::can::error::{CanError, CanResult};

/// Payload capacity of a classic CAN data frame
pub const FRAME_PAYLOAD_LEN: usize = 8;

/// Largest 29-bit extended identifier
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// A fixed-size CAN payload tagged with source, destination and message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    message_type: u8,
    destination: u8,
    source: u8,
    len: u8,
    data: [u8; FRAME_PAYLOAD_LEN],
}

impl Frame {
    /// Build a frame from its tags and a payload of at most 8 bytes
    pub fn new(message_type: u8, destination: u8, source: u8, payload: &[u8]) -> CanResult<Self> {
        if payload.len() > FRAME_PAYLOAD_LEN {
            return Err(CanError::InvalidFrame(format!(
                "payload of {} bytes exceeds {} bytes",
                payload.len(),
                FRAME_PAYLOAD_LEN
            )));
        }

        let mut data = [0u8; FRAME_PAYLOAD_LEN];
        data[..payload.len()].copy_from_slice(payload);

        Ok(Self {
            message_type,
            destination,
            source,
            len: payload.len() as u8,
            data,
        })
    }

    /// Rebuild a frame from a raw extended identifier and data field
    pub fn from_raw(raw_id: u32, payload: &[u8]) -> CanResult<Self> {
        if raw_id > MAX_EXTENDED_ID {
            return Err(CanError::InvalidFrame(format!(
                "identifier {:#x} exceeds 29 bits",
                raw_id
            )));
        }

        Self::new(
            ((raw_id >> 16) & 0xFF) as u8,
            ((raw_id >> 8) & 0xFF) as u8,
            (raw_id & 0xFF) as u8,
            payload,
        )
    }

    /// Raw 29-bit extended identifier for this frame
    pub fn raw_id(&self) -> u32 {
        (u32::from(self.message_type) << 16)
            | (u32::from(self.destination) << 8)
            | u32::from(self.source)
    }

    /// Message-type discriminator
    pub fn message_type(&self) -> u8 {
        self.message_type
    }

    /// Destination tag
    pub fn destination(&self) -> u8 {
        self.destination
    }

    /// Source tag
    pub fn source(&self) -> u8 {
        self.source
    }

    /// Meaningful payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Full 8-byte data field, zero padded
    pub fn data(&self) -> &[u8; FRAME_PAYLOAD_LEN] {
        &self.data
    }

    /// Number of meaningful payload bytes (the CAN DLC)
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True if the frame carries no payload
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

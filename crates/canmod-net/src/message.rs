// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bus message set and its frame encoding
//!
//! Message types `0x00..=0x3F` are reserved for system messages, the rest
//! carry application data. Multi-byte fields are little-endian.
//!
//! | Type | Message        | Payload                                        |
//! |------|----------------|------------------------------------------------|
//! | 0x01 | Enable         | -                                              |
//! | 0x02 | Disable        | -                                              |
//! | 0x03 | Fault          | `[address, origin, code]`                      |
//! | 0x04 | AddressClaim   | `[address, serial u32]`                        |
//! | 0x05 | Status         | `[address, state, sequence u16, serial u32]`   |
//!
//! A fault `origin` of 0 marks a system code, 1 an application code, so
//! application codes may use the full byte range.

use canmod_hal::{CanError, CanResult, Frame, FRAME_PAYLOAD_LEN};

/// Fixed-capacity frame payload
pub type Payload = heapless::Vec<u8, FRAME_PAYLOAD_LEN>;

/// First message type available to applications
pub const APPLICATION_KIND_START: u8 = 0x40;

/// Reserved system message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Enable = 0x01,
    Disable = 0x02,
    Fault = 0x03,
    AddressClaim = 0x04,
    Status = 0x05,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(MessageType::Enable),
            0x02 => Ok(MessageType::Disable),
            0x03 => Ok(MessageType::Fault),
            0x04 => Ok(MessageType::AddressClaim),
            0x05 => Ok(MessageType::Status),
            other => Err(other),
        }
    }
}

/// Reason carried by a fault announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCode {
    BusError,
    AddressConflict,
    /// Raised by application code
    Application(u8),
}

const FAULT_ORIGIN_SYSTEM: u8 = 0x00;
const FAULT_ORIGIN_APPLICATION: u8 = 0x01;

impl FaultCode {
    /// `[origin, code]` as carried in a fault payload
    pub fn to_bytes(self) -> [u8; 2] {
        match self {
            FaultCode::BusError => [FAULT_ORIGIN_SYSTEM, 0x01],
            FaultCode::AddressConflict => [FAULT_ORIGIN_SYSTEM, 0x02],
            FaultCode::Application(code) => [FAULT_ORIGIN_APPLICATION, code],
        }
    }

    /// `None` for an unassigned system code or origin
    pub fn from_bytes(origin: u8, code: u8) -> Option<Self> {
        match (origin, code) {
            (FAULT_ORIGIN_SYSTEM, 0x01) => Some(FaultCode::BusError),
            (FAULT_ORIGIN_SYSTEM, 0x02) => Some(FaultCode::AddressConflict),
            (FAULT_ORIGIN_APPLICATION, code) => Some(FaultCode::Application(code)),
            _ => None,
        }
    }
}

/// A decoded bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleMessage {
    /// Permission to start running
    Enable,
    /// Revoke a previous enable
    Disable,
    /// A module entered the faulted state
    Fault { address: u8, code: FaultCode },
    /// Address negotiation claim
    AddressClaim { address: u8, serial: u32 },
    /// Periodic health announcement
    Status {
        address: u8,
        state: u8,
        sequence: u16,
        serial: u32,
    },
    /// Application-defined traffic (`kind >= 0x40`)
    Application { kind: u8, data: Payload },
    /// Reserved type with no known meaning, or a malformed system payload
    Unknown { message_type: u8, data: Payload },
}

impl ModuleMessage {
    /// Build an application message
    ///
    /// Kinds below [`APPLICATION_KIND_START`] are reserved and yield `None`,
    /// as do payloads longer than a frame.
    pub fn application(kind: u8, data: &[u8]) -> Option<Self> {
        if kind < APPLICATION_KIND_START {
            return None;
        }
        Payload::from_slice(data)
            .ok()
            .map(|data| ModuleMessage::Application { kind, data })
    }

    /// Wire message type
    pub fn message_type(&self) -> u8 {
        match self {
            ModuleMessage::Enable => MessageType::Enable as u8,
            ModuleMessage::Disable => MessageType::Disable as u8,
            ModuleMessage::Fault { .. } => MessageType::Fault as u8,
            ModuleMessage::AddressClaim { .. } => MessageType::AddressClaim as u8,
            ModuleMessage::Status { .. } => MessageType::Status as u8,
            ModuleMessage::Application { kind, .. } => *kind,
            ModuleMessage::Unknown { message_type, .. } => *message_type,
        }
    }

    /// Encode into a frame
    ///
    /// # Errors
    /// `InvalidFrame` for an `Application` kind in the reserved range, or an
    /// `Unknown` type in the application range; neither would decode back
    /// to the same message.
    pub fn to_frame(&self, source: u8, destination: u8) -> CanResult<Frame> {
        match self {
            ModuleMessage::Application { kind, .. } if *kind < APPLICATION_KIND_START => {
                return Err(CanError::InvalidFrame(format!(
                    "application kind {kind:#04x} is reserved for system messages"
                )));
            }
            ModuleMessage::Unknown { message_type, .. }
                if *message_type >= APPLICATION_KIND_START =>
            {
                return Err(CanError::InvalidFrame(format!(
                    "message type {message_type:#04x} is an application kind"
                )));
            }
            _ => {}
        }

        let mut payload = [0u8; FRAME_PAYLOAD_LEN];
        let len = match self {
            ModuleMessage::Enable | ModuleMessage::Disable => 0,
            ModuleMessage::Fault { address, code } => {
                payload[0] = *address;
                payload[1..3].copy_from_slice(&code.to_bytes());
                3
            }
            ModuleMessage::AddressClaim { address, serial } => {
                payload[0] = *address;
                payload[1..5].copy_from_slice(&serial.to_le_bytes());
                5
            }
            ModuleMessage::Status {
                address,
                state,
                sequence,
                serial,
            } => {
                payload[0] = *address;
                payload[1] = *state;
                payload[2..4].copy_from_slice(&sequence.to_le_bytes());
                payload[4..8].copy_from_slice(&serial.to_le_bytes());
                8
            }
            ModuleMessage::Application { data, .. } | ModuleMessage::Unknown { data, .. } => {
                payload[..data.len()].copy_from_slice(data);
                data.len()
            }
        };
        Frame::new(self.message_type(), destination, source, &payload[..len])
    }

    /// Decode a frame
    ///
    /// Never fails: anything not matching a known layout becomes
    /// [`ModuleMessage::Unknown`].
    pub fn from_frame(frame: &Frame) -> Self {
        let p = frame.payload();
        let message_type = frame.message_type();

        if message_type >= APPLICATION_KIND_START {
            return ModuleMessage::Application {
                kind: message_type,
                data: copy_payload(p),
            };
        }

        let decoded = match MessageType::try_from(message_type) {
            Ok(MessageType::Enable) => Some(ModuleMessage::Enable),
            Ok(MessageType::Disable) => Some(ModuleMessage::Disable),
            Ok(MessageType::Fault) if p.len() >= 3 => {
                FaultCode::from_bytes(p[1], p[2]).map(|code| ModuleMessage::Fault {
                    address: p[0],
                    code,
                })
            }
            Ok(MessageType::AddressClaim) if p.len() >= 5 => Some(ModuleMessage::AddressClaim {
                address: p[0],
                serial: u32::from_le_bytes([p[1], p[2], p[3], p[4]]),
            }),
            Ok(MessageType::Status) if p.len() >= 8 => Some(ModuleMessage::Status {
                address: p[0],
                state: p[1],
                sequence: u16::from_le_bytes([p[2], p[3]]),
                serial: u32::from_le_bytes([p[4], p[5], p[6], p[7]]),
            }),
            _ => None,
        };

        decoded.unwrap_or_else(|| ModuleMessage::Unknown {
            message_type,
            data: copy_payload(p),
        })
    }
}

fn copy_payload(bytes: &[u8]) -> Payload {
    // Frame payloads never exceed the capacity
    let mut data = Payload::new();
    for byte in bytes.iter().take(FRAME_PAYLOAD_LEN) {
        let _ = data.push(*byte);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_layout() {
        let msg = ModuleMessage::Status {
            address: 0x21,
            state: 3,
            sequence: 0x0102,
            serial: 0xAABBCCDD,
        };
        let frame = msg.to_frame(0x21, 0xFF).unwrap();

        assert_eq!(frame.message_type(), 0x05);
        assert_eq!(frame.source(), 0x21);
        assert_eq!(frame.destination(), 0xFF);
        assert_eq!(
            frame.payload(),
            &[0x21, 3, 0x02, 0x01, 0xDD, 0xCC, 0xBB, 0xAA]
        );
        assert_eq!(ModuleMessage::from_frame(&frame), msg);
    }

    #[test]
    fn test_claim_layout() {
        let frame = ModuleMessage::AddressClaim {
            address: 0x30,
            serial: 7,
        }
        .to_frame(0x30, 0xFF)
        .unwrap();
        assert_eq!(frame.payload(), &[0x30, 7, 0, 0, 0]);
    }

    #[test]
    fn test_reserved_unknown_type_decodes_to_unknown() {
        let frame = Frame::new(0x3E, 0xFF, 0x10, &[1, 2]).unwrap();
        match ModuleMessage::from_frame(&frame) {
            ModuleMessage::Unknown { message_type, data } => {
                assert_eq!(message_type, 0x3E);
                assert_eq!(data.as_slice(), &[1, 2]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_short_system_payload_is_unknown() {
        let frame = Frame::new(0x05, 0xFF, 0x10, &[1, 2, 3]).unwrap();
        assert!(matches!(
            ModuleMessage::from_frame(&frame),
            ModuleMessage::Unknown { message_type: 0x05, .. }
        ));
    }

    #[test]
    fn test_application_kinds() {
        assert!(ModuleMessage::application(0x10, &[]).is_none());
        assert!(ModuleMessage::application(0x40, &[0; 9]).is_none());

        let msg = ModuleMessage::application(0x81, &[9, 8, 7]).unwrap();
        let frame = msg.to_frame(0x02, 0x03).unwrap();
        assert_eq!(frame.message_type(), 0x81);
        assert_eq!(ModuleMessage::from_frame(&frame), msg);
    }

    #[test]
    fn test_fault_codes() {
        assert_eq!(FaultCode::from_bytes(0, 0x01), Some(FaultCode::BusError));
        assert_eq!(FaultCode::from_bytes(0, 0x02), Some(FaultCode::AddressConflict));
        assert_eq!(FaultCode::from_bytes(1, 0x90), Some(FaultCode::Application(0x90)));
        assert_eq!(FaultCode::from_bytes(0, 0x90), None);
        assert_eq!(FaultCode::from_bytes(7, 0x01), None);
        assert_eq!(FaultCode::Application(0x90).to_bytes(), [1, 0x90]);
    }

    #[test]
    fn test_application_fault_codes_keep_their_meaning() {
        // Application codes share values with the system codes
        for code in [
            FaultCode::BusError,
            FaultCode::AddressConflict,
            FaultCode::Application(0x00),
            FaultCode::Application(0x01),
            FaultCode::Application(0x02),
            FaultCode::Application(0xFF),
        ] {
            let msg = ModuleMessage::Fault {
                address: 0x10,
                code,
            };
            let frame = msg.to_frame(0x10, 0xFF).unwrap();
            assert_eq!(ModuleMessage::from_frame(&frame), msg);
        }
    }

    #[test]
    fn test_unassigned_system_fault_code_is_unknown() {
        let frame = Frame::new(0x03, 0xFF, 0x10, &[0x10, 0, 0x77]).unwrap();
        assert!(matches!(
            ModuleMessage::from_frame(&frame),
            ModuleMessage::Unknown { message_type: 0x03, .. }
        ));
    }

    #[test]
    fn test_reserved_kinds_are_not_encoded() {
        let system_kind = ModuleMessage::Application {
            kind: 0x05,
            data: Payload::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
        };
        assert!(matches!(
            system_kind.to_frame(0x10, 0xFF),
            Err(CanError::InvalidFrame(_))
        ));

        let application_type = ModuleMessage::Unknown {
            message_type: 0x41,
            data: Payload::new(),
        };
        assert!(matches!(
            application_type.to_frame(0x10, 0xFF),
            Err(CanError::InvalidFrame(_))
        ));

        let reserved = ModuleMessage::Unknown {
            message_type: 0x3E,
            data: Payload::new(),
        };
        assert!(reserved.to_frame(0x10, 0xFF).is_ok());
    }
}

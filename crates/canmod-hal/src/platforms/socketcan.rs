// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Linux SocketCAN peripheral
//!
//! The chip-select parameter picks the interface index: select `n` binds
//! `{prefix}{n}` (`can0`, `vcan1`, ...). The socket is non-blocking; an empty
//! receive queue yields `None` and a full transmit queue yields `BusBusy`.

use std::io;

use socketcan::{
    CanFrame as SocketFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame as SocketFrameExt,
    Socket,
};
use tracing::{debug, trace};

use crate::can::{CanError, CanPeripheral, CanResult, ChipSelect, Frame};

/// SocketCAN-backed CAN peripheral
pub struct SocketCanPeripheral {
    prefix: String,
    id: String,
    socket: Option<CanSocket>,
}

impl SocketCanPeripheral {
    /// Peripheral binding `{prefix}{select}` on init, e.g. prefix `"can"`
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            id: format!("socketcan:{}", prefix),
            socket: None,
        }
    }

    fn socket(&self) -> CanResult<&CanSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| CanError::BusError("socket not open".to_string()))
    }
}

fn map_io_error(err: io::Error) -> CanError {
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::ENOBUFS) {
        CanError::BusBusy
    } else {
        CanError::BusError(err.to_string())
    }
}

impl CanPeripheral for SocketCanPeripheral {
    fn peripheral_id(&self) -> &str {
        &self.id
    }

    fn init(&mut self, select: ChipSelect) -> CanResult<()> {
        let interface = format!("{}{}", self.prefix, select.0);
        let socket = CanSocket::open(&interface).map_err(|e| {
            CanError::BusUnavailable(format!("cannot open {}: {}", interface, e))
        })?;
        socket.set_nonblocking(true).map_err(|e| {
            CanError::BusUnavailable(format!("cannot configure {}: {}", interface, e))
        })?;

        debug!(interface = %interface, "SocketCAN interface opened");
        self.socket = Some(socket);
        Ok(())
    }

    fn transmit(&mut self, frame: &Frame) -> CanResult<()> {
        let id = ExtendedId::new(frame.raw_id())
            .ok_or_else(|| CanError::InvalidFrame(format!("bad id {:#x}", frame.raw_id())))?;
        let out = SocketFrame::new(id, frame.payload())
            .ok_or_else(|| CanError::InvalidFrame("cannot build SocketCAN frame".to_string()))?;

        self.socket()?.write_frame(&out).map_err(map_io_error)
    }

    fn try_receive(&mut self) -> CanResult<Option<Frame>> {
        let socket = self.socket()?;
        loop {
            match socket.read_frame() {
                Ok(incoming) => {
                    // Standard-id, remote and error frames belong to other protocols
                    if !incoming.is_extended()
                        || incoming.is_remote_frame()
                        || incoming.is_error_frame()
                    {
                        trace!(id = incoming.raw_id(), "foreign frame skipped");
                        continue;
                    }
                    return Frame::from_raw(incoming.raw_id(), incoming.data()).map(Some);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(CanError::BusError(e.to_string())),
            }
        }
    }

    fn shutdown(&mut self) {
        self.socket = None;
    }
}

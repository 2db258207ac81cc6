use embedded_can::{ExtendedId, Id, StandardId};

use crate::error::{Error, Result};

/// Extended frame format flag in [`RawFrame::can_id`].
pub const EFF_FLAG: u32 = 0x8000_0000;
/// Remote transmission request flag in [`RawFrame::can_id`].
pub const RTR_FLAG: u32 = 0x4000_0000;
/// Error frame flag in [`RawFrame::can_id`].
pub const ERR_FLAG: u32 = 0x2000_0000;
/// Significant bits of an extended identifier.
pub const EFF_MASK: u32 = 0x1FFF_FFFF;
/// First identifier that no longer fits into 11 bits.
pub const SFF_LIMIT: u32 = 0x800;

pub const MAX_DLEN: usize = 8;

/// Frame as exchanged with the vendor SDK.
///
/// Frame format and remote flag live in the upper bits of `can_id`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub can_id: u32,
    pub can_dlc: u8,
    pub data: [u8; MAX_DLEN],
}

impl RawFrame {
    pub fn encode(message: &Message) -> Self {
        let mut can_id = message.id;
        if message.id >= SFF_LIMIT {
            can_id |= EFF_FLAG;
        }

        let mut frame = RawFrame {
            can_id,
            can_dlc: message.len,
            data: [0; MAX_DLEN],
        };

        // Remote frames carry no data.
        if message.remote {
            frame.can_id |= RTR_FLAG;
        } else {
            let len = message.len as usize;
            frame.data[..len].copy_from_slice(&message.data[..len]);
        }
        frame
    }

    pub fn decode(&self) -> Message {
        Message {
            id: self.can_id & EFF_MASK,
            len: self.can_dlc.min(MAX_DLEN as u8),
            remote: self.is_remote(),
            data: self.data,
        }
    }

    pub fn is_extended(&self) -> bool {
        self.can_id & EFF_FLAG != 0
    }

    pub fn is_remote(&self) -> bool {
        self.can_id & RTR_FLAG != 0
    }
}

/// CAN message as seen by the protocol stack.
///
/// Identifiers from `0x800` upwards are sent in the extended frame format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    id: u32,
    len: u8,
    remote: bool,
    data: [u8; MAX_DLEN],
}

impl Message {
    /// Creates a data message. Returns `None` for more than 8 bytes of data.
    pub fn new(id: u32, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DLEN {
            return None;
        }

        let mut buf = [0; MAX_DLEN];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id & EFF_MASK,
            len: data.len() as u8,
            remote: false,
            data: buf,
        })
    }

    /// Creates a remote request for `len` bytes.
    pub fn new_remote(id: u32, len: u8) -> Option<Self> {
        if len as usize > MAX_DLEN {
            return None;
        }

        Some(Self {
            id: id & EFF_MASK,
            len,
            remote: true,
            data: [0; MAX_DLEN],
        })
    }

    /// Builds a message from the fields of the C `Message` struct.
    pub fn from_parts(id: u32, len: u8, remote: bool, data: [u8; MAX_DLEN]) -> Result<Self> {
        if len as usize > MAX_DLEN {
            return Err(Error::InvalidLength(len));
        }

        Ok(Self {
            id: id & EFF_MASK,
            len,
            remote,
            data,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Payload buffer including the bytes beyond `len`.
    pub fn raw_data(&self) -> &[u8; MAX_DLEN] {
        &self.data
    }
}

impl embedded_can::Frame for Message {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Message::new(raw_id(id.into()), data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DLEN {
            return None;
        }
        Message::new_remote(raw_id(id.into()), dlc as u8)
    }

    fn is_extended(&self) -> bool {
        self.id >= SFF_LIMIT
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        if self.id < SFF_LIMIT {
            if let Some(id) = StandardId::new(self.id as u16) {
                return Id::Standard(id);
            }
        }
        match ExtendedId::new(self.id) {
            Some(id) => Id::Extended(id),
            None => Id::Extended(ExtendedId::MAX),
        }
    }

    fn dlc(&self) -> usize {
        self.len as usize
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.len as usize]
        }
    }
}

fn raw_id(id: Id) -> u32 {
    match id {
        Id::Standard(id) => id.as_raw() as u32,
        Id::Extended(id) => id.as_raw(),
    }
}

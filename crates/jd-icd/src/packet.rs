use crate::{CodecError, ControlPacket, CONTROL_PACKET_SIZE};

/// Payload capacity of a raw bus frame.
pub const PACKET_DATA_SIZE: usize = 32;

const _: () = assert!(PACKET_DATA_SIZE >= CONTROL_PACKET_SIZE);

/// A frame as handed over by the transport. The payload is opaque until a
/// driver decides how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPacket {
    pub crc: u16,
    pub address: u8,
    pub size: u8,
    pub data: [u8; PACKET_DATA_SIZE],
}

impl RawPacket {
    /// Copy `payload` into a frame for `address`.
    pub fn new(address: u8, payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() > PACKET_DATA_SIZE {
            return Err(CodecError::Oversized {
                max: PACKET_DATA_SIZE,
                actual: payload.len(),
            });
        }
        let mut data = [0u8; PACKET_DATA_SIZE];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self { crc: 0, address, size: payload.len() as u8, data })
    }

    /// Frame carrying `packet` on the logic channel.
    pub fn control(packet: &ControlPacket) -> Self {
        let mut data = [0u8; PACKET_DATA_SIZE];
        data[..CONTROL_PACKET_SIZE].copy_from_slice(&packet.encode());
        Self {
            crc: 0,
            address: crate::LOGIC_ADDRESS,
            size: CONTROL_PACKET_SIZE as u8,
            data,
        }
    }

    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.size).min(PACKET_DATA_SIZE);
        &self.data[..len]
    }

    /// Interpret the whole payload buffer as a control packet.
    pub fn as_control(&self) -> ControlPacket {
        let mut frame = [0u8; CONTROL_PACKET_SIZE];
        frame.copy_from_slice(&self.data[..CONTROL_PACKET_SIZE]);
        ControlPacket::from_bytes(&frame)
    }

    /// Interpret only the valid part of the payload as a control packet.
    pub fn try_control(&self) -> Result<ControlPacket, CodecError> {
        ControlPacket::decode(self.payload())
    }
}

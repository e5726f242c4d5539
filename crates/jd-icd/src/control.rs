use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use crate::{fixed, CodecError, DeviceRecord, DEVICE_RECORD_SIZE};

/// Size of the opaque payload carried by a control packet.
pub const CONTROL_DATA_SIZE: usize = 16;
/// Encoded size of a [`ControlPacket`].
pub const CONTROL_PACKET_SIZE: usize = CONTROL_HEADER_SIZE + CONTROL_DATA_SIZE;

const CONTROL_HEADER_SIZE: usize = 11;

const _: () = assert!(CONTROL_DATA_SIZE >= DEVICE_RECORD_SIZE);

bitflags! {
    /// Flags carried in the control packet header.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct ControlFlags: u8 {
        /// Rejection of a previous request.
        const NACK = 0b0000_0001;
    }
}

/// Kind of a control packet. Types this crate does not know are carried
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlPacketType {
    Hello,
    PairingRequest,
    Other(u8),
}

impl From<u8> for ControlPacketType {
    fn from(value: u8) -> Self {
        match value {
            1 => ControlPacketType::Hello,
            2 => ControlPacketType::PairingRequest,
            v => ControlPacketType::Other(v),
        }
    }
}

impl From<ControlPacketType> for u8 {
    fn from(value: ControlPacketType) -> Self {
        match value {
            ControlPacketType::Hello => 1,
            ControlPacketType::PairingRequest => 2,
            ControlPacketType::Other(v) => v,
        }
    }
}

/// Envelope exchanged on the logic channel.
///
/// Wire layout (little-endian, [`CONTROL_PACKET_SIZE`] bytes):
///
/// | offset | size | field         |
/// |--------|------|---------------|
/// | 0      | 1    | address       |
/// | 1      | 4    | driver_class  |
/// | 5      | 4    | serial_number |
/// | 9      | 1    | packet_type   |
/// | 10     | 1    | flags         |
/// | 11     | 16   | data          |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPacket {
    pub address: u8,
    pub driver_class: u32,
    pub serial_number: u32,
    pub packet_type: ControlPacketType,
    pub flags: ControlFlags,
    pub data: [u8; CONTROL_DATA_SIZE],
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControlPacket {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ControlPacket {{ a: {}, class: {}, sn: {}, type: {}, flags: {=u8:#x} }}",
            self.address,
            self.driver_class,
            self.serial_number,
            self.packet_type,
            self.flags.bits()
        )
    }
}

impl ControlPacket {
    /// A packet addressed to `target`'s identity with an empty payload.
    pub fn directed_at(target: &DeviceRecord, packet_type: ControlPacketType) -> Self {
        Self {
            address: target.address,
            driver_class: target.driver_class,
            serial_number: target.serial_number,
            packet_type,
            flags: ControlFlags::empty(),
            data: [0; CONTROL_DATA_SIZE],
        }
    }

    /// Copy `device` into the payload.
    pub fn set_device(&mut self, device: &DeviceRecord) {
        self.data[..DEVICE_RECORD_SIZE].copy_from_slice(&device.encode());
    }

    /// Read the device record carried in the payload.
    pub fn device(&self) -> DeviceRecord {
        let mut record = [0u8; DEVICE_RECORD_SIZE];
        record.copy_from_slice(&self.data[..DEVICE_RECORD_SIZE]);
        DeviceRecord::from_bytes(&record)
    }

    pub fn is_nack(&self) -> bool {
        self.flags.contains(ControlFlags::NACK)
    }

    pub fn encode(&self) -> [u8; CONTROL_PACKET_SIZE] {
        let mut buf = [0u8; CONTROL_PACKET_SIZE];
        buf[0] = self.address;
        LittleEndian::write_u32(&mut buf[1..5], self.driver_class);
        LittleEndian::write_u32(&mut buf[5..9], self.serial_number);
        buf[9] = self.packet_type.into();
        buf[10] = self.flags.bits();
        buf[CONTROL_HEADER_SIZE..].copy_from_slice(&self.data);
        buf
    }

    pub fn from_bytes(bytes: &[u8; CONTROL_PACKET_SIZE]) -> Self {
        let mut data = [0u8; CONTROL_DATA_SIZE];
        data.copy_from_slice(&bytes[CONTROL_HEADER_SIZE..]);
        Self {
            address: bytes[0],
            driver_class: LittleEndian::read_u32(&bytes[1..5]),
            serial_number: LittleEndian::read_u32(&bytes[5..9]),
            packet_type: bytes[9].into(),
            flags: ControlFlags::from_bits_retain(bytes[10]),
            data,
        }
    }

    /// Decode a packet from the start of `bytes`; trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        fixed::<CONTROL_PACKET_SIZE>(bytes).map(Self::from_bytes)
    }
}

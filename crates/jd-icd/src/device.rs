use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use crate::{fixed, CodecError};

/// Encoded size of a [`DeviceRecord`].
pub const DEVICE_RECORD_SIZE: usize = 15;

bitflags! {
    /// Role and state bits of a device record.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct DeviceFlags: u16 {
        const REMOTE      = 0x8000;
        const LOCAL       = 0x4000;
        const BROADCAST   = 0x2000;
        const PAIR        = 0x1000;
        const PAIRABLE    = 0x0800;
        const PAIRED      = 0x0400;
        const PAIRING     = 0x0200;
        const INITIALISED = 0x0080;
        const CP_SEEN     = 0x0040;

        /// Bits replaced wholesale when a role is applied.
        const ROLE_MASK = Self::REMOTE.bits()
            | Self::LOCAL.bits()
            | Self::BROADCAST.bits()
            | Self::PAIR.bits()
            | Self::PAIRABLE.bits()
            | Self::PAIRED.bits()
            | Self::PAIRING.bits();
    }
}

/// Named role presets a driver can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverRole {
    /// Local view of a service hosted elsewhere on the bus.
    Virtual,
    /// Seeks an exclusive partner before doing anything useful.
    Paired,
    /// Hosts a service on this device.
    Host,
    /// Hosts a service and advertises that it accepts a partner.
    PairableHost,
    /// Hosts a service that every device on the bus may consume.
    Broadcast,
    /// Observes broadcast traffic from a remote host.
    Sniffer,
}

impl DriverRole {
    pub const fn flags(self) -> DeviceFlags {
        match self {
            Self::Virtual => DeviceFlags::REMOTE,
            Self::Paired => DeviceFlags::BROADCAST.union(DeviceFlags::PAIR),
            Self::Host => DeviceFlags::LOCAL,
            Self::PairableHost => DeviceFlags::LOCAL.union(DeviceFlags::PAIRABLE),
            Self::Broadcast => DeviceFlags::LOCAL.union(DeviceFlags::BROADCAST),
            Self::Sniffer => DeviceFlags::REMOTE.union(DeviceFlags::BROADCAST),
        }
    }
}

/// Identity and state of one participant on the bus.
///
/// Wire layout (little-endian, [`DEVICE_RECORD_SIZE`] bytes):
///
/// | offset | size | field           |
/// |--------|------|-----------------|
/// | 0      | 1    | address         |
/// | 1      | 4    | serial_number   |
/// | 5      | 4    | driver_class    |
/// | 9      | 2    | flags           |
/// | 11     | 4    | rolling_counter |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceRecord {
    /// Bus address; 0 until one has been assigned.
    pub address: u8,
    pub serial_number: u32,
    pub driver_class: u32,
    pub flags: DeviceFlags,
    pub rolling_counter: u32,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceRecord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "DeviceRecord {{ a: {}, sn: {}, class: {}, flags: {=u16:#x}, rc: {} }}",
            self.address,
            self.serial_number,
            self.driver_class,
            self.flags.bits(),
            self.rolling_counter
        )
    }
}

impl DeviceRecord {
    pub const fn new(serial_number: u32, driver_class: u32, role: DriverRole) -> Self {
        Self {
            address: 0,
            serial_number,
            driver_class,
            flags: role.flags(),
            rolling_counter: 0,
        }
    }

    /// Replace every role and pairing bit with `flags`, keeping the
    /// connection bits (`INITIALISED`, `CP_SEEN`) as they are.
    pub fn set_mode(&mut self, flags: DeviceFlags) {
        self.flags.remove(DeviceFlags::ROLE_MASK);
        self.flags.insert(flags & DeviceFlags::ROLE_MASK);
    }

    pub fn set_role(&mut self, role: DriverRole) {
        self.set_mode(role.flags());
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(DeviceFlags::INITIALISED)
    }

    pub fn is_paired(&self) -> bool {
        self.flags.contains(DeviceFlags::PAIRED)
    }

    pub fn is_pairable(&self) -> bool {
        self.flags.contains(DeviceFlags::PAIRABLE)
    }

    pub fn is_pairing(&self) -> bool {
        self.flags.contains(DeviceFlags::PAIRING)
    }

    pub fn encode(&self) -> [u8; DEVICE_RECORD_SIZE] {
        let mut buf = [0u8; DEVICE_RECORD_SIZE];
        buf[0] = self.address;
        LittleEndian::write_u32(&mut buf[1..5], self.serial_number);
        LittleEndian::write_u32(&mut buf[5..9], self.driver_class);
        LittleEndian::write_u16(&mut buf[9..11], self.flags.bits());
        LittleEndian::write_u32(&mut buf[11..15], self.rolling_counter);
        buf
    }

    pub fn from_bytes(bytes: &[u8; DEVICE_RECORD_SIZE]) -> Self {
        Self {
            address: bytes[0],
            serial_number: LittleEndian::read_u32(&bytes[1..5]),
            driver_class: LittleEndian::read_u32(&bytes[5..9]),
            flags: DeviceFlags::from_bits_retain(LittleEndian::read_u16(&bytes[9..11])),
            rolling_counter: LittleEndian::read_u32(&bytes[11..15]),
        }
    }

    /// Decode a record from the start of `bytes`; trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        fixed::<DEVICE_RECORD_SIZE>(bytes).map(Self::from_bytes)
    }
}

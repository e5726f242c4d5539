#![no_std]
//! Interface control document for the shared-bus driver protocol.
//!
//! Everything that crosses the wire lives here: the device record every
//! driver instance carries, the control packet envelope used on the logic
//! channel, and the raw frame delivered by the transport. All layouts are
//! fixed and little-endian; see the per-type docs for byte offsets.

mod control;
mod device;
mod packet;

pub use control::*;
pub use device::*;
pub use packet::*;

/// Reserved address of the logic (control) channel.
pub const LOGIC_ADDRESS: u8 = 0;

/// Errors produced by the fixed-layout codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// The slice is shorter than the fixed layout.
    Truncated { expected: usize, actual: usize },
    /// The payload does not fit in a frame.
    Oversized { max: usize, actual: usize },
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CodecError::Truncated { expected, actual } => {
                write!(f, "Truncated frame: expected {} bytes, got {}", expected, actual)
            }
            CodecError::Oversized { max, actual } => {
                write!(f, "Payload of {} bytes exceeds frame capacity {}", actual, max)
            }
        }
    }
}

/// The first `N` bytes of `bytes`.
pub(crate) fn fixed<const N: usize>(bytes: &[u8]) -> Result<&[u8; N], CodecError> {
    bytes.first_chunk::<N>().ok_or(CodecError::Truncated {
        expected: N,
        actual: bytes.len(),
    })
}

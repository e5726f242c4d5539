use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::event::EventBus;
use crate::registry::DriverRegistry;

/// Sends frames on the bus.
pub trait Transport {
    /// Error type for send failures.
    type Error: core::fmt::Debug;

    /// Queue `frame` for transmission. The frame length is `frame.len()`.
    fn send(&mut self, frame: &[u8], priority: u8) -> Result<(), Self::Error>;
}

/// Bundles the collaborators a [`Context`](crate::Context) is built from.
///
/// Implementors are usually zero-sized marker types; firmware picks
/// `CriticalSectionRawMutex` so the context can be touched from interrupt
/// handlers, host tests pick `NoopRawMutex`.
pub trait Platform {
    /// Mutex guarding every collaborator inside the context.
    type Mutex: RawMutex;
    type Registry: DriverRegistry;
    type Events: EventBus;
    type Transport: Transport;
}

/// Transport error of platform `P`.
pub type TransportError<P> = <<P as Platform>::Transport as Transport>::Error;

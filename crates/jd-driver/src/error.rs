/// Result of a protocol operation that ran without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The operation took effect. Sending a NACK counts as handled.
    Handled,
    /// The instance declined the request (no override, stale callback,
    /// wrong state).
    Cancelled,
}

/// The event bus could not take a subscription or an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventBusError {
    SubscriptionsFull,
    QueueFull,
}

/// The registry has no room for another driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

/// Faults raised by driver operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError<E: core::fmt::Debug> {
    /// The transport failed to send a frame.
    Transport(E),
    /// The event bus rejected a subscription or an event.
    Events(EventBusError),
    /// The driver registry is full.
    Registry(RegistryFull),
    /// Every driver id of the context has been handed out.
    IdsExhausted,
}

impl core::fmt::Display for EventBusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EventBusError::SubscriptionsFull => {
                write!(f, "No room for another subscription")
            }
            EventBusError::QueueFull => write!(f, "Event queue is full"),
        }
    }
}

impl core::fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Driver registry is full")
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for DriverError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DriverError::Transport(err) => {
                write!(f, "Transport error: {:?}", err)
            }
            DriverError::Events(err) => write!(f, "Event bus error: {}", err),
            DriverError::Registry(err) => write!(f, "Registry error: {}", err),
            DriverError::IdsExhausted => write!(f, "No driver ids left"),
        }
    }
}

impl<E: core::fmt::Debug> From<EventBusError> for DriverError<E> {
    fn from(e: EventBusError) -> Self {
        DriverError::Events(e)
    }
}

impl<E: core::fmt::Debug> From<RegistryFull> for DriverError<E> {
    fn from(e: RegistryFull) -> Self {
        DriverError::Registry(e)
    }
}

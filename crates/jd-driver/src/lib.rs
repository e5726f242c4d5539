#![no_std]
//! Driver base for a shared-bus device protocol.
//!
//! Every participant on the bus is represented locally by a
//! [`DriverInstance`]. Instances get a stable [`DriverId`] from the
//! [`Context`], register themselves with its registry, react to the
//! transport's connect/remove notifications, and run the pairing handshake
//! that binds two drivers into an exclusive partnership.
//!
//! The bus transport, the event bus and the driver registry are
//! collaborators supplied through [`Platform`]. [`EventQueue`] and
//! [`DriverTable`] are fixed-capacity implementations of the latter two.
//!
//! Event delivery is cooperative: operations publish into the event bus and
//! return; the application drains [`Context::next_delivery`] and hands each
//! delivery to the instance it names via [`DriverInstance::deliver`].

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod context;
mod driver;
mod error;
mod event;
mod pairing;
mod platform;
mod registry;

pub use context::{Config, Context, DYNAMIC_ID_BASE};
pub use driver::{BaseDriver, Driver, DriverInstance, DriverResult, Peer};
pub use error::{DriverError, EventBusError, Outcome, RegistryFull};
pub use event::{
    Delivery, DriverId, Event, EventBus, EventKind, EventQueue, Handler, SubscriptionId,
};
pub use jd_icd as icd;
pub use platform::{Platform, Transport, TransportError};
pub use registry::{DriverRegistry, DriverTable};

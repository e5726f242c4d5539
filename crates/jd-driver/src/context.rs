use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use jd_icd::DeviceRecord;
use portable_atomic::{AtomicU32, Ordering};

use crate::error::{DriverError, EventBusError, RegistryFull};
use crate::event::{Delivery, DriverId, Event, EventBus, EventKind, Handler, SubscriptionId};
use crate::platform::{Platform, Transport, TransportError};
use crate::registry::DriverRegistry;

/// First id handed out by a context built with [`Config::default`].
pub const DYNAMIC_ID_BASE: u32 = 3000;

/// Tunables for a [`Context`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Id given to the first driver created in the context. Ids count up
    /// from here and stop before `u32::MAX`.
    pub first_id: u32,
    /// Priority passed to the transport for control packets.
    pub control_priority: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self { first_id: DYNAMIC_ID_BASE, control_priority: 0 }
    }
}

/// Process-scoped state shared by every driver instance: the id counter and
/// the registry, event bus and transport collaborators.
///
/// Drivers hold a shared reference to the context for their whole life, so
/// in firmware it normally lives in a `static`.
pub struct Context<P: Platform> {
    config: Config,
    next_id: AtomicU32,
    registry: Mutex<P::Mutex, RefCell<P::Registry>>,
    events: Mutex<P::Mutex, RefCell<P::Events>>,
    transport: Mutex<P::Mutex, RefCell<P::Transport>>,
}

impl<P: Platform> Context<P> {
    pub const fn new(
        config: Config,
        registry: P::Registry,
        events: P::Events,
        transport: P::Transport,
    ) -> Self {
        Self {
            next_id: AtomicU32::new(config.first_id),
            config,
            registry: Mutex::new(RefCell::new(registry)),
            events: Mutex::new(RefCell::new(events)),
            transport: Mutex::new(RefCell::new(transport)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut P::Registry) -> R) -> R {
        self.registry.lock(|cell| f(&mut *cell.borrow_mut()))
    }

    /// Run `f` with exclusive access to the event bus.
    pub fn with_events<R>(&self, f: impl FnOnce(&mut P::Events) -> R) -> R {
        self.events.lock(|cell| f(&mut *cell.borrow_mut()))
    }

    /// Run `f` with exclusive access to the transport.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut P::Transport) -> R) -> R {
        self.transport.lock(|cell| f(&mut *cell.borrow_mut()))
    }

    /// Pop the next pending event delivery. The caller routes it to the
    /// instance named by `subscriber` through
    /// [`DriverInstance::deliver`](crate::DriverInstance::deliver).
    pub fn next_delivery(&self) -> Option<Delivery> {
        self.with_events(|events| events.next_delivery())
    }

    /// Ids are never reused within a context; `None` once they run out.
    pub(crate) fn allocate_id(&self) -> Option<DriverId> {
        self.next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .ok()
            .map(DriverId)
    }

    pub(crate) fn register(
        &self,
        id: DriverId,
        device: &DeviceRecord,
    ) -> Result<(), RegistryFull> {
        self.with_registry(|registry| registry.add(id, device))
    }

    pub(crate) fn deregister(&self, id: DriverId) {
        self.with_registry(|registry| registry.remove(id))
    }

    pub(crate) fn listen(
        &self,
        source: DriverId,
        kind: EventKind,
        subscriber: DriverId,
        handler: Handler,
    ) -> Result<SubscriptionId, EventBusError> {
        self.with_events(|events| events.listen(source, kind, subscriber, handler))
    }

    pub(crate) fn ignore(&self, subscription: SubscriptionId) -> bool {
        self.with_events(|events| events.ignore(subscription))
    }

    pub(crate) fn publish(&self, source: DriverId, kind: EventKind) -> Result<(), EventBusError> {
        self.with_events(|events| events.publish(Event::new(source, kind)))
    }

    /// Publish `kind` for a change that has already taken effect. A full
    /// event bus drops the notification instead of failing the operation.
    pub(crate) fn notify(&self, source: DriverId, kind: EventKind) {
        if let Err(e) = self.publish(source, kind) {
            warn!("driver {} dropped {} event: {}", source.0, kind, e);
        }
    }

    /// Send a control frame at the configured control priority.
    pub(crate) fn send_control(
        &self,
        frame: &[u8],
    ) -> Result<(), DriverError<TransportError<P>>> {
        let priority = self.config.control_priority;
        self.with_transport(|transport| transport.send(frame, priority))
            .map_err(DriverError::Transport)
    }
}

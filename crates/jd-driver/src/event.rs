//! Event bus seam.
//!
//! Drivers never call each other directly; they publish events keyed by
//! their [`DriverId`] and subscribe to events from other ids. A subscription
//! names the handler it is bound to, so delivering it back to the right
//! driver is a plain `match` and cancelling it is exact.

use heapless::{Deque, Vec};

use crate::error::EventBusError;

/// Stable local identity of a driver instance, independent of its bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverId(pub u32);

/// Handle returned by [`EventBus::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscriptionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    Connected,
    Disconnected,
    Paired,
    Unpaired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub source: DriverId,
    pub kind: EventKind,
}

impl Event {
    pub const fn new(source: DriverId, kind: EventKind) -> Self {
        Self { source, kind }
    }
}

/// What a subscriber wants run when a matching event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handler {
    /// Own address assigned; send the pending pairing request.
    OnEnumeration,
    /// The owned peer went away; tear the pairing down.
    PartnerDisconnected,
    /// Application listener, tagged with a caller-chosen value.
    External(u16),
}

/// One event routed to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Delivery {
    pub subscription: SubscriptionId,
    pub subscriber: DriverId,
    pub handler: Handler,
    pub event: Event,
}

/// Publish/subscribe dispatcher used for every asynchronous notification.
pub trait EventBus {
    /// Run `handler` on `subscriber` whenever `source` publishes `kind`.
    fn listen(
        &mut self,
        source: DriverId,
        kind: EventKind,
        subscriber: DriverId,
        handler: Handler,
    ) -> Result<SubscriptionId, EventBusError>;

    /// Cancel a subscription, including deliveries still waiting for it.
    /// Returns `false` when the subscription was already gone.
    fn ignore(&mut self, subscription: SubscriptionId) -> bool;

    fn publish(&mut self, event: Event) -> Result<(), EventBusError>;

    /// Next delivery in publish order.
    fn next_delivery(&mut self) -> Option<Delivery>;
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    id: SubscriptionId,
    source: DriverId,
    kind: EventKind,
    subscriber: DriverId,
    handler: Handler,
}

/// Fixed-capacity event bus with `S` subscriptions and `D` pending deliveries.
///
/// Fan-out happens at publish time: a subscription made after an event was
/// published does not see it, and cancelling a subscription drops whatever
/// was queued for it.
pub struct EventQueue<const S: usize, const D: usize> {
    subscriptions: Vec<Subscription, S>,
    pending: Deque<Delivery, D>,
    next_subscription: u32,
}

impl<const S: usize, const D: usize> EventQueue<S, D> {
    pub const fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            pending: Deque::new(),
            next_subscription: 0,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_subscribed(&self, subscription: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|s| s.id == subscription)
    }
}

impl<const S: usize, const D: usize> Default for EventQueue<S, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const S: usize, const D: usize> EventBus for EventQueue<S, D> {
    fn listen(
        &mut self,
        source: DriverId,
        kind: EventKind,
        subscriber: DriverId,
        handler: Handler,
    ) -> Result<SubscriptionId, EventBusError> {
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions
            .push(Subscription { id, source, kind, subscriber, handler })
            .map_err(|_| EventBusError::SubscriptionsFull)?;
        self.next_subscription = self.next_subscription.wrapping_add(1);
        Ok(id)
    }

    fn ignore(&mut self, subscription: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != subscription);
        for _ in 0..self.pending.len() {
            if let Some(d) = self.pending.pop_front() {
                if d.subscription != subscription {
                    // One slot was just freed.
                    let _ = self.pending.push_back(d);
                }
            }
        }
        self.subscriptions.len() != before
    }

    fn publish(&mut self, event: Event) -> Result<(), EventBusError> {
        let matches = |s: &&Subscription| s.source == event.source && s.kind == event.kind;
        let count = self.subscriptions.iter().filter(matches).count();
        if self.pending.len() + count > D {
            return Err(EventBusError::QueueFull);
        }
        for s in self.subscriptions.iter().filter(matches) {
            // Capacity was checked above.
            let _ = self.pending.push_back(Delivery {
                subscription: s.id,
                subscriber: s.subscriber,
                handler: s.handler,
                event,
            });
        }
        Ok(())
    }

    fn next_delivery(&mut self) -> Option<Delivery> {
        self.pending.pop_front()
    }
}

use alloc::boxed::Box;

use jd_icd::{
    ControlPacket, ControlPacketType, DeviceFlags, DeviceRecord, DriverRole, RawPacket,
};

use crate::context::Context;
use crate::error::{DriverError, Outcome};
use crate::event::{Delivery, DriverId, EventKind, Handler, SubscriptionId};
use crate::platform::{Platform, TransportError};

/// Result type of driver operations on platform `P`.
pub type DriverResult<T, P> = Result<T, DriverError<TransportError<P>>>;

/// Class-specific behavior plugged into a [`DriverInstance`].
///
/// Every method has a default, so a driver only overrides what it handles.
pub trait Driver {
    /// Append class-specific data to an outgoing control packet.
    fn fill_control_packet(
        &mut self,
        _device: &DeviceRecord,
        _packet: &mut ControlPacket,
    ) -> Outcome {
        Outcome::Handled
    }

    /// Handle a control packet that is not part of the pairing protocol.
    fn handle_control_packet(
        &mut self,
        _device: &DeviceRecord,
        _packet: &RawPacket,
    ) -> Outcome {
        Outcome::Cancelled
    }

    /// Handle a data packet addressed to this driver.
    fn handle_packet(&mut self, _device: &DeviceRecord, _packet: &RawPacket) -> Outcome {
        Outcome::Cancelled
    }
}

/// Driver with no class-specific behavior. Used for the counterparts the
/// pairing protocol creates.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseDriver;

impl Driver for BaseDriver {}

/// Counterpart owned by a paired (or pairing) instance.
pub type Peer<'a, P> = DriverInstance<'a, P, BaseDriver>;

/// One participant on the bus, as seen from this device.
///
/// Owns its [`DeviceRecord`] and at most one [`Peer`]. Construction registers
/// the instance with the context's registry; dropping it releases the peer,
/// cancels its subscriptions and deregisters.
pub struct DriverInstance<'a, P: Platform, D: Driver = BaseDriver> {
    pub(crate) ctx: &'a Context<P>,
    pub(crate) id: DriverId,
    pub(crate) device: DeviceRecord,
    pub(crate) paired: Option<Box<Peer<'a, P>>>,
    /// One-shot `Connected` subscription armed while a pairing request waits
    /// for our address.
    pub(crate) enumeration: Option<SubscriptionId>,
    /// `Disconnected` subscription on the owned peer.
    pub(crate) partner: Option<SubscriptionId>,
    driver: D,
}

impl<'a, P: Platform, D: Driver> DriverInstance<'a, P, D> {
    pub fn new(
        ctx: &'a Context<P>,
        device: DeviceRecord,
        driver: D,
    ) -> DriverResult<Self, P> {
        let Some(id) = ctx.allocate_id() else {
            return Err(DriverError::IdsExhausted);
        };
        ctx.register(id, &device)?;
        debug!(
            "driver {} created: sn {} class {}",
            id.0,
            device.serial_number,
            device.driver_class
        );
        Ok(Self {
            ctx,
            id,
            device,
            paired: None,
            enumeration: None,
            partner: None,
            driver,
        })
    }

    pub fn id(&self) -> DriverId {
        self.id
    }

    pub fn device(&self) -> &DeviceRecord {
        &self.device
    }

    pub fn address(&self) -> u8 {
        self.device.address
    }

    pub fn driver_class(&self) -> u32 {
        self.device.driver_class
    }

    pub fn serial_number(&self) -> u32 {
        self.device.serial_number
    }

    pub fn flags(&self) -> DeviceFlags {
        self.device.flags
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// The paired or pending counterpart, if any.
    pub fn peer(&self) -> Option<&Peer<'a, P>> {
        self.paired.as_deref()
    }

    /// Mutable access for the router, which delivers frames and removals
    /// to the counterpart.
    pub fn peer_mut(&mut self) -> Option<&mut Peer<'a, P>> {
        self.paired.as_deref_mut()
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    pub fn is_paired(&self) -> bool {
        self.device.is_paired()
    }

    pub fn is_pairable(&self) -> bool {
        self.device.is_pairable()
    }

    /// Record the bus address assigned during enumeration.
    pub fn set_address(&mut self, address: u8) {
        self.device.address = address;
    }

    pub fn set_role(&mut self, role: DriverRole) {
        self.device.set_role(role);
    }

    /// The device has been seen on the bus and holds an address.
    ///
    /// The `Connected` event drives pending pairing requests, so a full
    /// event bus is reported as an error. The flags are already set by
    /// then and calling this again is safe.
    pub fn device_connected(&mut self, device: DeviceRecord) -> DriverResult<Outcome, P> {
        info!("CONNECTED a:{} sn:{}", device.address, device.serial_number);
        self.device
            .flags
            .insert(DeviceFlags::INITIALISED | DeviceFlags::CP_SEEN);
        self.ctx.publish(self.id, EventKind::Connected)?;
        Ok(Outcome::Handled)
    }

    /// The device dropped off the bus.
    pub fn device_removed(&mut self) -> DriverResult<Outcome, P> {
        info!(
            "DISCONN a:{} sn:{}",
            self.device.address,
            self.device.serial_number
        );
        self.device.flags.remove(DeviceFlags::INITIALISED);
        self.device.rolling_counter = 0;
        self.ctx.publish(self.id, EventKind::Disconnected)?;
        Ok(Outcome::Handled)
    }

    /// Entry point for frames arriving on the logic channel.
    pub fn handle_logic_packet(&mut self, packet: &RawPacket) -> DriverResult<Outcome, P> {
        let cp = packet.as_control();

        // Pairing requests are handled here, everything else goes to the driver.
        if cp.packet_type == ControlPacketType::PairingRequest {
            return self.handle_pairing_packet(packet);
        }

        Ok(self.driver.handle_control_packet(&self.device, packet))
    }

    /// Entry point for data frames addressed to this driver.
    pub fn handle_packet(&mut self, packet: &RawPacket) -> Outcome {
        self.driver.handle_packet(&self.device, packet)
    }

    pub fn fill_control_packet(&mut self, packet: &mut ControlPacket) -> Outcome {
        self.driver.fill_control_packet(&self.device, packet)
    }

    /// Control packet announcing this device, or `None` if the driver
    /// declined to fill it.
    pub fn enumeration_packet(&mut self) -> Option<ControlPacket> {
        let mut cp = ControlPacket::directed_at(&self.device, ControlPacketType::Hello);
        cp.set_device(&self.device);
        match self.fill_control_packet(&mut cp) {
            Outcome::Handled => Some(cp),
            Outcome::Cancelled => None,
        }
    }

    /// Run the handler bound to `delivery`.
    ///
    /// Deliveries for the owned peer are forwarded to it. A delivery whose
    /// subscription this instance no longer holds is stale and is dropped
    /// with [`Outcome::Cancelled`].
    pub fn deliver(&mut self, delivery: Delivery) -> DriverResult<Outcome, P> {
        if delivery.subscriber != self.id {
            return match self.paired.as_deref_mut() {
                Some(peer) if peer.id == delivery.subscriber => peer.deliver(delivery),
                _ => Ok(Outcome::Cancelled),
            };
        }

        let live = Some(delivery.subscription);
        match delivery.handler {
            Handler::OnEnumeration if self.enumeration == live => self.on_enumeration(),
            Handler::PartnerDisconnected if self.partner == live => {
                self.partner_disconnected()
            }
            _ => {
                trace!("driver {} dropped stale delivery", self.id.0);
                Ok(Outcome::Cancelled)
            }
        }
    }

    pub(crate) fn cancel_subscriptions(&mut self) {
        for subscription in [self.enumeration.take(), self.partner.take()]
            .into_iter()
            .flatten()
        {
            self.ctx.ignore(subscription);
        }
    }

    /// Destroy the owned peer with interrupts masked, so no packet handler
    /// running in interrupt context can reach it half torn down.
    pub(crate) fn release_peer(&mut self) {
        if self.paired.is_none() {
            return;
        }
        critical_section::with(|_cs| {
            let peer = self.paired.take();
            drop(peer);
        });
    }
}

impl<P: Platform, D: Driver> Drop for DriverInstance<'_, P, D> {
    fn drop(&mut self) {
        self.cancel_subscriptions();
        self.release_peer();
        self.ctx.deregister(self.id);
        trace!("driver {} destroyed", self.id.0);
    }
}

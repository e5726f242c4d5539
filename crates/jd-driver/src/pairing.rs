//! Pairing handshake.
//!
//! The initiator creates a counterpart for the target, waits for its own
//! address and then sends a `PairingRequest` on the logic channel, assuming
//! success. The target either accepts (it was pairable and the request was
//! addressed to it) or answers with a NACK, which makes the initiator tear
//! its pairing down again. There is no retry: the application decides
//! whether to call [`DriverInstance::send_pairing_packet`] again.

use alloc::boxed::Box;

use jd_icd::{
    ControlFlags, ControlPacket, ControlPacketType, DeviceFlags, DeviceRecord, DriverRole,
    RawPacket,
};

use crate::driver::{BaseDriver, Driver, DriverInstance, DriverResult};
use crate::error::Outcome;
use crate::event::{EventKind, Handler};
use crate::platform::Platform;

/// Flags of an instance that has asked to pair and waits for an address.
const INITIATOR: DeviceFlags = DeviceFlags::LOCAL
    .union(DeviceFlags::PAIR)
    .union(DeviceFlags::PAIRING);

impl<'a, P: Platform, D: Driver> DriverInstance<'a, P, D> {
    /// Start pairing with `target`.
    ///
    /// Nothing is sent yet; the request goes out from [`on_enumeration`]
    /// once this instance is connected.
    ///
    /// [`on_enumeration`]: Self::on_enumeration
    pub fn send_pairing_packet(&mut self, target: DeviceRecord) -> DriverResult<Outcome, P> {
        if self.paired.is_some() {
            warn!("driver {} already has a partner", self.id.0);
            return Ok(Outcome::Cancelled);
        }

        let peer = Box::new(DriverInstance::new(self.ctx, target, BaseDriver)?);
        let partner = self.ctx.listen(
            peer.id,
            EventKind::Disconnected,
            self.id,
            Handler::PartnerDisconnected,
        )?;
        let enumeration = match self.ctx.listen(
            self.id,
            EventKind::Connected,
            self.id,
            Handler::OnEnumeration,
        ) {
            Ok(subscription) => subscription,
            Err(e) => {
                self.ctx.ignore(partner);
                return Err(e.into());
            }
        };

        self.paired = Some(peer);
        self.partner = Some(partner);
        self.enumeration = Some(enumeration);

        // Not a role anyone should configure; we only need an address.
        self.device.set_mode(INITIATOR);

        Ok(Outcome::Handled)
    }

    /// Send the pending pairing request now that we have an address.
    pub fn on_enumeration(&mut self) -> DriverResult<Outcome, P> {
        if !self.device.is_pairing() {
            return Ok(Outcome::Cancelled);
        }

        let target = match self.paired.as_deref() {
            Some(peer) => peer.device,
            None => {
                warn!("driver {} pairing without a partner", self.id.0);
                return Ok(Outcome::Cancelled);
            }
        };

        if let Some(subscription) = self.enumeration.take() {
            self.ctx.ignore(subscription);
        }

        let mut cp = ControlPacket::directed_at(&target, ControlPacketType::PairingRequest);
        cp.set_device(&self.device);

        info!("SEND PAIRING REQ: A {} S {}", cp.address, cp.serial_number);
        self.ctx.send_control(&cp.encode())?;

        self.device.flags.remove(DeviceFlags::PAIRING);
        self.device.flags.insert(DeviceFlags::PAIRED);

        self.ctx.notify(self.id, EventKind::Paired);
        Ok(Outcome::Handled)
    }

    /// Handle a `PairingRequest` control packet addressed to this instance.
    pub fn handle_pairing_packet(&mut self, packet: &RawPacket) -> DriverResult<Outcome, P> {
        let cp = packet.as_control();
        let requester = cp.device();
        let own_serial = self.device.serial_number;

        // Our optimistic pairing was refused.
        if self.device.is_paired() && cp.is_nack() && cp.serial_number == own_serial {
            info!(
                "PAIRING REQ DENIED: A {} S {}",
                requester.address,
                requester.serial_number
            );
            return self.partner_disconnected();
        }

        if self.device.is_pairable() && cp.serial_number == own_serial {
            info!(
                "PAIRING REQ: A {} S {}",
                requester.address,
                requester.serial_number
            );

            // Local stand-in for the requester, so its disconnection reaches us.
            let mut remote = requester;
            remote.flags = DeviceFlags::REMOTE | DeviceFlags::INITIALISED;
            let peer = Box::new(DriverInstance::new(self.ctx, remote, BaseDriver)?);
            let partner = self.ctx.listen(
                peer.id,
                EventKind::Disconnected,
                self.id,
                Handler::PartnerDisconnected,
            )?;

            self.cancel_subscriptions();
            self.release_peer();
            self.paired = Some(peer);
            self.partner = Some(partner);

            self.device.flags.remove(DeviceFlags::PAIRABLE);
            self.device.flags.insert(DeviceFlags::PAIRED);

            self.ctx.notify(self.id, EventKind::Paired);
            return Ok(Outcome::Handled);
        }

        info!("NACK A {} S {}", requester.address, requester.serial_number);

        // Reply directed at the device that asked.
        let mut reply = cp;
        reply.flags.insert(ControlFlags::NACK);
        reply.address = requester.address;
        reply.serial_number = requester.serial_number;
        reply.driver_class = requester.driver_class;
        reply.set_device(&self.device);

        self.ctx.send_control(&reply.encode())?;
        Ok(Outcome::Handled)
    }

    /// Tear the pairing down and go back to the configured posture.
    ///
    /// Runs when the owned peer publishes `Disconnected` (through
    /// [`deliver`](Self::deliver)) or directly when our request was refused.
    pub fn partner_disconnected(&mut self) -> DriverResult<Outcome, P> {
        info!("PARTNER D/C: driver {}", self.id.0);
        self.cancel_subscriptions();

        self.device.flags.remove(DeviceFlags::PAIRED);

        // Paired drivers go back to seeking, pairable hosts advertise again.
        if self.device.flags.contains(DeviceFlags::PAIR) {
            self.device.set_role(DriverRole::Paired);
        } else {
            self.device.flags.insert(DeviceFlags::PAIRABLE);
        }

        self.release_peer();

        self.ctx.notify(self.id, EventKind::Unpaired);
        Ok(Outcome::Handled)
    }
}

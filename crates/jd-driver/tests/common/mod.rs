#![allow(dead_code)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use jd_driver::icd::{ControlPacket, DeviceFlags, DeviceRecord, DriverRole, RawPacket};
use jd_driver::{
    Config, Context, Delivery, DriverId, DriverInstance, DriverRegistry, DriverTable,
    EventBus, EventKind, EventQueue, Handler, Platform, RegistryFull, SubscriptionId,
    Transport,
};

pub const CLASS: u32 = 0x1234;

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSendError;

/// Records every frame it is asked to send.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Vec<(Vec<u8>, u8)>,
    /// When set, every send fails.
    pub fail: bool,
}

impl Transport for MockTransport {
    type Error = MockSendError;

    fn send(&mut self, frame: &[u8], priority: u8) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockSendError);
        }
        self.sent.push((frame.to_vec(), priority));
        Ok(())
    }
}

/// Registry that remembers every removal, in order.
#[derive(Default)]
pub struct MockRegistry {
    pub table: DriverTable<16>,
    pub removed: Vec<DriverId>,
}

impl DriverRegistry for MockRegistry {
    fn add(&mut self, id: DriverId, device: &DeviceRecord) -> Result<(), RegistryFull> {
        self.table.add(id, device)
    }

    fn remove(&mut self, id: DriverId) {
        self.removed.push(id);
        self.table.remove(id);
    }
}

pub struct TestPlatform;

impl Platform for TestPlatform {
    type Mutex = NoopRawMutex;
    type Registry = MockRegistry;
    type Events = EventQueue<16, 32>;
    type Transport = MockTransport;
}

/// Platform with room for a single subscription and a single driver.
pub struct TinyPlatform;

impl Platform for TinyPlatform {
    type Mutex = NoopRawMutex;
    type Registry = DriverTable<1>;
    type Events = EventQueue<1, 4>;
    type Transport = MockTransport;
}

/// Platform whose event bus holds a single pending delivery.
pub struct CrampedPlatform;

impl Platform for CrampedPlatform {
    type Mutex = NoopRawMutex;
    type Registry = MockRegistry;
    type Events = EventQueue<4, 1>;
    type Transport = MockTransport;
}

pub type TestContext = Context<TestPlatform>;
pub type TestDriver<'a> = DriverInstance<'a, TestPlatform>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn make_context() -> TestContext {
    Context::new(
        Config::default(),
        MockRegistry::default(),
        EventQueue::new(),
        MockTransport::default(),
    )
}

pub fn record(serial_number: u32, role: DriverRole) -> DeviceRecord {
    DeviceRecord::new(serial_number, CLASS, role)
}

/// Record of a device already on the bus at `address`.
pub fn on_bus(serial_number: u32, address: u8, role: DriverRole) -> DeviceRecord {
    let mut d = record(serial_number, role);
    d.address = address;
    d
}

/// Subscribe an application listener to `kind` events from `source`.
pub fn watch(ctx: &TestContext, source: DriverId, kind: EventKind) -> SubscriptionId {
    ctx.with_events(|events| events.listen(source, kind, DriverId(0), Handler::External(0)))
        .unwrap()
}

/// Hand every pending delivery to `drivers` until the bus is idle. Returns
/// the deliveries meant for application listeners.
pub fn pump(ctx: &TestContext, drivers: &mut [&mut TestDriver<'_>]) -> Vec<Delivery> {
    let mut external = Vec::new();
    while let Some(delivery) = ctx.next_delivery() {
        if let Handler::External(_) = delivery.handler {
            external.push(delivery);
            continue;
        }
        for driver in drivers.iter_mut() {
            driver.deliver(delivery).unwrap();
        }
    }
    external
}

pub fn sent_frames(ctx: &TestContext) -> Vec<Vec<u8>> {
    ctx.with_transport(|t| t.sent.iter().map(|(frame, _)| frame.clone()).collect())
}

pub fn last_sent(ctx: &TestContext) -> ControlPacket {
    let frames = sent_frames(ctx);
    ControlPacket::decode(frames.last().expect("nothing was sent")).unwrap()
}

/// Wrap a sent control frame the way the router would deliver it.
pub fn as_received(frame: &[u8]) -> RawPacket {
    RawPacket::control(&ControlPacket::decode(frame).unwrap())
}

pub fn removed(ctx: &TestContext) -> Vec<DriverId> {
    ctx.with_registry(|r| r.removed.clone())
}

pub fn assert_flags_consistent(device: &DeviceRecord) {
    let flags = device.flags;
    assert!(
        !flags.contains(DeviceFlags::PAIRED | DeviceFlags::PAIRABLE),
        "PAIRED and PAIRABLE both set: {:?}",
        flags
    );
    assert!(
        !flags.contains(DeviceFlags::PAIRED | DeviceFlags::PAIRING),
        "PAIRED and PAIRING both set: {:?}",
        flags
    );
}

/// Bring `driver` onto the bus at `address`.
pub fn enumerate(driver: &mut TestDriver<'_>, address: u8) {
    driver.set_address(address);
    let device = *driver.device();
    driver.device_connected(device).unwrap();
}

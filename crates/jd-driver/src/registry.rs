use heapless::Vec;
use jd_icd::DeviceRecord;

use crate::error::RegistryFull;
use crate::event::DriverId;

/// Process-wide list of live drivers. Every [`DriverInstance`](crate::DriverInstance)
/// adds itself on construction and removes itself when dropped.
pub trait DriverRegistry {
    fn add(&mut self, id: DriverId, device: &DeviceRecord) -> Result<(), RegistryFull>;

    /// Removing an id that is not registered is a no-op.
    fn remove(&mut self, id: DriverId);
}

/// Registry backed by a fixed-size table of `N` entries.
pub struct DriverTable<const N: usize> {
    entries: Vec<(DriverId, DeviceRecord), N>,
}

impl<const N: usize> DriverTable<N> {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: DriverId) -> bool {
        self.entries.iter().any(|(i, _)| *i == id)
    }

    /// Device record as it was when `id` registered.
    pub fn registered_as(&self, id: DriverId) -> Option<&DeviceRecord> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, d)| d)
    }

    pub fn ids(&self) -> impl Iterator<Item = DriverId> + '_ {
        self.entries.iter().map(|(i, _)| *i)
    }
}

impl<const N: usize> Default for DriverTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DriverRegistry for DriverTable<N> {
    fn add(&mut self, id: DriverId, device: &DeviceRecord) -> Result<(), RegistryFull> {
        self.entries.push((id, *device)).map_err(|_| RegistryFull)
    }

    fn remove(&mut self, id: DriverId) {
        self.entries.retain(|(i, _)| *i != id);
    }
}

//! Per-device lookup of which physical inputs the hooks may touch.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Events from this device are never hooked.
    pub blacklisted: bool,
}

impl DeviceDescriptor {
    fn blacklisted() -> Self {
        Self { blacklisted: true }
    }

    fn for_ids(vendor: u16, product: u16) -> Self {
        match (vendor, product) {
            // Internal devices, our own virtual mouse included.
            (0, 0) => Self::blacklisted(),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DeviceDb {
    devices: RwLock<HashMap<i32, DeviceDescriptor>>,
}

impl DeviceDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, id: i32, vendor: u16, product: u16) {
        let descriptor = DeviceDescriptor::for_ids(vendor, product);
        log::debug!(
            "Device {} ({:04x}:{:04x}) blacklisted={}",
            id,
            vendor,
            product,
            descriptor.blacklisted
        );
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, descriptor);
    }

    pub fn remove_device(&self, id: i32) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Descriptor for `id`; unknown devices are treated as blacklisted.
    pub fn get(&self, id: i32) -> DeviceDescriptor {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
            .unwrap_or_else(DeviceDescriptor::blacklisted)
    }
}
